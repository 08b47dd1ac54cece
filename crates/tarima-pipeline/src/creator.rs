use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tarima_core::CoreError;
use tarima_core::domain::{Album, Artist, MetaTagIdentifier as Tag, Song, TagSet};
use tarima_core::naming::sidecar_file_name;
use tarima_core::ports::{AlbumSerializer, DirectoryPlugin, DirectoryPluginOutcome, FileSystem, SongTagReader};
use tarima_core::text::normalize_key;

pub const TAG_FILE_CREATOR_ID: &str = "tag-file-album-creator";

/// Tags que pasan de la primera canción que los tenga al álbum.
const ALBUM_LEVEL_TAGS: &[Tag] =
  &[Tag::Album, Tag::AlbumArtist, Tag::RecordingYear, Tag::OrigAlbumYear, Tag::AlbumDate, Tag::Genre, Tag::DiscTotal];

/// Crea sidecars a partir de los tags de los archivos de audio de un
/// directorio: un álbum por cada par (título de álbum, artista de álbum).
pub struct TagFileAlbumCreator {
  fs: Arc<dyn FileSystem>,
  reader: Arc<dyn SongTagReader>,
  serializer: Arc<dyn AlbumSerializer>,
  sidecar_suffix: String,
  max_sidecar_len: usize,
  enabled: bool,
}

impl TagFileAlbumCreator {
  pub fn new(
    fs: Arc<dyn FileSystem>,
    reader: Arc<dyn SongTagReader>,
    serializer: Arc<dyn AlbumSerializer>,
    sidecar_suffix: impl Into<String>,
    max_sidecar_len: usize,
  ) -> Self {
    Self { fs, reader, serializer, sidecar_suffix: sidecar_suffix.into(), max_sidecar_len, enabled: true }
  }

  pub fn enabled(mut self, enabled: bool) -> Self {
    self.enabled = enabled;
    self
  }

  fn album_from(&self, dir: &Path, songs: Vec<Song>) -> Album {
    let mut tags = TagSet::new();
    for id in ALBUM_LEVEL_TAGS {
      if let Some(value) = songs.iter().find_map(|s| s.tags.get(*id)) {
        tags.set(*id, value);
      }
    }
    tags.mark_persisted();

    let artist_name = songs.iter().find_map(|s| s.album_artist().or(s.artist())).unwrap_or_default();
    let mut album = Album::new(Artist::new(artist_name), tags, songs, dir);
    album.via_plugins.push(TAG_FILE_CREATOR_ID.to_string());
    album
  }
}

#[async_trait]
impl DirectoryPlugin for TagFileAlbumCreator {
  fn id(&self) -> &str {
    TAG_FILE_CREATOR_ID
  }

  fn is_enabled(&self) -> bool {
    self.enabled
  }

  fn sort_order(&self) -> i32 {
    0
  }

  async fn process_directory(&self, dir: &Path) -> Result<DirectoryPluginOutcome, CoreError> {
    let mut files = self.fs.enumerate_files(dir, false).await?;
    files.retain(|f| self.reader.handles(f));
    files.sort();

    let mut errors = Vec::new();
    let mut groups: BTreeMap<(String, String), Vec<Song>> = BTreeMap::new();
    let mut handled = 0;

    for file in files {
      let mut song = match self.reader.read_song(&file).await {
        Ok(song) => song,
        Err(e) => {
          tracing::warn!(path = %file.display(), error = %e, "unable to read song tags");
          errors.push(format!("{}: {e}", file.display()));
          continue;
        }
      };
      song.file_name = file.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string();
      song.file_size = self.fs.file_size(&file).await.unwrap_or(0);

      let key = (
        normalize_key(song.tags.get(Tag::Album).unwrap_or_default()),
        normalize_key(song.album_artist().or(song.artist()).unwrap_or_default()),
      );
      groups.entry(key).or_default().push(song);
      handled += 1;
    }

    for songs in groups.into_values() {
      let album = self.album_from(dir, songs);
      let name = sidecar_file_name(&album, &self.sidecar_suffix, self.max_sidecar_len);
      let bytes = self.serializer.serialize(&album)?;
      self.fs.write_bytes(&dir.join(&name), &bytes).await?;
      tracing::info!(dir = %dir.display(), sidecar = %name, songs = album.songs.len(), "album created from song tags");
    }

    Ok(DirectoryPluginOutcome { files_handled: handled, success: handled > 0 || errors.is_empty(), stop_processing: false, errors })
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use std::path::PathBuf;
  use tarima_fs::MemoryFileSystem;
  use tarima_metadata::JsonSidecarSerializer;

  /// Lee tags de archivos `.flac` cuyo contenido es
  /// `album|artista|pista|título|duración`.
  pub(crate) struct PipeTagReader {
    pub fs: Arc<dyn FileSystem>,
  }

  #[async_trait]
  impl SongTagReader for PipeTagReader {
    fn handles(&self, file: &Path) -> bool {
      file.extension().is_some_and(|e| e == "flac")
    }

    async fn read_song(&self, file: &Path) -> Result<Song, CoreError> {
      let bytes = self.fs.read_bytes(file).await?;
      let text = String::from_utf8(bytes).map_err(|e| CoreError::Plugin(e.to_string()))?;
      let parts: Vec<&str> = text.split('|').collect();
      let &[album, artist, track, title, length] = parts.as_slice() else {
        return Err(CoreError::Plugin(format!("bad tags in {}", file.display())));
      };
      let name = file.file_name().and_then(|n| n.to_str()).unwrap_or_default();
      Ok(Song::new(
        name,
        TagSet::from_pairs([
          (Tag::Album, album),
          (Tag::AlbumArtist, artist),
          (Tag::TrackNumber, track),
          (Tag::Title, title),
          (Tag::Length, length),
          (Tag::RecordingYear, "1997"),
        ]),
      ))
    }
  }

  #[tokio::test]
  async fn one_sidecar_per_album_group() {
    let fs = Arc::new(
      MemoryFileSystem::new()
        .with_file("/in/mix/01.flac", b"OK Computer|Radiohead|1|Airbag|284000".to_vec())
        .with_file("/in/mix/02.flac", b"OK Computer|Radiohead|2|Paranoid Android|383000".to_vec())
        .with_file("/in/mix/03.flac", b"Mezzanine|Massive Attack|1|Angel|379000".to_vec())
        .with_file("/in/mix/04.flac", b"garbage".to_vec())
        .with_file("/in/mix/notes.txt", b"ignored".to_vec()),
    );
    let creator = TagFileAlbumCreator::new(
      fs.clone(),
      Arc::new(PipeTagReader { fs: fs.clone() }),
      Arc::new(JsonSidecarSerializer),
      "tarima.json",
      200,
    );

    let out = creator.process_directory(Path::new("/in/mix")).await.unwrap();
    assert!(out.success);
    assert_eq!(out.files_handled, 3);
    assert_eq!(out.errors.len(), 1);

    let sidecars: Vec<PathBuf> = fs.file_paths().into_iter().filter(|p| p.to_string_lossy().ends_with(".tarima.json")).collect();
    assert_eq!(
      sidecars,
      vec![PathBuf::from("/in/mix/Massive Attack_Mezzanine.tarima.json"), PathBuf::from("/in/mix/Radiohead_OK Computer.tarima.json")]
    );

    let bytes = fs.read_bytes(&sidecars[1]).await.unwrap();
    let album = JsonSidecarSerializer.deserialize(&bytes).unwrap();
    assert_eq!(album.songs.len(), 2);
    assert_eq!(album.year(), Some(1997));
    assert_eq!(album.via_plugins, vec![TAG_FILE_CREATOR_ID.to_string()]);
    assert!(!album.tags.was_modified());
  }
}
