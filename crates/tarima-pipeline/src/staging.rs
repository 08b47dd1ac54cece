//! Copia de canciones e imágenes al directorio de staging con nombres
//! canónicos.

use std::collections::HashSet;
use std::io;
use std::path::Path;
use std::sync::Arc;

use tarima_core::domain::Album;
use tarima_core::naming::song_file_name;
use tarima_core::ports::FileSystem;

use crate::images::Harvest;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StagedCount {
  /// Archivos copiados o movidos en esta pasada.
  pub placed: usize,
  /// Archivos que ya estaban en su destino.
  pub unchanged: usize,
}

pub struct Stager {
  fs: Arc<dyn FileSystem>,
  delete_original: bool,
}

impl Stager {
  pub fn new(fs: Arc<dyn FileSystem>, delete_original: bool) -> Self {
    Self { fs, delete_original }
  }

  pub async fn ensure_dir(&self, dir: &Path) -> io::Result<()> {
    if self.fs.directory_exists(dir).await {
      return Ok(());
    }
    self.fs.create_dir_all(dir).await
  }

  /// Deja `to` con el contenido de `from`. Un destino que ya existe con el
  /// mismo tamaño se da por bueno. Devuelve si hubo que tocar el disco.
  async fn place(&self, from: &Path, to: &Path, move_file: bool) -> io::Result<bool> {
    if from == to {
      return Ok(false);
    }
    if self.fs.file_exists(to).await {
      let same_size = match (self.fs.file_size(from).await, self.fs.file_size(to).await) {
        (Ok(a), Ok(b)) => a == b,
        (Err(_), Ok(_)) => true,
        _ => false,
      };
      if same_size {
        return Ok(false);
      }
    }
    if move_file {
      self.fs.move_path(from, to).await?;
    } else {
      self.fs.copy_file(from, to).await?;
    }
    Ok(true)
  }

  /// Lleva las canciones de `source_dir` a `target_dir` y actualiza
  /// `file_name` y `file_size` de cada una. Dos canciones con el mismo nombre
  /// canónico no se pisan: la segunda recibe un sufijo ` (n)` según el orden
  /// del álbum.
  pub async fn stage_songs(
    &self,
    album: &mut Album,
    source_dir: &Path,
    target_dir: &Path,
  ) -> io::Result<StagedCount> {
    let song_total = album.song_total();
    let mut count = StagedCount::default();
    let mut used = HashSet::new();

    for song in album.songs.iter_mut() {
      let name = unique_name(song_file_name(song, song_total), &mut used);
      let from = source_dir.join(&song.file_name);
      let to = target_dir.join(&name);

      if !self.fs.file_exists(&from).await && !self.fs.file_exists(&to).await {
        tracing::warn!(song = %song.id, path = %from.display(), "song file not found, not staged");
        continue;
      }

      if self.place(&from, &to, self.delete_original).await? {
        count.placed += 1;
      } else {
        count.unchanged += 1;
      }
      song.file_name = name;
      if let Ok(size) = self.fs.file_size(&to).await {
        song.file_size = size;
      }
    }
    Ok(count)
  }

  /// Lleva las imágenes recolectadas a `target_dir`. Las copias temporales
  /// de conversión se mueven siempre.
  pub async fn stage_images(&self, harvest: &Harvest, target_dir: &Path) -> io::Result<StagedCount> {
    let mut count = StagedCount::default();

    for image in harvest.iter() {
      let to = target_dir.join(&image.info.file_name);
      let move_file = image.temporary || self.delete_original;

      if self.place(&image.source, &to, move_file).await? {
        count.placed += 1;
      } else {
        count.unchanged += 1;
        if image.temporary && self.fs.file_exists(&image.source).await {
          self.fs.delete_file(&image.source).await?;
        }
      }
    }
    Ok(count)
  }
}

/// `name` si está libre en `used`; si no, `"{stem} (n){ext}"` con el primer
/// `n` libre desde 2. Sin distinguir mayúsculas.
fn unique_name(name: String, used: &mut HashSet<String>) -> String {
  if used.insert(name.to_lowercase()) {
    return name;
  }
  let path = Path::new(&name);
  let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(&name);
  let ext = path.extension().and_then(|e| e.to_str()).map(|e| format!(".{e}")).unwrap_or_default();
  let mut n = 2;
  loop {
    let candidate = format!("{stem} ({n}){ext}");
    if used.insert(candidate.to_lowercase()) {
      return candidate;
    }
    n += 1;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tarima_core::domain::{Artist, ImageInfo, MetaTagIdentifier as Tag, PictureIdentifier, Song, TagSet};
  use tarima_fs::MemoryFileSystem;

  use crate::images::HarvestedImage;

  fn album() -> Album {
    let songs = vec![
      Song::new("track1.flac", TagSet::from_pairs([(Tag::TrackNumber, "1"), (Tag::Title, "so what")])),
      Song::new("track2.flac", TagSet::from_pairs([(Tag::TrackNumber, "2"), (Tag::Title, "Freddie Freeloader")])),
      Song::new("missing.flac", TagSet::from_pairs([(Tag::TrackNumber, "3"), (Tag::Title, "Blue in Green")])),
    ];
    Album::new(Artist::new("Miles Davis"), TagSet::from_pairs([(Tag::Album, "Kind of Blue")]), songs, "/in/kob")
  }

  fn fs() -> Arc<MemoryFileSystem> {
    Arc::new(
      MemoryFileSystem::new()
        .with_file("/in/kob/track1.flac", b"one".to_vec())
        .with_file("/in/kob/track2.flac", b"two!".to_vec())
        .with_file("/in/kob/cover.jpg", b"img".to_vec())
        .with_dir("/stage/kob"),
    )
  }

  #[tokio::test]
  async fn songs_get_canonical_names_and_second_pass_is_a_no_op() {
    let fs = fs();
    let stager = Stager::new(fs.clone(), false);
    let mut a = album();

    let first = stager.stage_songs(&mut a, Path::new("/in/kob"), Path::new("/stage/kob")).await.unwrap();
    assert_eq!(first, StagedCount { placed: 2, unchanged: 0 });
    assert_eq!(a.songs[0].file_name, "01 So What.flac");
    assert_eq!(a.songs[1].file_size, 4);
    assert_eq!(a.songs[2].file_name, "missing.flac");
    assert!(fs.file_exists(Path::new("/in/kob/track1.flac")).await);

    let mutations = fs.mutation_count();
    let mut again = album();
    let second = stager.stage_songs(&mut again, Path::new("/in/kob"), Path::new("/stage/kob")).await.unwrap();
    assert_eq!(second, StagedCount { placed: 0, unchanged: 2 });
    assert_eq!(fs.mutation_count(), mutations);
  }

  #[tokio::test]
  async fn colliding_canonical_names_get_distinct_files() {
    let fs = Arc::new(
      MemoryFileSystem::new()
        .with_file("/in/raw/a.flac", b"first-song".to_vec())
        .with_file("/in/raw/b.flac", b"second-song-longer".to_vec())
        .with_dir("/stage/raw"),
    );
    let songs = vec![Song::new("a.flac", TagSet::default()), Song::new("b.flac", TagSet::default())];
    let mut a = Album::new(Artist::new("Unknown"), TagSet::default(), songs, "/in/raw");
    let stager = Stager::new(fs.clone(), false);

    let first = stager.stage_songs(&mut a, Path::new("/in/raw"), Path::new("/stage/raw")).await.unwrap();
    assert_eq!(first.placed, 2);
    assert_eq!(a.songs[0].file_name, "00 Untitled.flac");
    assert_eq!(a.songs[1].file_name, "00 Untitled (2).flac");
    assert_eq!(fs.read_bytes(Path::new("/stage/raw/00 Untitled.flac")).await.unwrap(), b"first-song");
    assert_eq!(fs.read_bytes(Path::new("/stage/raw/00 Untitled (2).flac")).await.unwrap(), b"second-song-longer");

    let mutations = fs.mutation_count();
    let songs = vec![Song::new("a.flac", TagSet::default()), Song::new("b.flac", TagSet::default())];
    let mut again = Album::new(Artist::new("Unknown"), TagSet::default(), songs, "/in/raw");
    let second = stager.stage_songs(&mut again, Path::new("/in/raw"), Path::new("/stage/raw")).await.unwrap();
    assert_eq!(second, StagedCount { placed: 0, unchanged: 2 });
    assert_eq!(fs.mutation_count(), mutations);
  }

  #[tokio::test]
  async fn delete_original_moves_files() {
    let fs = fs();
    let stager = Stager::new(fs.clone(), true);
    let mut a = album();

    stager.stage_songs(&mut a, Path::new("/in/kob"), Path::new("/stage/kob")).await.unwrap();
    assert!(!fs.file_exists(Path::new("/in/kob/track1.flac")).await);
    assert!(fs.file_exists(Path::new("/stage/kob/02 Freddie Freeloader.flac")).await);
  }

  #[tokio::test]
  async fn temporary_images_are_moved_and_cleaned_up() {
    let fs = Arc::new(
      MemoryFileSystem::new().with_file("/in/kob/cover.jpg", b"img".to_vec()).with_file("/w/abc.jpg", b"conv".to_vec()),
    );
    let stager = Stager::new(fs.clone(), false);
    let info = |name: &str| ImageInfo {
      hash: name.into(),
      picture_identifier: PictureIdentifier::Front,
      sort_order: 1,
      width: 1,
      height: 1,
      original_file_name: name.into(),
      file_name: name.into(),
    };
    let harvest = Harvest {
      album: vec![
        HarvestedImage { source: "/in/kob/cover.jpg".into(), temporary: false, info: info("i-01-Front.jpg") },
        HarvestedImage { source: "/w/abc.jpg".into(), temporary: true, info: info("i-02-Front.jpg") },
      ],
      artist: vec![],
      discarded: 0,
    };

    let count = stager.stage_images(&harvest, Path::new("/stage/kob")).await.unwrap();
    assert_eq!(count.placed, 2);
    assert!(fs.file_exists(Path::new("/in/kob/cover.jpg")).await);
    assert!(!fs.file_exists(Path::new("/w/abc.jpg")).await);
    assert!(fs.file_exists(Path::new("/stage/kob/i-02-Front.jpg")).await);
  }
}
