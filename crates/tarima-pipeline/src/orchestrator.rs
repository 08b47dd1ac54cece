//! Orquestador: lleva cada directorio de origen al staging.
//!
//! Por directorio: plugins de directorio, plugins de conversión, creadores de
//! álbum si no hay sidecar, y después cada álbum en secuencia (imágenes,
//! clasificación, staging, tags, validación, enriquecimiento, magic, sidecar).

use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tarima_core::OperationResult;
use tarima_core::classification;
use tarima_core::domain::{Album, Artist, MetaTagIdentifier as Tag};
use tarima_core::naming::{album_directory_name, sidecar_file_name};
use tarima_core::ports::{
  AlbumImageSearch, AlbumSerializer, AlbumValidator, ArtistSearch, ConversionPlugin, DirectoryPlugin, FileSystem,
  ImageInspector, NoopObserver, ProcessingObserver, SongTagWriter,
};
use tarima_core::text::normalize_key;

use crate::config::PipelineConfig;
use crate::context::RunContext;
use crate::enrichment::Enricher;
use crate::error::PipelineError;
use crate::images::ImageHarvester;
use crate::magic::MagicNormalizer;
use crate::staging::Stager;

/// Directorio de trabajo para conversiones, dentro del staging.
const WORK_DIR_NAME: &str = ".tarima-work";

/// Contadores de una ejecución.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessingSummary {
  pub directories_processed: usize,
  pub directories_skipped: usize,
  pub albums_processed: usize,
  pub valid_albums: usize,
  pub album_errors: usize,
  pub song_files_staged: usize,
  pub image_files_staged: usize,
  pub sidecars_written: usize,
  pub directory_plugin_files: usize,
  pub conversion_files: usize,
  pub images_harvested: usize,
  /// La ejecución paró por cancelación o por cuota antes de recorrer todo.
  pub stopped_early: bool,
  /// Un error de directorio abortó la ejecución.
  pub aborted: bool,
  pub elapsed_ms: u64,
}

enum DirectoryState {
  Done { albums: usize },
  Skipped,
}

struct Run<'a> {
  source: &'a Path,
  staging: &'a Path,
  work_dir: PathBuf,
  ctx: &'a RunContext,
}

pub struct DirectoryProcessor {
  fs: Arc<dyn FileSystem>,
  serializer: Arc<dyn AlbumSerializer>,
  validator: Arc<dyn AlbumValidator>,
  tag_writer: Option<Arc<dyn SongTagWriter>>,
  directory_plugins: Vec<Arc<dyn DirectoryPlugin>>,
  conversion_plugins: Vec<Arc<dyn ConversionPlugin>>,
  creators: Vec<Arc<dyn DirectoryPlugin>>,
  observer: Arc<dyn ProcessingObserver>,
  harvester: ImageHarvester,
  stager: Stager,
  enricher: Enricher,
  magic: MagicNormalizer,
  cfg: PipelineConfig,
}

impl DirectoryProcessor {
  pub fn new(
    fs: Arc<dyn FileSystem>,
    serializer: Arc<dyn AlbumSerializer>,
    validator: Arc<dyn AlbumValidator>,
    inspector: Arc<dyn ImageInspector>,
    cfg: PipelineConfig,
  ) -> Self {
    Self {
      harvester: ImageHarvester::new(fs.clone(), inspector.clone(), cfg.maximum_images_count, cfg.sidecar_suffix.clone()),
      stager: Stager::new(fs.clone(), cfg.delete_original),
      enricher: Enricher::new(fs.clone(), inspector, &cfg),
      magic: MagicNormalizer::new(&cfg),
      fs,
      serializer,
      validator,
      tag_writer: None,
      directory_plugins: Vec::new(),
      conversion_plugins: Vec::new(),
      creators: Vec::new(),
      observer: Arc::new(NoopObserver),
      cfg,
    }
  }

  pub fn with_tag_writer(mut self, writer: Arc<dyn SongTagWriter>) -> Self {
    self.tag_writer = Some(writer);
    self
  }

  pub fn with_directory_plugin(mut self, plugin: Arc<dyn DirectoryPlugin>) -> Self {
    self.directory_plugins.push(plugin);
    self.directory_plugins.sort_by_key(|p| p.sort_order());
    self
  }

  pub fn with_conversion_plugin(mut self, plugin: Arc<dyn ConversionPlugin>) -> Self {
    self.conversion_plugins.push(plugin);
    self.conversion_plugins.sort_by_key(|p| p.sort_order());
    self
  }

  /// Creador de álbumes de respaldo: solo corre en directorios sin sidecar.
  pub fn with_album_creator(mut self, creator: Arc<dyn DirectoryPlugin>) -> Self {
    self.creators.push(creator);
    self.creators.sort_by_key(|p| p.sort_order());
    self
  }

  pub fn with_observer(mut self, observer: Arc<dyn ProcessingObserver>) -> Self {
    self.observer = observer;
    self
  }

  pub fn with_artist_search(mut self, search: Arc<dyn ArtistSearch>) -> Self {
    self.enricher = self.enricher.with_artist_search(search);
    self
  }

  pub fn with_image_search(mut self, search: Arc<dyn AlbumImageSearch>) -> Self {
    self.enricher = self.enricher.with_image_search(search);
    self
  }

  fn is_sidecar(&self, path: &Path) -> bool {
    let suffix = self.cfg.sidecar_suffix.trim_start_matches('.');
    path
      .file_name()
      .and_then(|n| n.to_str())
      .is_some_and(|n| n == suffix || n.ends_with(&format!(".{suffix}")))
  }

  fn has_skip_prefix(&self, dir: &Path) -> bool {
    !self.cfg.skip_prefix.is_empty()
      && dir.file_name().and_then(|n| n.to_str()).is_some_and(|n| n.starts_with(&self.cfg.skip_prefix))
  }

  async fn sidecars_in(&self, dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let mut files: Vec<PathBuf> =
      self.fs.enumerate_files(dir, false).await?.into_iter().filter(|f| self.is_sidecar(f)).collect();
    files.sort();
    Ok(files)
  }

  /// Directorios bajo `source`, en orden, sin el árbol de staging ni los
  /// directorios ya marcados con el prefijo de descarte.
  async fn discover(&self, source: &Path, staging: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let mut found = Vec::new();
    let mut queue = VecDeque::from([source.to_path_buf()]);
    while let Some(dir) = queue.pop_front() {
      if dir.starts_with(staging) || (dir != source && self.has_skip_prefix(&dir)) {
        continue;
      }
      queue.extend(self.fs.enumerate_directories(&dir).await?);
      found.push(dir);
    }
    found.sort();
    Ok(found)
  }

  /// Renombra `dir` con el prefijo de descarte. `None` si el prefijo está
  /// vacío o `dir` es la raíz de origen.
  async fn mark_skipped(&self, dir: &Path, source: &Path) -> Result<Option<PathBuf>, PipelineError> {
    if self.cfg.skip_prefix.is_empty() || dir == source {
      return Ok(None);
    }
    let Some(name) = dir.file_name().and_then(|n| n.to_str()) else {
      return Ok(None);
    };
    let target = dir.with_file_name(format!("{}{name}", self.cfg.skip_prefix));
    self.fs.move_path(dir, &target).await?;
    tracing::warn!(dir = %dir.display(), renamed = %target.display(), "directory marked as skipped");
    Ok(Some(target))
  }

  /// Procesa todos los directorios de `source` hacia `staging`.
  ///
  /// Falta alguna de las dos raíces: error estructural sin tocar nada. Los
  /// errores por álbum se cuentan y el recorrido sigue; un error de
  /// directorio aborta o renombra el directorio según
  /// `continue_on_directory_error`.
  pub async fn process_directories(
    &self,
    source: &Path,
    staging: &Path,
    ctx: &RunContext,
  ) -> OperationResult<ProcessingSummary> {
    let started = Instant::now();

    for (label, root) in [("source", source), ("staging", staging)] {
      if !self.fs.directory_exists(root).await {
        let err = PipelineError::Structural(format!("{label} directory {} does not exist", root.display()));
        tracing::error!(error = %err, "run not started");
        return OperationResult::failed(ProcessingSummary::default(), err);
      }
    }
    if source.starts_with(staging) {
      let err = PipelineError::Structural(format!("source {} is inside staging {}", source.display(), staging.display()));
      tracing::error!(error = %err, "run not started");
      return OperationResult::failed(ProcessingSummary::default(), err);
    }

    let mut result = OperationResult::ok(ProcessingSummary::default());
    let directories = match self.discover(source, staging).await {
      Ok(dirs) => dirs,
      Err(e) => {
        tracing::error!(source = %source.display(), error = %e, "unable to enumerate source directories");
        return OperationResult::failed(ProcessingSummary::default(), e);
      }
    };

    let run = Run { source, staging, work_dir: staging.join(WORK_DIR_NAME), ctx };
    tracing::info!(source = %source.display(), staging = %staging.display(), directories = directories.len(), "processing started");
    self.observer.start(directories.len()).await;

    for dir in directories {
      if ctx.should_stop() {
        tracing::info!(cancelled = ctx.is_cancelled(), quota = ctx.quota_reached(), "processing stopped");
        result.data.stopped_early = true;
        break;
      }
      // Puede haber desaparecido al renombrar un directorio padre.
      if !self.fs.directory_exists(&dir).await {
        continue;
      }

      match self.process_directory(&dir, &run, &mut result).await {
        Ok(DirectoryState::Done { albums }) => {
          result.data.directories_processed += 1;
          self.observer.on_directory_processed(&dir, albums).await;
        }
        Ok(DirectoryState::Skipped) => result.data.directories_skipped += 1,
        Err(e) => {
          tracing::error!(dir = %dir.display(), error = %e, "directory failed");
          self.observer.on_error(&dir, &e.to_string()).await;
          result.push_error(PipelineError::DirectoryAborted { dir: dir.clone(), reason: e.to_string() });

          if !self.cfg.continue_on_directory_error {
            result.data.aborted = true;
            break;
          }
          if let Err(e) = self.mark_skipped(&dir, source).await {
            tracing::warn!(dir = %dir.display(), error = %e, "unable to rename failed directory");
          }
          result.data.directories_skipped += 1;
        }
      }
    }

    if self.fs.directory_exists(&run.work_dir).await
      && let Err(e) = self.fs.delete_directory(&run.work_dir).await
    {
      tracing::warn!(path = %run.work_dir.display(), error = %e, "unable to remove work directory");
    }

    result.data.elapsed_ms = started.elapsed().as_millis() as u64;
    self.observer.finish().await;
    tracing::info!(
      directories = result.data.directories_processed,
      skipped = result.data.directories_skipped,
      albums = result.data.albums_processed,
      valid = result.data.valid_albums,
      errors = result.errors.len(),
      elapsed_ms = result.data.elapsed_ms,
      "processing finished"
    );
    result
  }

  async fn process_directory(
    &self,
    dir: &Path,
    run: &Run<'_>,
    result: &mut OperationResult<ProcessingSummary>,
  ) -> Result<DirectoryState, PipelineError> {
    tracing::debug!(dir = %dir.display(), "processing directory");

    for plugin in self.directory_plugins.iter().filter(|p| p.is_enabled()) {
      let outcome = plugin.process_directory(dir).await?;
      result.data.directory_plugin_files += outcome.files_handled;
      for e in &outcome.errors {
        tracing::warn!(dir = %dir.display(), plugin = plugin.id(), error = %e, "directory plugin reported an error");
        result.push_message(format!("{}: {e}", plugin.id()));
      }
      if outcome.stop_processing {
        tracing::info!(dir = %dir.display(), plugin = plugin.id(), success = outcome.success, "directory plugin stopped processing");
        if !outcome.success && self.mark_skipped(dir, run.source).await?.is_some() {
          return Ok(DirectoryState::Skipped);
        }
        break;
      }
    }

    self.run_conversions(dir, result).await?;

    let mut sidecars = self.sidecars_in(dir).await?;
    if sidecars.is_empty() {
      for creator in self.creators.iter().filter(|c| c.is_enabled()) {
        let outcome = creator.process_directory(dir).await?;
        for e in &outcome.errors {
          tracing::warn!(dir = %dir.display(), plugin = creator.id(), error = %e, "album creator reported an error");
          result.push_message(format!("{}: {e}", creator.id()));
        }
        sidecars = self.sidecars_in(dir).await?;
        if !sidecars.is_empty() {
          break;
        }
      }
    }

    let mut albums = Vec::new();
    for file in &sidecars {
      let loaded = match self.fs.read_bytes(file).await {
        Ok(bytes) => self.serializer.deserialize(&bytes).map_err(PipelineError::from),
        Err(e) => Err(e.into()),
      };
      match loaded {
        Ok(album) => albums.push(album),
        Err(e) => {
          tracing::warn!(path = %file.display(), error = %e, "unreadable sidecar skipped");
          result.push_message(format!("{}: {e}", file.display()));
        }
      }
    }

    let mut processed = 0;
    for mut album in albums {
      if run.ctx.should_stop() {
        result.data.stopped_early = true;
        break;
      }
      album.original_directory = dir.to_path_buf();
      album.directory = dir.to_path_buf();
      let id = album.id;

      match self.process_album(album, dir, run, &mut result.data).await {
        Ok(album) => {
          processed += 1;
          result.data.albums_processed += 1;
          self.observer.on_album_processed(&album).await;
          if album.is_valid() {
            result.data.valid_albums += 1;
            if run.ctx.record_valid() {
              tracing::info!(valid = run.ctx.valid_count(), "maximum processing count reached");
            }
          }
        }
        Err(e) => {
          tracing::error!(album = %id, dir = %dir.display(), error = %e, "album failed");
          result.data.album_errors += 1;
          self.observer.on_error(dir, &e.to_string()).await;
          result.push_error(format!("album {id} in {}: {e}", dir.display()));
        }
      }
    }

    Ok(DirectoryState::Done { albums: processed })
  }

  /// Aplica cada plugin de conversión habilitado a los archivos que acepta.
  /// Los fallos se anotan y no detienen el directorio.
  async fn run_conversions(&self, dir: &Path, result: &mut OperationResult<ProcessingSummary>) -> Result<(), PipelineError> {
    let plugins: Vec<&Arc<dyn ConversionPlugin>> = self.conversion_plugins.iter().filter(|p| p.is_enabled()).collect();
    if plugins.is_empty() {
      return Ok(());
    }

    let mut files = self.fs.enumerate_files(dir, false).await?;
    files.sort();
    for file in &files {
      for plugin in &plugins {
        if !plugin.handles(dir, file) {
          continue;
        }
        let errors = match plugin.process_file(dir, file).await {
          Ok(outcome) if outcome.success => {
            result.data.conversion_files += 1;
            continue;
          }
          Ok(outcome) => outcome.errors,
          Err(e) => vec![e.to_string()],
        };
        for e in errors {
          tracing::warn!(path = %file.display(), plugin = plugin.id(), error = %e, "conversion failed");
          result.push_message(format!("{}: {}: {e}", plugin.id(), file.display()));
        }
      }
    }
    Ok(())
  }

  async fn process_album(
    &self,
    mut album: Album,
    dir: &Path,
    run: &Run<'_>,
    summary: &mut ProcessingSummary,
  ) -> Result<Album, PipelineError> {
    let harvest = self.harvester.harvest(&album, dir, run.source, &run.work_dir).await?;
    summary.images_harvested += harvest.len();
    album.images = harvest.album.iter().map(|i| i.info.clone()).collect();
    let artist_images = harvest.artist.iter().map(|i| i.info.clone()).collect();
    album.replace_artist(Artist { images: artist_images, ..album.artist.clone() });

    if apply_sentinel_artist(&mut album) {
      tracing::info!(album = %album.id, artist = %album.artist.name, "album artist replaced by sentinel");
    }

    let target = run.staging.join(album_directory_name(&album, self.cfg.maximum_album_directory_name_length));
    self.stager.ensure_dir(&target).await?;
    let songs = self.stager.stage_songs(&mut album, dir, &target).await?;
    let images = self.stager.stage_images(&harvest, &target).await?;
    summary.song_files_staged += songs.placed;
    summary.image_files_staged += images.placed;
    album.directory = target.clone();

    self.write_song_tags(&mut album, &target).await?;
    album.apply_validation(self.validator.validate(&album));

    let previous = self.staged_album(&target).await;
    let enriched = self.enricher.enrich(&mut album, &target, previous.as_ref(), run.ctx).await;
    album.apply_validation(self.validator.validate(&album));

    let magic = self.magic.apply(&mut album);
    if magic.changed() {
      self.write_song_tags(&mut album, &target).await?;
      album.apply_validation(self.validator.validate(&album));
    }

    if self.persist(&mut album, &target).await? {
      summary.sidecars_written += 1;
    }

    tracing::info!(
      album = %album.id,
      target = %target.display(),
      status = ?album.status(),
      songs = album.songs.len(),
      images = album.images.len(),
      artist_hit = enriched.artist_hit,
      magic_songs = magic.changed_songs.len(),
      "album staged"
    );
    Ok(album)
  }

  /// Primer sidecar legible que ya esté en el directorio de staging.
  async fn staged_album(&self, target: &Path) -> Option<Album> {
    for path in self.sidecars_in(target).await.ok()? {
      let loaded = match self.fs.read_bytes(&path).await {
        Ok(bytes) => self.serializer.deserialize(&bytes).map_err(PipelineError::from),
        Err(e) => Err(e.into()),
      };
      match loaded {
        Ok(album) => return Some(album),
        Err(e) => tracing::debug!(path = %path.display(), error = %e, "staged sidecar not readable"),
      }
    }
    None
  }

  /// Pasa al escritor de tags solo las canciones con tags modificados.
  async fn write_song_tags(&self, album: &mut Album, dir: &Path) -> Result<(), PipelineError> {
    for song in album.songs.iter_mut().filter(|s| s.tags.was_modified()) {
      if let Some(writer) = &self.tag_writer {
        writer.update_song(dir, song).await?;
      }
      song.tags.mark_persisted();
    }
    Ok(())
  }

  /// Sobrescribe el sidecar del álbum en `target` tras borrar cualquier otro
  /// sidecar del directorio. Si el contenido no cambió no se escribe.
  async fn persist(&self, album: &mut Album, target: &Path) -> Result<bool, PipelineError> {
    album.tags.mark_persisted();
    let name = sidecar_file_name(album, &self.cfg.sidecar_suffix, self.cfg.maximum_sidecar_file_name_length);
    let path = target.join(&name);

    for stale in self.sidecars_in(target).await?.into_iter().filter(|p| *p != path) {
      tracing::info!(path = %stale.display(), "stale sidecar removed");
      self.fs.delete_file(&stale).await?;
    }

    let bytes = self.serializer.serialize(album)?;
    if self.fs.file_exists(&path).await && self.fs.read_bytes(&path).await? == bytes {
      return Ok(false);
    }
    self.fs.write_bytes(&path, &bytes).await?;
    Ok(true)
  }
}

/// Bandas sonoras y grabaciones de reparto cuyas canciones no coinciden en
/// el artista del álbum pasan al artista centinela, también en cada canción.
/// Un reparto con un único artista conserva el suyo.
fn apply_sentinel_artist(album: &mut Album) -> bool {
  let sentinel = if classification::is_soundtrack(album) {
    Artist::various_artists()
  } else if classification::is_original_cast(album) {
    Artist::theater()
  } else {
    return false;
  };

  let album_artists: HashSet<String> =
    album.songs.iter().map(|s| normalize_key(s.album_artist().unwrap_or_default())).collect();
  if album_artists.len() < 2 {
    return false;
  }

  let name = sentinel.name.clone();
  album.replace_artist(sentinel);
  let ids: Vec<_> = album.songs.iter().map(|s| s.id).collect();
  for id in ids {
    album.set_song_tag(id, Tag::AlbumArtist, name.as_str());
  }
  true
}
