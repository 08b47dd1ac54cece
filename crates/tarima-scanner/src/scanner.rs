use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::stream;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use tarima_core::OperationResult;
use tarima_core::domain::Album;
use tarima_core::ports::{AlbumSerializer, FileSystem};

use crate::cache::DirectoryCache;
use crate::config::ScannerConfig;
use crate::listing::{self, PagedRequest, PagedResult};

#[derive(Debug, Error)]
pub enum ScannerError {
  #[error("invalid argument: {0}")]
  InvalidArgument(String),
}

/// Álbum descubierto en disco junto con su contexto de escaneo.
#[derive(Debug, Clone, PartialEq)]
pub struct AlbumEntry {
  pub album: Album,
  /// Directorio que contiene el sidecar.
  pub directory: PathBuf,
  pub sidecar_path: PathBuf,
  pub created_at: DateTime<Utc>,
  /// Cuántos sidecars comparten la identidad de este álbum (1 si es único).
  pub duplicates: usize,
}

type DirectoryScan = Vec<AlbumEntry>;

/// Escáner de sidecars con caché por directorio.
pub struct AlbumScanner {
  fs: Arc<dyn FileSystem>,
  serializer: Arc<dyn AlbumSerializer>,
  cache: DirectoryCache<DirectoryScan>,
  cfg: ScannerConfig,
}

/// Límites de concurrencia: enumeración (I/O) y deserialización (CPU).
fn fan_out_limits() -> (usize, usize) {
  let cpus = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
  ((cpus / 4).max(1), (cpus / 2).max(1))
}

impl AlbumScanner {
  pub fn new(fs: Arc<dyn FileSystem>, serializer: Arc<dyn AlbumSerializer>, cfg: ScannerConfig) -> Self {
    let cache = DirectoryCache::new(cfg.staleness(), cfg.cache_capacity, cfg.eviction_fraction);
    Self { fs, serializer, cache, cfg }
  }

  pub fn config(&self) -> &ScannerConfig {
    &self.cfg
  }

  pub fn cache(&self) -> &DirectoryCache<DirectoryScan> {
    &self.cache
  }

  fn is_sidecar(&self, path: &Path) -> bool {
    let suffix = self.cfg.sidecar_suffix.trim_start_matches('.');
    path
      .file_name()
      .and_then(|n| n.to_str())
      .is_some_and(|n| n == suffix || n.ends_with(&format!(".{suffix}")))
  }

  async fn load_sidecar(&self, dir: &Path, file: &Path) -> Result<AlbumEntry, String> {
    let bytes = self.fs.read_bytes(file).await.map_err(|e| format!("{}: {e}", file.display()))?;
    let mut album = self.serializer.deserialize(&bytes).map_err(|e| format!("{}: {e}", file.display()))?;
    album.directory = dir.to_path_buf();

    let created_at = self.fs.modified(file).await.ok().flatten().unwrap_or(album.created_at);

    Ok(AlbumEntry { album, directory: dir.to_path_buf(), sidecar_path: file.to_path_buf(), created_at, duplicates: 1 })
  }

  /// Albums de un directorio: de la caché si el directorio existe y la entrada
  /// es fresca, si no deserializando sus sidecars.
  async fn scan_one_directory(&self, dir: PathBuf, sidecars: Vec<PathBuf>, parallel: usize) -> (Arc<DirectoryScan>, Vec<String>) {
    if self.fs.directory_exists(&dir).await {
      if let Some(cached) = self.cache.get_fresh(&dir) {
        tracing::trace!(dir = %dir.display(), "directory served from cache");
        return (cached, Vec::new());
      }
    } else {
      self.cache.invalidate(&dir);
      return (Arc::new(Vec::new()), Vec::new());
    }

    let results: Vec<Result<AlbumEntry, String>> =
      stream::iter(sidecars.iter()).map(|f| self.load_sidecar(&dir, f)).buffer_unordered(parallel).collect().await;

    let mut entries = Vec::new();
    let mut errors = Vec::new();
    for res in results {
      match res {
        Ok(entry) => entries.push(entry),
        Err(e) => {
          tracing::warn!(dir = %dir.display(), error = %e, "unreadable sidecar skipped");
          errors.push(e);
        }
      }
    }
    entries.sort_by(|a, b| a.sidecar_path.cmp(&b.sidecar_path));

    (self.cache.insert(dir, entries), errors)
  }

  /// Descubre recursivamente todos los sidecars bajo `root`.
  ///
  /// Los fallos por archivo se registran en `messages` y no abortan el
  /// escaneo. Si `root` no existe devuelve un resultado vacío y exitoso.
  pub async fn scan_directory(&self, root: &Path) -> OperationResult<Vec<AlbumEntry>> {
    let mut result = OperationResult::ok(Vec::new());

    if !self.fs.directory_exists(root).await {
      tracing::debug!(root = %root.display(), "scan root does not exist");
      result.push_message(format!("directory {} does not exist", root.display()));
      return result;
    }

    let files = match self.fs.enumerate_files(root, true).await {
      Ok(files) => files,
      Err(e) => {
        tracing::warn!(root = %root.display(), error = %e, "unable to enumerate scan root");
        result.push_message(format!("unable to enumerate {}: {e}", root.display()));
        return result;
      }
    };

    let mut by_directory: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    for file in files.into_iter().filter(|f| self.is_sidecar(f)) {
      if let Some(parent) = file.parent() {
        by_directory.entry(parent.to_path_buf()).or_default().push(file);
      }
    }

    let (dir_parallel, file_parallel) = fan_out_limits();
    let scans: Vec<(Arc<DirectoryScan>, Vec<String>)> = stream::iter(by_directory)
      .map(|(dir, sidecars)| self.scan_one_directory(dir, sidecars, file_parallel))
      .buffer_unordered(dir_parallel)
      .collect()
      .await;

    let mut all: Vec<AlbumEntry> = Vec::new();
    for (entries, errors) in scans {
      all.extend(entries.iter().cloned());
      for e in errors {
        result.push_message(e);
      }
    }

    result.data = dedup_by_identity(all);
    tracing::debug!(root = %root.display(), albums = result.data.len(), "scan finished");
    result
  }

  /// Escanea y aplica filtros, orden y paginación.
  pub async fn list_albums(
    &self,
    root: &Path,
    request: &PagedRequest,
  ) -> Result<OperationResult<PagedResult<AlbumEntry>>, ScannerError> {
    if request.page == 0 || request.page_size == 0 {
      return Err(ScannerError::InvalidArgument(format!(
        "page and page_size must be positive (page={}, page_size={})",
        request.page, request.page_size
      )));
    }

    let scanned = self.scan_directory(root).await;
    let cfg = &self.cfg;
    Ok(scanned.map(|entries| listing::apply(entries, request, cfg)))
  }

  /// Borra el directorio de cada álbum que cumpla `predicate`.
  ///
  /// Devuelve si se borró algo; los fallos individuales van a `errors`.
  pub async fn delete_albums<P>(&self, root: &Path, predicate: P) -> OperationResult<bool>
  where
    P: Fn(&AlbumEntry) -> bool,
  {
    let scanned = self.scan_directory(root).await;
    let mut result = OperationResult::ok(false);
    result.messages = scanned.messages;

    let targets: BTreeSet<PathBuf> = scanned.data.iter().filter(|e| predicate(e)).map(|e| e.directory.clone()).collect();

    for dir in targets {
      match self.fs.delete_directory(&dir).await {
        Ok(()) => {
          tracing::info!(dir = %dir.display(), "album directory deleted");
          self.cache.invalidate(&dir);
          result.data = true;
        }
        Err(e) => {
          tracing::error!(dir = %dir.display(), error = %e, "unable to delete album directory");
          result.push_error(format!("{}: {e}", dir.display()));
        }
      }
    }

    result
  }
}

/// Conserva la primera entrada (por ruta) de cada identidad y cuenta el resto.
fn dedup_by_identity(mut entries: Vec<AlbumEntry>) -> Vec<AlbumEntry> {
  entries.sort_by(|a, b| a.sidecar_path.cmp(&b.sidecar_path));

  let mut counts: HashMap<String, usize> = HashMap::new();
  for entry in &entries {
    *counts.entry(entry.album.unique_hash()).or_default() += 1;
  }

  let mut seen = HashMap::new();
  entries
    .into_iter()
    .filter_map(|mut entry| {
      let hash = entry.album.unique_hash();
      if seen.insert(hash.clone(), ()).is_some() {
        return None;
      }
      entry.duplicates = counts.get(&hash).copied().unwrap_or(1);
      Some(entry)
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use tarima_core::domain::{Artist, MetaTagIdentifier as Tag, TagSet};
  use tarima_fs::MemoryFileSystem;
  use tarima_metadata::JsonSidecarSerializer;

  fn album_bytes(artist: &str, title: &str) -> Vec<u8> {
    let album = Album::new(Artist::new(artist), TagSet::from_pairs([(Tag::Album, title)]), vec![], "/orig");
    JsonSidecarSerializer.serialize(&album).unwrap()
  }

  fn scanner(fs: Arc<MemoryFileSystem>, cfg: ScannerConfig) -> AlbumScanner {
    AlbumScanner::new(fs, Arc::new(JsonSidecarSerializer), cfg)
  }

  fn library() -> MemoryFileSystem {
    MemoryFileSystem::new()
      .with_file("/lib/Tool/Lateralus/Tool_Lateralus.tarima.json", album_bytes("Tool", "Lateralus"))
      .with_file("/lib/Tool/Lateralus/01.flac", b"audio".to_vec())
      .with_file("/lib/Tool/Aenima/Tool_Aenima.tarima.json", album_bytes("Tool", "Ænima"))
      .with_file("/lib/copy/Lateralus/Tool_Lateralus.tarima.json", album_bytes("TOOL", "lateralus"))
      .with_file("/lib/broken/x.tarima.json", b"{ not json".to_vec())
  }

  #[tokio::test]
  async fn scan_dedups_and_reports_broken_sidecars() {
    let fs = Arc::new(library());
    let scanner = scanner(fs, ScannerConfig::default());

    let result = scanner.scan_directory(Path::new("/lib")).await;

    assert!(result.is_success());
    assert_eq!(result.data.len(), 2);
    assert_eq!(result.messages.len(), 1);
    assert!(result.messages[0].contains("/lib/broken/x.tarima.json"));

    let lateralus = result.data.iter().find(|e| e.album.title() == Some("Lateralus")).unwrap();
    assert_eq!(lateralus.duplicates, 2);
    assert_eq!(lateralus.directory, PathBuf::from("/lib/Tool/Lateralus"));
    assert_eq!(lateralus.album.directory, lateralus.directory);
  }

  #[tokio::test]
  async fn missing_root_is_empty_success() {
    let scanner = scanner(Arc::new(MemoryFileSystem::new()), ScannerConfig::default());
    let result = scanner.scan_directory(Path::new("/nowhere")).await;
    assert!(result.is_success());
    assert!(result.data.is_empty());
  }

  #[tokio::test]
  async fn fresh_cache_is_reused_until_directory_disappears() {
    let fs = Arc::new(library());
    let scanner = scanner(Arc::clone(&fs), ScannerConfig::default());

    scanner.scan_directory(Path::new("/lib")).await;
    assert_eq!(scanner.cache().len(), 4);

    // Un sidecar nuevo en un directorio cacheado no se ve dentro de la ventana.
    fs.write_bytes(Path::new("/lib/Tool/Aenima/Tool_Undertow.tarima.json"), &album_bytes("Tool", "Undertow"))
      .await
      .unwrap();
    let again = scanner.scan_directory(Path::new("/lib")).await;
    assert_eq!(again.data.len(), 2);

    fs.delete_directory(Path::new("/lib/Tool/Aenima")).await.unwrap();
    let after_delete = scanner.scan_directory(Path::new("/lib")).await;
    assert!(after_delete.data.iter().all(|e| e.directory != Path::new("/lib/Tool/Aenima")));
  }

  #[tokio::test]
  async fn zero_staleness_always_rescans() {
    let fs = Arc::new(library());
    let cfg = ScannerConfig { staleness_secs: 0, ..ScannerConfig::default() };
    let scanner = scanner(Arc::clone(&fs), cfg);

    scanner.scan_directory(Path::new("/lib")).await;
    fs.write_bytes(Path::new("/lib/Tool/Aenima/Tool_Undertow.tarima.json"), &album_bytes("Tool", "Undertow"))
      .await
      .unwrap();

    let again = scanner.scan_directory(Path::new("/lib")).await;
    assert_eq!(again.data.len(), 3);
  }

  #[tokio::test]
  async fn list_rejects_zero_page_size() {
    let scanner = scanner(Arc::new(library()), ScannerConfig::default());
    let request = PagedRequest { page_size: 0, ..PagedRequest::default() };
    assert!(matches!(scanner.list_albums(Path::new("/lib"), &request).await, Err(ScannerError::InvalidArgument(_))));

    let page = scanner.list_albums(Path::new("/lib"), &PagedRequest::default()).await.unwrap();
    assert_eq!(page.data.total_count, 2);
  }

  #[tokio::test]
  async fn delete_removes_matching_directories() {
    let fs = Arc::new(library());
    let scanner = scanner(Arc::clone(&fs), ScannerConfig::default());

    let deleted = scanner.delete_albums(Path::new("/lib"), |e| e.album.title() == Some("Ænima")).await;
    assert!(deleted.data);
    assert!(!fs.directory_exists(Path::new("/lib/Tool/Aenima")).await);

    let nothing = scanner.delete_albums(Path::new("/lib"), |_| false).await;
    assert!(!nothing.data);
  }
}
