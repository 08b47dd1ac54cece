//! Recorrido recursivo asíncrono de directorios como `Stream`.
//!
//! Pila explícita de frames (sin recursión), filtrado asíncrono por entrada y
//! detección de ciclos por identidad de archivo cuando se siguen symlinks.

use std::collections::HashSet;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

use futures::StreamExt;
use futures::stream::{self, Stream};
use tokio::fs::{self, ReadDir};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct FileId(u64, u64);

#[cfg(unix)]
fn file_id(meta: &std::fs::Metadata) -> Option<FileId> {
  use std::os::unix::fs::MetadataExt;
  Some(FileId(meta.dev(), meta.ino()))
}

// Sin inode estable la deduplicación queda desactivada.
#[cfg(not(unix))]
fn file_id(_meta: &std::fs::Metadata) -> Option<FileId> {
  None
}

/// Opciones del recorrido.
#[derive(Debug, Clone)]
pub struct WalkConfig {
  pub follow_symlinks: bool,
  pub max_depth: usize,
  /// Evita visitar dos veces el mismo directorio físico.
  pub dedup_dirs: bool,
}

impl Default for WalkConfig {
  fn default() -> Self {
    Self { follow_symlinks: false, max_depth: 50, dedup_dirs: true }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filtering {
  /// No emitir la entrada, pero entrar si es directorio.
  Ignore,
  /// No emitir ni entrar.
  IgnoreDir,
  Continue,
}

#[derive(Debug)]
pub struct WalkEntry {
  pub path: PathBuf,
  pub depth: usize,
  /// Tipo vía `lstat`: un symlink se reporta como symlink.
  pub file_type: std::fs::FileType,
}

impl WalkEntry {
  pub fn path(&self) -> &Path {
    &self.path
  }
}

enum Frame {
  Pending { path: PathBuf, depth: usize, known_id: Option<FileId> },
  Open { rd: ReadDir, depth: usize },
}

struct WalkState<F> {
  stack: Vec<Frame>,
  visited: HashSet<FileId>,
  cfg: WalkConfig,
  filter: F,
}

impl<F> WalkState<F> {
  /// Abre un directorio pendiente. `Ok(false)` si se descarta (profundidad o ciclo).
  async fn open(&mut self, path: PathBuf, depth: usize, known_id: Option<FileId>) -> io::Result<bool> {
    if depth > self.cfg.max_depth {
      return Ok(false);
    }

    if self.cfg.dedup_dirs {
      let id = match known_id {
        Some(id) => Some(id),
        None => {
          let meta = fs::metadata(&path).await?;
          if meta.is_dir() { file_id(&meta) } else { None }
        }
      };
      if let Some(id) = id {
        if !self.visited.insert(id) {
          return Ok(false);
        }
      }
    }

    let rd = fs::read_dir(&path).await?;
    self.stack.push(Frame::Open { rd, depth });
    Ok(true)
  }

  /// Decide si una entrada recién leída genera un frame pendiente.
  async fn descend_into(&self, entry: &WalkEntry) -> Option<Frame> {
    if entry.file_type.is_dir() {
      return Some(Frame::Pending { path: entry.path.clone(), depth: entry.depth, known_id: None });
    }

    if entry.file_type.is_symlink() && self.cfg.follow_symlinks {
      if let Ok(meta) = fs::metadata(&entry.path).await {
        if meta.is_dir() {
          let known_id = if self.cfg.dedup_dirs { file_id(&meta) } else { None };
          return Some(Frame::Pending { path: entry.path.clone(), depth: entry.depth, known_id });
        }
      }
    }

    None
  }
}

/// Recorre `root` sin filtrar.
pub fn walk(root: impl Into<PathBuf>, cfg: WalkConfig) -> impl Stream<Item = io::Result<WalkEntry>> {
  walk_filtered(root, cfg, |_| async { Filtering::Continue })
}

/// Recorre `root` aplicando un filtro asíncrono a cada entrada.
///
/// Los errores de E/S se emiten como elementos del stream y el recorrido
/// continúa con el resto del árbol.
pub fn walk_filtered<F, Fut>(
  root: impl Into<PathBuf>,
  cfg: WalkConfig,
  filter: F,
) -> impl Stream<Item = io::Result<WalkEntry>>
where
  F: FnMut(&WalkEntry) -> Fut + Send + 'static,
  Fut: Future<Output = Filtering> + Send,
{
  let mut stack = Vec::with_capacity(16);
  stack.push(Frame::Pending { path: root.into(), depth: 0, known_id: None });
  let state = WalkState { stack, visited: HashSet::new(), cfg, filter };

  stream::unfold(state, |mut st| async move {
    loop {
      match st.stack.pop()? {
        Frame::Pending { path, depth, known_id } => {
          if let Err(e) = st.open(path, depth, known_id).await {
            return Some((Err(e), st));
          }
        }
        Frame::Open { mut rd, depth } => {
          let next = rd.next_entry().await;
          let entry = match next {
            Ok(Some(entry)) => entry,
            // Fin del directorio: el frame ya se sacó de la pila.
            Ok(None) => continue,
            Err(e) => return Some((Err(e), st)),
          };
          st.stack.push(Frame::Open { rd, depth });

          let file_type = match entry.file_type().await {
            Ok(ft) => ft,
            Err(e) => return Some((Err(e), st)),
          };
          let walk_entry = WalkEntry { path: entry.path(), depth: depth + 1, file_type };

          let filtering = (st.filter)(&walk_entry).await;
          if filtering != Filtering::IgnoreDir && walk_entry.depth <= st.cfg.max_depth {
            if let Some(frame) = st.descend_into(&walk_entry).await {
              st.stack.push(frame);
            }
          }

          if filtering == Filtering::Continue {
            return Some((Ok(walk_entry), st));
          }
        }
      }
    }
  })
}

/// Recoge los archivos regulares bajo `root` que acepte `keep`.
///
/// Los errores de lectura se registran y se omiten.
pub async fn collect_files<P>(root: &Path, cfg: WalkConfig, keep: P) -> Vec<PathBuf>
where
  P: Fn(&Path) -> bool + Send + Sync + 'static,
{
  let entries = walk(root.to_path_buf(), cfg);
  tokio::pin!(entries);

  let mut files = Vec::new();
  while let Some(res) = entries.next().await {
    match res {
      Ok(entry) => {
        let is_file = entry.file_type.is_file()
          || (entry.file_type.is_symlink() && fs::metadata(&entry.path).await.is_ok_and(|m| m.is_file()));
        if is_file && keep(&entry.path) {
          files.push(entry.path);
        }
      }
      Err(e) => tracing::warn!(root = %root.display(), error = %e, "walker error"),
    }
  }
  files
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  #[tokio::test]
  async fn walks_nested_tree_and_respects_filters() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    std::fs::create_dir_all(root.join("a/b")).unwrap();
    std::fs::create_dir_all(root.join(".hidden")).unwrap();
    std::fs::write(root.join("a/one.txt"), b"1").unwrap();
    std::fs::write(root.join("a/b/two.txt"), b"2").unwrap();
    std::fs::write(root.join(".hidden/three.txt"), b"3").unwrap();

    let entries = walk_filtered(root.to_path_buf(), WalkConfig::default(), |e| {
      let hidden = e.path.file_name().is_some_and(|n| n.to_string_lossy().starts_with('.'));
      async move { if hidden { Filtering::IgnoreDir } else { Filtering::Continue } }
    });
    let mut found: Vec<PathBuf> = entries.filter_map(|r| async move { r.ok() }).map(|e| e.path).collect().await;
    found.sort();

    assert!(found.contains(&root.join("a/one.txt")));
    assert!(found.contains(&root.join("a/b/two.txt")));
    assert!(!found.iter().any(|p| p.starts_with(root.join(".hidden"))));
  }

  #[tokio::test]
  async fn max_depth_limits_descent() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    std::fs::create_dir_all(root.join("a/b")).unwrap();
    std::fs::write(root.join("a/b/deep.txt"), b"x").unwrap();
    std::fs::write(root.join("top.txt"), b"x").unwrap();

    let cfg = WalkConfig { max_depth: 1, ..WalkConfig::default() };
    let files = collect_files(root, cfg, |_| true).await;

    assert_eq!(files, vec![root.join("top.txt")]);
  }

  #[tokio::test]
  async fn missing_root_yields_error_item() {
    let tmp = tempdir().unwrap();
    let missing = tmp.path().join("nope");

    let items: Vec<io::Result<WalkEntry>> = walk(missing, WalkConfig::default()).collect().await;
    assert_eq!(items.len(), 1);
    assert!(items[0].is_err());
  }
}
