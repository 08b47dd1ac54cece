//! Sistema de archivos simulado en memoria, para tests del scanner y del
//! orquestador sin tocar disco.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use tarima_core::ports::FileSystem;

#[derive(Debug, Clone)]
enum Node {
  Dir,
  File { bytes: Vec<u8>, modified: DateTime<Utc> },
}

#[derive(Debug, Default)]
pub struct MemoryFileSystem {
  nodes: Mutex<BTreeMap<PathBuf, Node>>,
  mutations: AtomicUsize,
}

fn not_found(path: &Path) -> io::Error {
  io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path.display()))
}

fn poisoned() -> io::Error {
  io::Error::other("memory filesystem lock poisoned")
}

fn insert_ancestors(nodes: &mut BTreeMap<PathBuf, Node>, path: &Path) {
  for ancestor in path.ancestors() {
    if ancestor.as_os_str().is_empty() {
      continue;
    }
    nodes.entry(ancestor.to_path_buf()).or_insert(Node::Dir);
  }
}

impl MemoryFileSystem {
  pub fn new() -> Self {
    Self::default()
  }

  /// Crea un archivo (y sus directorios padre) sin contar como mutación.
  pub fn with_file(self, path: impl AsRef<Path>, bytes: impl Into<Vec<u8>>) -> Self {
    if let Ok(mut nodes) = self.nodes.lock() {
      let path = path.as_ref();
      if let Some(parent) = path.parent() {
        insert_ancestors(&mut nodes, parent);
      }
      nodes.insert(path.to_path_buf(), Node::File { bytes: bytes.into(), modified: Utc::now() });
    }
    self
  }

  pub fn with_dir(self, path: impl AsRef<Path>) -> Self {
    if let Ok(mut nodes) = self.nodes.lock() {
      insert_ancestors(&mut nodes, path.as_ref());
    }
    self
  }

  /// Número de operaciones que modificaron el árbol.
  pub fn mutation_count(&self) -> usize {
    self.mutations.load(Ordering::SeqCst)
  }

  /// Todas las rutas de archivo, ordenadas.
  pub fn file_paths(&self) -> Vec<PathBuf> {
    self
      .nodes
      .lock()
      .map(|nodes| {
        nodes.iter().filter(|(_, n)| matches!(n, Node::File { .. })).map(|(p, _)| p.clone()).collect()
      })
      .unwrap_or_default()
  }

  fn mutate<T>(&self, f: impl FnOnce(&mut BTreeMap<PathBuf, Node>) -> io::Result<T>) -> io::Result<T> {
    let mut nodes = self.nodes.lock().map_err(|_| poisoned())?;
    let out = f(&mut nodes)?;
    self.mutations.fetch_add(1, Ordering::SeqCst);
    Ok(out)
  }

  fn read<T>(&self, f: impl FnOnce(&BTreeMap<PathBuf, Node>) -> io::Result<T>) -> io::Result<T> {
    let nodes = self.nodes.lock().map_err(|_| poisoned())?;
    f(&nodes)
  }

  fn is_dir(nodes: &BTreeMap<PathBuf, Node>, path: &Path) -> bool {
    matches!(nodes.get(path), Some(Node::Dir))
  }
}

#[async_trait]
impl FileSystem for MemoryFileSystem {
  async fn directory_exists(&self, dir: &Path) -> bool {
    self.read(|nodes| Ok(Self::is_dir(nodes, dir))).unwrap_or(false)
  }

  async fn file_exists(&self, file: &Path) -> bool {
    self.read(|nodes| Ok(matches!(nodes.get(file), Some(Node::File { .. })))).unwrap_or(false)
  }

  async fn enumerate_files(&self, dir: &Path, recursive: bool) -> io::Result<Vec<PathBuf>> {
    self.read(|nodes| {
      if !Self::is_dir(nodes, dir) {
        return Err(not_found(dir));
      }
      Ok(
        nodes
          .iter()
          .filter(|(p, n)| matches!(n, Node::File { .. }) && p.starts_with(dir))
          .filter(|(p, _)| recursive || p.parent() == Some(dir))
          .map(|(p, _)| p.clone())
          .collect(),
      )
    })
  }

  async fn enumerate_directories(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
    self.read(|nodes| {
      if !Self::is_dir(nodes, dir) {
        return Err(not_found(dir));
      }
      Ok(
        nodes
          .iter()
          .filter(|(p, n)| matches!(n, Node::Dir) && p.parent() == Some(dir))
          .map(|(p, _)| p.clone())
          .collect(),
      )
    })
  }

  async fn create_dir_all(&self, dir: &Path) -> io::Result<()> {
    self.mutate(|nodes| {
      insert_ancestors(nodes, dir);
      Ok(())
    })
  }

  async fn delete_directory(&self, dir: &Path) -> io::Result<()> {
    self.mutate(|nodes| {
      if !Self::is_dir(nodes, dir) {
        return Err(not_found(dir));
      }
      nodes.retain(|p, _| !p.starts_with(dir));
      Ok(())
    })
  }

  async fn delete_file(&self, file: &Path) -> io::Result<()> {
    self.mutate(|nodes| match nodes.get(file) {
      Some(Node::File { .. }) => {
        nodes.remove(file);
        Ok(())
      }
      _ => Err(not_found(file)),
    })
  }

  async fn move_path(&self, from: &Path, to: &Path) -> io::Result<()> {
    self.mutate(|nodes| {
      if !nodes.contains_key(from) {
        return Err(not_found(from));
      }
      let moved: Vec<(PathBuf, Node)> =
        nodes.iter().filter(|(p, _)| p.starts_with(from)).map(|(p, n)| (p.clone(), n.clone())).collect();
      nodes.retain(|p, _| !p.starts_with(from));
      if let Some(parent) = to.parent() {
        insert_ancestors(nodes, parent);
      }
      for (path, node) in moved {
        let suffix = path.strip_prefix(from).map_err(io::Error::other)?;
        let target = if suffix.as_os_str().is_empty() { to.to_path_buf() } else { to.join(suffix) };
        nodes.insert(target, node);
      }
      Ok(())
    })
  }

  async fn copy_file(&self, from: &Path, to: &Path) -> io::Result<()> {
    self.mutate(|nodes| {
      let bytes = match nodes.get(from) {
        Some(Node::File { bytes, .. }) => bytes.clone(),
        _ => return Err(not_found(from)),
      };
      if let Some(parent) = to.parent() {
        insert_ancestors(nodes, parent);
      }
      nodes.insert(to.to_path_buf(), Node::File { bytes, modified: Utc::now() });
      Ok(())
    })
  }

  async fn read_bytes(&self, file: &Path) -> io::Result<Vec<u8>> {
    self.read(|nodes| match nodes.get(file) {
      Some(Node::File { bytes, .. }) => Ok(bytes.clone()),
      _ => Err(not_found(file)),
    })
  }

  async fn write_bytes(&self, file: &Path, contents: &[u8]) -> io::Result<()> {
    self.mutate(|nodes| {
      if let Some(parent) = file.parent() {
        insert_ancestors(nodes, parent);
      }
      nodes.insert(file.to_path_buf(), Node::File { bytes: contents.to_vec(), modified: Utc::now() });
      Ok(())
    })
  }

  async fn file_size(&self, file: &Path) -> io::Result<u64> {
    self.read(|nodes| match nodes.get(file) {
      Some(Node::File { bytes, .. }) => Ok(bytes.len() as u64),
      _ => Err(not_found(file)),
    })
  }

  async fn modified(&self, path: &Path) -> io::Result<Option<DateTime<Utc>>> {
    self.read(|nodes| match nodes.get(path) {
      Some(Node::File { modified, .. }) => Ok(Some(*modified)),
      Some(Node::Dir) => Ok(None),
      None => Err(not_found(path)),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn tree_operations() {
    let fs = MemoryFileSystem::new()
      .with_file("/in/album/01.mp3", b"a".to_vec())
      .with_file("/in/album/scans/front.jpg", b"b".to_vec());

    assert!(fs.directory_exists(Path::new("/in/album")).await);
    assert_eq!(fs.enumerate_files(Path::new("/in/album"), false).await.unwrap().len(), 1);
    assert_eq!(fs.enumerate_files(Path::new("/in/album"), true).await.unwrap().len(), 2);
    assert_eq!(
      fs.enumerate_directories(Path::new("/in/album")).await.unwrap(),
      vec![PathBuf::from("/in/album/scans")]
    );
    assert_eq!(fs.mutation_count(), 0);

    fs.move_path(Path::new("/in/album"), Path::new("/in/_skipped_album")).await.unwrap();
    assert!(!fs.directory_exists(Path::new("/in/album")).await);
    assert!(fs.file_exists(Path::new("/in/_skipped_album/scans/front.jpg")).await);
    assert_eq!(fs.mutation_count(), 1);

    fs.delete_directory(Path::new("/in/_skipped_album")).await.unwrap();
    assert!(fs.file_paths().is_empty());
  }

  #[tokio::test]
  async fn missing_paths_are_not_found() {
    let fs = MemoryFileSystem::new();
    let err = fs.read_bytes(Path::new("/nope")).await.unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::NotFound);
    assert!(fs.enumerate_files(Path::new("/nope"), true).await.is_err());
  }
}
