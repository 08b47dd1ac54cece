use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

use tarima_core::ports::FileSystem;

use crate::async_walker::{WalkConfig, collect_files};
use crate::io::atomic_write;

/// Implementación de [`FileSystem`] sobre el disco local (tokio).
#[derive(Debug, Clone, Default)]
pub struct LocalFileSystem {
  walk: WalkConfig,
}

impl LocalFileSystem {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_walk_config(walk: WalkConfig) -> Self {
    Self { walk }
  }
}

#[async_trait]
impl FileSystem for LocalFileSystem {
  async fn directory_exists(&self, dir: &Path) -> bool {
    fs::metadata(dir).await.is_ok_and(|m| m.is_dir())
  }

  async fn file_exists(&self, file: &Path) -> bool {
    fs::metadata(file).await.is_ok_and(|m| m.is_file())
  }

  async fn enumerate_files(&self, dir: &Path, recursive: bool) -> io::Result<Vec<PathBuf>> {
    if recursive {
      // El walker emite los errores por entrada; la raíz sí debe existir.
      fs::metadata(dir).await?;
      let mut files = collect_files(dir, self.walk.clone(), |_| true).await;
      files.sort();
      return Ok(files);
    }

    let mut files = Vec::new();
    let mut rd = fs::read_dir(dir).await?;
    while let Some(entry) = rd.next_entry().await? {
      if entry.file_type().await?.is_file() {
        files.push(entry.path());
      }
    }
    files.sort();
    Ok(files)
  }

  async fn enumerate_directories(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    let mut rd = fs::read_dir(dir).await?;
    while let Some(entry) = rd.next_entry().await? {
      if entry.file_type().await?.is_dir() {
        dirs.push(entry.path());
      }
    }
    dirs.sort();
    Ok(dirs)
  }

  async fn create_dir_all(&self, dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir).await
  }

  async fn delete_directory(&self, dir: &Path) -> io::Result<()> {
    fs::remove_dir_all(dir).await
  }

  async fn delete_file(&self, file: &Path) -> io::Result<()> {
    fs::remove_file(file).await
  }

  async fn move_path(&self, from: &Path, to: &Path) -> io::Result<()> {
    if let Some(parent) = to.parent() {
      fs::create_dir_all(parent).await?;
    }
    match fs::rename(from, to).await {
      Ok(()) => Ok(()),
      // Entre dispositivos solo se soportan archivos: copia y borrado.
      Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
        fs::copy(from, to).await?;
        fs::remove_file(from).await
      }
      Err(e) => Err(e),
    }
  }

  async fn copy_file(&self, from: &Path, to: &Path) -> io::Result<()> {
    if let Some(parent) = to.parent() {
      fs::create_dir_all(parent).await?;
    }
    fs::copy(from, to).await.map(|_| ())
  }

  async fn read_bytes(&self, file: &Path) -> io::Result<Vec<u8>> {
    fs::read(file).await
  }

  async fn write_bytes(&self, file: &Path, contents: &[u8]) -> io::Result<()> {
    atomic_write(file, contents).await
  }

  async fn file_size(&self, file: &Path) -> io::Result<u64> {
    Ok(fs::metadata(file).await?.len())
  }

  async fn modified(&self, path: &Path) -> io::Result<Option<DateTime<Utc>>> {
    let meta = fs::metadata(path).await?;
    Ok(meta.modified().ok().map(DateTime::<Utc>::from))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  #[tokio::test]
  async fn enumerates_flat_and_recursive() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    std::fs::create_dir_all(root.join("scans")).unwrap();
    std::fs::write(root.join("01.mp3"), b"a").unwrap();
    std::fs::write(root.join("scans/cover.jpg"), b"b").unwrap();

    let fs = LocalFileSystem::new();
    assert_eq!(fs.enumerate_files(root, false).await.unwrap(), vec![root.join("01.mp3")]);
    assert_eq!(fs.enumerate_files(root, true).await.unwrap().len(), 2);
    assert_eq!(fs.enumerate_directories(root).await.unwrap(), vec![root.join("scans")]);
    assert!(fs.enumerate_files(&root.join("missing"), true).await.is_err());
  }

  #[tokio::test]
  async fn move_copy_and_delete() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    let fs = LocalFileSystem::new();

    fs.write_bytes(&root.join("in/a.txt"), b"hello").await.unwrap();
    fs.copy_file(&root.join("in/a.txt"), &root.join("out/b.txt")).await.unwrap();
    fs.move_path(&root.join("in"), &root.join("_skipped_in")).await.unwrap();

    assert!(fs.file_exists(&root.join("out/b.txt")).await);
    assert!(fs.directory_exists(&root.join("_skipped_in")).await);
    assert!(!fs.directory_exists(&root.join("in")).await);
    assert!(fs.modified(&root.join("out/b.txt")).await.unwrap().is_some());

    fs.delete_directory(&root.join("out")).await.unwrap();
    assert!(!fs.directory_exists(&root.join("out")).await);
  }
}
