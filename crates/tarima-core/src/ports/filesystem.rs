use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};

/// Port de acceso al sistema de archivos.
///
/// El scanner y el orquestador solo tocan disco a través de este trait, de
/// modo que los tests pueden correr contra un árbol simulado en memoria.
#[async_trait]
pub trait FileSystem: Send + Sync {
  async fn directory_exists(&self, dir: &Path) -> bool;

  async fn file_exists(&self, file: &Path) -> bool;

  /// Archivos de `dir`; con `recursive` también los de sus subdirectorios.
  async fn enumerate_files(&self, dir: &Path, recursive: bool) -> io::Result<Vec<PathBuf>>;

  /// Subdirectorios inmediatos de `dir`.
  async fn enumerate_directories(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;

  async fn create_dir_all(&self, dir: &Path) -> io::Result<()>;

  async fn delete_directory(&self, dir: &Path) -> io::Result<()>;

  async fn delete_file(&self, file: &Path) -> io::Result<()>;

  /// Mueve o renombra un archivo o directorio.
  async fn move_path(&self, from: &Path, to: &Path) -> io::Result<()>;

  async fn copy_file(&self, from: &Path, to: &Path) -> io::Result<()>;

  async fn read_bytes(&self, file: &Path) -> io::Result<Vec<u8>>;

  /// Escritura atómica: o queda el contenido completo o nada.
  async fn write_bytes(&self, file: &Path, contents: &[u8]) -> io::Result<()>;

  async fn file_size(&self, file: &Path) -> io::Result<u64>;

  /// Fecha de modificación, si el backend la conoce.
  async fn modified(&self, path: &Path) -> io::Result<Option<DateTime<Utc>>>;
}
