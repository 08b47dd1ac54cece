use async_trait::async_trait;
use std::path::Path;

use crate::domain::Album;

/// Eventos de progreso del pipeline.
///
/// Una UI o una CLI lo implementan para mostrar avance; el orquestador no
/// depende de que nadie escuche.
#[async_trait]
pub trait ProcessingObserver: Send + Sync {
  async fn start(&self, total_directories: usize);
  async fn on_directory_processed(&self, dir: &Path, albums: usize);
  async fn on_album_processed(&self, album: &Album);
  async fn on_error(&self, path: &Path, error: &str);
  async fn finish(&self);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

#[async_trait]
impl ProcessingObserver for NoopObserver {
  async fn start(&self, _total_directories: usize) {}
  async fn on_directory_processed(&self, _dir: &Path, _albums: usize) {}
  async fn on_album_processed(&self, _album: &Album) {}
  async fn on_error(&self, _path: &Path, _error: &str) {}
  async fn finish(&self) {}
}
