use async_trait::async_trait;
use std::path::Path;

use crate::domain::Song;
use crate::errors::CoreError;

/// Resultado de un plugin de directorio.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryPluginOutcome {
  pub files_handled: usize,
  pub success: bool,
  /// Pide no ejecutar más plugins sobre este directorio.
  pub stop_processing: bool,
  pub errors: Vec<String>,
}

impl DirectoryPluginOutcome {
  pub fn handled(files_handled: usize) -> Self {
    Self { files_handled, success: true, stop_processing: false, errors: Vec::new() }
  }

  pub fn failed(error: impl Into<String>, stop_processing: bool) -> Self {
    Self { files_handled: 0, success: false, stop_processing, errors: vec![error.into()] }
  }
}

/// Plugin que produce o completa el sidecar de un directorio a partir de
/// evidencia no-audio (playlists, manifiestos de checksums, notas...).
///
/// Se ejecutan en orden ascendente de `sort_order`, y solo si están habilitados.
#[async_trait]
pub trait DirectoryPlugin: Send + Sync {
  fn id(&self) -> &str;
  fn is_enabled(&self) -> bool;
  fn sort_order(&self) -> i32;
  async fn process_directory(&self, dir: &Path) -> Result<DirectoryPluginOutcome, CoreError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionOutcome {
  pub success: bool,
  pub errors: Vec<String>,
}

/// Plugin que transforma un archivo a otro formato o codificación.
#[async_trait]
pub trait ConversionPlugin: Send + Sync {
  fn id(&self) -> &str;
  fn is_enabled(&self) -> bool;
  fn sort_order(&self) -> i32;
  fn handles(&self, dir: &Path, file: &Path) -> bool;
  async fn process_file(&self, dir: &Path, file: &Path) -> Result<ConversionOutcome, CoreError>;
}

/// Escribe los tags modificados de una canción en su archivo de audio.
#[async_trait]
pub trait SongTagWriter: Send + Sync {
  async fn update_song(&self, dir: &Path, song: &Song) -> Result<(), CoreError>;
}

/// Lee los tags de un archivo de audio.
#[async_trait]
pub trait SongTagReader: Send + Sync {
  fn handles(&self, file: &Path) -> bool;
  async fn read_song(&self, file: &Path) -> Result<Song, CoreError>;
}
