use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::domain::{Album, PictureIdentifier, ValidationOutcome};
use crate::errors::CoreError;

/// Validador de álbumes: función pura, sin efectos secundarios.
pub trait AlbumValidator: Send + Sync {
  fn validate(&self, album: &Album) -> ValidationOutcome;
}

/// Resultado de inspeccionar una imagen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageCheck {
  pub is_valid: bool,
  pub width: u32,
  pub height: u32,
}

/// Valida y convierte imágenes.
#[async_trait]
pub trait ImageInspector: Send + Sync {
  async fn validate(&self, file: &Path, identifier: PictureIdentifier) -> Result<ImageCheck, CoreError>;

  /// Convierte la imagen al formato de staging y devuelve la ruta resultante.
  async fn convert(&self, dir: &Path, file: &Path) -> Result<PathBuf, CoreError>;
}
