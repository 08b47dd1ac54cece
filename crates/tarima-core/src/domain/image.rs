use serde::{Deserialize, Serialize};
use std::fmt;

/// Rol semántico de una imagen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PictureIdentifier {
  #[default]
  NotSet,
  Generic,
  /// Portada principal.
  Front,
  /// Portadas adicionales (`cover02`, `back`, `inlay`...).
  SecondaryFront,
  Back,
  /// Foto principal del artista o grupo.
  Band,
  /// Fotos adicionales y logos del artista.
  BandSecondary,
}

impl PictureIdentifier {
  pub fn is_album_image(&self) -> bool {
    matches!(self, PictureIdentifier::Front | PictureIdentifier::SecondaryFront | PictureIdentifier::Back)
  }

  pub fn is_artist_image(&self) -> bool {
    matches!(self, PictureIdentifier::Band | PictureIdentifier::BandSecondary)
  }
}

impl fmt::Display for PictureIdentifier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Debug::fmt(self, f)
  }
}

/// Imagen asociada a un álbum, una canción o un artista.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
  /// Hash del contenido (hex), usado para deduplicar.
  pub hash: String,
  pub picture_identifier: PictureIdentifier,
  /// Orden ascendente y único dentro de su grupo de identificador.
  pub sort_order: u32,
  pub width: u32,
  pub height: u32,
  /// Nombre del archivo tal como se encontró.
  pub original_file_name: String,
  /// Nombre final dentro del directorio de staging.
  pub file_name: String,
}
