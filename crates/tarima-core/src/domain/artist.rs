use serde::{Deserialize, Serialize};

use crate::classification;
use crate::domain::image::ImageInfo;
use crate::text::normalize_key;

pub const VARIOUS_ARTISTS: &str = "Various Artists";
pub const THEATER: &str = "Theater";

/// Artista de un álbum (valor).
///
/// Un álbum tiene exactamente un `Artist`. Reemplazarlo es siempre una copia
/// completa (`Artist { campo, ..otro.clone() }`), nunca una mutación de un
/// valor compartido.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
  pub name: String,
  pub name_normalized: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sort_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub musicbrainz_id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub spotify_id: Option<String>,
  /// Identificador en el catálogo externo de búsqueda.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub search_engine_id: Option<String>,
  #[serde(default)]
  pub images: Vec<ImageInfo>,
}

impl Artist {
  pub fn new(name: impl Into<String>) -> Self {
    let name = name.into().trim().to_string();
    let name_normalized = normalize_key(&name);
    Self {
      name,
      name_normalized,
      sort_name: None,
      musicbrainz_id: None,
      spotify_id: None,
      search_engine_id: None,
      images: Vec::new(),
    }
  }

  /// Artista centinela para compilaciones de varios artistas.
  pub fn various_artists() -> Self {
    Self::new(VARIOUS_ARTISTS)
  }

  /// Artista centinela para grabaciones de reparto original.
  pub fn theater() -> Self {
    Self::new(THEATER)
  }

  pub fn is_valid(&self) -> bool {
    !self.name.trim().is_empty()
  }

  /// Nombre usado al ordenar: el `sort_name` si existe, si no el nombre.
  pub fn sort_name_value(&self) -> &str {
    self.sort_name.as_deref().filter(|s| !s.trim().is_empty()).unwrap_or(&self.name)
  }

  pub fn is_various_artist(&self) -> bool {
    classification::is_various_artist_name(&self.name)
  }

  pub fn is_cast_recording(&self) -> bool {
    classification::is_cast_name(&self.name)
  }

  pub fn is_various_or_cast(&self) -> bool {
    self.is_various_artist() || self.is_cast_recording()
  }
}

impl Default for Artist {
  fn default() -> Self {
    Self::new("")
  }
}
