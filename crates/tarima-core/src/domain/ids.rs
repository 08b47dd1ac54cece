use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identificador local de un álbum.
///
/// Se genera una vez cuando se crea el sidecar y se conserva entre
/// ejecuciones, de modo que reprocesar un directorio no cambia su identidad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlbumId(Uuid);

impl AlbumId {
  /// Genera un nuevo identificador único.
  pub fn new() -> Self {
    AlbumId(Uuid::new_v4())
  }

  pub fn from_uuid(u: Uuid) -> Self {
    AlbumId(u)
  }

  pub fn as_uuid(&self) -> Uuid {
    self.0
  }
}

impl Default for AlbumId {
  fn default() -> Self {
    Self::new()
  }
}

impl From<Uuid> for AlbumId {
  fn from(u: Uuid) -> Self {
    AlbumId(u)
  }
}

impl From<AlbumId> for Uuid {
  fn from(id: AlbumId) -> Self {
    id.0
  }
}

impl fmt::Display for AlbumId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.0.fmt(f)
  }
}

/// Identificador global de una canción.
///
/// Es estable entre ejecuciones: las mutaciones de tags se dirigen a la
/// canción por este id y no por su posición en la lista.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SongId(Uuid);

impl SongId {
  pub fn new() -> Self {
    SongId(Uuid::new_v4())
  }

  pub fn from_uuid(u: Uuid) -> Self {
    SongId(u)
  }

  pub fn as_uuid(&self) -> Uuid {
    self.0
  }
}

impl Default for SongId {
  fn default() -> Self {
    Self::new()
  }
}

impl From<Uuid> for SongId {
  fn from(u: Uuid) -> Self {
    SongId(u)
  }
}

impl From<SongId> for Uuid {
  fn from(id: SongId) -> Self {
    id.0
  }
}

impl fmt::Display for SongId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.0.fmt(f)
  }
}
