use crate::domain::Album;
use crate::errors::CoreError;

/// Serializa el grafo completo del álbum hacia/desde el sidecar.
pub trait AlbumSerializer: Send + Sync {
  fn serialize(&self, album: &Album) -> Result<Vec<u8>, CoreError>;
  fn deserialize(&self, bytes: &[u8]) -> Result<Album, CoreError>;
}
