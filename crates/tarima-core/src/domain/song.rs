use serde::{Deserialize, Serialize};

use crate::domain::ids::SongId;
use crate::domain::image::ImageInfo;
use crate::domain::tags::{MetaTagIdentifier, TagSet};

/// Separación entre discos al calcular el orden de una canción.
pub const DISC_SORT_STRIDE: i64 = 10_000;

/// Una canción de un álbum, con sus propios tags e imágenes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
  pub id: SongId,
  /// Nombre del archivo de audio dentro del directorio del álbum.
  pub file_name: String,
  #[serde(default)]
  pub file_size: u64,
  pub tags: TagSet,
  #[serde(default)]
  pub images: Vec<ImageInfo>,
}

impl Song {
  pub fn new(file_name: impl Into<String>, tags: TagSet) -> Self {
    Self { id: SongId::new(), file_name: file_name.into(), file_size: 0, tags, images: Vec::new() }
  }

  pub fn title(&self) -> Option<&str> {
    self.tags.get(MetaTagIdentifier::Title)
  }

  /// Artista por canción (tag `Artist`).
  pub fn artist(&self) -> Option<&str> {
    self.tags.get(MetaTagIdentifier::Artist)
  }

  pub fn album_artist(&self) -> Option<&str> {
    self.tags.get(MetaTagIdentifier::AlbumArtist)
  }

  pub fn genre(&self) -> Option<&str> {
    self.tags.get(MetaTagIdentifier::Genre)
  }

  pub fn composer(&self) -> Option<&str> {
    self.tags.get(MetaTagIdentifier::Composer)
  }

  pub fn track_number(&self) -> Option<i32> {
    self.tags.get_number(MetaTagIdentifier::TrackNumber)
  }

  /// Número de disco; 1 si no hay tag o es inválido.
  pub fn disc_number(&self) -> i32 {
    self.tags.get_number(MetaTagIdentifier::DiscNumber).filter(|d| *d > 0).unwrap_or(1)
  }

  pub fn duration_ms(&self) -> Option<u64> {
    self.tags.get(MetaTagIdentifier::Length).and_then(|v| v.parse::<f64>().ok()).map(|v| v as u64)
  }

  /// `pista + (disco - 1) * 10000`: conserva el orden entre discos.
  pub fn sort_order(&self) -> i64 {
    i64::from(self.track_number().unwrap_or(0)) + i64::from(self.disc_number() - 1) * DISC_SORT_STRIDE
  }

  /// Extensión del archivo en minúsculas, con punto (`".flac"`).
  pub fn extension(&self) -> String {
    std::path::Path::new(&self.file_name)
      .extension()
      .and_then(|e| e.to_str())
      .map(|e| format!(".{}", e.to_ascii_lowercase()))
      .unwrap_or_default()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sort_order_keeps_discs_apart() {
    let first = Song::new(
      "a.mp3",
      TagSet::from_pairs([(MetaTagIdentifier::TrackNumber, "12"), (MetaTagIdentifier::DiscNumber, "1")]),
    );
    let second = Song::new(
      "b.mp3",
      TagSet::from_pairs([(MetaTagIdentifier::TrackNumber, "1"), (MetaTagIdentifier::DiscNumber, "2/2")]),
    );

    assert_eq!(first.sort_order(), 12);
    assert_eq!(second.sort_order(), 10_001);
    assert!(first.sort_order() < second.sort_order());
  }

  #[test]
  fn extension_is_lowercase() {
    let song = Song::new("01 Intro.FLAC", TagSet::new());
    assert_eq!(song.extension(), ".flac");
    assert_eq!(Song::new("noext", TagSet::new()).extension(), "");
  }
}
