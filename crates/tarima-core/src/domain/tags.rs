use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Clave semántica de un tag.
///
/// Los lectores de tags concretos (ID3, Vorbis, MP4...) traducen sus claves
/// nativas a este conjunto cerrado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MetaTagIdentifier {
  Album,
  AlbumArtist,
  Artist,
  Title,
  TrackNumber,
  SongTotal,
  DiscNumber,
  DiscTotal,
  Genre,
  Composer,
  RecordingYear,
  OrigAlbumYear,
  AlbumDate,
  /// Duración de la canción en milisegundos.
  Length,
  SortAlbumArtist,
  Comment,
}

impl FromStr for MetaTagIdentifier {
  type Err = String;

  /// Acepta el nombre canónico y los alias más comunes de los formatos de tags.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let key = s.trim().to_ascii_lowercase().replace(['_', ' ', '-'], "");

    let id = match key.as_str() {
      "album" => MetaTagIdentifier::Album,
      "albumartist" | "band" => MetaTagIdentifier::AlbumArtist,
      "artist" | "performer" => MetaTagIdentifier::Artist,
      "title" => MetaTagIdentifier::Title,
      "tracknumber" | "track" => MetaTagIdentifier::TrackNumber,
      "songtotal" | "tracktotal" | "totaltracks" => MetaTagIdentifier::SongTotal,
      "discnumber" | "disc" => MetaTagIdentifier::DiscNumber,
      "disctotal" | "totaldiscs" => MetaTagIdentifier::DiscTotal,
      "genre" => MetaTagIdentifier::Genre,
      "composer" => MetaTagIdentifier::Composer,
      "recordingyear" | "year" => MetaTagIdentifier::RecordingYear,
      "origalbumyear" | "originalyear" => MetaTagIdentifier::OrigAlbumYear,
      "albumdate" | "date" => MetaTagIdentifier::AlbumDate,
      "length" | "duration" => MetaTagIdentifier::Length,
      "sortalbumartist" | "albumartistsort" => MetaTagIdentifier::SortAlbumArtist,
      "comment" => MetaTagIdentifier::Comment,
      _ => return Err(format!("unknown tag identifier: {s}")),
    };

    Ok(id)
  }
}

impl fmt::Display for MetaTagIdentifier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Debug::fmt(self, f)
  }
}

/// Un tag con su valor actual y, si fue modificado, el valor original.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaTag {
  pub identifier: MetaTagIdentifier,
  pub value: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub original_value: Option<String>,
  #[serde(default)]
  pub was_modified: bool,
}

/// Conjunto ordenado de tags (orden de inserción).
///
/// `set` solo marca un tag como modificado cuando el valor cambia de verdad;
/// sobre eso descansa la idempotencia de las reglas de normalización.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(Vec<MetaTag>);

impl TagSet {
  pub fn new() -> Self {
    Self(Vec::new())
  }

  /// Construye el conjunto sin marcar nada como modificado.
  pub fn from_pairs<I, S>(pairs: I) -> Self
  where
    I: IntoIterator<Item = (MetaTagIdentifier, S)>,
    S: Into<String>,
  {
    let mut tags: Vec<MetaTag> = Vec::new();
    for (identifier, value) in pairs {
      let value = value.into();
      match tags.iter_mut().find(|t| t.identifier == identifier) {
        Some(existing) => existing.value = value,
        None => tags.push(MetaTag { identifier, value, original_value: None, was_modified: false }),
      }
    }
    Self(tags)
  }

  /// Valor del tag, ignorando valores vacíos.
  pub fn get(&self, id: MetaTagIdentifier) -> Option<&str> {
    self
      .0
      .iter()
      .find(|t| t.identifier == id)
      .map(|t| t.value.trim())
      .filter(|v| !v.is_empty())
  }

  /// Valor numérico del tag. Acepta formas como `"3/12"` o `"2001-05-04"`
  /// tomando el primer grupo de dígitos.
  pub fn get_number(&self, id: MetaTagIdentifier) -> Option<i32> {
    let raw = self.get(id)?;
    let digits: String = raw
      .trim_start()
      .chars()
      .skip_while(|c| !c.is_ascii_digit())
      .take_while(|c| c.is_ascii_digit())
      .collect();
    digits.parse().ok()
  }

  /// Asigna un valor. Devuelve `true` solo si el valor cambió.
  pub fn set(&mut self, id: MetaTagIdentifier, value: impl Into<String>) -> bool {
    let value = value.into();

    match self.0.iter_mut().find(|t| t.identifier == id) {
      Some(tag) if tag.value == value => false,
      Some(tag) => {
        if tag.original_value.is_none() {
          tag.original_value = Some(std::mem::take(&mut tag.value));
        }
        tag.value = value;
        tag.was_modified = true;
        true
      }
      None => {
        self.0.push(MetaTag { identifier: id, value, original_value: None, was_modified: true });
        true
      }
    }
  }

  /// Elimina el tag. Devuelve `true` si existía.
  pub fn remove(&mut self, id: MetaTagIdentifier) -> bool {
    let before = self.0.len();
    self.0.retain(|t| t.identifier != id);
    before != self.0.len()
  }

  pub fn was_modified(&self) -> bool {
    self.0.iter().any(|t| t.was_modified)
  }

  /// Limpia las marcas de modificación tras escribir los tags al archivo.
  pub fn mark_persisted(&mut self) {
    for tag in &mut self.0 {
      tag.was_modified = false;
      tag.original_value = None;
    }
  }

  pub fn iter(&self) -> impl Iterator<Item = &MetaTag> {
    self.0.iter()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}
