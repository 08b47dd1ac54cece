use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::domain::artist::Artist;
use crate::domain::ids::{AlbumId, SongId};
use crate::domain::image::{ImageInfo, PictureIdentifier};
use crate::domain::song::Song;
use crate::domain::status::{AlbumStatus, AlbumStatusReasons, ValidationMessage, ValidationOutcome};
use crate::domain::tags::{MetaTagIdentifier, TagSet};
use crate::text::{hash_hex, normalize_key};

/// Álbum: raíz del agregado que se serializa en el sidecar.
///
/// `status`, `status_reasons` y `validation_messages` solo cambian a través de
/// [`Album::apply_validation`], con la salida del validador.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
  pub id: AlbumId,
  /// Identificador en el catálogo externo de búsqueda.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub external_id: Option<String>,
  /// Identificador de release en el catálogo de referencia.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub musicbrainz_id: Option<String>,
  pub artist: Artist,
  pub tags: TagSet,
  #[serde(default)]
  pub songs: Vec<Song>,
  #[serde(default)]
  pub images: Vec<ImageInfo>,
  #[serde(default)]
  status: AlbumStatus,
  #[serde(default)]
  status_reasons: AlbumStatusReasons,
  #[serde(default)]
  validation_messages: Vec<ValidationMessage>,
  /// Directorio donde se descubrió el álbum.
  pub original_directory: PathBuf,
  /// Directorio que contiene el sidecar actual (staging tras procesar).
  pub directory: PathBuf,
  /// Plugins que participaron en la creación del álbum.
  #[serde(default)]
  pub via_plugins: Vec<String>,
  pub created_at: DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub modified_at: Option<DateTime<Utc>>,
}

impl Album {
  pub fn new(artist: Artist, tags: TagSet, songs: Vec<Song>, original_directory: impl Into<PathBuf>) -> Self {
    let original_directory = original_directory.into();
    Self {
      id: AlbumId::new(),
      external_id: None,
      musicbrainz_id: None,
      artist,
      tags,
      songs,
      images: Vec::new(),
      status: AlbumStatus::New,
      status_reasons: AlbumStatusReasons::NOT_SET,
      validation_messages: Vec::new(),
      directory: original_directory.clone(),
      original_directory,
      via_plugins: Vec::new(),
      created_at: Utc::now(),
      modified_at: None,
    }
  }

  pub fn status(&self) -> AlbumStatus {
    self.status
  }

  pub fn status_reasons(&self) -> AlbumStatusReasons {
    self.status_reasons
  }

  pub fn validation_messages(&self) -> &[ValidationMessage] {
    &self.validation_messages
  }

  /// Persiste en el registro la última salida del validador.
  pub fn apply_validation(&mut self, outcome: ValidationOutcome) {
    self.status = outcome.status;
    self.status_reasons = outcome.reasons;
    self.validation_messages = outcome.messages;
  }

  pub fn is_valid(&self) -> bool {
    self.status == AlbumStatus::Ok
  }

  pub fn title(&self) -> Option<&str> {
    self.tags.get(MetaTagIdentifier::Album)
  }

  /// Año del álbum: año de grabación, año original o prefijo de la fecha.
  pub fn year(&self) -> Option<i32> {
    [MetaTagIdentifier::RecordingYear, MetaTagIdentifier::OrigAlbumYear, MetaTagIdentifier::AlbumDate]
      .into_iter()
      .find_map(|id| self.tags.get_number(id))
      .filter(|y| *y > 0)
  }

  /// Género del álbum; si el álbum no lo tiene, el de la primera canción que lo tenga.
  pub fn genre(&self) -> Option<&str> {
    self.tags.get(MetaTagIdentifier::Genre).or_else(|| self.songs.iter().find_map(|s| s.genre()))
  }

  /// Total de canciones declarado, o el número de canciones si no se declara.
  pub fn song_total(&self) -> usize {
    self
      .tags
      .get_number(MetaTagIdentifier::SongTotal)
      .or_else(|| self.songs.iter().find_map(|s| s.tags.get_number(MetaTagIdentifier::SongTotal)))
      .filter(|t| *t > 0)
      .map(|t| t as usize)
      .unwrap_or(self.songs.len())
  }

  pub fn total_duration_ms(&self) -> u64 {
    self.songs.iter().filter_map(Song::duration_ms).sum()
  }

  pub fn cover_image(&self) -> Option<&ImageInfo> {
    self
      .images
      .iter()
      .filter(|i| i.picture_identifier == PictureIdentifier::Front)
      .min_by_key(|i| i.sort_order)
  }

  /// Identidad de deduplicación: hash de artista + título normalizados.
  pub fn unique_hash(&self) -> String {
    let key = format!("{}{}", self.artist.name_normalized, normalize_key(self.title().unwrap_or_default()));
    hash_hex(key.as_bytes())
  }

  /// Cambia un tag de una canción por id. Devuelve `true` si cambió.
  pub fn set_song_tag(&mut self, song_id: SongId, id: MetaTagIdentifier, value: impl Into<String>) -> bool {
    self.songs.iter_mut().find(|s| s.id == song_id).map(|s| s.tags.set(id, value)).unwrap_or(false)
  }

  /// Reemplaza el artista por un valor nuevo.
  pub fn replace_artist(&mut self, artist: Artist) {
    self.artist = artist;
  }

  pub fn songs_sorted(&self) -> Vec<&Song> {
    let mut songs: Vec<&Song> = self.songs.iter().collect();
    songs.sort_by_key(|s| s.sort_order());
    songs
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn album(artist: &str, title: &str) -> Album {
    Album::new(Artist::new(artist), TagSet::from_pairs([(MetaTagIdentifier::Album, title)]), vec![], "/music/a")
  }

  #[test]
  fn unique_hash_ignores_case_and_punctuation() {
    let a = album("AC/DC", "Back in Black");
    let b = album("ac dc", "BACK IN BLACK!");
    let c = album("AC/DC", "Highway to Hell");

    assert_eq!(a.unique_hash(), b.unique_hash());
    assert_ne!(a.unique_hash(), c.unique_hash());
  }

  #[test]
  fn year_prefers_recording_year_then_date() {
    let mut a = album("X", "Y");
    a.tags.set(MetaTagIdentifier::AlbumDate, "1987-04-01");
    assert_eq!(a.year(), Some(1987));

    a.tags.set(MetaTagIdentifier::RecordingYear, "1990");
    assert_eq!(a.year(), Some(1990));
  }

  #[test]
  fn status_changes_only_through_validation() {
    let mut a = album("X", "Y");
    assert_eq!(a.status(), AlbumStatus::New);

    a.apply_validation(ValidationOutcome::from_findings(
      AlbumStatusReasons::HAS_NO_SONGS,
      vec![ValidationMessage::critical("no songs")],
    ));

    assert_eq!(a.status(), AlbumStatus::Invalid);
    assert!(a.status_reasons().contains(AlbumStatusReasons::HAS_NO_SONGS));
    assert_eq!(a.validation_messages().len(), 1);
  }

  #[test]
  fn sidecar_round_trip_keeps_private_status() {
    let mut a = album("X", "Y");
    a.apply_validation(ValidationOutcome::from_findings(AlbumStatusReasons::NOT_SET, vec![]));

    let json = serde_json::to_string(&a).unwrap();
    let back: Album = serde_json::from_str(&json).unwrap();
    assert_eq!(back.status(), AlbumStatus::Ok);
    assert_eq!(back, a);
  }
}
