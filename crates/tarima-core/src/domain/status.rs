use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Estado de un álbum dentro del pipeline.
///
/// El orden de las variantes es el orden de clasificación al listar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlbumStatus {
  NotSet,
  #[default]
  New,
  Ok,
  Invalid,
  Reviewed,
  Complete,
}

impl FromStr for AlbumStatus {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let status = match s.trim().to_ascii_lowercase().as_str() {
      "notset" => AlbumStatus::NotSet,
      "new" => AlbumStatus::New,
      "ok" => AlbumStatus::Ok,
      "invalid" => AlbumStatus::Invalid,
      "reviewed" => AlbumStatus::Reviewed,
      "complete" => AlbumStatus::Complete,
      other => return Err(format!("unknown album status: {other}")),
    };
    Ok(status)
  }
}

impl fmt::Display for AlbumStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Debug::fmt(self, f)
  }
}

/// Motivos por los que un álbum necesita atención (bitset).
///
/// Los valores de bit son estables: se persisten en el sidecar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlbumStatusReasons(u32);

impl AlbumStatusReasons {
  pub const NOT_SET: Self = Self(0);
  pub const ALBUM_CANNOT_BE_LOADED: Self = Self(1 << 0);
  pub const ARTIST_IS_NOT_SET: Self = Self(1 << 1);
  pub const ARTIST_NAME_HAS_UNWANTED_TEXT: Self = Self(1 << 2);
  pub const HAS_INVALID_ARTISTS: Self = Self(1 << 3);
  pub const HAS_INVALID_SONGS: Self = Self(1 << 4);
  pub const HAS_INVALID_YEAR: Self = Self(1 << 5);
  pub const HAS_MULTIPLE_ARTISTS_BUT_NOT_MULTIPLE_ARTIST_ALBUM_TYPE: Self = Self(1 << 6);
  pub const HAS_NO_IMAGES: Self = Self(1 << 7);
  pub const HAS_NO_SONGS: Self = Self(1 << 8);
  pub const HAS_NO_TAGS: Self = Self(1 << 9);
  pub const HAS_SONGS_WITH_INVALID_NUMBER: Self = Self(1 << 10);
  pub const HAS_SONGS_WITH_NUMBER_GREATER_THAN_MAXIMUM_ALLOWED: Self = Self(1 << 11);
  pub const HAS_SONGS_WITH_UNWANTED_TEXT: Self = Self(1 << 12);
  pub const HAS_UNKNOWN_ARTIST: Self = Self(1 << 14);
  pub const IS_NOT_STUDIO_TYPE_ALBUM: Self = Self(1 << 15);
  pub const SONG_TOTAL_DOESNT_MATCH_SONG_COUNT: Self = Self(1 << 18);
  pub const SONGS_ARE_NOT_SEQUENTIALLY_NUMBERED: Self = Self(1 << 19);
  pub const SONGS_ARE_NOT_UNIQUELY_NUMBERED: Self = Self(1 << 20);
  pub const TITLE_HAS_UNWANTED_TEXT: Self = Self(1 << 21);
  pub const TITLE_IS_INVALID: Self = Self(1 << 22);
  pub const HAS_INVALID_FIRST_SONG_NUMBER: Self = Self(1 << 23);

  const NAMES: [(Self, &'static str); 21] = [
    (Self::ALBUM_CANNOT_BE_LOADED, "AlbumCannotBeLoaded"),
    (Self::ARTIST_IS_NOT_SET, "ArtistIsNotSet"),
    (Self::ARTIST_NAME_HAS_UNWANTED_TEXT, "ArtistNameHasUnwantedText"),
    (Self::HAS_INVALID_ARTISTS, "HasInvalidArtists"),
    (Self::HAS_INVALID_SONGS, "HasInvalidSongs"),
    (Self::HAS_INVALID_YEAR, "HasInvalidYear"),
    (Self::HAS_MULTIPLE_ARTISTS_BUT_NOT_MULTIPLE_ARTIST_ALBUM_TYPE, "HasMultipleArtistsButNotMultipleArtistAlbumType"),
    (Self::HAS_NO_IMAGES, "HasNoImages"),
    (Self::HAS_NO_SONGS, "HasNoSongs"),
    (Self::HAS_NO_TAGS, "HasNoTags"),
    (Self::HAS_SONGS_WITH_INVALID_NUMBER, "HasSongsWithInvalidNumber"),
    (Self::HAS_SONGS_WITH_NUMBER_GREATER_THAN_MAXIMUM_ALLOWED, "HasSongsWithNumberGreaterThanMaximumAllowed"),
    (Self::HAS_SONGS_WITH_UNWANTED_TEXT, "HasSongsWithUnwantedText"),
    (Self::HAS_UNKNOWN_ARTIST, "HasUnknownArtist"),
    (Self::IS_NOT_STUDIO_TYPE_ALBUM, "IsNotStudioTypeAlbum"),
    (Self::SONG_TOTAL_DOESNT_MATCH_SONG_COUNT, "SongTotalDoesntMatchSongCount"),
    (Self::SONGS_ARE_NOT_SEQUENTIALLY_NUMBERED, "SongsAreNotSequentiallyNumbered"),
    (Self::SONGS_ARE_NOT_UNIQUELY_NUMBERED, "SongsAreNotUniquelyNumbered"),
    (Self::TITLE_HAS_UNWANTED_TEXT, "TitleHasUnwantedText"),
    (Self::TITLE_IS_INVALID, "TitleIsInvalid"),
    (Self::HAS_INVALID_FIRST_SONG_NUMBER, "HasInvalidFirstSongNumber"),
  ];

  pub const fn from_bits(bits: u32) -> Self {
    Self(bits)
  }

  pub const fn bits(&self) -> u32 {
    self.0
  }

  pub const fn is_empty(&self) -> bool {
    self.0 == 0
  }

  pub const fn contains(&self, other: Self) -> bool {
    self.0 & other.0 == other.0
  }

  pub fn insert(&mut self, other: Self) {
    self.0 |= other.0;
  }

  /// Nombres de los bits activos, en orden ascendente de bit.
  pub fn names(&self) -> Vec<&'static str> {
    Self::NAMES.iter().filter(|(flag, _)| self.contains(*flag)).map(|(_, name)| *name).collect()
  }
}

impl std::ops::BitOr for AlbumStatusReasons {
  type Output = Self;

  fn bitor(self, rhs: Self) -> Self {
    Self(self.0 | rhs.0)
  }
}

impl std::ops::BitOrAssign for AlbumStatusReasons {
  fn bitor_assign(&mut self, rhs: Self) {
    self.0 |= rhs.0;
  }
}

impl fmt::Display for AlbumStatusReasons {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.is_empty() {
      return f.write_str("NotSet");
    }
    f.write_str(&self.names().join(" | "))
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
  Critical,
  Undesired,
  Informational,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidationMessage {
  pub message: String,
  pub severity: Severity,
}

impl ValidationMessage {
  pub fn critical(message: impl Into<String>) -> Self {
    Self { message: message.into(), severity: Severity::Critical }
  }

  pub fn undesired(message: impl Into<String>) -> Self {
    Self { message: message.into(), severity: Severity::Undesired }
  }
}

/// Salida del validador. Es la única forma de asignar estado a un álbum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
  pub status: AlbumStatus,
  pub reasons: AlbumStatusReasons,
  pub messages: Vec<ValidationMessage>,
}

impl ValidationOutcome {
  /// Ok si no hay mensajes críticos, Invalid en caso contrario.
  pub fn from_findings(reasons: AlbumStatusReasons, messages: Vec<ValidationMessage>) -> Self {
    let status = if messages.iter().any(|m| m.severity == Severity::Critical) {
      AlbumStatus::Invalid
    } else {
      AlbumStatus::Ok
    };
    Self { status, reasons, messages }
  }

  pub fn is_valid(&self) -> bool {
    self.status == AlbumStatus::Ok
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reasons_combine_and_render() {
    let mut reasons = AlbumStatusReasons::HAS_INVALID_YEAR;
    reasons |= AlbumStatusReasons::HAS_NO_IMAGES;

    assert!(reasons.contains(AlbumStatusReasons::HAS_INVALID_YEAR));
    assert!(!reasons.contains(AlbumStatusReasons::HAS_NO_SONGS));
    assert_eq!(reasons.bits(), (1 << 5) | (1 << 7));
    assert_eq!(reasons.to_string(), "HasInvalidYear | HasNoImages");
    assert_eq!(AlbumStatusReasons::NOT_SET.to_string(), "NotSet");
  }

  #[test]
  fn outcome_is_invalid_only_with_critical_messages() {
    let ok = ValidationOutcome::from_findings(
      AlbumStatusReasons::TITLE_HAS_UNWANTED_TEXT,
      vec![ValidationMessage::undesired("title has unwanted text")],
    );
    assert_eq!(ok.status, AlbumStatus::Ok);

    let bad = ValidationOutcome::from_findings(
      AlbumStatusReasons::HAS_NO_SONGS,
      vec![ValidationMessage::critical("album has no songs")],
    );
    assert_eq!(bad.status, AlbumStatus::Invalid);
  }
}
