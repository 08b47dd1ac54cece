use std::collections::{BTreeMap, BTreeSet, HashSet};

use tarima_core::classification;
use tarima_core::domain::{Album, AlbumStatusReasons as Reason, ValidationMessage, ValidationOutcome};
use tarima_core::ports::AlbumValidator;
use tarima_core::text::normalize_key;

use crate::config::PipelineConfig;
use crate::rules;

/// Validador por reglas.
///
/// El estado es `Ok` si ninguna regla produce un mensaje crítico; los motivos
/// se acumulan en el bitset aunque el mensaje sea solo "no deseado".
#[derive(Debug, Clone)]
pub struct RuleAlbumValidator {
  minimum_year: i32,
  maximum_year: i32,
  maximum_song_number: i32,
  require_known_artist: bool,
}

impl RuleAlbumValidator {
  pub fn new(cfg: &PipelineConfig) -> Self {
    Self {
      minimum_year: cfg.minimum_valid_year,
      maximum_year: cfg.max_year(),
      maximum_song_number: cfg.maximum_song_number,
      require_known_artist: cfg.require_known_artist,
    }
  }
}

impl Default for RuleAlbumValidator {
  fn default() -> Self {
    Self::new(&PipelineConfig::default())
  }
}

#[derive(Default)]
struct Findings {
  reasons: Reason,
  messages: Vec<ValidationMessage>,
}

impl Findings {
  fn critical(&mut self, reason: Reason, message: &str) {
    self.reasons |= reason;
    self.messages.push(ValidationMessage::critical(message));
  }

  fn undesired(&mut self, reason: Reason, message: impl Into<String>) {
    self.reasons |= reason;
    self.messages.push(ValidationMessage::undesired(message));
  }
}

impl RuleAlbumValidator {
  fn check_songs(&self, album: &Album, f: &mut Findings) {
    let invalid_song = album.songs.iter().any(|s| {
      s.file_name.trim().is_empty() || s.title().is_none() || s.duration_ms().is_none_or(|d| d == 0)
    });
    if invalid_song {
      f.critical(Reason::HAS_INVALID_SONGS, "Album has invalid songs.");
    }
  }

  /// Números de pista por disco: empiezan en 1, sin huecos, sin repetidos y
  /// por debajo del máximo configurado.
  fn check_numbering(&self, album: &Album, f: &mut Findings) {
    let mut by_disc: BTreeMap<i32, Vec<i32>> = BTreeMap::new();
    for song in &album.songs {
      by_disc.entry(song.disc_number()).or_default().push(song.track_number().unwrap_or(0));
    }

    let mut numbering_ok = true;
    let mut unique = true;

    for numbers in by_disc.values_mut() {
      numbers.sort_unstable();
      let distinct: BTreeSet<i32> = numbers.iter().copied().collect();
      if distinct.len() != numbers.len() {
        unique = false;
      }
      if distinct.contains(&0) {
        f.reasons |= Reason::HAS_SONGS_WITH_INVALID_NUMBER;
        numbering_ok = false;
      }
      if distinct.first().copied() != Some(1) {
        f.reasons |= Reason::HAS_INVALID_FIRST_SONG_NUMBER;
        numbering_ok = false;
      }
      if distinct.iter().any(|n| *n > self.maximum_song_number) {
        f.reasons |= Reason::HAS_SONGS_WITH_NUMBER_GREATER_THAN_MAXIMUM_ALLOWED;
        numbering_ok = false;
      }
      let sequential = distinct.iter().zip(1..).all(|(n, expected)| *n == expected);
      numbering_ok &= sequential;
    }

    if !numbering_ok {
      f.critical(Reason::SONGS_ARE_NOT_SEQUENTIALLY_NUMBERED, "Album song numbers are invalid.");
    }
    if !unique {
      f.critical(Reason::SONGS_ARE_NOT_UNIQUELY_NUMBERED, "Album has songs with duplicated numbers.");
    }
  }

  fn check_album_artist(&self, album: &Album, f: &mut Findings) {
    if !album.artist.is_valid() {
      return;
    }
    let distinct: HashSet<String> = album.songs.iter().filter_map(|s| s.album_artist()).map(normalize_key).collect();
    if distinct.len() > 1 && !classification::is_various_artists(album) {
      f.critical(
        Reason::HAS_MULTIPLE_ARTISTS_BUT_NOT_MULTIPLE_ARTIST_ALBUM_TYPE,
        "Songs do not all have the same album artist.",
      );
    }
  }

  fn check_unwanted_text(&self, album: &Album, f: &mut Findings) {
    let title = album.title().unwrap_or_default();

    let offending: Vec<String> = album
      .songs_sorted()
      .into_iter()
      .filter(|s| rules::song_has_unwanted_text(title, s.title(), s.track_number()))
      .map(|s| format!("[{}]", s.title().unwrap_or(&s.file_name)))
      .collect();
    if !offending.is_empty() {
      f.undesired(Reason::HAS_SONGS_WITH_UNWANTED_TEXT, format!("Some songs have unwanted text: {}", offending.join("")));
    }

    if rules::has_featuring(&album.artist.name) {
      f.undesired(Reason::ARTIST_NAME_HAS_UNWANTED_TEXT, "Album artist has unwanted text.");
    }

    if !title.is_empty() && rules::album_title_has_unwanted_text(title) {
      f.undesired(Reason::TITLE_HAS_UNWANTED_TEXT, "Album title has unwanted text.");
    }
  }
}

impl AlbumValidator for RuleAlbumValidator {
  fn validate(&self, album: &Album) -> ValidationOutcome {
    let mut f = Findings::default();

    if album.songs.is_empty() {
      f.critical(Reason::HAS_NO_SONGS, "Album has no songs.");
    }
    if album.tags.is_empty() {
      f.critical(Reason::HAS_NO_TAGS, "Album has no tags.");
    }
    if !album.artist.is_valid() {
      f.critical(Reason::HAS_INVALID_ARTISTS | Reason::ARTIST_IS_NOT_SET, "Album artist is invalid.");
    }

    let year_ok = album.year().is_some_and(|y| y >= self.minimum_year && y <= self.maximum_year);
    if !year_ok {
      f.critical(Reason::HAS_INVALID_YEAR, "Album has invalid year.");
    }
    if album.title().is_none() {
      f.critical(Reason::TITLE_IS_INVALID, "Album title is invalid.");
    }

    if !album.songs.is_empty() {
      self.check_songs(album, &mut f);
      self.check_numbering(album, &mut f);
      self.check_album_artist(album, &mut f);
      self.check_unwanted_text(album, &mut f);

      if album.song_total() != album.songs.len() {
        f.critical(Reason::SONG_TOTAL_DOESNT_MATCH_SONG_COUNT, "Album song total does not match song count.");
      }
    }

    if album.cover_image().is_none() {
      f.critical(Reason::HAS_NO_IMAGES, "Album does not have cover image.");
    }

    if self.require_known_artist && album.artist.is_valid() && album.artist.search_engine_id.is_none() {
      f.critical(Reason::HAS_UNKNOWN_ARTIST, "Album artist is unknown, will need manual validation.");
    }

    ValidationOutcome::from_findings(f.reasons, f.messages)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tarima_core::domain::{
    AlbumStatus, Artist, ImageInfo, MetaTagIdentifier as Tag, PictureIdentifier, Severity, Song, TagSet,
  };

  fn song(n: &str, title: &str) -> Song {
    Song::new(
      format!("{n}.flac"),
      TagSet::from_pairs([(Tag::TrackNumber, n), (Tag::Title, title), (Tag::Length, "200000")]),
    )
  }

  fn valid_album() -> Album {
    let mut artist = Artist::new("Boards of Canada");
    artist.search_engine_id = Some("boc".into());
    let mut album = Album::new(
      artist,
      TagSet::from_pairs([(Tag::Album, "Geogaddi"), (Tag::RecordingYear, "2002")]),
      vec![song("1", "Ready Lets Go"), song("2", "Music Is Math"), song("3", "Beware The Friendly Stranger")],
      "/in/boc",
    );
    album.images.push(ImageInfo {
      hash: "h".into(),
      picture_identifier: PictureIdentifier::Front,
      sort_order: 1,
      width: 600,
      height: 600,
      original_file_name: "cover.jpg".into(),
      file_name: "i-01-Front.jpg".into(),
    });
    album
  }

  fn validator() -> RuleAlbumValidator {
    RuleAlbumValidator::new(&PipelineConfig { maximum_valid_year: Some(2030), ..PipelineConfig::default() })
  }

  #[test]
  fn complete_album_is_ok() {
    let outcome = validator().validate(&valid_album());
    assert_eq!(outcome.status, AlbumStatus::Ok, "{:?}", outcome.messages);
    assert!(outcome.reasons.is_empty());
  }

  #[test]
  fn invalid_year_and_missing_cover_are_critical() {
    let mut album = valid_album();
    album.tags.set(Tag::RecordingYear, "1500");
    album.images.clear();

    let outcome = validator().validate(&album);
    assert_eq!(outcome.status, AlbumStatus::Invalid);
    assert!(outcome.reasons.contains(Reason::HAS_INVALID_YEAR));
    assert!(outcome.reasons.contains(Reason::HAS_NO_IMAGES));
  }

  #[test]
  fn numbering_gaps_and_duplicates() {
    let mut album = valid_album();
    album.songs[2].tags.set(Tag::TrackNumber, "5");
    let outcome = validator().validate(&album);
    assert!(outcome.reasons.contains(Reason::SONGS_ARE_NOT_SEQUENTIALLY_NUMBERED));

    let mut album = valid_album();
    album.songs[2].tags.set(Tag::TrackNumber, "2");
    let outcome = validator().validate(&album);
    assert!(outcome.reasons.contains(Reason::SONGS_ARE_NOT_UNIQUELY_NUMBERED));
    assert_eq!(outcome.status, AlbumStatus::Invalid);
  }

  #[test]
  fn multi_disc_numbering_restarts_per_disc() {
    let mut album = valid_album();
    album.songs[2].tags.set(Tag::TrackNumber, "1");
    album.songs[2].tags.set(Tag::DiscNumber, "2");
    let outcome = validator().validate(&album);
    assert_eq!(outcome.status, AlbumStatus::Ok, "{:?}", outcome.messages);
  }

  #[test]
  fn unwanted_text_is_only_undesired() {
    let mut album = valid_album();
    album.songs[0].tags.set(Tag::Title, "Ready Lets Go (feat. Someone)");
    album.tags.set(Tag::Album, "Geogaddi (Deluxe Edition)");

    let outcome = validator().validate(&album);
    assert_eq!(outcome.status, AlbumStatus::Ok);
    assert!(outcome.reasons.contains(Reason::HAS_SONGS_WITH_UNWANTED_TEXT));
    assert!(outcome.reasons.contains(Reason::TITLE_HAS_UNWANTED_TEXT));
    assert!(outcome.messages.iter().all(|m| m.severity == Severity::Undesired));
  }

  #[test]
  fn mixed_album_artists_need_various_type() {
    let mut album = valid_album();
    album.songs[0].tags.set(Tag::AlbumArtist, "Boards of Canada");
    album.songs[1].tags.set(Tag::AlbumArtist, "Someone Else");
    let outcome = validator().validate(&album);
    assert!(outcome.reasons.contains(Reason::HAS_MULTIPLE_ARTISTS_BUT_NOT_MULTIPLE_ARTIST_ALBUM_TYPE));

    album.replace_artist(Artist { search_engine_id: Some("va".into()), ..Artist::various_artists() });
    let outcome = validator().validate(&album);
    assert!(!outcome.reasons.contains(Reason::HAS_MULTIPLE_ARTISTS_BUT_NOT_MULTIPLE_ARTIST_ALBUM_TYPE));
  }

  #[test]
  fn unknown_artist_is_optional() {
    let mut album = valid_album();
    album.artist.search_engine_id = None;
    assert!(validator().validate(&album).reasons.contains(Reason::HAS_UNKNOWN_ARTIST));

    let lenient =
      RuleAlbumValidator::new(&PipelineConfig { require_known_artist: false, ..PipelineConfig::default() });
    assert!(lenient.validate(&album).is_valid());
  }
}
