//! Motor de clasificación: funciones puras sobre un [`Album`], sin I/O.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::domain::{Album, MetaTagIdentifier};
use crate::text::normalize_key;

/// Géneros (normalizados) que identifican una banda sonora.
const SOUNDTRACK_GENRES: &[&str] = &["SOUNDTRACK", "ORIGINALSOUNDTRACK", "ORIGINALSOUNDTRACKRECORDING", "OST"];

/// Géneros (normalizados) de grabaciones de reparto, teatro y audio-drama.
const CAST_GENRES: &[&str] = &[
  "THEATRE",
  "THEATER",
  "AUDIODRAMA",
  "AUDIOPLAY",
  "AUDIOTHEATRE",
  "AUDIOTHEATER",
  "BROADWAY",
  "CASTRECORDING",
  "RADIOTHEATRE",
  "OCT",
  "ORIGINALRECORDING",
  "ORIGINALCAST",
  "ORIGINALCASTRECORDING",
];

const VARIOUS_LITERALS: &[&str] = &["VA", "VARIOUS", "VARIOUSARTISTS"];

static SOUNDTRACK_TITLE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?i)(soundtrack|\(\s*ost\s*\))").expect("valid soundtrack regex"));

static CAST_PATTERN: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?i)original\s+(broadway\s+)?cast").expect("valid cast regex"));

static VARIOUS_PATTERN: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?i)([\[(]*various\s*artists[\])]*)|(^[\[(]*va[\])]*(\W|$))").expect("valid various artists regex")
});

/// Tipo de artista de un álbum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtistType {
  NotSet,
  ArtistOrBand,
  VariousArtists,
}

fn genre_in(album: &Album, set: &[&str]) -> bool {
  album.genre().map(normalize_key).is_some_and(|g| set.contains(&g.as_str()))
}

/// `true` si el nombre indica una compilación de varios artistas.
pub fn is_various_artist_name(name: &str) -> bool {
  let name = name.trim();
  if name.is_empty() {
    return false;
  }
  VARIOUS_LITERALS.contains(&normalize_key(name).as_str()) || VARIOUS_PATTERN.is_match(name)
}

/// `true` si el nombre indica una grabación de reparto original.
pub fn is_cast_name(name: &str) -> bool {
  let name = name.trim();
  !name.is_empty() && (CAST_PATTERN.is_match(name) || normalize_key(name) == "THEATER")
}

pub fn is_soundtrack(album: &Album) -> bool {
  if genre_in(album, SOUNDTRACK_GENRES) {
    return true;
  }
  album.title().is_some_and(|t| t.chars().count() > 2 && SOUNDTRACK_TITLE.is_match(t))
}

pub fn is_original_cast(album: &Album) -> bool {
  if genre_in(album, CAST_GENRES) {
    return true;
  }
  CAST_PATTERN.is_match(&album.artist.name) || album.title().is_some_and(|t| CAST_PATTERN.is_match(t))
}

/// Reglas en orden: banda sonora; varios géneros con artista VA/reparto;
/// algún compositor "various" (del álbum o de una canción); artista VA/reparto.
pub fn is_various_artists(album: &Album) -> bool {
  if is_soundtrack(album) {
    return true;
  }
  if album.songs.is_empty() {
    return false;
  }

  let artist_flagged = album.artist.is_various_or_cast();

  let genres: HashSet<String> = album.songs.iter().filter_map(|s| s.genre()).map(normalize_key).collect();
  if genres.len() > 1 && artist_flagged {
    return true;
  }

  let album_composer = album.tags.get(MetaTagIdentifier::Composer);
  let song_composers = album.songs.iter().filter_map(|s| s.composer());
  let various_composer = album_composer.into_iter().chain(song_composers).any(|c| {
    let normalized = normalize_key(c);
    normalized == "VARIOUS" || normalized == "VARIOUSARTISTS" || VARIOUS_PATTERN.is_match(c)
  });
  if various_composer {
    return true;
  }

  artist_flagged
}

/// Cualquier canción con tag de artista poblado (igual o distinto al del
/// álbum) resuelve a `VariousArtists`. Se mantiene tal cual se observa.
pub fn artist_type(album: &Album) -> ArtistType {
  let album_artist = album.artist.name.trim();
  if album_artist.is_empty() {
    return ArtistType::NotSet;
  }

  let same_artist = album.songs.iter().filter_map(|s| s.artist()).any(|a| a.eq_ignore_ascii_case(album_artist));
  let other_artist = album.songs.iter().filter_map(|s| s.artist()).any(|a| !a.eq_ignore_ascii_case(album_artist));

  if same_artist || other_artist { ArtistType::VariousArtists } else { ArtistType::ArtistOrBand }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Artist, MetaTagIdentifier as Tag, Song, TagSet};

  fn album(artist: &str, tags: &[(Tag, &str)], songs: Vec<Song>) -> Album {
    Album::new(Artist::new(artist), TagSet::from_pairs(tags.iter().copied()), songs, "/in/album")
  }

  fn song(tags: &[(Tag, &str)]) -> Song {
    Song::new("01.mp3", TagSet::from_pairs(tags.iter().copied()))
  }

  #[test]
  fn soundtrack_genre_wins_regardless_of_title() {
    let a = album("Hans Zimmer", &[(Tag::Album, "Inception"), (Tag::Genre, "Soundtrack")], vec![]);
    assert!(is_soundtrack(&a));
    assert!(is_various_artists(&a));
  }

  #[test]
  fn soundtrack_title_patterns() {
    let a = album("X", &[(Tag::Album, "Drive (Original Motion Picture Soundtrack)")], vec![]);
    assert!(is_soundtrack(&a));

    let b = album("X", &[(Tag::Album, "Akira (OST)")], vec![]);
    assert!(is_soundtrack(&b));

    let c = album("X", &[(Tag::Album, "Ghost Stories")], vec![]);
    assert!(!is_soundtrack(&c));
  }

  #[test]
  fn cast_detected_from_title_artist_or_genre() {
    let wicked = album("Stephen Schwartz", &[(Tag::Album, "Wicked (Original Broadway Cast Recording)")], vec![]);
    assert!(is_original_cast(&wicked));

    let by_artist = album("Original Cast of Hamilton", &[(Tag::Album, "Hamilton")], vec![]);
    assert!(is_original_cast(&by_artist));

    let by_genre = album("X", &[(Tag::Album, "Y"), (Tag::Genre, "Audio Drama")], vec![]);
    assert!(is_original_cast(&by_genre));

    let plain = album("Metallica", &[(Tag::Album, "Master of Puppets")], vec![]);
    assert!(!is_original_cast(&plain));
  }

  #[test]
  fn various_artist_names() {
    assert!(is_various_artist_name("Various Artists"));
    assert!(is_various_artist_name("[VA]"));
    assert!(is_various_artist_name("va"));
    assert!(!is_various_artist_name("Eva Cassidy"));
    assert!(!is_various_artist_name(""));
  }

  #[test]
  fn various_artists_rules() {
    let no_songs = album("Various Artists", &[(Tag::Album, "Hits")], vec![]);
    assert!(!is_various_artists(&no_songs));

    let flagged = album("Various Artists", &[(Tag::Album, "Hits")], vec![song(&[(Tag::Title, "a")])]);
    assert!(is_various_artists(&flagged));

    let composer = album("Someone", &[(Tag::Album, "Hits")], vec![song(&[(Tag::Composer, "Various")])]);
    assert!(is_various_artists(&composer));

    let plain = album("Someone", &[(Tag::Album, "Hits")], vec![song(&[(Tag::Genre, "Rock")])]);
    assert!(!is_various_artists(&plain));
  }

  #[test]
  fn album_level_composer_counts_as_various() {
    let a = album(
      "Someone",
      &[(Tag::Album, "Hits"), (Tag::Composer, "Various Artists")],
      vec![song(&[(Tag::Title, "a")])],
    );
    assert!(is_various_artists(&a));

    let named = album("Someone", &[(Tag::Album, "Hits"), (Tag::Composer, "Ennio Morricone")], vec![song(&[])]);
    assert!(!is_various_artists(&named));
  }

  #[test]
  fn artist_type_any_song_artist_means_various() {
    let unnamed = album("", &[], vec![song(&[])]);
    assert_eq!(artist_type(&unnamed), ArtistType::NotSet);

    let bare = album("Björk", &[], vec![song(&[(Tag::Title, "Hyperballad")])]);
    assert_eq!(artist_type(&bare), ArtistType::ArtistOrBand);

    let same = album("Björk", &[], vec![song(&[(Tag::Artist, "björk")])]);
    assert_eq!(artist_type(&same), ArtistType::VariousArtists);

    let other = album("Björk", &[], vec![song(&[(Tag::Artist, "Thom Yorke")])]);
    assert_eq!(artist_type(&other), ArtistType::VariousArtists);
  }
}
