//! Reglas de normalización ("magic").
//!
//! Cada regla se activa por configuración, compara valor viejo y nuevo, y
//! solo escribe cuando cambian. Una segunda pasada sobre el mismo álbum no
//! modifica nada.

use chrono::Datelike;
use std::collections::{BTreeMap, BTreeSet};

use tarima_core::domain::{Album, Artist, MetaTagIdentifier as Tag, SongId};
use tarima_core::naming::strip_leading_number;
use tarima_core::text::normalize_key;

use crate::config::{MagicConfig, PipelineConfig};
use crate::rules;

/// Resultado de una pasada.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MagicOutcome {
  /// Canciones con algún tag cambiado (candidatas al escritor de tags).
  pub changed_songs: BTreeSet<SongId>,
  pub album_changed: bool,
  pub skipped: bool,
}

impl MagicOutcome {
  pub fn changed(&self) -> bool {
    self.album_changed || !self.changed_songs.is_empty()
  }
}

pub struct MagicNormalizer {
  cfg: MagicConfig,
  minimum_year: i32,
  maximum_year: i32,
  /// Variante normalizada -> nombre canónico.
  replacements: BTreeMap<String, String>,
}

impl MagicNormalizer {
  pub fn new(cfg: &PipelineConfig) -> Self {
    let replacements = cfg
      .artist_name_replacements
      .iter()
      .flat_map(|(canonical, variants)| variants.iter().map(move |v| (normalize_key(v), canonical.clone())))
      .filter(|(key, _)| !key.is_empty())
      .collect();

    Self { cfg: cfg.magic.clone(), minimum_year: cfg.minimum_valid_year, maximum_year: cfg.max_year(), replacements }
  }

  /// Aplica las reglas activas en orden. No hace nada si magic está
  /// desactivado o el álbum ya es válido.
  pub fn apply(&self, album: &mut Album) -> MagicOutcome {
    let mut out = MagicOutcome::default();
    if !self.cfg.enabled || album.is_valid() {
      out.skipped = true;
      return out;
    }

    if self.cfg.renumber_songs {
      self.renumber_songs(album, &mut out);
    }
    if self.cfg.remove_featuring_from_song_artist {
      self.featuring_from_song_artist(album, &mut out);
    }
    if self.cfg.remove_featuring_from_song_title {
      self.featuring_from_song_title(album, &mut out);
    }
    if self.cfg.replace_song_artist_separators {
      self.song_artist_separators(album, &mut out);
    }
    if self.cfg.set_year_to_current_if_invalid {
      self.year_to_current(album, &mut out);
    }
    if self.cfg.remove_unwanted_text_from_album_title {
      self.album_title_text(album, &mut out);
    }
    if self.cfg.remove_unwanted_text_from_song_titles {
      self.song_title_text(album, &mut out);
    }
    if self.cfg.replace_artist_names {
      self.artist_names(album, &mut out);
    }

    if out.changed() {
      tracing::debug!(album = %album.id, songs = out.changed_songs.len(), album_changed = out.album_changed, "magic applied");
    }
    out
  }

  /// Renumera 1..n dentro de cada disco, en el orden actual de las canciones;
  /// el orden entre discos lo conserva `sort_order`. El total del álbum sí
  /// cuenta todas las canciones.
  fn renumber_songs(&self, album: &mut Album, out: &mut MagicOutcome) {
    let mut order: Vec<(i32, i64, String, SongId)> =
      album.songs.iter().map(|s| (s.disc_number(), s.sort_order(), s.file_name.clone(), s.id)).collect();
    order.sort();

    let mut next: BTreeMap<i32, i32> = BTreeMap::new();
    for (disc, _, _, id) in order {
      let number = next.entry(disc).or_insert(0);
      *number += 1;
      if album.set_song_tag(id, Tag::TrackNumber, number.to_string()) {
        out.changed_songs.insert(id);
      }
    }

    let count = album.songs.len().to_string();
    if album.tags.get(Tag::SongTotal).is_some() && album.tags.set(Tag::SongTotal, count) {
      out.album_changed = true;
    }
  }

  /// `"Artista feat. Invitado"` queda como `"Invitado"`.
  fn featuring_from_song_artist(&self, album: &mut Album, out: &mut MagicOutcome) {
    for song in album.songs.iter_mut() {
      let Some(artist) = song.artist() else { continue };
      if !rules::has_featuring(artist) {
        continue;
      }
      if let Some(featured) = rules::featured_artist(artist)
        && song.tags.set(Tag::Artist, featured)
      {
        out.changed_songs.insert(song.id);
      }
    }
  }

  /// Quita el fragmento "featuring" del título. Si la canción no tenía
  /// artista propio, el invitado pasa a serlo.
  fn featuring_from_song_title(&self, album: &mut Album, out: &mut MagicOutcome) {
    for song in album.songs.iter_mut() {
      let Some(title) = song.title().map(str::to_string) else { continue };
      let Some(clean) = rules::title_without_featuring(&title) else { continue };

      let mut changed = false;
      if song.artist().is_none()
        && let Some(featured) = rules::featured_artist(&title)
      {
        changed |= song.tags.set(Tag::Artist, featured);
      }
      changed |= song.tags.set(Tag::Title, clean);
      if changed {
        out.changed_songs.insert(song.id);
      }
    }
  }

  fn song_artist_separators(&self, album: &mut Album, out: &mut MagicOutcome) {
    for song in album.songs.iter_mut() {
      let Some(artist) = song.artist() else { continue };
      let replaced = rules::replace_separators(artist);
      if !replaced.is_empty() && song.tags.set(Tag::Artist, replaced) {
        out.changed_songs.insert(song.id);
      }
    }
  }

  fn year_to_current(&self, album: &mut Album, out: &mut MagicOutcome) {
    let valid = album.year().is_some_and(|y| y >= self.minimum_year && y <= self.maximum_year);
    if valid {
      return;
    }
    let year = chrono::Utc::now().year().clamp(self.minimum_year, self.maximum_year).to_string();
    if album.tags.set(Tag::RecordingYear, year.clone()) {
      out.album_changed = true;
    }
    for song in album.songs.iter_mut() {
      if song.tags.get(Tag::RecordingYear).is_some() && song.tags.set(Tag::RecordingYear, year.clone()) {
        out.changed_songs.insert(song.id);
      }
    }
  }

  fn album_title_text(&self, album: &mut Album, out: &mut MagicOutcome) {
    let Some(title) = album.title().map(str::to_string) else { return };
    if !rules::album_title_has_unwanted_text(&title) {
      return;
    }
    let without_featuring = rules::title_without_featuring(&title).unwrap_or(title);
    let clean = rules::remove_unwanted_album_text(&without_featuring);
    if clean.is_empty() {
      return;
    }

    if album.tags.set(Tag::Album, clean.clone()) {
      out.album_changed = true;
    }
    for song in album.songs.iter_mut() {
      if song.tags.get(Tag::Album).is_some() && song.tags.set(Tag::Album, clean.clone()) {
        out.changed_songs.insert(song.id);
      }
    }
  }

  fn song_title_text(&self, album: &mut Album, out: &mut MagicOutcome) {
    let album_title = album.title().unwrap_or_default().to_string();
    for song in album.songs.iter_mut() {
      let Some(title) = song.title() else { continue };
      if !rules::song_has_unwanted_text(&album_title, Some(title), song.track_number()) {
        continue;
      }
      let mut clean = rules::remove_unwanted_song_text(title);
      if rules::song_has_unwanted_text(&album_title, Some(&clean), song.track_number()) {
        clean = strip_leading_number(&clean).to_string();
      }
      if !clean.is_empty() && song.tags.set(Tag::Title, clean) {
        out.changed_songs.insert(song.id);
      }
    }
  }

  fn canonical_name(&self, name: &str) -> Option<&str> {
    self.replacements.get(&normalize_key(name)).map(String::as_str).filter(|c| *c != name)
  }

  /// Sustituye variantes conocidas del nombre del artista por la canónica,
  /// en el artista del álbum y en los tags de cada canción.
  fn artist_names(&self, album: &mut Album, out: &mut MagicOutcome) {
    if self.replacements.is_empty() {
      return;
    }

    if let Some(canonical) = self.canonical_name(&album.artist.name) {
      let renamed = Artist::new(canonical);
      let artist = Artist { name: renamed.name, name_normalized: renamed.name_normalized, ..album.artist.clone() };
      album.replace_artist(artist);
      out.album_changed = true;
    }

    for song in album.songs.iter_mut() {
      for id in [Tag::Artist, Tag::AlbumArtist] {
        let canonical = song.tags.get(id).and_then(|v| self.canonical_name(v)).map(str::to_string);
        if let Some(canonical) = canonical
          && song.tags.set(id, canonical)
        {
          out.changed_songs.insert(song.id);
        }
      }
    }
  }
}
