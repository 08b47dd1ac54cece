//! Filtrado, ordenación y paginación de álbumes escaneados.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use tarima_core::domain::{AlbumId, AlbumStatus};
use tarima_core::text::normalize_key;

use crate::config::ScannerConfig;
use crate::scanner::AlbumEntry;

/// Clase de resultado (primer filtro, excluyente).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultFilter {
  #[default]
  All,
  /// Álbumes cuya identidad aparece en más de un sidecar.
  Duplicates,
  /// Estado `Invalid`.
  NeedsAttention,
  LessThanConfiguredSongs,
  New,
  /// Estado `Ok`.
  ReadyToMove,
  Selected(Vec<AlbumId>),
  LessThanConfiguredDuration,
}

/// Filtro por propiedad; se aplican todos (AND).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyFilter {
  /// Subcadena del nombre del artista, sin distinguir mayúsculas.
  ArtistName(String),
  Status(AlbumStatus),
  /// Subcadena normalizada del título o del artista.
  NameNormalized(String),
  Year(i32),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortKey {
  #[default]
  Artist,
  CreatedAt,
  Duration,
  NeedsAttentionReasons,
  Title,
  Year,
  Status,
  SongCount,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
  #[default]
  Ascending,
  Descending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagedRequest {
  /// Página 1-based.
  pub page: usize,
  pub page_size: usize,
  #[serde(default)]
  pub result_filter: ResultFilter,
  #[serde(default)]
  pub filters: Vec<PropertyFilter>,
  #[serde(default)]
  pub sort: SortKey,
  #[serde(default)]
  pub direction: SortDirection,
}

impl Default for PagedRequest {
  fn default() -> Self {
    Self {
      page: 1,
      page_size: 50,
      result_filter: ResultFilter::All,
      filters: Vec::new(),
      sort: SortKey::Artist,
      direction: SortDirection::Ascending,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PagedResult<T> {
  pub items: Vec<T>,
  pub total_count: usize,
  pub total_pages: usize,
  pub page: usize,
  pub page_size: usize,
}

fn matches_result_filter(entry: &AlbumEntry, filter: &ResultFilter, cfg: &ScannerConfig) -> bool {
  let album = &entry.album;
  match filter {
    ResultFilter::All => true,
    ResultFilter::Duplicates => entry.duplicates > 1,
    ResultFilter::NeedsAttention => album.status() == AlbumStatus::Invalid,
    ResultFilter::LessThanConfiguredSongs => album.songs.len() < cfg.filter_less_than_song_count,
    ResultFilter::New => album.status() == AlbumStatus::New,
    ResultFilter::ReadyToMove => album.status() == AlbumStatus::Ok,
    ResultFilter::Selected(ids) => ids.contains(&album.id),
    ResultFilter::LessThanConfiguredDuration => album.total_duration_ms() < cfg.filter_less_than_duration_ms,
  }
}

fn matches_property(entry: &AlbumEntry, filter: &PropertyFilter) -> bool {
  let album = &entry.album;
  match filter {
    PropertyFilter::ArtistName(name) => album.artist.name.to_lowercase().contains(&name.to_lowercase()),
    PropertyFilter::Status(status) => album.status() == *status,
    PropertyFilter::NameNormalized(needle) => {
      let needle = normalize_key(needle);
      normalize_key(album.title().unwrap_or_default()).contains(&needle) || album.artist.name_normalized.contains(&needle)
    }
    PropertyFilter::Year(year) => album.year() == Some(*year),
  }
}

fn compare(a: &AlbumEntry, b: &AlbumEntry, key: SortKey) -> Ordering {
  let (x, y) = (&a.album, &b.album);
  match key {
    SortKey::Artist => x.artist.sort_name_value().to_lowercase().cmp(&y.artist.sort_name_value().to_lowercase()),
    SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
    SortKey::Duration => x.total_duration_ms().cmp(&y.total_duration_ms()),
    SortKey::NeedsAttentionReasons => x.status_reasons().bits().cmp(&y.status_reasons().bits()),
    SortKey::Title => x.title().unwrap_or_default().to_lowercase().cmp(&y.title().unwrap_or_default().to_lowercase()),
    SortKey::Year => x.year().cmp(&y.year()),
    SortKey::Status => x.status().cmp(&y.status()),
    SortKey::SongCount => x.songs.len().cmp(&y.songs.len()),
  }
}

/// Aplica, en orden: clase de resultado, filtros de propiedad, orden y página.
pub fn apply(entries: Vec<AlbumEntry>, request: &PagedRequest, cfg: &ScannerConfig) -> PagedResult<AlbumEntry> {
  let mut filtered: Vec<AlbumEntry> = entries
    .into_iter()
    .filter(|e| matches_result_filter(e, &request.result_filter, cfg))
    .filter(|e| request.filters.iter().all(|f| matches_property(e, f)))
    .collect();

  // Desempate estable por id para que la paginación sea determinista.
  filtered.sort_by(|a, b| {
    let ordering = compare(a, b, request.sort);
    let ordering = match request.direction {
      SortDirection::Ascending => ordering,
      SortDirection::Descending => ordering.reverse(),
    };
    ordering.then_with(|| a.album.id.cmp(&b.album.id))
  });

  let page_size = request.page_size.max(1);
  let total_count = filtered.len();
  let total_pages = total_count.div_ceil(page_size);
  let skip = request.page.saturating_sub(1) * page_size;

  PagedResult {
    items: filtered.into_iter().skip(skip).take(page_size).collect(),
    total_count,
    total_pages,
    page: request.page,
    page_size,
  }
}
