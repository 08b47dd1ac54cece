use async_trait::async_trait;
use std::path::Path;

use crate::errors::CoreError;

/// Consulta al buscador de artistas.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtistSearchQuery {
  pub name: String,
  pub name_normalized: String,
  pub musicbrainz_id: Option<String>,
  pub spotify_id: Option<String>,
  /// Par (año, título normalizado) del álbum que se quiere casar.
  pub album_year: Option<i32>,
  pub album_title_normalized: Option<String>,
}

/// Release del artista que casa con el álbum buscado.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseMatch {
  pub year: Option<i32>,
  pub title_normalized: String,
  pub musicbrainz_id: Option<String>,
  pub external_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtistSearchResult {
  /// Mayor es mejor.
  pub rank: i32,
  pub name: String,
  pub sort_name: Option<String>,
  pub search_engine_id: Option<String>,
  pub musicbrainz_id: Option<String>,
  pub spotify_id: Option<String>,
  pub releases: Vec<ReleaseMatch>,
}

#[async_trait]
pub trait ArtistSearch: Send + Sync {
  async fn search(&self, query: &ArtistSearchQuery, top_n: usize) -> Result<Vec<ArtistSearchResult>, CoreError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlbumImageQuery {
  pub artist_name: String,
  pub album_title: String,
  pub year: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlbumImageResult {
  pub rank: i32,
  pub url: String,
  pub width: u32,
  pub height: u32,
  pub musicbrainz_id: Option<String>,
  pub external_id: Option<String>,
}

#[async_trait]
pub trait AlbumImageSearch: Send + Sync {
  async fn search(&self, query: &AlbumImageQuery, top_n: usize) -> Result<Vec<AlbumImageResult>, CoreError>;

  /// Descarga la imagen candidata en `target`.
  async fn download(&self, result: &AlbumImageResult, target: &Path) -> Result<(), CoreError>;
}
