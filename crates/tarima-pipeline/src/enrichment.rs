//! Enriquecimiento con los buscadores externos.
//!
//! Todo es de mejor esfuerzo: un buscador ausente, vacío o que falla solo deja
//! una traza y el álbum sigue con sus datos originales.

use std::cmp::Reverse;
use std::path::Path;
use std::sync::Arc;

use tarima_core::domain::{Album, Artist, ImageInfo, MetaTagIdentifier as Tag, PictureIdentifier};
use tarima_core::naming::image_file_name;
use tarima_core::ports::{
  AlbumImageQuery, AlbumImageResult, AlbumImageSearch, ArtistSearch, ArtistSearchQuery, ArtistSearchResult, FileSystem,
  ImageInspector, ReleaseMatch,
};
use tarima_core::text::{hash_hex, normalize_key};

use crate::config::PipelineConfig;
use crate::context::RunContext;

/// Resultados pedidos a cada buscador.
const TOP_N: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentOutcome {
  pub artist_hit: bool,
  pub release_hit: bool,
  pub image_hit: bool,
}

pub struct Enricher {
  fs: Arc<dyn FileSystem>,
  artist_search: Option<Arc<dyn ArtistSearch>>,
  image_search: Option<Arc<dyn AlbumImageSearch>>,
  inspector: Arc<dyn ImageInspector>,
  max_images: usize,
  minimum_year: i32,
  maximum_year: i32,
}

impl Enricher {
  pub fn new(fs: Arc<dyn FileSystem>, inspector: Arc<dyn ImageInspector>, cfg: &PipelineConfig) -> Self {
    Self {
      fs,
      artist_search: None,
      image_search: None,
      inspector,
      max_images: cfg.maximum_images_count,
      minimum_year: cfg.minimum_valid_year,
      maximum_year: cfg.max_year(),
    }
  }

  pub fn with_artist_search(mut self, search: Arc<dyn ArtistSearch>) -> Self {
    self.artist_search = Some(search);
    self
  }

  pub fn with_image_search(mut self, search: Arc<dyn AlbumImageSearch>) -> Self {
    self.image_search = Some(search);
    self
  }

  fn year_is_valid(&self, year: Option<i32>) -> bool {
    year.is_some_and(|y| y >= self.minimum_year && y <= self.maximum_year)
  }

  /// Enriquece `album`, cuyo directorio de staging es `staging_dir`.
  /// `previous` es el álbum de un sidecar ya presente en ese directorio.
  ///
  /// No toca el estado del álbum: lo recalcula el validador a continuación.
  pub async fn enrich(
    &self,
    album: &mut Album,
    staging_dir: &Path,
    previous: Option<&Album>,
    ctx: &RunContext,
  ) -> EnrichmentOutcome {
    let mut out = EnrichmentOutcome::default();

    if let Some(search) = &self.artist_search
      && album.artist.is_valid()
      && !ctx.is_cancelled()
    {
      self.enrich_artist(search.as_ref(), album, &mut out).await;
    }

    if album.images.is_empty()
      && let Some(search) = &self.image_search
      && !ctx.is_cancelled()
    {
      if self.reuse_staged_cover(album, staging_dir, previous).await {
        tracing::debug!(album = %album.id, "staged cover reused");
      } else {
        self.enrich_cover(search.as_ref(), album, staging_dir, &mut out).await;
      }
    }

    out
  }

  async fn enrich_artist(&self, search: &dyn ArtistSearch, album: &mut Album, out: &mut EnrichmentOutcome) {
    let query = ArtistSearchQuery {
      name: album.artist.name.clone(),
      name_normalized: album.artist.name_normalized.clone(),
      musicbrainz_id: album.artist.musicbrainz_id.clone(),
      spotify_id: album.artist.spotify_id.clone(),
      album_year: album.year(),
      album_title_normalized: album.title().map(normalize_key),
    };

    let best = match search.search(&query, TOP_N).await {
      Ok(results) => results.into_iter().min_by_key(|r| Reverse(r.rank)),
      Err(e) => {
        tracing::warn!(album = %album.id, artist = %query.name, error = %e, "artist search failed");
        return;
      }
    };
    let Some(best) = best else {
      tracing::debug!(album = %album.id, artist = %query.name, "artist search returned nothing");
      return;
    };

    album.replace_artist(merge_artist(&album.artist, &best));
    out.artist_hit = true;

    if let Some(release) = self.matching_release(album, &best.releases) {
      if release.musicbrainz_id.is_some() {
        album.musicbrainz_id = release.musicbrainz_id.clone();
      }
      if release.external_id.is_some() {
        album.external_id = release.external_id.clone();
      }
      if !self.year_is_valid(album.year())
        && let Some(year) = release.year.filter(|y| self.year_is_valid(Some(*y)))
      {
        album.tags.set(Tag::RecordingYear, year.to_string());
      }
      out.release_hit = true;
    }
    tracing::debug!(album = %album.id, artist = %album.artist.name, release = out.release_hit, "artist enriched");
  }

  /// Release con el mismo título normalizado y el mismo año. Si el año del
  /// álbum no es válido basta con el título.
  fn matching_release<'a>(&self, album: &Album, releases: &'a [ReleaseMatch]) -> Option<&'a ReleaseMatch> {
    let title = normalize_key(album.title()?);
    let year = album.year().filter(|y| self.year_is_valid(Some(*y)));
    releases.iter().find(|r| r.title_normalized == title && (year.is_none() || r.year == year))
  }

  /// Portada descargada en una pasada anterior: si sigue en el staging y es
  /// válida se adopta sin volver a buscar. Del álbum previo se conservan el
  /// nombre original y los ids cuando el contenido no ha cambiado.
  async fn reuse_staged_cover(&self, album: &mut Album, staging_dir: &Path, previous: Option<&Album>) -> bool {
    let file_name = image_file_name(1, PictureIdentifier::Front, self.max_images);
    let target = staging_dir.join(&file_name);
    if !self.fs.file_exists(&target).await {
      return false;
    }

    let check = match self.inspector.validate(&target, PictureIdentifier::Front).await {
      Ok(check) if check.is_valid => check,
      _ => return false,
    };
    let hash = match self.fs.read_bytes(&target).await {
      Ok(bytes) => hash_hex(&bytes),
      Err(e) => {
        tracing::debug!(path = %target.display(), error = %e, "unable to read staged cover");
        return false;
      }
    };

    let same = previous.filter(|p| p.cover_image().is_some_and(|i| i.hash == hash && i.file_name == file_name));
    let original_file_name =
      same.and_then(|p| p.cover_image()).map_or_else(|| file_name.clone(), |i| i.original_file_name.clone());

    album.images = vec![ImageInfo {
      hash,
      picture_identifier: PictureIdentifier::Front,
      sort_order: 1,
      width: check.width,
      height: check.height,
      original_file_name,
      file_name,
    }];
    if let Some(p) = same {
      album.musicbrainz_id = album.musicbrainz_id.take().or_else(|| p.musicbrainz_id.clone());
      album.external_id = album.external_id.take().or_else(|| p.external_id.clone());
    }
    true
  }

  async fn enrich_cover(&self, search: &dyn AlbumImageSearch, album: &mut Album, staging_dir: &Path, out: &mut EnrichmentOutcome) {
    let query = AlbumImageQuery {
      artist_name: album.artist.name.clone(),
      album_title: album.title().unwrap_or_default().to_string(),
      year: album.year(),
    };

    let best = match search.search(&query, TOP_N).await {
      Ok(results) => results.into_iter().min_by_key(|r| Reverse(r.rank)),
      Err(e) => {
        tracing::warn!(album = %album.id, error = %e, "album image search failed");
        return;
      }
    };
    let Some(best) = best else {
      tracing::debug!(album = %album.id, "album image search returned nothing");
      return;
    };

    let file_name = image_file_name(1, PictureIdentifier::Front, self.max_images);
    let target = staging_dir.join(&file_name);
    if let Err(e) = search.download(&best, &target).await {
      tracing::warn!(album = %album.id, url = %best.url, error = %e, "album image download failed");
      return;
    }

    let check = match self.inspector.validate(&target, PictureIdentifier::Front).await {
      Ok(check) if check.is_valid => check,
      other => {
        if let Err(e) = other {
          tracing::debug!(path = %target.display(), error = %e, "downloaded image validation failed");
        }
        tracing::info!(album = %album.id, url = %best.url, "downloaded image is not valid, discarded");
        if let Err(e) = self.fs.delete_file(&target).await {
          tracing::debug!(path = %target.display(), error = %e, "unable to remove discarded image");
        }
        return;
      }
    };

    let hash = match self.fs.read_bytes(&target).await {
      Ok(bytes) => hash_hex(&bytes),
      Err(e) => {
        tracing::warn!(path = %target.display(), error = %e, "unable to read downloaded image");
        return;
      }
    };

    album.images = vec![ImageInfo {
      hash,
      picture_identifier: PictureIdentifier::Front,
      sort_order: 1,
      width: check.width,
      height: check.height,
      original_file_name: original_name(&best),
      file_name,
    }];
    album.musicbrainz_id = album.musicbrainz_id.take().or(best.musicbrainz_id);
    album.external_id = album.external_id.take().or(best.external_id);
    out.image_hit = true;
    tracing::debug!(album = %album.id, url = %best.url, "cover downloaded");
  }
}

/// Copia completa del artista; los campos externos solo se rellenan si
/// estaban vacíos.
fn merge_artist(current: &Artist, found: &ArtistSearchResult) -> Artist {
  Artist {
    sort_name: current.sort_name.clone().or_else(|| found.sort_name.clone()),
    musicbrainz_id: current.musicbrainz_id.clone().or_else(|| found.musicbrainz_id.clone()),
    spotify_id: current.spotify_id.clone().or_else(|| found.spotify_id.clone()),
    search_engine_id: current.search_engine_id.clone().or_else(|| found.search_engine_id.clone()),
    ..current.clone()
  }
}

fn original_name(result: &AlbumImageResult) -> String {
  result.url.rsplit('/').find(|s| !s.is_empty()).unwrap_or(&result.url).to_string()
}

#[cfg(test)]
mod tests {
  use super::*;
  use async_trait::async_trait;
  use std::sync::Mutex;
  use tarima_core::CoreError;
  use tarima_core::domain::TagSet;
  use tarima_fs::MemoryFileSystem;

  use crate::images::tests::FakeInspector;

  struct FakeArtists(Vec<ArtistSearchResult>);

  #[async_trait]
  impl ArtistSearch for FakeArtists {
    async fn search(&self, _query: &ArtistSearchQuery, _top_n: usize) -> Result<Vec<ArtistSearchResult>, CoreError> {
      Ok(self.0.clone())
    }
  }

  struct FailingArtists;

  #[async_trait]
  impl ArtistSearch for FailingArtists {
    async fn search(&self, _query: &ArtistSearchQuery, _top_n: usize) -> Result<Vec<ArtistSearchResult>, CoreError> {
      Err(CoreError::Search("offline".into()))
    }
  }

  struct FakeCovers {
    fs: Arc<MemoryFileSystem>,
    payload: &'static [u8],
    results: Vec<AlbumImageResult>,
    downloads: Mutex<Vec<String>>,
  }

  impl FakeCovers {
    fn new(fs: Arc<MemoryFileSystem>, payload: &'static [u8]) -> Self {
      let results = vec![
        AlbumImageResult { rank: 1, url: "http://img/low.jpg".into(), ..Default::default() },
        AlbumImageResult {
          rank: 9,
          url: "http://img/best.jpg".into(),
          musicbrainz_id: Some("mb-release".into()),
          ..Default::default()
        },
      ];
      Self { fs, payload, results, downloads: Mutex::new(Vec::new()) }
    }

    fn download_count(&self) -> usize {
      self.downloads.lock().unwrap().len()
    }
  }

  #[async_trait]
  impl AlbumImageSearch for FakeCovers {
    async fn search(&self, _query: &AlbumImageQuery, _top_n: usize) -> Result<Vec<AlbumImageResult>, CoreError> {
      Ok(self.results.clone())
    }

    async fn download(&self, result: &AlbumImageResult, target: &Path) -> Result<(), CoreError> {
      self.downloads.lock().unwrap().push(result.url.clone());
      self.fs.write_bytes(target, self.payload).await?;
      Ok(())
    }
  }

  fn album() -> Album {
    let mut artist = Artist::new("Portishead");
    artist.musicbrainz_id = Some("existing".into());
    Album::new(
      artist,
      TagSet::from_pairs([(Tag::Album, "Dummy"), (Tag::RecordingYear, "1994")]),
      vec![],
      "/in/dummy",
    )
  }

  fn result() -> ArtistSearchResult {
    ArtistSearchResult {
      rank: 10,
      name: "PORTISHEAD".into(),
      sort_name: Some("Portishead".into()),
      search_engine_id: Some("se-1".into()),
      musicbrainz_id: Some("from-search".into()),
      spotify_id: Some("sp-1".into()),
      releases: vec![ReleaseMatch {
        year: Some(1994),
        title_normalized: "DUMMY".into(),
        musicbrainz_id: Some("mb-dummy".into()),
        external_id: Some("ext-dummy".into()),
      }],
    }
  }

  fn enricher(fs: Arc<MemoryFileSystem>) -> Enricher {
    let inspector = Arc::new(FakeInspector { fs: fs.clone() });
    let cfg = PipelineConfig { maximum_valid_year: Some(2030), ..PipelineConfig::default() };
    Enricher::new(fs, inspector, &cfg)
  }

  #[tokio::test]
  async fn artist_ids_are_null_coalesced_and_release_ids_overwritten() {
    let fs = Arc::new(MemoryFileSystem::new());
    let low = ArtistSearchResult { rank: 1, search_engine_id: Some("worse".into()), ..Default::default() };
    let e = enricher(fs).with_artist_search(Arc::new(FakeArtists(vec![low, result()])));

    let mut a = album();
    a.musicbrainz_id = Some("old-release".into());
    let status_before = a.status();
    let out = e.enrich(&mut a, Path::new("/stage/dummy"), None, &RunContext::unbounded()).await;

    assert!(out.artist_hit && out.release_hit);
    assert_eq!(a.artist.name, "Portishead");
    assert_eq!(a.artist.musicbrainz_id.as_deref(), Some("existing"));
    assert_eq!(a.artist.search_engine_id.as_deref(), Some("se-1"));
    assert_eq!(a.artist.spotify_id.as_deref(), Some("sp-1"));
    assert_eq!(a.musicbrainz_id.as_deref(), Some("mb-dummy"));
    assert_eq!(a.external_id.as_deref(), Some("ext-dummy"));
    assert_eq!(a.status(), status_before);
  }

  #[tokio::test]
  async fn search_failures_leave_the_album_untouched() {
    let e = enricher(Arc::new(MemoryFileSystem::new())).with_artist_search(Arc::new(FailingArtists));
    let mut a = album();
    let before = a.clone();

    let out = e.enrich(&mut a, Path::new("/stage/dummy"), None, &RunContext::unbounded()).await;
    assert_eq!(out, EnrichmentOutcome::default());
    assert_eq!(a, before);
  }

  #[tokio::test]
  async fn missing_cover_is_downloaded_and_validated() {
    let fs = Arc::new(MemoryFileSystem::new().with_dir("/stage/dummy"));
    let covers = Arc::new(FakeCovers::new(fs.clone(), b"jpeg"));
    let e = enricher(fs.clone()).with_image_search(covers.clone());

    let mut a = album();
    let out = e.enrich(&mut a, Path::new("/stage/dummy"), None, &RunContext::unbounded()).await;

    assert!(out.image_hit);
    assert_eq!(a.images.len(), 1);
    assert_eq!(a.images[0].file_name, "i-01-Front.jpg");
    assert_eq!(a.images[0].original_file_name, "best.jpg");
    assert_eq!(a.cover_image().map(|i| i.hash.clone()), Some(hash_hex(b"jpeg")));
    assert_eq!(a.musicbrainz_id.as_deref(), Some("mb-release"));
    assert!(fs.file_exists(Path::new("/stage/dummy/i-01-Front.jpg")).await);

    // Con imágenes no se vuelve a buscar.
    e.enrich(&mut a, Path::new("/stage/dummy"), None, &RunContext::unbounded()).await;
    assert_eq!(covers.download_count(), 1);
  }

  #[tokio::test]
  async fn equal_ranks_keep_the_first_result() {
    let fs = Arc::new(MemoryFileSystem::new().with_dir("/stage/dummy"));
    let first = ArtistSearchResult { search_engine_id: Some("first".into()), ..result() };
    let second = ArtistSearchResult { search_engine_id: Some("second".into()), ..result() };
    let mut covers = FakeCovers::new(fs.clone(), b"jpeg");
    covers.results = vec![
      AlbumImageResult { rank: 5, url: "http://img/first.jpg".into(), ..Default::default() },
      AlbumImageResult { rank: 5, url: "http://img/second.jpg".into(), ..Default::default() },
    ];
    let covers = Arc::new(covers);
    let e = enricher(fs)
      .with_artist_search(Arc::new(FakeArtists(vec![first, second])))
      .with_image_search(covers.clone());

    let mut a = album();
    e.enrich(&mut a, Path::new("/stage/dummy"), None, &RunContext::unbounded()).await;

    assert_eq!(a.artist.search_engine_id.as_deref(), Some("first"));
    assert_eq!(*covers.downloads.lock().unwrap(), vec!["http://img/first.jpg".to_string()]);
    assert_eq!(a.images[0].original_file_name, "first.jpg");
  }

  #[tokio::test]
  async fn valid_staged_cover_is_reused_without_searching() {
    let fs = Arc::new(MemoryFileSystem::new().with_file("/stage/dummy/i-01-Front.jpg", b"staged".to_vec()));
    let covers = Arc::new(FakeCovers::new(fs.clone(), b"fresh"));
    let e = enricher(fs.clone()).with_image_search(covers.clone());

    let mut previous = album();
    previous.musicbrainz_id = Some("mb-release".into());
    previous.images = vec![ImageInfo {
      hash: hash_hex(b"staged"),
      picture_identifier: PictureIdentifier::Front,
      sort_order: 1,
      width: 500,
      height: 500,
      original_file_name: "best.jpg".into(),
      file_name: "i-01-Front.jpg".into(),
    }];

    let mut a = album();
    let out = e.enrich(&mut a, Path::new("/stage/dummy"), Some(&previous), &RunContext::unbounded()).await;

    assert!(!out.image_hit);
    assert_eq!(covers.download_count(), 0);
    assert_eq!(a.images, previous.images);
    assert_eq!(a.musicbrainz_id.as_deref(), Some("mb-release"));
    assert_eq!(fs.mutation_count(), 0);

    // Sin sidecar previo el nombre original es el del archivo staged.
    let mut b = album();
    e.enrich(&mut b, Path::new("/stage/dummy"), None, &RunContext::unbounded()).await;
    assert_eq!(b.images[0].original_file_name, "i-01-Front.jpg");
    assert_eq!(b.images[0].hash, hash_hex(b"staged"));
    assert_eq!(covers.download_count(), 0);
  }
}
