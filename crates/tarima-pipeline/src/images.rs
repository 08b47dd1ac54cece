//! Recolección de imágenes de álbum y de artista para un álbum.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tarima_core::domain::{Album, ImageInfo, PictureIdentifier};
use tarima_core::naming::image_file_name;
use tarima_core::ports::{FileSystem, ImageInspector};
use tarima_core::text::{hash_hex, normalize_key};

use crate::error::PipelineError;

const IMAGE_EXTENSIONS: &[&str] = &["bmp", "jpeg", "jpe", "jpg", "png", "gif", "webp"];

const ARTIST_KEYWORDS: &[&str] = &["BAND", "ARTIST", "GROUP", "PHOTO"];
const ARTIST_SECONDARY_KEYWORDS: &[&str] = &["ARTISTLOGO", "LOGO"];
const ALBUM_KEYWORDS: &[&str] = &["ALBUM", "ART", "BIG", "COVER", "CVR", "FOLDER", "FRONT", "SCAN"];
const ALBUM_SECONDARY_KEYWORDS: &[&str] = &[
  "BACK", "BOOK", "CD", "DIGIPACK", "DISC", "DVD", "ENCARTES", "INSIDE", "INNER", "INLAY", "INSITE", "JEWEL", "MATRIX",
  "TRAYCARD",
];

/// Niveles de directorio padre donde se buscan imágenes de artista.
const ARTIST_PARENT_LEVELS: usize = 2;

/// Años plausibles embebidos en el nombre de una portada ("cover 1979.jpg").
const MINIMUM_YEAR_IN_NAME: u64 = 1860;

pub fn is_image_file(path: &Path) -> bool {
  path
    .extension()
    .and_then(|e| e.to_str())
    .is_some_and(|e| IMAGE_EXTENSIONS.iter().any(|known| e.eq_ignore_ascii_case(known)))
}

/// Dígitos del nombre concatenados, como número.
fn number_in_name(name: &str) -> u64 {
  let digits: String = name.chars().filter(|c| c.is_ascii_digit()).collect();
  if digits.is_empty() {
    return 0;
  }
  digits.parse().unwrap_or(u64::MAX)
}

fn stem_key(path: &Path) -> String {
  path.file_stem().and_then(|s| s.to_str()).map(normalize_key).unwrap_or_default()
}

/// Clasifica una imagen por su nombre de archivo.
///
/// `None` si el nombre no contiene ninguna palabra clave conocida.
pub fn classify_file_name(path: &Path) -> Option<PictureIdentifier> {
  if !is_image_file(path) {
    return None;
  }
  let key = stem_key(path);
  let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
  let number = number_in_name(name);

  if ARTIST_KEYWORDS.iter().any(|k| key.contains(k)) {
    return Some(if number < 2 { PictureIdentifier::Band } else { PictureIdentifier::BandSecondary });
  }
  if ARTIST_SECONDARY_KEYWORDS.iter().any(|k| key.contains(k)) {
    return Some(PictureIdentifier::BandSecondary);
  }
  if ALBUM_SECONDARY_KEYWORDS.iter().any(|k| key.contains(k)) {
    return Some(PictureIdentifier::SecondaryFront);
  }
  if ALBUM_KEYWORDS.iter().any(|k| key.contains(k)) {
    let primary = number < 2 || number > MINIMUM_YEAR_IN_NAME;
    return Some(if primary { PictureIdentifier::Front } else { PictureIdentifier::SecondaryFront });
  }
  None
}

/// Imagen lista para llevarse al staging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestedImage {
  /// Archivo del que se copia (o mueve) la imagen.
  pub source: PathBuf,
  /// `source` es una copia convertida en el directorio de trabajo; siempre
  /// se mueve, nunca se copia.
  pub temporary: bool,
  pub info: ImageInfo,
}

#[derive(Debug, Clone, Default)]
pub struct Harvest {
  pub album: Vec<HarvestedImage>,
  pub artist: Vec<HarvestedImage>,
  /// Imágenes descartadas por inválidas o duplicadas.
  pub discarded: usize,
}

impl Harvest {
  pub fn len(&self) -> usize {
    self.album.len() + self.artist.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn iter(&self) -> impl Iterator<Item = &HarvestedImage> {
    self.album.iter().chain(self.artist.iter())
  }
}

struct Candidate {
  path: PathBuf,
  original_file_name: String,
  identifier: PictureIdentifier,
}

pub struct ImageHarvester {
  fs: Arc<dyn FileSystem>,
  inspector: Arc<dyn ImageInspector>,
  max_images: usize,
  sidecar_suffix: String,
}

impl ImageHarvester {
  pub fn new(
    fs: Arc<dyn FileSystem>,
    inspector: Arc<dyn ImageInspector>,
    max_images: usize,
    sidecar_suffix: impl Into<String>,
  ) -> Self {
    Self { fs, inspector, max_images: max_images.max(1), sidecar_suffix: sidecar_suffix.into() }
  }

  fn is_sidecar(&self, path: &Path) -> bool {
    let suffix = self.sidecar_suffix.trim_start_matches('.');
    path.file_name().and_then(|n| n.to_str()).is_some_and(|n| n.ends_with(suffix))
  }

  async fn image_files(&self, dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let mut files: Vec<PathBuf> = self.fs.enumerate_files(dir, false).await?.into_iter().filter(|f| is_image_file(f)).collect();
    files.sort();
    Ok(files)
  }

  /// Subdirectorios inmediatos con imágenes y sin sidecar propio (carpetas
  /// de escaneos, no otros álbumes).
  async fn image_subdirectories(&self, dir: &Path) -> Result<Vec<(PathBuf, Vec<PathBuf>)>, PipelineError> {
    let mut subdirs = self.fs.enumerate_directories(dir).await?;
    subdirs.sort();

    let mut out = Vec::new();
    for sub in subdirs {
      let files = self.fs.enumerate_files(&sub, false).await?;
      if files.iter().any(|f| self.is_sidecar(f)) {
        continue;
      }
      let mut images: Vec<PathBuf> = files.into_iter().filter(|f| is_image_file(f)).collect();
      if images.is_empty() {
        continue;
      }
      images.sort();
      out.push((sub, images));
    }
    Ok(out)
  }

  /// Imágenes del directorio del álbum y de sus carpetas de imágenes. Los
  /// nombres repetidos en una subcarpeta llevan el nombre de la subcarpeta.
  async fn local_images(&self, dir: &Path) -> Result<Vec<(PathBuf, String)>, PipelineError> {
    let mut seen_names = HashSet::new();
    let mut out = Vec::new();

    for file in self.image_files(dir).await? {
      let name = file_name_of(&file);
      seen_names.insert(name.to_ascii_lowercase());
      out.push((file, name));
    }

    for (sub, images) in self.image_subdirectories(dir).await? {
      let sub_name = file_name_of(&sub);
      for file in images {
        let mut name = file_name_of(&file);
        if !seen_names.insert(name.to_ascii_lowercase()) {
          let stem = file.file_stem().and_then(|s| s.to_str()).unwrap_or("image");
          let ext = file.extension().and_then(|e| e.to_str()).unwrap_or("jpg");
          name = format!("{stem}-{sub_name}.{ext}");
          seen_names.insert(name.to_ascii_lowercase());
        }
        out.push((file, name));
      }
    }
    Ok(out)
  }

  fn album_candidates(&self, album: &Album, local: &[(PathBuf, String)]) -> Vec<Candidate> {
    let title_key = album.title().map(|t| normalize_key(t).replace("AND", "")).filter(|t| !t.is_empty());

    local
      .iter()
      .filter_map(|(path, name)| {
        let by_name = classify_file_name(path);
        if by_name.is_some_and(|id| id.is_artist_image()) {
          return None;
        }
        let title_match = title_key.as_deref().is_some_and(|t| stem_key(path).contains(t));
        let identifier = if by_name == Some(PictureIdentifier::Front) || title_match {
          PictureIdentifier::Front
        } else {
          PictureIdentifier::SecondaryFront
        };
        Some(Candidate { path: path.clone(), original_file_name: name.clone(), identifier })
      })
      .collect()
  }

  async fn artist_candidates(
    &self,
    dir: &Path,
    boundary: &Path,
    local: &[(PathBuf, String)],
  ) -> Result<Vec<Candidate>, PipelineError> {
    let mut pool: Vec<(PathBuf, String)> = local.to_vec();

    for parent in dir.ancestors().skip(1).take(ARTIST_PARENT_LEVELS) {
      if !parent.starts_with(boundary) || !self.fs.directory_exists(parent).await {
        break;
      }
      for file in self.image_files(parent).await? {
        let name = file_name_of(&file);
        pool.push((file, name));
      }
    }

    Ok(
      pool
        .into_iter()
        .filter_map(|(path, name)| {
          let identifier = classify_file_name(&path).filter(|id| id.is_artist_image())?;
          Some(Candidate { path, original_file_name: name, identifier })
        })
        .collect(),
    )
  }

  /// Valida; si no es válida, convierte una copia en `work_dir` y vuelve a
  /// validar. El archivo de origen nunca se modifica.
  async fn accept(&self, candidate: &Candidate, work_dir: &Path) -> Option<(PathBuf, bool, u32, u32)> {
    match self.inspector.validate(&candidate.path, candidate.identifier).await {
      Ok(check) if check.is_valid => return Some((candidate.path.clone(), false, check.width, check.height)),
      Ok(_) => {}
      Err(e) => tracing::debug!(path = %candidate.path.display(), error = %e, "image validation failed"),
    }

    if !self.fs.directory_exists(work_dir).await
      && let Err(e) = self.fs.create_dir_all(work_dir).await
    {
      tracing::warn!(dir = %work_dir.display(), error = %e, "unable to create image work directory");
      return None;
    }

    let ext = candidate.path.extension().and_then(|e| e.to_str()).unwrap_or("img");
    let key = hash_hex(candidate.path.to_string_lossy().as_bytes());
    let copy = work_dir.join(format!("{}.{ext}", &key[..16]));
    if let Err(e) = self.fs.copy_file(&candidate.path, &copy).await {
      tracing::warn!(path = %candidate.path.display(), error = %e, "unable to copy image for conversion");
      return None;
    }

    let converted = match self.inspector.convert(work_dir, &copy).await {
      Ok(p) => p,
      Err(e) => {
        tracing::warn!(path = %candidate.path.display(), error = %e, "image conversion failed");
        self.discard(&copy).await;
        return None;
      }
    };

    match self.inspector.validate(&converted, candidate.identifier).await {
      Ok(check) if check.is_valid => Some((converted, true, check.width, check.height)),
      _ => {
        tracing::info!(path = %candidate.path.display(), "image still invalid after conversion, dropped");
        self.discard(&converted).await;
        None
      }
    }
  }

  async fn discard(&self, file: &Path) {
    if self.fs.file_exists(file).await
      && let Err(e) = self.fs.delete_file(file).await
    {
      tracing::debug!(path = %file.display(), error = %e, "unable to remove temporary image");
    }
  }

  async fn collect(
    &self,
    candidates: Vec<Candidate>,
    work_dir: &Path,
    seen_hashes: &mut HashSet<String>,
    discarded: &mut usize,
  ) -> Vec<HarvestedImage> {
    let mut out = Vec::new();
    for candidate in candidates {
      let Some((source, temporary, width, height)) = self.accept(&candidate, work_dir).await else {
        *discarded += 1;
        continue;
      };
      let hash = match self.fs.read_bytes(&source).await {
        Ok(bytes) => hash_hex(&bytes),
        Err(e) => {
          tracing::warn!(path = %source.display(), error = %e, "unable to read image");
          *discarded += 1;
          continue;
        }
      };
      if !seen_hashes.insert(hash.clone()) {
        tracing::debug!(path = %candidate.path.display(), "duplicate image skipped");
        if temporary {
          self.discard(&source).await;
        }
        *discarded += 1;
        continue;
      }
      out.push(HarvestedImage {
        source,
        temporary,
        info: ImageInfo {
          hash,
          picture_identifier: candidate.identifier,
          sort_order: 0,
          width,
          height,
          original_file_name: candidate.original_file_name,
          file_name: String::new(),
        },
      });
    }
    out
  }

  /// Recolecta las imágenes de `album`, cuyo directorio es `dir`.
  ///
  /// Las imágenes de artista se buscan también hasta dos niveles hacia
  /// arriba, sin salir de `boundary`. Las conversiones se hacen en
  /// `work_dir`.
  pub async fn harvest(
    &self,
    album: &Album,
    dir: &Path,
    boundary: &Path,
    work_dir: &Path,
  ) -> Result<Harvest, PipelineError> {
    let local = self.local_images(dir).await?;
    let mut seen = HashSet::new();
    let mut harvest = Harvest::default();

    let album_candidates = self.album_candidates(album, &local);
    let mut album_images = self.collect(album_candidates, work_dir, &mut seen, &mut harvest.discarded).await;
    promote_front(&mut album_images);
    album_images.sort_by_key(|i| i.info.picture_identifier);
    album_images.truncate(self.max_images);

    let artist_candidates = self.artist_candidates(dir, boundary, &local).await?;
    let mut artist_images = self.collect(artist_candidates, work_dir, &mut seen, &mut harvest.discarded).await;
    artist_images.sort_by_key(|i| i.info.picture_identifier);
    artist_images.truncate(self.max_images.saturating_sub(album_images.len().max(1)));

    // El índice 1 queda reservado para la portada que pueda traer el
    // enriquecimiento cuando el álbum no tiene imágenes propias.
    let artist_start = album_images.len().max(1) + 1;
    self.number(&mut album_images, 1);
    self.number(&mut artist_images, artist_start);

    tracing::debug!(
      dir = %dir.display(),
      album_images = album_images.len(),
      artist_images = artist_images.len(),
      discarded = harvest.discarded,
      "images harvested"
    );

    harvest.album = album_images;
    harvest.artist = artist_images;
    Ok(harvest)
  }

  /// Nombres canónicos por índice global y orden dentro de cada identificador.
  fn number(&self, images: &mut [HarvestedImage], first_index: usize) {
    let mut last: Option<(PictureIdentifier, u32)> = None;
    for (offset, image) in images.iter_mut().enumerate() {
      let identifier = image.info.picture_identifier;
      let order = match last {
        Some((id, n)) if id == identifier => n + 1,
        _ => 1,
      };
      last = Some((identifier, order));
      image.info.sort_order = order;
      image.info.file_name = image_file_name(first_index + offset, identifier, self.max_images);
    }
  }
}

/// Sin portada principal, la primera secundaria pasa a serlo.
fn promote_front(images: &mut [HarvestedImage]) {
  if images.iter().any(|i| i.info.picture_identifier == PictureIdentifier::Front) {
    return;
  }
  if let Some(first) = images.iter_mut().find(|i| i.info.picture_identifier == PictureIdentifier::SecondaryFront) {
    first.info.picture_identifier = PictureIdentifier::Front;
  }
}

fn file_name_of(path: &Path) -> String {
  path.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string()
}
