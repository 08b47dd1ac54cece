use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use std::path::{Path, PathBuf};

use tarima_core::CoreError;
use tarima_core::domain::PictureIdentifier;
use tarima_core::ports::{ImageCheck, ImageInspector};

use crate::config::ImageConfig;

/// Inspector de imágenes basado en el crate `image`.
///
/// Una imagen es válida si es JPEG y su tamaño está dentro de los límites
/// configurados; `convert` re-codifica a JPEG y reduce las demasiado grandes.
#[derive(Debug, Clone, Default)]
pub struct RasterImageInspector {
  cfg: ImageConfig,
}

impl RasterImageInspector {
  pub fn new(cfg: ImageConfig) -> Self {
    Self { cfg }
  }
}

fn is_jpeg(path: &Path) -> bool {
  path.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"))
}

fn image_error(path: &Path, e: impl std::fmt::Display) -> CoreError {
  CoreError::Image(format!("{}: {e}", path.display()))
}

fn convert_blocking(cfg: &ImageConfig, dir: &Path, file: &Path) -> Result<PathBuf, CoreError> {
  let decoded = image::open(file).map_err(|e| image_error(file, e))?;
  let (width, height) = decoded.dimensions();

  let max = cfg.maximum_size.max(1);
  let resized =
    if width.max(height) > max { decoded.resize(max, max, FilterType::Lanczos3) } else { decoded };

  let stem = file.file_stem().and_then(|s| s.to_str()).unwrap_or("image");
  let target = dir.join(format!("{stem}.jpg"));

  let mut out = Vec::new();
  DynamicImage::ImageRgb8(resized.to_rgb8())
    .write_with_encoder(JpegEncoder::new_with_quality(&mut out, cfg.jpeg_quality))
    .map_err(|e| image_error(file, e))?;
  std::fs::write(&target, out)?;

  if target != file {
    std::fs::remove_file(file)?;
  }
  Ok(target)
}

#[async_trait]
impl ImageInspector for RasterImageInspector {
  async fn validate(&self, file: &Path, identifier: PictureIdentifier) -> Result<ImageCheck, CoreError> {
    let path = file.to_path_buf();
    let dimensions = tokio::task::spawn_blocking(move || image::image_dimensions(&path))
      .await
      .map_err(|e| CoreError::Image(e.to_string()))?;

    let (width, height) = match dimensions {
      Ok(d) => d,
      Err(e) => {
        tracing::debug!(path = %file.display(), error = %e, "unreadable image");
        return Ok(ImageCheck::default());
      }
    };

    let within_bounds = width.min(height) >= self.cfg.minimum_size && width.max(height) <= self.cfg.maximum_size;
    let is_valid = within_bounds && is_jpeg(file) && identifier != PictureIdentifier::NotSet;

    Ok(ImageCheck { is_valid, width, height })
  }

  async fn convert(&self, dir: &Path, file: &Path) -> Result<PathBuf, CoreError> {
    let cfg = self.cfg.clone();
    let (dir, file) = (dir.to_path_buf(), file.to_path_buf());
    tokio::task::spawn_blocking(move || convert_blocking(&cfg, &dir, &file))
      .await
      .map_err(|e| CoreError::Image(e.to_string()))?
  }
}
