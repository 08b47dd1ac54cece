use serde::{Deserialize, Serialize};
use tarima_config::{CONFIG_BACKEND, ConfigBackend, ConfigError};

/// Sección `[images]` de tarima.toml.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageConfig {
  /// Lado mínimo (px) para considerar válida una imagen.
  #[serde(default = "default_minimum_size")]
  pub minimum_size: u32,

  /// Lado máximo (px); las imágenes mayores se reducen al convertir.
  #[serde(default = "default_maximum_size")]
  pub maximum_size: u32,

  #[serde(default = "default_jpeg_quality")]
  pub jpeg_quality: u8,
}

fn default_minimum_size() -> u32 {
  300
}

fn default_maximum_size() -> u32 {
  1600
}

fn default_jpeg_quality() -> u8 {
  90
}

impl Default for ImageConfig {
  fn default() -> Self {
    Self {
      minimum_size: default_minimum_size(),
      maximum_size: default_maximum_size(),
      jpeg_quality: default_jpeg_quality(),
    }
  }
}

impl ImageConfig {
  pub fn load() -> Result<Self, ConfigError> {
    Self::load_from(&*CONFIG_BACKEND)
  }

  pub fn load_from<B: ConfigBackend>(backend: &B) -> Result<Self, ConfigError> {
    let cfg: Self = backend.load_section_with_default("images")?;
    if cfg.minimum_size > cfg.maximum_size {
      return Err(ConfigError::Invalid {
        key: "images.minimum_size".into(),
        reason: format!("{} is greater than maximum_size {}", cfg.minimum_size, cfg.maximum_size),
      });
    }
    Ok(cfg)
  }
}
