use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tarima_config::{CONFIG_BACKEND, ConfigBackend, ConfigError};

/// Reglas de normalización ("magic"), cada una con su interruptor.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct MagicConfig {
  pub enabled: bool,
  pub renumber_songs: bool,
  pub remove_featuring_from_song_artist: bool,
  pub remove_featuring_from_song_title: bool,
  pub replace_song_artist_separators: bool,
  pub set_year_to_current_if_invalid: bool,
  pub remove_unwanted_text_from_album_title: bool,
  pub remove_unwanted_text_from_song_titles: bool,
  pub replace_artist_names: bool,
}

impl Default for MagicConfig {
  fn default() -> Self {
    MagicConfig {
      enabled: true,
      renumber_songs: true,
      remove_featuring_from_song_artist: true,
      remove_featuring_from_song_title: true,
      replace_song_artist_separators: true,
      set_year_to_current_if_invalid: false,
      remove_unwanted_text_from_album_title: true,
      remove_unwanted_text_from_song_titles: true,
      replace_artist_names: true,
    }
  }
}

/// Sección `[pipeline]` de tarima.toml.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PipelineConfig {
  /// Longitud máxima del nombre del directorio de staging antes de usar un hash.
  #[serde(default = "default_max_name_length")]
  pub maximum_album_directory_name_length: usize,

  #[serde(default = "default_max_name_length")]
  pub maximum_sidecar_file_name_length: usize,

  /// Máximo de imágenes por álbum; también fija el ancho de la numeración.
  #[serde(default = "default_maximum_images_count")]
  pub maximum_images_count: usize,

  /// Máximo de álbumes *válidos* por ejecución; `None` = sin límite.
  #[serde(default)]
  pub maximum_processing_count: Option<usize>,

  #[serde(default = "default_true")]
  pub continue_on_directory_error: bool,

  /// Prefijo con el que se renombran los directorios descartados. Vacío
  /// desactiva el renombrado.
  #[serde(default = "default_skip_prefix")]
  pub skip_prefix: String,

  /// Mover (en vez de copiar) los archivos al staging.
  #[serde(default)]
  pub delete_original: bool,

  #[serde(default = "default_minimum_valid_year")]
  pub minimum_valid_year: i32,

  /// Año máximo válido; si falta, el año actual + 1.
  #[serde(default)]
  pub maximum_valid_year: Option<i32>,

  #[serde(default = "default_maximum_song_number")]
  pub maximum_song_number: i32,

  /// Un artista sin id del buscador externo deja el álbum inválido.
  #[serde(default = "default_true")]
  pub require_known_artist: bool,

  #[serde(default = "default_sidecar_suffix")]
  pub sidecar_suffix: String,

  /// Nombre canónico -> variantes que se reemplazan por él.
  #[serde(default)]
  pub artist_name_replacements: BTreeMap<String, Vec<String>>,

  #[serde(default)]
  pub magic: MagicConfig,
}

fn default_max_name_length() -> usize {
  200
}

fn default_maximum_images_count() -> usize {
  25
}

fn default_true() -> bool {
  true
}

fn default_skip_prefix() -> String {
  "_skipped_".into()
}

fn default_minimum_valid_year() -> i32 {
  1860
}

fn default_maximum_song_number() -> i32 {
  999
}

fn default_sidecar_suffix() -> String {
  "tarima.json".into()
}

impl Default for PipelineConfig {
  fn default() -> Self {
    PipelineConfig {
      maximum_album_directory_name_length: default_max_name_length(),
      maximum_sidecar_file_name_length: default_max_name_length(),
      maximum_images_count: default_maximum_images_count(),
      maximum_processing_count: None,
      continue_on_directory_error: true,
      skip_prefix: default_skip_prefix(),
      delete_original: false,
      minimum_valid_year: default_minimum_valid_year(),
      maximum_valid_year: None,
      maximum_song_number: default_maximum_song_number(),
      require_known_artist: true,
      sidecar_suffix: default_sidecar_suffix(),
      artist_name_replacements: BTreeMap::new(),
      magic: MagicConfig::default(),
    }
  }
}

impl PipelineConfig {
  pub fn load() -> Result<Self, ConfigError> {
    Self::load_from(&*CONFIG_BACKEND)
  }

  pub fn load_from<B: ConfigBackend>(backend: &B) -> Result<Self, ConfigError> {
    let cfg: Self = backend.load_section_with_default("pipeline")?;
    cfg.check()?;
    Ok(cfg)
  }

  pub fn save(&self) -> Result<(), ConfigError> {
    CONFIG_BACKEND.save_section("pipeline", self)
  }

  fn check(&self) -> Result<(), ConfigError> {
    if self.maximum_images_count == 0 {
      return Err(ConfigError::Invalid { key: "pipeline.maximum_images_count".into(), reason: "must be > 0".into() });
    }
    if self.minimum_valid_year > self.max_year() {
      return Err(ConfigError::Invalid {
        key: "pipeline.minimum_valid_year".into(),
        reason: format!("{} is after maximum_valid_year {}", self.minimum_valid_year, self.max_year()),
      });
    }
    if self.sidecar_suffix.trim_start_matches('.').is_empty() {
      return Err(ConfigError::Invalid { key: "pipeline.sidecar_suffix".into(), reason: "must not be empty".into() });
    }
    Ok(())
  }

  pub fn max_year(&self) -> i32 {
    self.maximum_valid_year.unwrap_or_else(|| chrono::Utc::now().year() + 1)
  }

  pub fn is_valid_year(&self, year: Option<i32>) -> bool {
    year.is_some_and(|y| y >= self.minimum_valid_year && y <= self.max_year())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tarima_config::{TarimaPaths, TomlConfigBackend};
  use tempfile::tempdir;

  #[test]
  fn partial_section_keeps_defaults() {
    let tmp = tempdir().unwrap();
    let paths = TarimaPaths::at(tmp.path()).unwrap();
    std::fs::write(
      paths.config_file(),
      "[pipeline]\nmaximum_processing_count = 5\nskip_prefix = \"\"\n\n[pipeline.magic]\nrenumber_songs = false\n\n[pipeline.artist_name_replacements]\n\"AC/DC\" = [\"AC; DC\", \"AC-DC\"]\n",
    )
    .unwrap();

    let cfg = PipelineConfig::load_from(&TomlConfigBackend::new(paths)).unwrap();
    assert_eq!(cfg.maximum_processing_count, Some(5));
    assert!(cfg.skip_prefix.is_empty());
    assert!(!cfg.magic.renumber_songs);
    assert!(cfg.magic.enabled);
    assert_eq!(cfg.maximum_images_count, 25);
    assert_eq!(cfg.artist_name_replacements["AC/DC"].len(), 2);
  }

  #[test]
  fn inverted_year_bounds_are_rejected() {
    let tmp = tempdir().unwrap();
    let paths = TarimaPaths::at(tmp.path()).unwrap();
    std::fs::write(paths.config_file(), "[pipeline]\nminimum_valid_year = 2000\nmaximum_valid_year = 1990\n").unwrap();

    let err = PipelineConfig::load_from(&TomlConfigBackend::new(paths)).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { .. }));
  }

  #[test]
  fn year_window() {
    let cfg = PipelineConfig { maximum_valid_year: Some(2030), ..PipelineConfig::default() };
    assert!(cfg.is_valid_year(Some(1860)));
    assert!(cfg.is_valid_year(Some(2030)));
    assert!(!cfg.is_valid_year(Some(1859)));
    assert!(!cfg.is_valid_year(Some(2031)));
    assert!(!cfg.is_valid_year(None));
  }
}
