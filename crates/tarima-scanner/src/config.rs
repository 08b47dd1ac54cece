use serde::{Deserialize, Serialize};
use std::time::Duration;
use tarima_config::{CONFIG_BACKEND, ConfigBackend, ConfigError};

/// Sección `[scanner]` de tarima.toml.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ScannerConfig {
  /// Edad máxima (segundos) de una entrada de caché antes de re-escanear.
  #[serde(default = "default_staleness_secs")]
  pub staleness_secs: u64,

  /// Número de directorios cacheados antes de desalojar.
  #[serde(default = "default_cache_capacity")]
  pub cache_capacity: usize,

  /// Fracción de entradas (las más antiguas) que se desalojan al llenarse.
  #[serde(default = "default_eviction_fraction")]
  pub eviction_fraction: f64,

  /// Sufijo que identifica a los sidecars (`<artista>_<título>.<sufijo>`).
  #[serde(default = "default_sidecar_suffix")]
  pub sidecar_suffix: String,

  /// Umbral del filtro "menos canciones de las configuradas".
  #[serde(default = "default_filter_song_count")]
  pub filter_less_than_song_count: usize,

  /// Umbral (ms) del filtro "menos duración de la configurada".
  #[serde(default = "default_filter_duration_ms")]
  pub filter_less_than_duration_ms: u64,
}

fn default_staleness_secs() -> u64 {
  30
}

fn default_cache_capacity() -> usize {
  1000
}

fn default_eviction_fraction() -> f64 {
  0.2
}

fn default_sidecar_suffix() -> String {
  "tarima.json".into()
}

fn default_filter_song_count() -> usize {
  3
}

fn default_filter_duration_ms() -> u64 {
  720_000
}

impl Default for ScannerConfig {
  fn default() -> Self {
    ScannerConfig {
      staleness_secs: default_staleness_secs(),
      cache_capacity: default_cache_capacity(),
      eviction_fraction: default_eviction_fraction(),
      sidecar_suffix: default_sidecar_suffix(),
      filter_less_than_song_count: default_filter_song_count(),
      filter_less_than_duration_ms: default_filter_duration_ms(),
    }
  }
}

impl ScannerConfig {
  pub fn load() -> Result<Self, ConfigError> {
    Self::load_from(&*CONFIG_BACKEND)
  }

  pub fn load_from<B: ConfigBackend>(backend: &B) -> Result<Self, ConfigError> {
    let cfg: Self = backend.load_section_with_default("scanner")?;
    if !(0.0..=1.0).contains(&cfg.eviction_fraction) {
      return Err(ConfigError::Invalid {
        key: "scanner.eviction_fraction".into(),
        reason: format!("{} is outside 0..=1", cfg.eviction_fraction),
      });
    }
    Ok(cfg)
  }

  pub fn save(&self) -> Result<(), ConfigError> {
    CONFIG_BACKEND.save_section("scanner", self)
  }

  pub fn staleness(&self) -> Duration {
    Duration::from_secs(self.staleness_secs)
  }
}
