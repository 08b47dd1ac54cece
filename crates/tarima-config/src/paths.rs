use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
  #[error("toml error: {0}")]
  Toml(#[from] toml::de::Error),
  #[error("directories error: could not determine home directory")]
  Directories,
  #[error("invalid value for {key}: {reason}")]
  Invalid { key: String, reason: String },
  #[error("other: {0}")]
  Other(String),
}

/// Directorios de trabajo de Tarima.
#[derive(Debug, Clone)]
pub struct TarimaPaths {
  pub base_dir: PathBuf,
  pub config_dir: PathBuf,
  pub data_dir: PathBuf,
  pub cache_dir: PathBuf,
}

impl TarimaPaths {
  /// Layout portable bajo `base`: `config/`, `data/`, `cache/`.
  pub fn at(base: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let base = base.as_ref().to_path_buf();
    let paths = Self {
      config_dir: base.join("config"),
      data_dir: base.join("data"),
      cache_dir: base.join("cache"),
      base_dir: base,
    };
    paths.ensure()?;
    Ok(paths)
  }

  /// `TARIMA_BASE_DIR` si está definida; si no, los directorios del sistema.
  pub fn detect() -> Result<Self, ConfigError> {
    if let Ok(env_base) = std::env::var("TARIMA_BASE_DIR") {
      return Self::at(env_base);
    }

    let proj_dirs = ProjectDirs::from("com", "tarima", "tarima").ok_or(ConfigError::Directories)?;
    let paths = Self {
      base_dir: proj_dirs.config_dir().to_path_buf(),
      config_dir: proj_dirs.config_dir().to_path_buf(),
      data_dir: proj_dirs.data_dir().to_path_buf(),
      cache_dir: proj_dirs.cache_dir().to_path_buf(),
    };
    paths.ensure()?;
    Ok(paths)
  }

  fn ensure(&self) -> Result<(), ConfigError> {
    std::fs::create_dir_all(&self.config_dir)?;
    std::fs::create_dir_all(&self.data_dir)?;
    std::fs::create_dir_all(&self.cache_dir)?;
    Ok(())
  }

  pub fn config_file(&self) -> PathBuf {
    self.config_dir.join("tarima.toml")
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  struct EnvVarGuard {
    key: String,
    original: Option<String>,
  }

  impl EnvVarGuard {
    fn new(key: &str, value: &str) -> Self {
      let original = std::env::var(key).ok();
      unsafe { std::env::set_var(key, value) };
      EnvVarGuard { key: key.to_owned(), original }
    }
  }

  impl Drop for EnvVarGuard {
    fn drop(&mut self) {
      match &self.original {
        Some(val) => unsafe { std::env::set_var(&self.key, val) },
        None => unsafe { std::env::remove_var(&self.key) },
      }
    }
  }

  #[test]
  fn base_dir_override_creates_layout() {
    let tmp = tempdir().unwrap();
    let _env = EnvVarGuard::new("TARIMA_BASE_DIR", tmp.path().to_str().unwrap());

    let paths = TarimaPaths::detect().unwrap();

    assert_eq!(paths.base_dir, tmp.path());
    assert_eq!(paths.config_file(), tmp.path().join("config").join("tarima.toml"));
    assert!(paths.config_dir.exists());
    assert!(paths.data_dir.exists());
    assert!(paths.cache_dir.exists());
  }
}
