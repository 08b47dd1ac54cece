use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
  /// Falta la raíz de origen o la de staging; la ejecución no empieza.
  #[error("structural error: {0}")]
  Structural(String),

  #[error("config error: {0}")]
  Config(#[from] tarima_config::ConfigError),

  #[error(transparent)]
  Core(#[from] tarima_core::CoreError),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("directory {dir} aborted: {reason}")]
  DirectoryAborted { dir: PathBuf, reason: String },
}
