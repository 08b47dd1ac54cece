use thiserror::Error;

/// Error genérico del núcleo de Tarima.
///
/// Los colaboradores externos (plugins, buscadores, serializadores) lo
/// devuelven; el orquestador lo convierte en mensajes del `OperationResult`.
#[derive(Debug, Error)]
pub enum CoreError {
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("plugin error: {0}")]
  Plugin(String),

  #[error("serialization error: {0}")]
  Serialization(String),

  #[error("search error: {0}")]
  Search(String),

  #[error("image error: {0}")]
  Image(String),

  #[error("invalid argument: {0}")]
  InvalidArgument(String),

  #[error("not found")]
  NotFound,
}
