mod backend;
mod paths;

pub use backend::{ConfigBackend, TomlConfigBackend};
pub use paths::{ConfigError, TarimaPaths};

use once_cell::sync::Lazy;

// Rutas del proceso (portable vía TARIMA_BASE_DIR o del sistema).
pub static PATHS: Lazy<TarimaPaths> = Lazy::new(|| TarimaPaths::detect().expect("failed to init TarimaPaths"));

pub static CONFIG_BACKEND: Lazy<TomlConfigBackend> = Lazy::new(|| TomlConfigBackend::new(PATHS.clone()));
