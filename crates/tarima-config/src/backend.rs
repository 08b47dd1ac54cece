use crate::paths::{ConfigError, TarimaPaths};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::ErrorKind;

// La escritura usa toml_edit para conservar comentarios del usuario.
use toml_edit::{DocumentMut, Item};

/// Acceso por secciones a la configuración.
pub trait ConfigBackend {
  fn load_section<T: DeserializeOwned>(&self, section: &str) -> Result<T, ConfigError>;

  /// Como `load_section`, pero devuelve `T::default()` si falta el archivo o la sección.
  fn load_section_with_default<T: DeserializeOwned + Default>(&self, section: &str) -> Result<T, ConfigError>;

  fn save_section<T: Serialize>(&self, section: &str, value: &T) -> Result<(), ConfigError>;
}

pub struct TomlConfigBackend {
  paths: TarimaPaths,
}

impl TomlConfigBackend {
  pub fn new(paths: TarimaPaths) -> Self {
    Self { paths }
  }

  pub fn paths(&self) -> &TarimaPaths {
    &self.paths
  }

  /// Documento actual, o `None` si el archivo no existe.
  fn read_document(&self) -> Result<Option<toml::Value>, ConfigError> {
    match fs::read_to_string(self.paths.config_file()) {
      Ok(content) => Ok(Some(toml::from_str(&content)?)),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e.into()),
    }
  }
}

fn decode<T: DeserializeOwned>(section: &str, table: &toml::Value) -> Result<T, ConfigError> {
  table.clone().try_into().map_err(|e| ConfigError::Other(format!("decode section [{section}]: {e}")))
}

impl ConfigBackend for TomlConfigBackend {
  fn load_section<T: DeserializeOwned>(&self, section: &str) -> Result<T, ConfigError> {
    let path = self.paths.config_file();
    let doc = self
      .read_document()?
      .ok_or_else(|| ConfigError::Other(format!("config file {} not found", path.display())))?;

    let table = doc
      .get(section)
      .ok_or_else(|| ConfigError::Other(format!("missing section [{section}] in {}", path.display())))?;

    decode(section, table)
  }

  fn load_section_with_default<T>(&self, section: &str) -> Result<T, ConfigError>
  where
    T: DeserializeOwned + Default,
  {
    let Some(doc) = self.read_document()? else {
      tracing::debug!(section, "config file missing, using defaults");
      return Ok(T::default());
    };

    match doc.get(section) {
      Some(table) => decode(section, table),
      None => Ok(T::default()),
    }
  }

  fn save_section<T: Serialize>(&self, section: &str, value: &T) -> Result<(), ConfigError> {
    let path = self.paths.config_file();

    let mut doc: DocumentMut = match fs::read_to_string(&path) {
      Ok(content) => {
        content.parse::<DocumentMut>().map_err(|e| ConfigError::Other(format!("parse toml_edit doc: {e}")))?
      }
      Err(e) if e.kind() == ErrorKind::NotFound => DocumentMut::new(),
      Err(e) => return Err(e.into()),
    };

    // La sección serializada es un documento sin cabecera ("a = 1\nb = 2\n");
    // como Item pasa a ser la tabla completa de la sección.
    let section_str =
      toml::to_string(value).map_err(|e| ConfigError::Other(format!("encode section [{section}]: {e}")))?;
    let section_item: Item = section_str
      .parse::<DocumentMut>()
      .map_err(|e| ConfigError::Other(format!("parse section as doc: {e}")))?
      .into_item();

    doc[section] = section_item;

    tarima_fs::atomic_write_str(&path, &doc.to_string())?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde::Deserialize;
  use tempfile::tempdir;

  #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
  struct Sample {
    #[serde(default)]
    limit: u32,
    #[serde(default)]
    prefix: String,
  }

  #[test]
  fn missing_file_or_section_yields_default() {
    let tmp = tempdir().unwrap();
    let backend = TomlConfigBackend::new(TarimaPaths::at(tmp.path()).unwrap());

    let sample: Sample = backend.load_section_with_default("pipeline").unwrap();
    assert_eq!(sample, Sample::default());
    assert!(backend.load_section::<Sample>("pipeline").is_err());
  }

  #[test]
  fn save_preserves_comments_and_other_sections() {
    let tmp = tempdir().unwrap();
    let paths = TarimaPaths::at(tmp.path()).unwrap();
    std::fs::write(paths.config_file(), "# user notes\n[scanner]\nstaleness_secs = 10\n").unwrap();
    let backend = TomlConfigBackend::new(paths.clone());

    backend.save_section("pipeline", &Sample { limit: 5, prefix: "_skip_".into() }).unwrap();

    let written = std::fs::read_to_string(paths.config_file()).unwrap();
    assert!(written.contains("# user notes"));
    assert!(written.contains("staleness_secs = 10"));

    let loaded: Sample = backend.load_section("pipeline").unwrap();
    assert_eq!(loaded, Sample { limit: 5, prefix: "_skip_".into() });
  }
}
