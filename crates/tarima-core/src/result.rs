use serde::Serialize;
use std::fmt::Display;

/// Sobre de resultado de las operaciones públicas.
///
/// Los fallos recuperables viajan en `errors` en lugar de propagarse como
/// `Err`, para que quien llama pueda contar éxitos y fallos de un lote.
#[derive(Debug, Clone, Serialize)]
pub struct OperationResult<T> {
  pub data: T,
  pub messages: Vec<String>,
  pub errors: Vec<String>,
}

impl<T> OperationResult<T> {
  pub fn ok(data: T) -> Self {
    Self { data, messages: Vec::new(), errors: Vec::new() }
  }

  pub fn failed(data: T, error: impl Display) -> Self {
    Self { data, messages: Vec::new(), errors: vec![error.to_string()] }
  }

  pub fn is_success(&self) -> bool {
    self.errors.is_empty()
  }

  pub fn push_message(&mut self, message: impl Into<String>) {
    self.messages.push(message.into());
  }

  pub fn push_error(&mut self, error: impl Display) {
    self.errors.push(error.to_string());
  }

  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> OperationResult<U> {
    OperationResult { data: f(self.data), messages: self.messages, errors: self.errors }
  }
}

impl<T: Default> Default for OperationResult<T> {
  fn default() -> Self {
    Self::ok(T::default())
  }
}
