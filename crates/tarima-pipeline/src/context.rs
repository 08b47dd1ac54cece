use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

/// Contexto de cancelación de una ejecución.
///
/// Junta los dos canales: la señal externa (`CancellationToken`) y la bandera
/// cooperativa que se levanta al alcanzar la cuota de álbumes válidos. Ninguno
/// interrumpe una operación en curso; se consultan al inicio de cada bucle y
/// antes de cada I/O.
#[derive(Debug)]
pub struct RunContext {
  cancel: CancellationToken,
  quota: Option<usize>,
  valid: AtomicUsize,
  stop: AtomicBool,
}

impl RunContext {
  pub fn new(cancel: CancellationToken, quota: Option<usize>) -> Self {
    Self { cancel, quota, valid: AtomicUsize::new(0), stop: AtomicBool::new(quota == Some(0)) }
  }

  pub fn unbounded() -> Self {
    Self::new(CancellationToken::new(), None)
  }

  pub fn is_cancelled(&self) -> bool {
    self.cancel.is_cancelled()
  }

  pub fn quota_reached(&self) -> bool {
    self.stop.load(Ordering::SeqCst)
  }

  pub fn should_stop(&self) -> bool {
    self.is_cancelled() || self.quota_reached()
  }

  /// Cuenta un álbum válido. Devuelve `true` si con él se alcanzó la cuota.
  pub fn record_valid(&self) -> bool {
    let count = self.valid.fetch_add(1, Ordering::SeqCst) + 1;
    match self.quota {
      Some(max) if count >= max => {
        self.stop.store(true, Ordering::SeqCst);
        true
      }
      _ => false,
    }
  }

  pub fn valid_count(&self) -> usize {
    self.valid.load(Ordering::SeqCst)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn quota_raises_stop_flag() {
    let ctx = RunContext::new(CancellationToken::new(), Some(2));
    assert!(!ctx.record_valid());
    assert!(!ctx.should_stop());
    assert!(ctx.record_valid());
    assert!(ctx.should_stop());
    assert!(!ctx.is_cancelled());
    assert_eq!(ctx.valid_count(), 2);
  }

  #[test]
  fn external_cancellation_is_independent() {
    let token = CancellationToken::new();
    let ctx = RunContext::new(token.clone(), None);
    token.cancel();
    assert!(ctx.should_stop());
    assert!(!ctx.quota_reached());
  }
}
