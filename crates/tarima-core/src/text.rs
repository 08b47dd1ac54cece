//! Utilidades de texto compartidas por clasificación, nombres y validación.

use sha2::{Digest, Sha256};

/// Clave normalizada: mayúsculas y solo caracteres alfanuméricos.
pub fn normalize_key(s: &str) -> String {
  s.chars().filter(|c| c.is_alphanumeric()).flat_map(char::to_uppercase).collect()
}

/// Colapsa cualquier secuencia de espacios en uno solo y recorta extremos.
pub fn collapse_whitespace(s: &str) -> String {
  s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Pone en mayúscula la primera letra de cada palabra; el resto no se toca
/// para no romper siglas como "AC/DC".
pub fn title_case(s: &str) -> String {
  collapse_whitespace(s)
    .split(' ')
    .map(|word| {
      let mut chars = word.chars();
      match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
      }
    })
    .collect::<Vec<_>>()
    .join(" ")
}

/// SHA-256 del contenido en hexadecimal.
pub fn hash_hex(bytes: &[u8]) -> String {
  let mut hasher = Sha256::new();
  hasher.update(bytes);
  format!("{:x}", hasher.finalize())
}

/// Número de dígitos decimales de `n` (al menos 1).
pub fn digit_count(n: usize) -> usize {
  n.checked_ilog10().map(|d| d as usize + 1).unwrap_or(1)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normalize_strips_everything_but_alphanumerics() {
    assert_eq!(normalize_key("Original Soundtrack!"), "ORIGINALSOUNDTRACK");
    assert_eq!(normalize_key("  va  "), "VA");
  }

  #[test]
  fn title_case_keeps_inner_casing() {
    assert_eq!(title_case("back  in black"), "Back In Black");
    assert_eq!(title_case("AC/DC live"), "AC/DC Live");
  }

  #[test]
  fn digits() {
    assert_eq!(digit_count(0), 1);
    assert_eq!(digit_count(9), 1);
    assert_eq!(digit_count(10), 2);
    assert_eq!(digit_count(125), 3);
  }
}
