//! Nombres deterministas para directorios de staging, canciones, imágenes y
//! sidecars. Las mismas entradas producen siempre el mismo nombre.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::{Album, PictureIdentifier, Song};
use crate::text::{collapse_whitespace, digit_count, hash_hex, title_case};

/// Caracteres que no pueden aparecer en un nombre de archivo en ningún SO.
const INVALID_FILE_NAME_CHARS: &[char] = &['\\', '"', '/', ':', '*', '$', '?', '\'', '<', '>', '|'];

static LEADING_NUMBER: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^\s*\d+\s*[-._)]?\s+").expect("valid leading number regex"));

/// Reemplaza caracteres inválidos por espacio y colapsa espacios.
pub fn sanitize_file_name(name: &str) -> String {
  let replaced: String =
    name.chars().map(|c| if INVALID_FILE_NAME_CHARS.contains(&c) || c.is_control() { ' ' } else { c }).collect();
  collapse_whitespace(&replaced).trim_end_matches('.').trim().to_string()
}

/// Si el nombre supera `max_len` caracteres se sustituye por un hash de su
/// contenido (conservando la extensión si se indica).
fn bounded(name: String, max_len: usize, extension: &str) -> String {
  if name.chars().count() <= max_len {
    return name;
  }
  format!("{}{}", hash_hex(name.as_bytes()), extension)
}

/// `"{Artista} - [{año}] {Título}"`, saneado.
pub fn album_directory_name(album: &Album, max_len: usize) -> String {
  let raw = format!(
    "{} - [{:04}] {}",
    album.artist.name,
    album.year().unwrap_or(0),
    album.title().unwrap_or_default()
  );
  bounded(sanitize_file_name(&raw), max_len, "")
}

/// `{artista}_{título}.{sufijo}` o `{hash}.{sufijo}` si es demasiado largo.
pub fn sidecar_file_name(album: &Album, suffix: &str, max_len: usize) -> String {
  let suffix = suffix.trim_start_matches('.');
  let stem = sanitize_file_name(&format!("{}_{}", album.artist.name, album.title().unwrap_or_default()));
  let name = format!("{stem}.{suffix}");
  if name.chars().count() <= max_len {
    return name;
  }
  format!("{}.{suffix}", hash_hex(stem.as_bytes()))
}

/// Título sin prefijo numérico (`"03 - Intro"` -> `"Intro"`).
pub fn strip_leading_number(title: &str) -> &str {
  match LEADING_NUMBER.find(title) {
    Some(m) if m.end() < title.len() => &title[m.end()..],
    _ => title,
  }
}

/// `"{NN} {Título}{ext}"`, con prefijo `"{disco}-"` cuando el disco es > 1.
///
/// El ancho del número es el de `song_total` (mínimo 2).
pub fn song_file_name(song: &Song, song_total: usize) -> String {
  let width = digit_count(song_total).max(2);
  let number = song.track_number().unwrap_or(0).max(0);
  let title = song.title().map(strip_leading_number).map(title_case).unwrap_or_else(|| "Untitled".to_string());

  let disc = song.disc_number();
  let prefix = if disc > 1 { format!("{disc}-") } else { String::new() };

  sanitize_file_name(&format!("{prefix}{number:0width$} {title}{}", song.extension()))
}

/// `i-{NN}-{Identificador}.jpg`, con `NN` rellenado al ancho de `max_images`.
pub fn image_file_name(index: usize, identifier: PictureIdentifier, max_images: usize) -> String {
  let width = digit_count(max_images).max(2);
  format!("i-{index:0width$}-{identifier}.jpg")
}
