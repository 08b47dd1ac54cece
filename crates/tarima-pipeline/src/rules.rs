//! Patrones de texto compartidos por el validador y las reglas magic.

use once_cell::sync::Lazy;
use regex::Regex;

use tarima_core::text::collapse_whitespace;

/// Fragmentos "featuring": `ft.`, `feat.`, `featuring`, `(with ...)`.
///
/// `with` solo cuenta entre corchetes o paréntesis: suelto es demasiado
/// común en títulos ("Dance With Me").
pub static FEATURING: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?i)(\s[\(\[]*ft[\s\.]|\s*[\(\[]+with\s+|\s*[\(\[]*feat[\s\.]|[\(\[]*(featuring))+")
    .expect("valid featuring regex")
});

static SEPARATORS: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?i)\s+with\s+|\s*;\s*|\s*(&|\bft\b\.*|\bfeat\b\.?)\s*|\s+x\s+|\s*,\s*").expect("valid separators regex")
});

static UNWANTED_ALBUM_TITLE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(
    r"(?i)(\s*(-\s)*\bCD[_\-#\s]*[0-9]*)|(\s[\[\(]*(lp|ep|bonus|album|re-*issue|re-*master|re-*mastered|anniversary|single|cd|disc|deluxe|digipak|digipack|vinyl|japan(ese)*|asian|remastered|limited|ltd|expanded|(re)*-*edition|web|\(320\)|\(*compilation\)*)\b[\]\)]*)",
  )
  .expect("valid unwanted album title regex")
});

static UNWANTED_SONG_TITLE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?i)(\s{2,}|(\s\(prod\s))").expect("valid unwanted song title regex"));

static PRODUCER_FRAGMENT: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?i)\s*\(prod\.?\s[^)]*\)?").expect("valid producer fragment regex"));

pub fn has_featuring(input: &str) -> bool {
  !input.trim().is_empty() && FEATURING.is_match(input)
}

/// Normaliza separadores de varios artistas a `/`.
pub fn replace_separators(artist: &str) -> String {
  SEPARATORS.replace_all(artist, "/").trim().to_string()
}

/// Conserva el texto que sigue al fragmento "featuring", con los separadores
/// normalizados. `None` si no hay fragmento o no queda nada.
pub fn featured_artist(artist: &str) -> Option<String> {
  let m = FEATURING.find(artist)?;
  let rest = FEATURING.replace_all(&artist[m.start()..], "");
  let cleaned = replace_separators(&collapse_whitespace(&rest));
  let cleaned = cleaned.trim_end_matches([']', ')']).replace('"', "'").trim().to_string();
  (!cleaned.is_empty()).then_some(cleaned)
}

/// Título sin el fragmento "featuring" ni lo que le sigue.
pub fn title_without_featuring(title: &str) -> Option<String> {
  let m = FEATURING.find(title)?;
  let kept = title[..m.start()].trim_end_matches(|c: char| c.is_whitespace() || matches!(c, '(' | '[' | '-'));
  let kept = collapse_whitespace(kept);
  (!kept.is_empty()).then_some(kept)
}

pub fn album_title_has_unwanted_text(title: &str) -> bool {
  title.trim().is_empty() || UNWANTED_ALBUM_TITLE.is_match(title) || has_featuring(title)
}

pub fn remove_unwanted_album_text(title: &str) -> String {
  collapse_whitespace(&UNWANTED_ALBUM_TITLE.replace_all(title, ""))
}

/// Colapsa espacios y quita créditos de producción (`(prod. X)`).
pub fn remove_unwanted_song_text(title: &str) -> String {
  collapse_whitespace(&PRODUCER_FRAGMENT.replace_all(&collapse_whitespace(title), ""))
}

/// Título de canción vacío, con "featuring", con espacios dobles o créditos
/// de producción, igual a su número, o que empieza con su número.
pub fn song_has_unwanted_text(album_title: &str, song_title: Option<&str>, song_number: Option<i32>) -> bool {
  let Some(title) = song_title.filter(|t| !t.trim().is_empty()) else {
    return true;
  };
  if has_featuring(title) || UNWANTED_SONG_TITLE.is_match(title) {
    return true;
  }
  if !title.chars().any(|c| c.is_ascii_digit()) {
    return false;
  }

  let number = song_number.unwrap_or(0);
  if title.trim() == number.to_string() {
    return true;
  }

  let pattern = format!(r"^({}\s*.*\s*)?([0-9]*{number}\s)", regex::escape(album_title));
  match Regex::new(&pattern) {
    Ok(re) => re.is_match(title),
    Err(e) => {
      tracing::warn!(album_title, title, error = %e, "unable to build song number pattern");
      false
    }
  }
}
