//! Sidecar JSON: un archivo por directorio de álbum con el grafo completo
//! (álbum, canciones, imágenes, tags).

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use tarima_core::CoreError;
use tarima_core::domain::Album;
use tarima_core::ports::AlbumSerializer;

pub const SIDECAR_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct SidecarDocument<'a> {
  version: u32,
  album: Cow<'a, Album>,
}

/// Serializador JSON legible (pretty) del sidecar.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSidecarSerializer;

impl AlbumSerializer for JsonSidecarSerializer {
  fn serialize(&self, album: &Album) -> Result<Vec<u8>, CoreError> {
    let doc = SidecarDocument { version: SIDECAR_VERSION, album: Cow::Borrowed(album) };
    serde_json::to_vec_pretty(&doc).map_err(|e| CoreError::Serialization(e.to_string()))
  }

  fn deserialize(&self, bytes: &[u8]) -> Result<Album, CoreError> {
    let doc: SidecarDocument<'static> =
      serde_json::from_slice(bytes).map_err(|e| CoreError::Serialization(e.to_string()))?;

    if doc.version > SIDECAR_VERSION {
      return Err(CoreError::Serialization(format!(
        "sidecar version {} is newer than supported {SIDECAR_VERSION}",
        doc.version
      )));
    }

    Ok(doc.album.into_owned())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tarima_core::domain::{Artist, MetaTagIdentifier, Song, TagSet};

  #[test]
  fn reads_back_what_it_writes() {
    let song = Song::new("01 Intro.mp3", TagSet::from_pairs([(MetaTagIdentifier::Title, "Intro")]));
    let album = Album::new(
      Artist::new("Boards of Canada"),
      TagSet::from_pairs([(MetaTagIdentifier::Album, "Geogaddi")]),
      vec![song],
      "/in/boc",
    );

    let serializer = JsonSidecarSerializer;
    let bytes = serializer.serialize(&album).unwrap();
    let text = String::from_utf8(bytes.clone()).unwrap();
    assert!(text.contains("\"version\": 1"));

    let back = serializer.deserialize(&bytes).unwrap();
    assert_eq!(back, album);
  }

  #[test]
  fn rejects_garbage_and_future_versions() {
    let serializer = JsonSidecarSerializer;
    assert!(serializer.deserialize(b"not json").is_err());

    let album = Album::new(Artist::new("X"), TagSet::new(), vec![], "/in");
    let future = serde_json::json!({ "version": 99, "album": album });
    let err = serializer.deserialize(future.to_string().as_bytes()).unwrap_err();
    assert!(err.to_string().contains("newer than supported"));
  }
}
