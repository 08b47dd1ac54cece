use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

/// Ruta temporal hermana: `nombre.ext` -> `nombre.ext.tmp`.
fn temp_path(path: &Path) -> PathBuf {
  let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
  name.push(".tmp");
  path.with_file_name(name)
}

/// Escritura atómica síncrona (archivo temporal + `rename`).
pub fn atomic_write_str(path: &Path, contents: &str) -> io::Result<()> {
  let tmp_path = temp_path(path);

  {
    let mut tmp_file = fs::File::create(&tmp_path)?;
    tmp_file.write_all(contents.as_bytes())?;
    tmp_file.sync_all()?;
  }

  fs::rename(&tmp_path, path)
}

/// Escritura atómica asíncrona. Crea los directorios padre si faltan.
pub async fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
  if let Some(parent) = path.parent() {
    tokio::fs::create_dir_all(parent).await?;
  }

  let tmp_path = temp_path(path);
  {
    let mut tmp_file = tokio::fs::File::create(&tmp_path).await?;
    tmp_file.write_all(contents).await?;
    tmp_file.sync_all().await?;
  }

  if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
    let _ = tokio::fs::remove_file(&tmp_path).await;
    return Err(e);
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  #[tokio::test]
  async fn atomic_write_replaces_content_and_leaves_no_temp() {
    let tmp = tempdir().unwrap();
    let target = tmp.path().join("nested/album.tarima.json");

    atomic_write(&target, b"first").await.unwrap();
    atomic_write(&target, b"second").await.unwrap();

    assert_eq!(std::fs::read(&target).unwrap(), b"second");
    assert!(!temp_path(&target).exists());
  }

  #[test]
  fn sync_variant_writes_file() {
    let tmp = tempdir().unwrap();
    let target = tmp.path().join("tarima.toml");

    atomic_write_str(&target, "a = 1\n").unwrap();
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "a = 1\n");
  }
}
