use std::{io::Write, path::Path};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

/// Replaces `path` with `text` in one step: readers see either the old file
/// or the complete new one.
pub fn write_atomic(path: &Path, text: &str) -> Result<()> {
  let dir = match path.parent() {
    Some(parent) if !parent.as_os_str().is_empty() => parent,
    _ => Path::new("."),
  };

  let mut file = NamedTempFile::new_in(dir).with_context(|| format!("tempfile in {dir:?}"))?;
  file.write_all(text.as_bytes()).context("write")?;
  file.persist(path).with_context(|| format!("persist {path:?}"))?;

  Ok(())
}
