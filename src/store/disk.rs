//! JSON file helpers with temp-file-then-rename writes

use anyhow::{Context, Result};
use serde::{Serialize, de::DeserializeOwned};
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Outcome of reading a JSON file that may legitimately be absent.
#[derive(Debug)]
pub enum JsonFile<T> {
    Missing,
    Corrupt(String),
    Loaded(T),
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> JsonFile<T> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return JsonFile::Missing,
        Err(e) => return JsonFile::Corrupt(format!("Failed to read {}: {e}", path.display())),
    };
    match serde_json::from_slice(&bytes) {
        Ok(value) => JsonFile::Loaded(value),
        Err(e) => JsonFile::Corrupt(format!("Failed to parse {}: {e}", path.display())),
    }
}

/// Serializes `value` into a sibling temp file, syncs it, then renames it over `path`.
///
/// Readers see either the previous file or the complete new one. If anything
/// fails before the rename the temp file is removed and `path` is untouched.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let mut temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, value)
            .with_context(|| format!("Failed to serialize data for {}", path.display()))?;
        writer.flush()?;
    }
    temp.as_file().sync_all()?;

    temp.persist(path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    debug!("Atomically wrote {}", path.display());
    Ok(())
}
