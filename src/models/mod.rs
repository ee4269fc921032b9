//! Trained models and their on-disk artifacts.

pub mod artifacts;
pub mod event_impact;
pub mod sector_bank;

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Serialize `value` with bincode to `path` via a temp file and rename.
pub(crate) fn save_artifact<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("tmp");
    let file = File::create(&tmp_path)
        .with_context(|| format!("failed to create temp file: {}", tmp_path.display()))?;
    let mut writer = BufWriter::new(file);
    bincode::serialize_into(&mut writer, value)
        .with_context(|| format!("failed to encode {}", path.display()))?;
    writer.flush()?;
    drop(writer);
    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("failed to move artifact into place: {}", path.display()))?;
    Ok(())
}

/// Load a bincode artifact, or `None` when the file does not exist.
pub(crate) fn load_artifact<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let value = bincode::deserialize_from(BufReader::new(file))
        .with_context(|| format!("failed to decode {}", path.display()))?;
    Ok(Some(value))
}
