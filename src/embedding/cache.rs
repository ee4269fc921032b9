//! Whole-corpus embedding cache.
//!
//! The file holds one matrix, row-aligned with the training corpus that
//! produced it. A readable file is trusted as-is: nothing checks that it still
//! matches the corpus, so delete it whenever the corpus changes.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use ndarray::Array2;

/// Load the cached matrix, or `None` when no cache file exists.
pub fn load(path: &Path) -> Result<Option<Array2<f32>>> {
    if !path.exists() {
        return Ok(None);
    }
    let file = File::open(path)
        .with_context(|| format!("failed to open embedding cache {}", path.display()))?;
    let matrix: Array2<f32> = bincode::deserialize_from(BufReader::new(file))
        .with_context(|| format!("failed to decode embedding cache {}", path.display()))?;

    tracing::info!(path = %path.display(), rows = matrix.nrows(), dims = matrix.ncols(), "loaded embedding cache");
    Ok(Some(matrix))
}

/// Write the matrix atomically (tmp + rename), creating parent directories.
pub fn save(path: &Path, matrix: &Array2<f32>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let tmp_path = path.with_extension("tmp");
    let file = File::create(&tmp_path)
        .with_context(|| format!("failed to create temp file: {}", tmp_path.display()))?;
    let mut writer = BufWriter::new(file);
    bincode::serialize_into(&mut writer, matrix).context("failed to encode embedding cache")?;
    writer.flush().context("failed to flush embedding cache")?;
    drop(writer);

    std::fs::rename(&tmp_path, path).context("failed to rename temp file")?;

    tracing::info!(path = %path.display(), rows = matrix.nrows(), dims = matrix.ncols(), "saved embedding cache");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_none() {
        let tmp = TempDir::new().unwrap();
        assert!(load(&tmp.path().join("absent.bin")).unwrap().is_none());
    }

    #[test]
    fn save_then_load_preserves_rows() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("cache.bin");
        let matrix = Array2::from_shape_fn((3, 4), |(i, j)| (i * 4 + j) as f32 * 0.5);

        save(&path, &matrix).unwrap();
        let loaded = load(&path).unwrap().unwrap();

        assert_eq!(loaded, matrix);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cache.bin");
        std::fs::write(&path, b"not a matrix").unwrap();
        assert!(load(&path).is_err());
    }
}
