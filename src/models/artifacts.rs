//! Where every artifact lives, and the manifest that describes a training run.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sector::Sector;

const MANIFEST_FILE: &str = "manifest.json";
const IMPACT_MODEL_FILE: &str = "event_impact_model.bin";

/// File names for the model directory and the embedding cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    model_dir: PathBuf,
    cache_file: PathBuf,
}

impl ArtifactLayout {
    pub fn new(model_dir: impl Into<PathBuf>, cache_file: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            cache_file: cache_file.into(),
        }
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    pub fn cache_file(&self) -> &Path {
        &self.cache_file
    }

    /// `<model_dir>/<sector>_model.bin`
    pub fn sector_model(&self, sector: Sector) -> PathBuf {
        self.model_dir.join(format!("{}_model.bin", sector.as_str()))
    }

    pub fn impact_model(&self) -> PathBuf {
        self.model_dir.join(IMPACT_MODEL_FILE)
    }

    pub fn manifest(&self) -> PathBuf {
        self.model_dir.join(MANIFEST_FILE)
    }

    /// Artifacts a predictor needs that are not on disk.
    ///
    /// Sectors the manifest records as unavailable are expected to have no
    /// model file and are not reported. Without a manifest, every sector
    /// model counts as required.
    pub fn missing_artifacts(&self) -> Vec<PathBuf> {
        let manifest = TrainingManifest::load(&self.manifest()).ok().flatten();

        let mut required = Vec::new();
        match &manifest {
            Some(m) => required.extend(m.trained_sectors.iter().map(|&s| self.sector_model(s))),
            None => {
                required.push(self.manifest());
                required.extend(Sector::ALL.iter().map(|&s| self.sector_model(s)));
            }
        }
        required.push(self.impact_model());
        required.push(self.cache_file.clone());

        required.into_iter().filter(|p| !p.exists()).collect()
    }
}

/// Summary of a training run, written next to the models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingManifest {
    pub trained_at: DateTime<Utc>,
    pub corpus_rows: usize,
    pub embedding_dim: usize,
    pub encoder: String,
    pub trained_sectors: Vec<Sector>,
    pub unavailable_sectors: Vec<Sector>,
}

impl TrainingManifest {
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest {}", path.display()))?;
        let manifest = serde_json::from_str(&json)
            .with_context(|| format!("failed to parse manifest {}", path.display()))?;
        Ok(Some(manifest))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write manifest {}", path.display()))
    }
}
