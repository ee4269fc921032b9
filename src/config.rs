use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::forest::ForestParams;
use crate::models::artifacts::ArtifactLayout;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ImpactConfig {
    pub logging: LoggingConfig,
    pub paths: PathsConfig,
    pub embedding: EmbeddingConfig,
    pub regressor: RegressorConfig,
    pub training: TrainingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PathsConfig {
    /// Labeled training corpus (JSON keyed by period).
    pub corpus: String,
    /// Headlines to score (CSV with a `Title` column).
    pub events_csv: String,
    pub model_dir: String,
    pub cache_file: String,
    pub result_file: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `"local"` (ONNX DistilBERT) or `"hashing"` (offline, deterministic).
    pub provider: String,
    pub model: String,
    /// Directory holding `model.onnx` and `tokenizer.json`.
    pub model_dir: String,
    pub batch_size: usize,
    pub max_seq_len: usize,
    pub hashing_dimensions: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RegressorConfig {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TrainingConfig {
    /// Train in-process when the predictor finds artifacts missing.
    pub auto_train: bool,
    /// Upper bound on on-demand training. `0` waits forever.
    pub timeout_secs: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let base = default_app_dir();
        Self {
            corpus: "data/articles/gdelt_headlines_cleaned_0.json".into(),
            events_csv: "data/articles/all_titles_99_deduplicated.csv".into(),
            model_dir: base.join("saved_models").to_string_lossy().into_owned(),
            cache_file: base
                .join("embeddings_cache.bin")
                .to_string_lossy()
                .into_owned(),
            result_file: "result.json".into(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let model_dir = default_app_dir()
            .join("encoder")
            .to_string_lossy()
            .into_owned();
        Self {
            provider: "local".into(),
            model: "distilbert-base-uncased".into(),
            model_dir,
            batch_size: 32,
            max_seq_len: 128,
            hashing_dimensions: 256,
        }
    }
}

impl Default for RegressorConfig {
    fn default() -> Self {
        let params = ForestParams::default();
        Self {
            n_trees: params.n_trees,
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            min_samples_leaf: params.min_samples_leaf,
            seed: params.seed,
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            auto_train: true,
            timeout_secs: 3600,
        }
    }
}

impl RegressorConfig {
    pub fn forest_params(&self) -> ForestParams {
        ForestParams {
            n_trees: self.n_trees,
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            seed: self.seed,
            ..ForestParams::default()
        }
    }
}

impl TrainingConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Returns `~/.sector-impact/`
pub fn default_app_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".sector-impact")
}

/// Returns the default config file path: `~/.sector-impact/config.toml`
pub fn default_config_path() -> PathBuf {
    default_app_dir().join("config.toml")
}

impl ImpactConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            ImpactConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SECTOR_IMPACT_LOG_LEVEL") {
            self.logging.log_level = val;
        }
        if let Ok(val) = std::env::var("SECTOR_IMPACT_CORPUS") {
            self.paths.corpus = val;
        }
        if let Ok(val) = std::env::var("SECTOR_IMPACT_MODEL_DIR") {
            self.paths.model_dir = val;
        }
        if let Ok(val) = std::env::var("SECTOR_IMPACT_CACHE") {
            self.paths.cache_file = val;
        }
        if let Ok(val) = std::env::var("SECTOR_IMPACT_PROVIDER") {
            self.embedding.provider = val;
        }
    }

    /// Artifact locations with `~` expanded.
    pub fn artifact_layout(&self) -> ArtifactLayout {
        ArtifactLayout::new(
            expand_tilde(&self.paths.model_dir),
            expand_tilde(&self.paths.cache_file),
        )
    }

    pub fn resolved_corpus_path(&self) -> PathBuf {
        expand_tilde(&self.paths.corpus)
    }

    pub fn resolved_events_csv(&self) -> PathBuf {
        expand_tilde(&self.paths.events_csv)
    }

    pub fn resolved_result_file(&self) -> PathBuf {
        expand_tilde(&self.paths.result_file)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
