//! Offline training: corpus → embeddings → sector bank → event impact model.
//!
//! Each stage saves its artifacts before the next starts. There is no resume:
//! a failure aborts the run, and rerunning starts over, though an existing
//! embedding cache skips the encoder entirely.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use ndarray::Array2;
use serde::Serialize;

use crate::config::ImpactConfig;
use crate::corpus::TrainingCorpus;
use crate::embedding::{self, cache, EmbeddingProvider};
use crate::error::PipelineError;
use crate::forest::ForestParams;
use crate::models::artifacts::{ArtifactLayout, TrainingManifest};
use crate::models::event_impact::{impact_labels, EventImpactModel};
use crate::models::sector_bank::SectorModelBank;
use crate::sector::Sector;

/// Progress through a training run; `ImpactTrained` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingStage {
    Loaded,
    Embedded,
    SectorsTrained,
    ImpactTrained,
}

impl std::fmt::Display for TrainingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Loaded => "loaded",
            Self::Embedded => "embedded",
            Self::SectorsTrained => "sectors_trained",
            Self::ImpactTrained => "impact_trained",
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub stage: TrainingStage,
    pub corpus_rows: usize,
    pub embedding_dim: usize,
    /// The corpus matrix came from the cache rather than the encoder.
    pub cache_hit: bool,
    pub trained_sectors: Vec<Sector>,
    pub unavailable_sectors: Vec<Sector>,
}

/// Something that can (re)build every artifact a predictor needs.
pub trait ArtifactBuilder: Send + Sync {
    fn build(&self) -> Result<TrainingReport>;
}

pub struct Trainer {
    corpus_path: PathBuf,
    layout: ArtifactLayout,
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    params: ForestParams,
}

impl Trainer {
    pub fn new(
        corpus_path: impl Into<PathBuf>,
        layout: ArtifactLayout,
        provider: Arc<dyn EmbeddingProvider>,
        batch_size: usize,
        params: ForestParams,
    ) -> Self {
        Self {
            corpus_path: corpus_path.into(),
            layout,
            provider,
            batch_size,
            params,
        }
    }

    pub fn from_config(config: &ImpactConfig, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self::new(
            config.resolved_corpus_path(),
            config.artifact_layout(),
            provider,
            config.embedding.batch_size,
            config.regressor.forest_params(),
        )
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// Run every stage and persist all artifacts.
    pub fn train(&self) -> Result<TrainingReport> {
        std::fs::create_dir_all(self.layout.model_dir()).with_context(|| {
            format!("failed to create model dir {}", self.layout.model_dir().display())
        })?;

        let corpus = TrainingCorpus::load(&self.corpus_path)?;
        advance(TrainingStage::Loaded, corpus.len());

        let (embeddings, cache_hit) = self.corpus_embeddings(&corpus)?;
        advance(TrainingStage::Embedded, embeddings.nrows());

        let bank = SectorModelBank::train(embeddings.view(), &corpus, &self.params)?;
        bank.save(&self.layout)?;
        advance(TrainingStage::SectorsTrained, bank.trained_sectors().len());

        let labels = impact_labels(embeddings.view(), &bank);
        let impact_model = EventImpactModel::train(embeddings.view(), &labels, &self.params)?;
        impact_model.save(&self.layout.impact_model())?;

        let manifest = TrainingManifest {
            trained_at: Utc::now(),
            corpus_rows: corpus.len(),
            embedding_dim: embeddings.ncols(),
            encoder: self.provider.name(),
            trained_sectors: bank.trained_sectors(),
            unavailable_sectors: bank.unavailable_sectors(),
        };
        manifest.save(&self.layout.manifest())?;
        advance(TrainingStage::ImpactTrained, labels.len());

        Ok(TrainingReport {
            stage: TrainingStage::ImpactTrained,
            corpus_rows: corpus.len(),
            embedding_dim: embeddings.ncols(),
            cache_hit,
            trained_sectors: manifest.trained_sectors,
            unavailable_sectors: manifest.unavailable_sectors,
        })
    }

    /// Cached matrix when the cache file exists, otherwise encode and save it.
    fn corpus_embeddings(&self, corpus: &TrainingCorpus) -> Result<(Array2<f32>, bool)> {
        let cache_path = self.layout.cache_file();
        if let Some(cached) = cache::load(cache_path)? {
            if cached.nrows() != corpus.len() {
                return Err(PipelineError::CacheShapeMismatch {
                    path: cache_path.to_path_buf(),
                    cached: cached.nrows(),
                    corpus: corpus.len(),
                }
                .into());
            }
            if cached.ncols() != self.provider.dimensions() {
                return Err(PipelineError::EncoderMismatch {
                    path: cache_path.to_path_buf(),
                    cached: cached.ncols(),
                    encoder: self.provider.dimensions(),
                }
                .into());
            }
            tracing::info!("using precomputed embeddings from cache");
            return Ok((cached, true));
        }

        tracing::info!(periods = corpus.len(), "generating corpus embeddings");
        let embeddings = embedding::embed_texts(self.provider.as_ref(), &corpus.texts(), self.batch_size)
            .context("failed to embed training corpus")?;
        cache::save(cache_path, &embeddings)?;
        Ok((embeddings, false))
    }
}

impl ArtifactBuilder for Trainer {
    fn build(&self) -> Result<TrainingReport> {
        self.train()
    }
}

fn advance(stage: TrainingStage, count: usize) {
    tracing::info!(stage = %stage, count, "training stage complete");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_are_ordered() {
        assert!(TrainingStage::Loaded < TrainingStage::Embedded);
        assert!(TrainingStage::Embedded < TrainingStage::SectorsTrained);
        assert!(TrainingStage::SectorsTrained < TrainingStage::ImpactTrained);
        assert_eq!(TrainingStage::SectorsTrained.to_string(), "sectors_trained");
    }
}
