//! Inference over a batch of current headlines.
//!
//! The predictor opens pre-built artifacts. When some are missing it can call
//! an injected [`ArtifactBuilder`] in-process, bounded by a timeout; without
//! one it fails with the list of missing paths.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use ndarray::{Array1, Array2, Axis};

use crate::embedding::{self, cache, EmbeddingProvider};
use crate::error::PipelineError;
use crate::models::artifacts::ArtifactLayout;
use crate::models::event_impact::{EventImpact, EventImpactModel};
use crate::models::sector_bank::SectorModelBank;
use crate::result::PredictionResult;
use crate::sector::Sector;
use crate::trainer::{ArtifactBuilder, TrainingReport};

/// Training to run when artifacts are missing, and how long to wait for it.
#[derive(Clone)]
pub struct TrainOnDemand {
    pub builder: Arc<dyn ArtifactBuilder>,
    /// `None` waits until training finishes.
    ///
    /// On timeout the build is not cancelled: its thread keeps writing into the
    /// model directory until it finishes. Calling [`Predictor::open`] again on
    /// the same layout before then puts two writers on the same files.
    pub timeout: Option<Duration>,
}

pub struct Predictor {
    bank: SectorModelBank,
    impact_model: Option<EventImpactModel>,
    provider: Arc<dyn EmbeddingProvider>,
    corpus_embeddings: Array2<f32>,
    batch_size: usize,
}

impl Predictor {
    /// Ensure artifacts exist (training on demand if allowed), then load them.
    pub fn open(
        layout: &ArtifactLayout,
        provider: Arc<dyn EmbeddingProvider>,
        batch_size: usize,
        on_demand: Option<TrainOnDemand>,
    ) -> Result<Self> {
        let missing = layout.missing_artifacts();
        if !missing.is_empty() {
            let Some(on_demand) = on_demand else {
                return Err(PipelineError::ArtifactsMissing(missing).into());
            };
            tracing::info!(
                missing = missing.len(),
                "models or embedding cache not found, training them now"
            );
            let report = run_builder(on_demand.builder, on_demand.timeout)?;
            tracing::info!(
                corpus_rows = report.corpus_rows,
                trained = report.trained_sectors.len(),
                "on-demand training finished"
            );
        }

        let bank = SectorModelBank::load(layout)?;
        let impact_model = EventImpactModel::load(&layout.impact_model())?;
        if impact_model.is_none() {
            tracing::warn!("event impact model not found; event impacts will not be calculated");
        }

        let corpus_embeddings = cache::load(layout.cache_file())?.ok_or_else(|| {
            PipelineError::ArtifactsMissing(vec![layout.cache_file().to_path_buf()])
        })?;
        if corpus_embeddings.ncols() != provider.dimensions() {
            return Err(PipelineError::EncoderMismatch {
                path: layout.cache_file().to_path_buf(),
                cached: corpus_embeddings.ncols(),
                encoder: provider.dimensions(),
            }
            .into());
        }

        Ok(Self {
            bank,
            impact_model,
            provider,
            corpus_embeddings,
            batch_size,
        })
    }

    /// Assemble a predictor from already-loaded parts.
    pub fn from_parts(
        bank: SectorModelBank,
        impact_model: Option<EventImpactModel>,
        provider: Arc<dyn EmbeddingProvider>,
        corpus_embeddings: Array2<f32>,
        batch_size: usize,
    ) -> Self {
        Self {
            bank,
            impact_model,
            provider,
            corpus_embeddings,
            batch_size,
        }
    }

    pub fn bank(&self) -> &SectorModelBank {
        &self.bank
    }

    /// Number of training periods behind the loaded models.
    pub fn corpus_rows(&self) -> usize {
        self.corpus_embeddings.nrows()
    }

    fn embed(&self, events: &[String]) -> Result<Array2<f32>> {
        embedding::embed_texts(self.provider.as_ref(), events, self.batch_size)
            .context("failed to embed events")
    }

    /// Score each event with the event impact model, in input order.
    pub fn predict_event_impacts(&self, events: &[String]) -> Result<Vec<EventImpact>> {
        let model = self
            .impact_model
            .as_ref()
            .ok_or(PipelineError::ImpactModelMissing)?;
        let embeddings = self.embed(events)?;
        model.score_events(events, embeddings.view())
    }

    /// Sector predictions for one representative embedding.
    pub fn sector_predictions(&self, embedding: &Array1<f32>) -> BTreeMap<Sector, f64> {
        self.bank.predict_all(embedding.view())
    }

    /// Predict sector impact for the whole batch and rank its events.
    ///
    /// All events are embedded once; the sector models see the mean embedding,
    /// the event model sees each row.
    pub fn predict_impact(&self, events: &[String]) -> Result<PredictionResult> {
        if events.is_empty() {
            return Err(PipelineError::NoEvents.into());
        }
        let model = self
            .impact_model
            .as_ref()
            .ok_or(PipelineError::ImpactModelMissing)?;

        let embeddings = self.embed(events)?;
        let mean = embeddings
            .mean_axis(Axis(0))
            .context("cannot average an empty embedding batch")?;

        let predictions = self.sector_predictions(&mean);
        let event_impacts = model.score_events(events, embeddings.view())?;

        Ok(PredictionResult::summarize(&predictions, event_impacts))
    }

    /// [`predict_impact`](Self::predict_impact) and overwrite `path` with the result.
    pub fn predict_and_save(&self, events: &[String], path: &Path) -> Result<PredictionResult> {
        let result = self.predict_impact(events)?;
        result.write_json(path)?;
        Ok(result)
    }
}

/// Run `builder` on a worker thread and wait at most `timeout` for it.
///
/// A timed-out build keeps running in the background; its output is ignored.
fn run_builder(builder: Arc<dyn ArtifactBuilder>, timeout: Option<Duration>) -> Result<TrainingReport> {
    let (tx, rx) = mpsc::channel();
    std::thread::Builder::new()
        .name("on-demand-training".into())
        .spawn(move || {
            let _ = tx.send(builder.build());
        })
        .context("failed to spawn training thread")?;

    let outcome = match timeout {
        Some(limit) => match rx.recv_timeout(limit) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => return Err(PipelineError::TrainingTimedOut(limit).into()),
            Err(RecvTimeoutError::Disconnected) => {
                return Err(PipelineError::TrainingFailed("training thread panicked".into()).into())
            }
        },
        None => rx
            .recv()
            .map_err(|_| PipelineError::TrainingFailed("training thread panicked".into()))?,
    };

    outcome.map_err(|err| PipelineError::TrainingFailed(format!("{err:#}")).into())
}
