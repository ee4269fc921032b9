//! One forest per sector, all fitted on the same corpus embedding matrix.
//!
//! A sector without labels is [`SectorModel::Unavailable`] rather than an
//! error, and predicting with an unavailable (or failing) model yields `0.0`
//! after a warning. Prediction problems never abort a batch.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use ndarray::{ArrayView1, ArrayView2, Axis};
use thiserror::Error;

use super::artifacts::ArtifactLayout;
use super::{load_artifact, save_artifact};
use crate::corpus::TrainingCorpus;
use crate::forest::{ForestError, ForestParams, RandomForestRegressor};
use crate::sector::Sector;

/// Why a sector prediction fell back to zero.
#[derive(Debug, Error)]
pub enum ModelUnavailable {
    #[error("no trained model for sector {0}")]
    NotTrained(Sector),

    #[error("model for sector {sector} failed to predict: {source}")]
    PredictionFailed {
        sector: Sector,
        #[source]
        source: ForestError,
    },
}

#[derive(Debug, Clone)]
pub enum SectorModel {
    Trained(RandomForestRegressor),
    Unavailable,
}

impl SectorModel {
    pub fn is_trained(&self) -> bool {
        matches!(self, Self::Trained(_))
    }
}

/// Models for all eleven sectors, keyed in canonical order.
#[derive(Debug, Clone)]
pub struct SectorModelBank {
    models: BTreeMap<Sector, SectorModel>,
}

impl SectorModelBank {
    /// Fit a forest for every sector that has labels; row `i` of `embeddings`
    /// must embed period `i` of `corpus`. Each sector trains on the rows that
    /// carry a label for it.
    pub fn train(
        embeddings: ArrayView2<f32>,
        corpus: &TrainingCorpus,
        params: &ForestParams,
    ) -> Result<Self> {
        anyhow::ensure!(
            embeddings.nrows() == corpus.len(),
            "{} embedding rows for {} corpus periods",
            embeddings.nrows(),
            corpus.len()
        );

        let pb = ProgressBar::new(Sector::ALL.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  Training sector models {bar:40.cyan/blue} {pos}/{len} {msg}")
                .expect("valid template")
                .progress_chars("##-"),
        );

        let mut models = BTreeMap::new();
        for sector in Sector::ALL {
            pb.set_message(sector.as_str());
            let (rows, targets): (Vec<usize>, Vec<f64>) = corpus
                .labels_for(sector)
                .into_iter()
                .enumerate()
                .filter_map(|(i, label)| label.map(|y| (i, y)))
                .unzip();

            let model = if rows.is_empty() {
                tracing::warn!(sector = %sector, "no training data for sector");
                SectorModel::Unavailable
            } else {
                let x = embeddings.select(Axis(0), &rows);
                let forest = RandomForestRegressor::fit(params, x.view(), &targets)
                    .with_context(|| format!("failed to train model for sector {sector}"))?;
                tracing::info!(sector = %sector, rows = rows.len(), "trained sector model");
                SectorModel::Trained(forest)
            };
            models.insert(sector, model);
            pb.inc(1);
        }
        pb.finish_and_clear();

        Ok(Self { models })
    }

    pub fn from_models(mut models: BTreeMap<Sector, SectorModel>) -> Self {
        for sector in Sector::ALL {
            models.entry(sector).or_insert(SectorModel::Unavailable);
        }
        Self { models }
    }

    pub fn get(&self, sector: Sector) -> &SectorModel {
        self.models.get(&sector).unwrap_or(&SectorModel::Unavailable)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Sector, &SectorModel)> {
        self.models.iter().map(|(s, m)| (*s, m))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn trained_sectors(&self) -> Vec<Sector> {
        self.iter().filter(|(_, m)| m.is_trained()).map(|(s, _)| s).collect()
    }

    pub fn unavailable_sectors(&self) -> Vec<Sector> {
        self.iter().filter(|(_, m)| !m.is_trained()).map(|(s, _)| s).collect()
    }

    pub fn try_predict(&self, sector: Sector, embedding: ArrayView1<f32>) -> Result<f64, ModelUnavailable> {
        match self.get(sector) {
            SectorModel::Trained(forest) => forest
                .predict_one(embedding)
                .map_err(|source| ModelUnavailable::PredictionFailed { sector, source }),
            SectorModel::Unavailable => Err(ModelUnavailable::NotTrained(sector)),
        }
    }

    /// Fail-soft prediction: any [`ModelUnavailable`] is logged and becomes `0.0`.
    pub fn predict(&self, sector: Sector, embedding: ArrayView1<f32>) -> f64 {
        match self.try_predict(sector, embedding) {
            Ok(value) => value,
            Err(reason) => {
                tracing::warn!(sector = %sector, %reason, "sector prediction unavailable, using 0.0");
                0.0
            }
        }
    }

    /// Predictions for every sector, in canonical order.
    pub fn predict_all(&self, embedding: ArrayView1<f32>) -> BTreeMap<Sector, f64> {
        Sector::ALL
            .iter()
            .map(|&sector| (sector, self.predict(sector, embedding)))
            .collect()
    }

    /// Write one artifact per trained sector. Untrained sectors have no file.
    pub fn save(&self, layout: &ArtifactLayout) -> Result<()> {
        for (sector, model) in self.iter() {
            let path = layout.sector_model(sector);
            match model {
                SectorModel::Trained(forest) => {
                    save_artifact(&path, forest)?;
                    tracing::debug!(sector = %sector, path = %path.display(), "saved sector model");
                }
                SectorModel::Unavailable => {
                    if path.exists() {
                        std::fs::remove_file(&path).with_context(|| {
                            format!("failed to remove stale model {}", path.display())
                        })?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Load every sector; a missing file is `Unavailable`, a corrupt one is an error.
    pub fn load(layout: &ArtifactLayout) -> Result<Self> {
        let mut models = BTreeMap::new();
        for sector in Sector::ALL {
            let model = match load_artifact::<RandomForestRegressor>(&layout.sector_model(sector))? {
                Some(forest) => SectorModel::Trained(forest),
                None => {
                    tracing::warn!(sector = %sector, "model not found; predictions for this sector will be 0");
                    SectorModel::Unavailable
                }
            };
            models.insert(sector, model);
        }
        Ok(Self { models })
    }
}
