//! Event impact model: how far one event moves the sector consensus.
//!
//! Training labels come from a leave-one-out probe. For event `i`, every
//! trained sector model scores both `e_i` and the mean of all other rows; the
//! label is the mean absolute gap over the models that answered. A forest is
//! then fitted from raw embedding to that label.

use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use ndarray::{Array1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use super::load_artifact;
use super::save_artifact;
use super::sector_bank::{SectorModel, SectorModelBank};
use crate::forest::{ForestParams, RandomForestRegressor};

/// One scored headline, as written to `top_5_events`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventImpact {
    pub event: String,
    pub impact: f64,
}

/// Leave-one-out sensitivity label for every row of `embeddings`.
///
/// With fewer than two rows there is no context vector and every label is `0.0`.
pub fn impact_labels(embeddings: ArrayView2<f32>, bank: &SectorModelBank) -> Vec<f64> {
    let n = embeddings.nrows();
    if n < 2 {
        return vec![0.0; n];
    }

    let column_sum: Array1<f64> = embeddings.mapv(f64::from).sum_axis(Axis(0));
    let forests: Vec<_> = bank
        .iter()
        .filter_map(|(sector, model)| match model {
            SectorModel::Trained(forest) => Some((sector, forest)),
            SectorModel::Unavailable => None,
        })
        .collect();

    let pb = ProgressBar::new(n as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  Calculating event impacts {bar:40.cyan/blue} {pos}/{len} ({eta})")
            .expect("valid template")
            .progress_chars("##-"),
    );

    let mut labels = Vec::with_capacity(n);
    for row in embeddings.rows() {
        let context: Array1<f32> = column_sum
            .iter()
            .zip(row.iter())
            .map(|(&total, &own)| ((total - f64::from(own)) / (n - 1) as f64) as f32)
            .collect();

        let mut total_gap = 0.0;
        let mut answered = 0usize;
        for (sector, forest) in &forests {
            match (forest.predict_one(row), forest.predict_one(context.view())) {
                (Ok(own), Ok(others)) => {
                    total_gap += (own - others).abs();
                    answered += 1;
                }
                (Err(err), _) | (_, Err(err)) => {
                    tracing::warn!(sector = %sector, %err, "skipping sector in impact probe");
                }
            }
        }

        labels.push(if answered > 0 {
            total_gap / answered as f64
        } else {
            0.0
        });
        pb.inc(1);
    }
    pb.finish_and_clear();

    labels
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventImpactModel {
    forest: RandomForestRegressor,
}

impl EventImpactModel {
    pub fn train(embeddings: ArrayView2<f32>, labels: &[f64], params: &ForestParams) -> Result<Self> {
        let forest = RandomForestRegressor::fit(params, embeddings, labels)
            .context("failed to train event impact model")?;
        tracing::info!(rows = embeddings.nrows(), "trained event impact model");
        Ok(Self { forest })
    }

    /// Raw impact per row.
    pub fn predict(&self, embeddings: ArrayView2<f32>) -> Result<Vec<f64>> {
        Ok(self.forest.predict(embeddings)?)
    }

    /// Pair each event with its impact rounded to 4 decimals, in input order.
    pub fn score_events<S: AsRef<str>>(
        &self,
        events: &[S],
        embeddings: ArrayView2<f32>,
    ) -> Result<Vec<EventImpact>> {
        anyhow::ensure!(
            events.len() == embeddings.nrows(),
            "{} events but {} embedding rows",
            events.len(),
            embeddings.nrows()
        );
        let impacts = self.predict(embeddings)?;
        Ok(events
            .iter()
            .zip(impacts)
            .map(|(event, impact)| EventImpact {
                event: event.as_ref().to_string(),
                impact: crate::result::round4(impact),
            })
            .collect())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_artifact(path, self)?;
        tracing::info!(path = %path.display(), "saved event impact model");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Option<Self>> {
        load_artifact(path)
    }
}
