//! The `result.json` artifact consumed by report and chart renderers.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::event_impact::EventImpact;
use crate::sector::Sector;

/// A sector is growing when its prediction is strictly above this.
pub const GROWTH_THRESHOLD: f64 = 0.05;
/// A sector is declining when its prediction is at or below this.
pub const DECLINE_THRESHOLD: f64 = -0.05;
pub const TOP_EVENTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub sector_with_most_growth_potential: Sector,
    pub sector_with_least_growth_potential: Sector,
    pub growing_sectors: Vec<Sector>,
    pub declining_sectors: Vec<Sector>,
    pub top_5_events: Vec<EventImpact>,
    /// Every sector, rounded to 4 decimals.
    pub all_predictions: BTreeMap<Sector, f64>,
}

impl PredictionResult {
    /// Build the summary from raw (unrounded) sector predictions.
    ///
    /// Sectors missing from `predictions` count as `0.0`. Thresholds are
    /// applied before rounding.
    pub fn summarize(predictions: &BTreeMap<Sector, f64>, event_impacts: Vec<EventImpact>) -> Self {
        let values: Vec<(Sector, f64)> = Sector::ALL
            .iter()
            .map(|&s| (s, predictions.get(&s).copied().unwrap_or(0.0)))
            .collect();

        let mut ranked = values.clone();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        let growing_sectors = values
            .iter()
            .filter(|(_, v)| *v > GROWTH_THRESHOLD)
            .map(|(s, _)| *s)
            .collect();
        let declining_sectors = values
            .iter()
            .filter(|(_, v)| *v <= DECLINE_THRESHOLD)
            .map(|(s, _)| *s)
            .collect();

        let mut top_5_events = event_impacts;
        top_5_events.sort_by(|a, b| b.impact.total_cmp(&a.impact));
        top_5_events.truncate(TOP_EVENTS);

        Self {
            sector_with_most_growth_potential: ranked[0].0,
            sector_with_least_growth_potential: ranked[ranked.len() - 1].0,
            growing_sectors,
            declining_sectors,
            top_5_events,
            all_predictions: values.into_iter().map(|(s, v)| (s, round4(v))).collect(),
        }
    }

    /// Pretty-print to `path`, replacing any previous result.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write results to {}", path.display()))?;
        tracing::info!(path = %path.display(), "saved prediction result");
        Ok(())
    }
}

/// Round to 4 decimal places.
pub fn round4(value: f64) -> f64 {
    (value * 1e4).round() / 1e4
}
