//! Training corpus and inference input loading.
//!
//! The training unit is a period (e.g. a month): all of its headlines joined
//! into one text, labelled with that period's historical sector impacts.
//! Inference instead scores individual headlines read from a CSV.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::error::PipelineError;
use crate::sector::Sector;

/// One period of the training corpus.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodRecord {
    pub period: String,
    /// The period's events joined with single spaces.
    pub text: String,
    pub labels: BTreeMap<Sector, f64>,
}

#[derive(Debug, Clone, Default)]
pub struct TrainingCorpus {
    records: Vec<PeriodRecord>,
}

impl TrainingCorpus {
    /// Read the JSON corpus, keeping periods in file order.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PipelineError::CorpusNotFound(path.to_path_buf()).into());
        }
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read corpus file: {}", path.display()))?;
        let corpus = Self::from_json(&json)
            .with_context(|| format!("failed to parse corpus: {}", path.display()))?;

        tracing::info!(path = %path.display(), periods = corpus.len(), "loaded training corpus");
        Ok(corpus)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let raw: serde_json::Map<String, Value> =
            serde_json::from_str(json).context("corpus must be a JSON object keyed by period")?;

        let records: Vec<PeriodRecord> = raw
            .into_iter()
            .map(|(period, data)| parse_period(period, &data))
            .collect();

        if records.is_empty() {
            return Err(PipelineError::NoEventData.into());
        }
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[PeriodRecord] {
        &self.records
    }

    /// Period texts in corpus order; row `i` of the embedding matrix embeds `texts()[i]`.
    pub fn texts(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.text.as_str()).collect()
    }

    /// Per-row target for `sector`; `None` where a period has no value.
    pub fn labels_for(&self, sector: Sector) -> Vec<Option<f64>> {
        self.records
            .iter()
            .map(|r| r.labels.get(&sector).copied())
            .collect()
    }

    /// Whether any period carries a label for `sector`.
    pub fn has_labels(&self, sector: Sector) -> bool {
        self.records.iter().any(|r| r.labels.contains_key(&sector))
    }
}

fn parse_period(period: String, data: &Value) -> PeriodRecord {
    let Value::Object(fields) = data else {
        return PeriodRecord {
            period,
            text: String::new(),
            labels: BTreeMap::new(),
        };
    };

    let text = match fields.get("events") {
        Some(Value::Array(events)) => events
            .iter()
            .map(|e| match e {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" "),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    let labels = Sector::ALL
        .iter()
        .filter_map(|&sector| {
            fields
                .get(sector.as_str())
                .and_then(Value::as_f64)
                .map(|v| (sector, v))
        })
        .collect();

    PeriodRecord {
        period,
        text,
        labels,
    }
}

/// Headlines from the `Title` column of a CSV, in file order, blanks dropped.
pub fn load_events_from_csv(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("CSV file not found at: {}", path.display()))?;

    let headers = reader.headers().context("failed to read CSV header")?;
    let title_idx = headers
        .iter()
        .position(|h| h.trim() == "Title")
        .ok_or_else(|| PipelineError::MissingTitleColumn(path.to_path_buf()))?;

    let mut events = Vec::new();
    for result in reader.records() {
        let record = result.context("malformed CSV row")?;
        if let Some(title) = record.get(title_idx).map(str::trim) {
            if !title.is_empty() {
                events.push(title.to_string());
            }
        }
    }

    tracing::info!(path = %path.display(), events = events.len(), "loaded events from CSV");
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn periods_keep_file_order_and_join_events() {
        let corpus = TrainingCorpus::from_json(
            r#"{
                "2024-02": {"events": ["Oil spikes", "OPEC cuts"], "energy": 0.07},
                "2024-01": {"events": ["Fed raises rates"], "energy": -0.1, "utilities": 0.03}
            }"#,
        )
        .unwrap();

        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.records()[0].period, "2024-02");
        assert_eq!(corpus.texts(), vec!["Oil spikes OPEC cuts", "Fed raises rates"]);
        assert_eq!(corpus.labels_for(Sector::Energy), vec![Some(0.07), Some(-0.1)]);
        assert_eq!(corpus.labels_for(Sector::Utilities), vec![None, Some(0.03)]);
        assert!(!corpus.has_labels(Sector::Financials));
    }

    #[test]
    fn odd_entries_degrade_to_empty_rows() {
        let corpus = TrainingCorpus::from_json(
            r#"{
                "2023-11": "not an object",
                "2023-12": {"energy": 0.02, "unknown_sector": 1.0},
                "2024-01": {"events": "single string", "financials": "n/a"}
            }"#,
        )
        .unwrap();

        let records = corpus.records();
        assert_eq!(records[0].text, "");
        assert!(records[0].labels.is_empty());
        assert_eq!(records[1].text, "");
        assert_eq!(records[1].labels.len(), 1);
        assert_eq!(records[2].text, "single string");
        assert!(records[2].labels.is_empty());
    }

    #[test]
    fn empty_corpus_has_no_event_data() {
        let err = TrainingCorpus::from_json("{}").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::NoEventData)
        ));
    }

    #[test]
    fn missing_corpus_file() {
        let tmp = TempDir::new().unwrap();
        let err = TrainingCorpus::load(&tmp.path().join("nope.json")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::CorpusNotFound(_))
        ));
    }

    #[test]
    fn csv_titles_skip_blanks() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("titles.csv");
        std::fs::write(
            &path,
            "Source,Title\nreuters,Oil prices spike\nap,\nbloomberg,\"Fed holds, signals cuts\"\n",
        )
        .unwrap();

        let events = load_events_from_csv(&path).unwrap();
        assert_eq!(events, vec!["Oil prices spike", "Fed holds, signals cuts"]);
    }

    #[test]
    fn csv_without_title_column() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("titles.csv");
        std::fs::write(&path, "Headline\nOil prices spike\n").unwrap();

        let err = load_events_from_csv(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::MissingTitleColumn(_))
        ));
    }
}
