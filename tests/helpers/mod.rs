#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use sector_impact::embedding::hashing::HashingEmbeddingProvider;
use sector_impact::embedding::EmbeddingProvider;
use sector_impact::forest::ForestParams;
use sector_impact::models::artifacts::ArtifactLayout;
use sector_impact::Trainer;
use tempfile::TempDir;

pub const DIMS: usize = 32;

/// Corpus from the single-period scenario: only energy and utilities are labelled.
pub const SINGLE_PERIOD_CORPUS: &str =
    r#"{"2024-01": {"events": ["Fed raises rates"], "energy": -0.1, "utilities": 0.03}}"#;

/// Six periods with labels for four sectors.
pub const MULTI_PERIOD_CORPUS: &str = r#"{
    "2024-01": {"events": ["Fed raises rates", "Bond yields climb"], "energy": -0.1, "financials": 0.08, "utilities": -0.06, "information_technology": -0.04},
    "2024-02": {"events": ["Oil prices spike", "OPEC cuts output"], "energy": 0.15, "financials": 0.01, "utilities": 0.02, "information_technology": -0.02},
    "2024-03": {"events": ["Chipmaker beats earnings", "AI demand surges"], "energy": 0.0, "financials": 0.02, "utilities": 0.01, "information_technology": 0.12},
    "2024-04": {"events": ["Oil prices slump", "Mild winter cuts demand"], "energy": -0.18, "financials": 0.0, "utilities": -0.03, "information_technology": 0.01},
    "2024-05": {"events": ["Fed signals cuts", "Mortgage rates fall"], "energy": 0.03, "financials": -0.07, "utilities": 0.09, "information_technology": 0.06},
    "2024-06": {"events": ["Chip export ban widens"], "energy": 0.01, "financials": -0.01, "utilities": 0.0, "information_technology": -0.11}
}"#;

/// Hashing encoder that counts how often it is asked to embed.
pub struct CountingProvider {
    inner: HashingEmbeddingProvider,
    calls: AtomicUsize,
    texts: AtomicUsize,
}

impl CountingProvider {
    pub fn new(dims: usize) -> Arc<Self> {
        Arc::new(Self {
            inner: HashingEmbeddingProvider::new(dims),
            calls: AtomicUsize::new(0),
            texts: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn texts(&self) -> usize {
        self.texts.load(Ordering::SeqCst)
    }
}

impl EmbeddingProvider for CountingProvider {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.fetch_add(texts.len(), Ordering::SeqCst);
        self.inner.embed_batch(texts)
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn name(&self) -> String {
        self.inner.name()
    }
}

pub fn fast_params() -> ForestParams {
    ForestParams {
        n_trees: 10,
        ..ForestParams::default()
    }
}

pub fn layout(tmp: &TempDir) -> ArtifactLayout {
    ArtifactLayout::new(tmp.path().join("saved_models"), tmp.path().join("embeddings_cache.bin"))
}

pub fn write_corpus(dir: &Path, json: &str) -> PathBuf {
    let path = dir.join("corpus.json");
    std::fs::write(&path, json).unwrap();
    path
}

pub fn trainer(tmp: &TempDir, corpus_json: &str, provider: Arc<CountingProvider>) -> Trainer {
    let corpus = write_corpus(tmp.path(), corpus_json);
    Trainer::new(corpus, layout(tmp), provider, 4, fast_params())
}

pub fn events(titles: &[&str]) -> Vec<String> {
    titles.iter().map(|t| t.to_string()).collect()
}
