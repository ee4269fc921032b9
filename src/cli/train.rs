//! CLI `train` command - build every artifact from the labeled corpus.

use std::sync::Arc;

use anyhow::{Context, Result};

use sector_impact::config::ImpactConfig;
use sector_impact::embedding::{self, EmbeddingProvider};
use sector_impact::Trainer;

pub fn train(config: &ImpactConfig) -> Result<()> {
    let provider: Arc<dyn EmbeddingProvider> = Arc::from(
        embedding::create_provider(&config.embedding)
            .context("failed to create embedding provider")?,
    );
    let trainer = Trainer::from_config(config, provider);

    println!("Loading and preprocessing {}...", config.resolved_corpus_path().display());
    let report = trainer.train()?;

    println!();
    println!("Training complete");
    println!("=================");
    println!("  Periods:             {}", report.corpus_rows);
    println!("  Embedding dims:      {}", report.embedding_dim);
    println!(
        "  Embeddings:          {}",
        if report.cache_hit { "from cache" } else { "generated" }
    );
    println!("  Trained sectors:     {}", report.trained_sectors.len());
    for sector in &report.unavailable_sectors {
        println!("  Warning: no training data for sector {sector}");
    }
    println!("  Models written to:   {}", trainer.layout().model_dir().display());
    Ok(())
}
