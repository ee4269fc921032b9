//! CLI `doctor` command - report on trained artifacts and the embedding cache.

use anyhow::Result;

use sector_impact::config::ImpactConfig;
use sector_impact::embedding::cache;
use sector_impact::models::artifacts::TrainingManifest;
use sector_impact::Sector;

pub fn doctor(config: &ImpactConfig) -> Result<()> {
    let layout = config.artifact_layout();

    println!("Sector Impact Health Report");
    println!("===========================");
    println!();
    println!("Model dir:         {}", layout.model_dir().display());
    println!("Corpus:            {}", config.resolved_corpus_path().display());
    println!("Encoder:           {} ({})", config.embedding.provider, config.embedding.model);
    println!();

    match TrainingManifest::load(&layout.manifest()) {
        Ok(Some(manifest)) => {
            println!("Last training:     {}", manifest.trained_at.to_rfc3339());
            println!("  Periods:         {}", manifest.corpus_rows);
            println!("  Embedding dims:  {}", manifest.embedding_dim);
            println!("  Encoder:         {}", manifest.encoder);
        }
        Ok(None) => println!("Last training:     (no manifest)"),
        Err(err) => println!("Last training:     unreadable manifest ({err:#})"),
    }
    println!();

    println!("Sector models:");
    for sector in Sector::ALL {
        let path = layout.sector_model(sector);
        let status = if path.exists() { "trained" } else { "unavailable (predicts 0.0)" };
        println!("  {:<24} {}", sector.as_str(), status);
    }
    println!(
        "  {:<24} {}",
        "event_impact",
        if layout.impact_model().exists() { "trained" } else { "MISSING" }
    );
    println!();

    match cache::load(layout.cache_file()) {
        Ok(Some(matrix)) => println!(
            "Embedding cache:   {} rows x {} dims at {}",
            matrix.nrows(),
            matrix.ncols(),
            layout.cache_file().display()
        ),
        Ok(None) => println!("Embedding cache:   not found at {}", layout.cache_file().display()),
        Err(err) => println!("Embedding cache:   unreadable ({err:#})"),
    }
    println!("  The cache is not checked against the corpus; delete it after editing the corpus.");

    let missing = layout.missing_artifacts();
    println!();
    if missing.is_empty() {
        println!("Status:            READY");
    } else {
        println!("Status:            {} artifact(s) missing", missing.len());
        for path in &missing {
            println!("  - {}", path.display());
        }
        println!("Run `sector-impact train` to build them.");
    }

    Ok(())
}
