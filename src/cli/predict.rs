//! CLI `predict` command - score current headlines and write `result.json`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use sector_impact::config::ImpactConfig;
use sector_impact::corpus::load_events_from_csv;
use sector_impact::embedding::{self, EmbeddingProvider};
use sector_impact::{Predictor, TrainOnDemand, Trainer};

pub struct PredictOptions {
    pub csv: Option<PathBuf>,
    pub events: Vec<String>,
    pub output: Option<PathBuf>,
    pub save: bool,
    pub auto_train: bool,
}

pub fn predict(config: &ImpactConfig, options: PredictOptions) -> Result<()> {
    println!("Sector impact prediction started!");

    let provider: Arc<dyn EmbeddingProvider> = Arc::from(
        embedding::create_provider(&config.embedding)
            .context("failed to create embedding provider")?,
    );

    let on_demand = (options.auto_train && config.training.auto_train).then(|| TrainOnDemand {
        builder: Arc::new(Trainer::from_config(config, Arc::clone(&provider))),
        timeout: config.training.timeout(),
    });

    let predictor = Predictor::open(
        &config.artifact_layout(),
        Arc::clone(&provider),
        config.embedding.batch_size,
        on_demand,
    )?;

    let events = if options.events.is_empty() {
        let csv_path = options.csv.unwrap_or_else(|| config.resolved_events_csv());
        load_events_from_csv(&csv_path)?
    } else {
        options.events
    };
    println!("Loaded {} events for analysis", events.len());

    let result = if options.save {
        let path = options.output.unwrap_or_else(|| config.resolved_result_file());
        let result = predictor.predict_and_save(&events, &path)?;
        println!("Results written to {}", path.display());
        result
    } else {
        predictor.predict_impact(&events)?
    };

    println!();
    println!("  Most growth potential:   {}", result.sector_with_most_growth_potential);
    println!("  Least growth potential:  {}", result.sector_with_least_growth_potential);
    println!("  Growing:                 {}", join(&result.growing_sectors));
    println!("  Declining:               {}", join(&result.declining_sectors));
    println!("  Top events:");
    for event in &result.top_5_events {
        println!("    {:>8.4}  {}", event.impact, event.event);
    }
    if !options.save {
        println!();
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    println!("Analysis completed successfully");
    Ok(())
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    if items.is_empty() {
        "(none)".into()
    } else {
        items.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(", ")
    }
}
