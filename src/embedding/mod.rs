//! Text-to-vector embedding pipeline.
//!
//! Provides the [`EmbeddingProvider`] trait, a local DistilBERT implementation
//! running on ONNX Runtime, a deterministic hashing encoder for offline use,
//! and the on-disk [`cache`] for the training corpus matrix. Providers are
//! created via [`create_provider`] from configuration.

pub mod cache;
pub mod hashing;
pub mod local;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use ndarray::Array2;

/// Hidden size of distilbert-base-uncased.
pub const DISTILBERT_DIM: usize = 768;

/// Trait for embedding text into vectors.
///
/// An event's vector must not depend on which other texts share its batch.
/// All methods are synchronous and run inference only.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of text strings, one vector per input, in input order.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Number of dimensions this provider produces.
    fn dimensions(&self) -> usize;

    /// Identifier recorded in the training manifest.
    fn name(&self) -> String;
}

/// Create an embedding provider from config.
///
/// `"local"` needs the ONNX model files - run `sector-impact model download` first.
pub fn create_provider(
    config: &crate::config::EmbeddingConfig,
) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "local" => {
            let provider = local::LocalEmbeddingProvider::new(config)?;
            Ok(Box::new(provider))
        }
        "hashing" => Ok(Box::new(hashing::HashingEmbeddingProvider::new(
            config.hashing_dimensions,
        ))),
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: local, hashing"),
    }
}

/// Embed `texts` in fixed-size batches and stack the vectors into an `(N, D)` matrix.
pub fn embed_texts<S: AsRef<str>>(
    provider: &dyn EmbeddingProvider,
    texts: &[S],
    batch_size: usize,
) -> Result<Array2<f32>> {
    anyhow::ensure!(batch_size > 0, "batch_size must be positive");
    let dim = provider.dimensions();
    let mut matrix = Array2::<f32>::zeros((texts.len(), dim));
    if texts.is_empty() {
        return Ok(matrix);
    }

    let n_batches = texts.len().div_ceil(batch_size);
    let pb = ProgressBar::new(n_batches as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  Generating embeddings {bar:40.cyan/blue} {pos}/{len} ({eta})")
            .expect("valid template")
            .progress_chars("##-"),
    );

    for (batch_idx, chunk) in texts.chunks(batch_size).enumerate() {
        let refs: Vec<&str> = chunk.iter().map(|t| t.as_ref()).collect();
        let vectors = provider.embed_batch(&refs)?;
        anyhow::ensure!(
            vectors.len() == chunk.len(),
            "provider returned {} vectors for a batch of {}",
            vectors.len(),
            chunk.len()
        );

        let offset = batch_idx * batch_size;
        for (i, vector) in vectors.iter().enumerate() {
            anyhow::ensure!(
                vector.len() == dim,
                "provider returned a {}-dim vector, expected {dim}",
                vector.len()
            );
            matrix
                .row_mut(offset + i)
                .assign(&ndarray::ArrayView1::from(vector.as_slice()));
        }
        tracing::debug!(batch = batch_idx, size = chunk.len(), "embedded batch");
        pb.inc(1);
    }

    pb.finish_and_clear();
    Ok(matrix)
}
