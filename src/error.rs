//! Pipeline error conditions callers may need to tell apart.
//!
//! Library functions return [`anyhow::Result`]; these variants travel inside
//! the `anyhow::Error` and can be recovered with `downcast_ref`.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("training corpus not found at {0}")]
    CorpusNotFound(PathBuf),

    #[error("no event data found in training corpus")]
    NoEventData,

    #[error("the CSV file {0} doesn't contain a 'Title' column")]
    MissingTitleColumn(PathBuf),

    #[error("no events to analyze")]
    NoEvents,

    #[error("event impact model is not loaded; cannot calculate event impacts")]
    ImpactModelMissing,

    #[error("model artifacts missing and no trainer available: {}", display_paths(.0))]
    ArtifactsMissing(Vec<PathBuf>),

    #[error("failed to generate models or embedding cache: {0}")]
    TrainingFailed(String),

    #[error("training did not finish within {0:?}")]
    TrainingTimedOut(Duration),

    #[error(
        "embedding cache has {} rows but the corpus has {} periods; delete {} to rebuild it",
        .cached,
        .corpus,
        .path.display()
    )]
    CacheShapeMismatch {
        path: PathBuf,
        cached: usize,
        corpus: usize,
    },

    #[error(
        "embedding cache has {} dimensions but the encoder produces {}; delete {} to rebuild it",
        .cached,
        .encoder,
        .path.display()
    )]
    EncoderMismatch {
        path: PathBuf,
        cached: usize,
        encoder: usize,
    },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
