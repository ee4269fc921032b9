//! News headlines in, predicted market-sector impact out.
//!
//! `sector-impact` trains one regression forest per market sector on text
//! embeddings of historical news periods, plus an event impact model that
//! estimates how strongly a single headline moves the sector consensus. The
//! predictor then scores a fresh batch of headlines and writes `result.json`
//! for downstream report and chart renderers.
//!
//! | Stage | Input | Output |
//! |-------|-------|--------|
//! | **Train** | period-keyed JSON corpus | sector forests, event impact forest, embedding cache, manifest |
//! | **Predict** | CSV of headlines | `result.json` |
//!
//! # Architecture
//!
//! - **Embeddings**: DistilBERT on ONNX Runtime (768 dimensions), mean-pooled over
//!   real tokens; a hashing encoder stands in when the model is not installed
//! - **Cache**: the training corpus matrix, reused whole while the file exists
//! - **Models**: bagged regression trees (100 trees, depth 5, seed 42)
//! - **Artifacts**: bincode files addressed by sector name, plus a JSON manifest
//!
//! Training and prediction are single-writer batch jobs: running both against
//! the same artifact directory at once is unsupported.
//!
//! # Modules
//!
//! - [`config`] - Configuration loading from TOML files and environment variables
//! - [`corpus`] - Training corpus and headline CSV parsing
//! - [`embedding`] - Text-to-vector providers and the embedding cache
//! - [`forest`] - Random forest regressor
//! - [`models`] - Sector model bank, event impact model, artifact layout
//! - [`trainer`] / [`predictor`] - The two pipeline entry points
//! - [`result`] - The `result.json` summary

pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod forest;
pub mod models;
pub mod predictor;
pub mod result;
pub mod sector;
pub mod trainer;

pub use error::PipelineError;
pub use predictor::{Predictor, TrainOnDemand};
pub use result::PredictionResult;
pub use sector::Sector;
pub use trainer::{ArtifactBuilder, Trainer, TrainingReport, TrainingStage};
