mod helpers;

use helpers::*;
use ndarray::Array2;
use sector_impact::embedding::cache;
use sector_impact::models::artifacts::TrainingManifest;
use sector_impact::models::sector_bank::{SectorModel, SectorModelBank};
use sector_impact::{PipelineError, Sector, TrainingStage};
use tempfile::TempDir;

#[test]
fn trains_every_artifact_from_a_single_period() {
    let tmp = TempDir::new().unwrap();
    let provider = CountingProvider::new(DIMS);
    let trainer = trainer(&tmp, SINGLE_PERIOD_CORPUS, provider.clone());

    let report = trainer.train().unwrap();

    assert_eq!(report.stage, TrainingStage::ImpactTrained);
    assert_eq!(report.corpus_rows, 1);
    assert_eq!(report.embedding_dim, DIMS);
    assert!(!report.cache_hit);
    assert_eq!(report.trained_sectors, vec![Sector::Energy, Sector::Utilities]);
    assert_eq!(report.unavailable_sectors.len(), 9);

    let layout = layout(&tmp);
    assert!(layout.missing_artifacts().is_empty());
    assert!(layout.sector_model(Sector::Energy).exists());
    assert!(!layout.sector_model(Sector::Financials).exists());
    assert!(provider.calls() > 0);
}

#[test]
fn bank_has_eleven_entries_and_only_unlabelled_sectors_are_unavailable() {
    let tmp = TempDir::new().unwrap();
    let trainer = trainer(&tmp, MULTI_PERIOD_CORPUS, CountingProvider::new(DIMS));
    trainer.train().unwrap();

    let bank = SectorModelBank::load(&layout(&tmp)).unwrap();
    assert_eq!(bank.len(), 11);

    let labelled = [
        Sector::Energy,
        Sector::Financials,
        Sector::InformationTechnology,
        Sector::Utilities,
    ];
    for sector in Sector::ALL {
        let trained = matches!(bank.get(sector), SectorModel::Trained(_));
        assert_eq!(trained, labelled.contains(&sector), "{sector}");
    }
}

#[test]
fn existing_cache_skips_the_encoder() {
    let tmp = TempDir::new().unwrap();
    trainer(&tmp, MULTI_PERIOD_CORPUS, CountingProvider::new(DIMS))
        .train()
        .unwrap();

    // Drop the models but keep the cache.
    std::fs::remove_dir_all(layout(&tmp).model_dir()).unwrap();

    let provider = CountingProvider::new(DIMS);
    let report = trainer(&tmp, MULTI_PERIOD_CORPUS, provider.clone())
        .train()
        .unwrap();

    assert!(report.cache_hit);
    assert_eq!(provider.calls(), 0);
    assert!(layout(&tmp).missing_artifacts().is_empty());
}

#[test]
fn cache_with_wrong_row_count_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let layout = layout(&tmp);
    cache::save(layout.cache_file(), &Array2::<f32>::zeros((3, DIMS))).unwrap();

    let err = trainer(&tmp, SINGLE_PERIOD_CORPUS, CountingProvider::new(DIMS))
        .train()
        .unwrap_err();

    match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::CacheShapeMismatch { cached, corpus, .. }) => {
            assert_eq!(*cached, 3);
            assert_eq!(*corpus, 1);
        }
        other => panic!("expected CacheShapeMismatch, got {other:?}"),
    }
}

#[test]
fn missing_corpus_aborts_without_writing_artifacts() {
    let tmp = TempDir::new().unwrap();
    let layout = layout(&tmp);
    let trainer = sector_impact::Trainer::new(
        tmp.path().join("nope.json"),
        layout.clone(),
        CountingProvider::new(DIMS),
        4,
        fast_params(),
    );

    let err = trainer.train().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::CorpusNotFound(_))
    ));
    assert!(!layout.manifest().exists());
    assert!(!layout.cache_file().exists());
}

#[test]
fn empty_corpus_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let err = trainer(&tmp, "{}", CountingProvider::new(DIMS))
        .train()
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::NoEventData)
    ));
}

#[test]
fn manifest_describes_the_run() {
    let tmp = TempDir::new().unwrap();
    trainer(&tmp, MULTI_PERIOD_CORPUS, CountingProvider::new(DIMS))
        .train()
        .unwrap();

    let manifest = TrainingManifest::load(&layout(&tmp).manifest())
        .unwrap()
        .expect("manifest written");
    assert_eq!(manifest.corpus_rows, 6);
    assert_eq!(manifest.embedding_dim, DIMS);
    assert_eq!(manifest.encoder, format!("hashing:{DIMS}"));
    assert_eq!(manifest.trained_sectors.len(), 4);
    assert_eq!(manifest.unavailable_sectors.len(), 7);

    let cached = cache::load(layout(&tmp).cache_file()).unwrap().unwrap();
    assert_eq!(cached.dim(), (6, DIMS));
}

#[test]
fn retraining_removes_models_for_sectors_that_lost_their_labels() {
    let tmp = TempDir::new().unwrap();
    trainer(&tmp, MULTI_PERIOD_CORPUS, CountingProvider::new(DIMS))
        .train()
        .unwrap();
    assert!(layout(&tmp).sector_model(Sector::Financials).exists());

    std::fs::remove_file(layout(&tmp).cache_file()).unwrap();
    trainer(&tmp, SINGLE_PERIOD_CORPUS, CountingProvider::new(DIMS))
        .train()
        .unwrap();

    let layout = layout(&tmp);
    assert!(!layout.sector_model(Sector::Financials).exists());
    assert!(layout.missing_artifacts().is_empty());
}

#[test]
fn cache_from_a_different_encoder_is_rejected() {
    let tmp = TempDir::new().unwrap();
    trainer(&tmp, MULTI_PERIOD_CORPUS, CountingProvider::new(DIMS))
        .train()
        .unwrap();
    std::fs::remove_dir_all(layout(&tmp).model_dir()).unwrap();

    let provider = CountingProvider::new(DIMS / 2);
    let err = trainer(&tmp, MULTI_PERIOD_CORPUS, provider.clone())
        .train()
        .unwrap_err();

    match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::EncoderMismatch { cached, encoder, .. }) => {
            assert_eq!(*cached, DIMS);
            assert_eq!(*encoder, DIMS / 2);
        }
        other => panic!("expected EncoderMismatch, got {other:?}"),
    }
    assert!(err.to_string().contains("delete"));
    assert_eq!(provider.calls(), 0);
    assert!(!layout(&tmp).manifest().exists());
}
