//! Integration test: Full pipeline (load → preprocess → train → persist → predict)

use chrono::NaiveDate;
use std::sync::Arc;
use tempfile::TempDir;
use tender_threshold::artifacts::{ArtifactStoreConfig, ModelArtifactStore};
use tender_threshold::error::ThresholdError;
use tender_threshold::inference::{PredictionRequest, Predictor};
use tender_threshold::records::{records_to_frame, TenderRecord};
use tender_threshold::summary::ThresholdSummary;
use tender_threshold::training::{ModelTrainer, TrainingConfig};
use tender_threshold::utils::DataLoader;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Twenty tenders over two categories, 50,000 - 500,000
fn history(categories: &[&str]) -> Vec<TenderRecord> {
    (0..20)
        .map(|i| {
            let base = 50_000.0 + 450_000.0 * i as f64 / 19.0;
            TenderRecord::new(base)
                .with_category(categories[i % categories.len()])
                .with_competitors(4 + (i as u32 * 3) % 25)
                .with_date(date(2022 + (i % 2) as i32, (i % 12) as u32 + 1, 10))
                .with_threshold(17.0 + base / 200_000.0)
        })
        .collect()
}

fn fs_store(dir: &TempDir) -> Arc<ModelArtifactStore> {
    Arc::new(ModelArtifactStore::open(ArtifactStoreConfig::new(dir.path())))
}

fn trainer() -> ModelTrainer {
    ModelTrainer::new(TrainingConfig::default().with_n_estimators(25))
}

#[test]
fn test_train_persist_predict() {
    let dir = TempDir::new().unwrap();
    let store = fs_store(&dir);
    let df = records_to_frame(&history(&["OG1", "OG3", "OS30"])).unwrap();

    let metrics = trainer().train_and_persist(&df, &store).unwrap();
    assert_eq!(metrics.n_samples, 20);
    assert!(store.is_trained());
    assert!(dir.path().join("threshold_forest.bin").exists());
    assert!(dir.path().join("model_columns.json").exists());
    assert!(dir.path().join("label_encoders.json").exists());

    let predictor = Predictor::new(store);
    let request = PredictionRequest::new(260_000.0, date(2024, 3, 15))
        .with_category("OG3")
        .with_competitors(10);
    let value = predictor.predict(&request).unwrap();
    assert!((17.0..=19.5).contains(&value), "prediction out of range: {}", value);
}

#[test]
fn test_save_load_preserves_columns_and_encoders() {
    let dir = TempDir::new().unwrap();
    let store = fs_store(&dir);
    let df = records_to_frame(&history(&["OG1", "OG3"])).unwrap();

    let (bundle, _) = trainer().train_frame(&df).unwrap();
    store.save(&bundle).unwrap();

    let reopened = fs_store(&dir);
    let loaded = reopened.require().unwrap();
    assert_eq!(
        serde_json::to_vec(&loaded.columns).unwrap(),
        serde_json::to_vec(&bundle.columns).unwrap()
    );
    assert_eq!(
        serde_json::to_vec(&loaded.registry).unwrap(),
        serde_json::to_vec(&bundle.registry).unwrap()
    );
    assert_eq!(loaded.info, bundle.info);
}

#[test]
fn test_unseen_category_predicts() {
    let store = Arc::new(ModelArtifactStore::in_memory());
    let df = records_to_frame(&history(&["OG1", "OG3"])).unwrap();
    trainer().train_and_persist(&df, &store).unwrap();

    let predictor = Predictor::new(store);
    let request = PredictionRequest::new(120_000.0, date(2024, 1, 5))
        .with_category("NeverSeenBefore")
        .with_competitors(6);
    let result = predictor.predict(&request);
    assert!(result.is_ok(), "unseen category must not fail: {:?}", result.err());
}

#[test]
fn test_predict_before_training() {
    let dir = TempDir::new().unwrap();
    let predictor = Predictor::new(fs_store(&dir));

    let err = predictor
        .predict(&PredictionRequest::new(100_000.0, date(2024, 1, 5)))
        .unwrap_err();
    assert!(matches!(err, ThresholdError::ModelNotTrained));
}

#[test]
fn test_missing_competitor_count_predicts() {
    let store = Arc::new(ModelArtifactStore::in_memory());
    let df = records_to_frame(&history(&["OG1", "OG3"])).unwrap();
    trainer().train_and_persist(&df, &store).unwrap();

    let request = PredictionRequest::new(300_000.0, date(2024, 7, 1)).with_category("OG1");
    let result = Predictor::new(store).predict(&request);
    assert!(result.is_ok(), "missing competitor count must not fail: {:?}", result.err());
}

#[test]
fn test_failed_training_keeps_previous_bundle() {
    let store = Arc::new(ModelArtifactStore::in_memory());
    let df = records_to_frame(&history(&["OG1", "OG3"])).unwrap();
    trainer().train_and_persist(&df, &store).unwrap();
    let before = store.require().unwrap().info;

    let unusable = records_to_frame(&[TenderRecord::new(1.0), TenderRecord::new(2.0)]).unwrap();
    let err = trainer().train_and_persist(&unusable, &store).unwrap_err();
    assert!(matches!(err, ThresholdError::InsufficientData(_)));

    assert_eq!(store.require().unwrap().info, before);
}

#[test]
fn test_retraining_replaces_vocabulary() {
    let store = Arc::new(ModelArtifactStore::in_memory());
    let predictor = Predictor::new(store.clone());

    trainer()
        .train_and_persist(&records_to_frame(&history(&["OG1", "OG3"])).unwrap(), &store)
        .unwrap();
    assert_eq!(predictor.known_categories(), vec!["OG1", "OG3", "Unknown"]);

    trainer()
        .train_and_persist(&records_to_frame(&history(&["OS28"])).unwrap(), &store)
        .unwrap();
    assert_eq!(predictor.known_categories(), vec!["OS28", "Unknown"]);
}

#[test]
fn test_concurrent_predictions() {
    let store = Arc::new(ModelArtifactStore::in_memory());
    trainer()
        .train_and_persist(&records_to_frame(&history(&["OG1", "OG3"])).unwrap(), &store)
        .unwrap();
    let predictor = Predictor::new(store);
    let request = PredictionRequest::new(200_000.0, date(2024, 4, 4)).with_category("OG1");
    let expected = predictor.predict(&request).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let predictor = predictor.clone();
            let request = request.clone();
            std::thread::spawn(move || predictor.predict(&request).unwrap())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[test]
fn test_csv_history_end_to_end() {
    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("history.csv");
    let mut content = String::from("base_amount,work_category,competitor_count,tender_date,anomaly_threshold\n");
    for record in history(&["OG1", "OG3", "OS30"]) {
        content.push_str(&format!(
            "{},{},{},{},{}\n",
            record.base_amount,
            record.work_category.unwrap_or_default(),
            record.competitor_count.unwrap_or_default(),
            record.tender_date.unwrap(),
            record.anomaly_threshold.unwrap()
        ));
    }
    std::fs::write(&csv, content).unwrap();

    let df = DataLoader::new().load_auto(&csv).unwrap();
    let summary = ThresholdSummary::from_frame(&df).unwrap();
    assert_eq!(summary.count, 20);
    assert!(summary.min <= summary.median && summary.median <= summary.max);

    let store = fs_store(&dir);
    let metrics = trainer().train_and_persist(&df, &store).unwrap();
    assert_eq!(metrics.n_samples, 20);
    assert_eq!(Predictor::new(store).known_categories().len(), 4);
}
