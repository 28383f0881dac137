//! Integration test: raw table → prepared artifacts → baseline → serving transform

use mlops_pipeline::artifacts::ArtifactStore;
use mlops_pipeline::preprocessing::Record;
use mlops_pipeline::training::{
    class_counts, prepare_dataset, ClassificationMetrics, MajorityClassifier, PrepareConfig,
    Predictor,
};
use mlops_pipeline::utils::{split_target, DataLoader, DataSaver};
use polars::prelude::*;
use serde_json::json;

const EMPLOYMENT_TYPES: [&str; 3] = ["contract", "salaried", "self_employed"];

/// 1000 applications, 600 approved and 400 rejected
fn loan_table() -> DataFrame {
    let n = 1000;
    let income: Vec<f64> = (0..n).map(|i| 20000.0 + (i * 97 % 1000) as f64 * 130.0).collect();
    let credit_score: Vec<i64> = (0..n).map(|i| 300 + (i * 31 % 550) as i64).collect();
    let employment: Vec<&str> = (0..n).map(|i| EMPLOYMENT_TYPES[i % 3]).collect();
    let approved: Vec<i64> = (0..n).map(|i| if i % 5 < 3 { 1 } else { 0 }).collect();

    df!(
        "income" => income,
        "credit_score" => credit_score,
        "employment_type" => employment,
        "loan_approved" => approved,
    )
    .unwrap()
}

fn query_record() -> Record {
    json!({"income": 60000, "credit_score": 700, "employment_type": "salaried"})
        .as_object()
        .unwrap()
        .clone()
}

#[test]
fn test_prepare_shapes_and_stratification() {
    let (df, labels) = split_target(&loan_table(), "loan_approved").unwrap();
    assert_eq!(class_counts(&labels)[&1], 600);

    let prepared = prepare_dataset(&df, &labels, &PrepareConfig::new()).unwrap();

    let width = 2 + EMPLOYMENT_TYPES.len();
    assert_eq!(prepared.x_test.dim(), (200, width));
    assert_eq!(prepared.x_train.dim(), (800, width));

    let test_counts = class_counts(&prepared.y_test);
    assert_eq!(test_counts[&1], 120);
    assert_eq!(test_counts[&0], 80);
}

#[test]
fn test_csv_to_artifacts_to_baseline() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("loans.csv");
    DataSaver::save_csv(&mut loan_table(), &csv).unwrap();

    let raw = DataLoader::new().load_auto(&csv).unwrap();
    let (df, labels) = split_target(&raw, "loan_approved").unwrap();
    let prepared = prepare_dataset(&df, &labels, &PrepareConfig::new()).unwrap();

    let store = ArtifactStore::new(dir.path().join("artifacts"));
    store.save_prepared(&prepared).unwrap();
    assert_eq!(store.list().len(), 5);

    let dataset = store.load_dataset().unwrap();
    assert_eq!(dataset.x_train, prepared.x_train);
    assert_eq!(dataset.y_test, prepared.y_test);

    let mut model = MajorityClassifier::new();
    model.fit(&dataset.x_train, &dataset.y_train).unwrap();
    assert_eq!(model.majority_class(), Some(1));

    let predictions = model.predict(&dataset.x_test).unwrap();
    let metrics = ClassificationMetrics::compute(&dataset.y_test, &predictions).unwrap();
    assert!((metrics.accuracy - 0.6).abs() < 1e-12);
    assert_eq!(metrics.confusion_matrix, [[0, 80], [0, 120]]);
}

#[test]
fn test_independent_loads_give_bit_identical_vectors() {
    let dir = tempfile::tempdir().unwrap();
    let (df, labels) = split_target(&loan_table(), "loan_approved").unwrap();
    let prepared = prepare_dataset(&df, &labels, &PrepareConfig::new()).unwrap();
    let store = ArtifactStore::new(dir.path());
    store.save_prepared(&prepared).unwrap();

    let record = [query_record()];
    let first = ArtifactStore::new(dir.path())
        .load_transform()
        .unwrap()
        .transform_records(&record)
        .unwrap();
    let second = ArtifactStore::new(dir.path())
        .load_transform()
        .unwrap()
        .transform_records(&record)
        .unwrap();

    let bits = |x: &ndarray::Array2<f64>| x.iter().map(|v| v.to_bits()).collect::<Vec<u64>>();
    assert_eq!(bits(&first), bits(&second));

    // in-memory transform agrees with the reloaded one
    let direct = prepared.transform.transform_records(&record).unwrap();
    assert_eq!(bits(&first), bits(&direct));

    // salaried is the middle category
    assert_eq!(first.row(0).iter().skip(2).copied().collect::<Vec<_>>(), vec![0.0, 1.0, 0.0]);
}

#[test]
fn test_separate_feature_and_label_files() {
    let dir = tempfile::tempdir().unwrap();
    let table = loan_table();
    let mut features = table.drop("loan_approved").unwrap();
    let mut labels = table.select(["loan_approved"]).unwrap();

    let x_path = dir.path().join("X.csv");
    let y_path = dir.path().join("y.csv");
    DataSaver::save_csv(&mut features, &x_path).unwrap();
    DataSaver::save_csv(&mut labels, &y_path).unwrap();

    let (df, y) = DataLoader::new()
        .load_features_and_labels(&x_path, &y_path, None)
        .unwrap();
    assert_eq!(df.width(), 3);
    assert_eq!(y.len(), 1000);

    let a = prepare_dataset(&df, &y, &PrepareConfig::new()).unwrap();
    let b = prepare_dataset(&df, &y, &PrepareConfig::new()).unwrap();
    assert_eq!(a.partition, b.partition);
    assert_eq!(a.x_test, b.x_test);
}
