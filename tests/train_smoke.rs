mod common;

use ai_vision::adapters::ml::model::{load_model, save_model};
use ai_vision::adapters::ml::train::train_model;
use ai_vision::adapters::ml::TrainBackend;
use ai_vision::config::TrainingConfig;
use ai_vision::domain::training::EpochMetrics;

fn tiny_config(root: &std::path::Path) -> TrainingConfig {
    TrainingConfig {
        train_dir: root.join("train"),
        valid_dir: root.join("valid"),
        num_classes: 2,
        epochs: 2,
        batch_size: 2,
        learning_rate: 1e-3,
        input_size: 32,
        grid_size: 2,
        backbone_weights: None,
        seed: Some(7),
    }
}

#[test]
fn trains_and_reports_each_epoch() {
    let dir = tempfile::tempdir().unwrap();
    common::write_split(&dir.path().join("train"), 3, 40);
    common::write_split(&dir.path().join("valid"), 2, 40);
    let cfg = tiny_config(dir.path());

    let mut seen: Vec<EpochMetrics> = Vec::new();
    let trained = train_model(&cfg, &mut |m: &EpochMetrics| seen.push(*m)).unwrap();

    assert_eq!(trained.report.epochs.len(), 2);
    assert_eq!(seen, trained.report.epochs);
    for (i, m) in trained.report.epochs.iter().enumerate() {
        assert_eq!(m.epoch, i + 1);
        assert!(m.loss.is_finite() && m.loss > 0.0);
        assert!(m.valid_loss.is_finite() && m.valid_loss > 0.0);
    }

    let ckpt = dir.path().join("out").join("detector.bin");
    save_model(trained.model, &ckpt).unwrap();
    let device = Default::default();
    let loaded = load_model::<TrainBackend>(&trained.config, &ckpt, &device).unwrap();
    assert_eq!(loaded.num_classes(), 2);
}

#[test]
fn empty_validation_split_aborts() {
    let dir = tempfile::tempdir().unwrap();
    common::write_split(&dir.path().join("train"), 2, 32);
    std::fs::create_dir_all(dir.path().join("valid").join("images")).unwrap();

    let err = train_model(&tiny_config(dir.path()), &mut |_: &EpochMetrics| {}).unwrap_err();
    assert!(err.to_string().contains("validation"));
}

#[test]
fn out_of_range_class_aborts() {
    let dir = tempfile::tempdir().unwrap();
    common::write_split(&dir.path().join("train"), 2, 32);
    common::write_split(&dir.path().join("valid"), 1, 32);
    std::fs::write(dir.path().join("train/labels/img_0.txt"), "5 0.5 0.5 0.2 0.2\n").unwrap();

    assert!(train_model(&tiny_config(dir.path()), &mut |_: &EpochMetrics| {}).is_err());
}
