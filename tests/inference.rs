use std::sync::Arc;

use ai_vision::adapters::ml::detector::{predict, BurnDetector, Detector};
use ai_vision::adapters::ml::model::{create_model, save_model, DetectorModelConfig};
use ai_vision::adapters::ml::model_catalog::FileModelCatalog;
use ai_vision::adapters::ml::predictor::DetectorHost;
use ai_vision::application::services::InferenceService;
use ai_vision::domain::errors::DomainError;
use ai_vision::domain::model::{Architecture, InferenceConfig, ModelId, YoloParams};
use burn::backend::NdArray;
use image::RgbImage;

type B = NdArray<f32>;

fn params() -> YoloParams {
    YoloParams { input_size: 64, conf_threshold: 0.0, iou_threshold: 0.45, max_detections: 100 }
}

fn detector() -> BurnDetector<B> {
    let device = Default::default();
    let model = create_model::<B>(&DetectorModelConfig::new(3).with_grid_size(4), &device).unwrap();
    BurnDetector::new(model, params(), vec!["a".into(), "b".into(), "c".into()], device)
}

fn write_image(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("scene.png");
    RgbImage::from_fn(48, 40, |x, y| image::Rgb([(x * 5) as u8, (y * 6) as u8, 128])).save(&path).unwrap();
    path
}

#[test]
fn higher_threshold_returns_subset() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_image(dir.path());
    let mut det = detector();
    assert_eq!(det.num_classes(), 3);

    let all = predict(&mut det, &path, 0.0).unwrap();
    let strict = predict(&mut det, &path, 0.9).unwrap();
    assert!(!all.is_empty());
    assert!(strict.scores.iter().all(|s| *s >= 0.9));

    // Cada resultado estricto aparece, en el mismo orden, en el resultado completo.
    let mut cursor = 0;
    for (i, score) in strict.scores.iter().enumerate() {
        let pos = all.scores[cursor..]
            .iter()
            .zip(&all.boxes[cursor..])
            .position(|(s, b)| s == score && *b == strict.boxes[i])
            .expect("strict result missing from full result");
        cursor += pos + 1;
    }

    for w in all.scores.windows(2) {
        assert!(w[0] >= w[1]);
    }
    for b in &all.boxes {
        assert!(b[0] <= b[2] && b[1] <= b[3]);
        assert!(b[2] <= 48.0 && b[3] <= 40.0);
    }
}

#[test]
fn missing_image_is_an_error() {
    let mut det = detector();
    let err = predict(&mut det, std::path::Path::new("nowhere/scene.png"), 0.5).unwrap_err();
    assert!(matches!(err.downcast_ref::<DomainError>(), Some(DomainError::NotFound(_))));
}

#[tokio::test]
async fn service_reloads_saved_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let ckpt = dir.path().join("detector.bin");
    let model_cfg = DetectorModelConfig::new(2).with_grid_size(2);

    let config = InferenceConfig {
        model: ModelId { architecture: Architecture::Detector, path: ckpt.clone() },
        params: params(),
        num_classes: 2,
        class_names: Vec::new(),
    };
    let service = InferenceService::new(
        Arc::new(DetectorHost::new(config.clone(), model_cfg.clone())),
        Arc::new(FileModelCatalog::new()),
        config.model.clone(),
    );

    let bytes = std::fs::read(write_image(dir.path())).unwrap();
    let res = service.predict(bytes.clone(), 0.0).await;
    assert!(matches!(res, Err(DomainError::Unavailable(_))));

    let device = Default::default();
    save_model(create_model::<B>(&model_cfg, &device).unwrap(), &ckpt).unwrap();

    let detections = service.predict(bytes.clone(), 0.0).await.unwrap();
    assert!(detections.iter().all(|d| d.label.starts_with("class_")));

    let res = service.predict(vec![1, 2, 3], 0.5).await;
    assert!(matches!(res, Err(DomainError::InvalidInput(_))));
    let res = service.predict(bytes, 1.5).await;
    assert!(matches!(res, Err(DomainError::InvalidInput(_))));
}
