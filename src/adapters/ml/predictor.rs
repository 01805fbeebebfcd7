use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::UNIX_EPOCH;
use tracing::{error, info};

use super::detector::{BurnDetector, Detector};
use super::model::{checkpoint_file, DetectorModelConfig};
use super::TrainBackend;
use crate::adapters::onnx::yolo_engine::OnnxYoloEngine;
use crate::application::ports::PredictorPort;
use crate::domain::detection::Detection;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::{Architecture, InferenceConfig};

/// Mantiene el detector cargado entre peticiones y lo recarga cuando cambia el fichero
/// del modelo (por ejemplo al terminar un entrenamiento).
pub struct DetectorHost {
    config: InferenceConfig,
    model_cfg: DetectorModelConfig,
    slot: Arc<Mutex<Option<LoadedDetector>>>,
}

struct LoadedDetector {
    key: String,
    detector: Box<dyn Detector>,
}

impl DetectorHost {
    pub fn new(config: InferenceConfig, model_cfg: DetectorModelConfig) -> Self {
        Self { config, model_cfg, slot: Arc::new(Mutex::new(None)) }
    }

    fn model_file(&self) -> PathBuf {
        match self.config.model.architecture {
            Architecture::Detector => checkpoint_file(&self.config.model.path),
            Architecture::Yolo => self.config.model.path.clone(),
        }
    }
}

pub fn build_detector(config: &InferenceConfig, model_cfg: &DetectorModelConfig) -> anyhow::Result<Box<dyn Detector>> {
    match config.model.architecture {
        Architecture::Detector => {
            let cfg = DetectorModelConfig { num_classes: config.num_classes, ..model_cfg.clone() };
            let detector = BurnDetector::<TrainBackend>::from_checkpoint(
                &cfg,
                &config.model.path,
                config.params.clone(),
                config.class_names.clone(),
            )?;
            Ok(Box::new(detector))
        }
        Architecture::Yolo => {
            let names = (!config.class_names.is_empty()).then(|| config.class_names.clone());
            let engine = OnnxYoloEngine::load(&config.model.path, config.params.clone(), names)?;
            Ok(Box::new(engine))
        }
    }
}

/// Ruta + fecha de modificación: si cualquiera cambia, el modelo se vuelve a cargar.
fn config_key(file: &std::path::Path) -> String {
    let mtime = std::fs::metadata(file)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("{}-{}", file.display(), mtime)
}

#[async_trait]
impl PredictorPort for DetectorHost {
    async fn detect(&self, image: Vec<u8>) -> DomainResult<Vec<Detection>> {
        let slot = self.slot.clone();
        let config = self.config.clone();
        let model_cfg = self.model_cfg.clone();
        let file = self.model_file();

        tokio::task::spawn_blocking(move || {
            let rgb = image::load_from_memory(&image)
                .map_err(|e| DomainError::InvalidInput(format!("invalid image: {e}")))?
                .to_rgb8();

            let mut lock = slot
                .lock()
                .map_err(|_| DomainError::OperationFailed("Lock del detector fallido".into()))?;

            let key = config_key(&file);
            if lock.as_ref().map(|l| l.key.as_str()) != Some(key.as_str()) {
                info!("Detector: cargando modelo {}", file.display());
                let detector = build_detector(&config, &model_cfg).map_err(|e| {
                    error!("Error cargando modelo: {:?}", e);
                    DomainError::Unavailable(e.to_string())
                })?;
                *lock = Some(LoadedDetector { key, detector });
            }

            let loaded = lock
                .as_mut()
                .ok_or_else(|| DomainError::Unavailable("modelo no cargado".into()))?;
            loaded
                .detector
                .detect(&rgb)
                .map_err(|e| DomainError::OperationFailed(e.to_string()))
        })
        .await
        .map_err(|e| DomainError::OperationFailed(format!("inference task failed: {e}")))?
    }
}
