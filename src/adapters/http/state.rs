use std::sync::Arc;

use crate::adapters::fs::upload_store::FsDatasetStore;
use crate::adapters::ml::{
    job::TrainingJob, model::DetectorModelConfig, model_catalog::FileModelCatalog, predictor::DetectorHost,
};
use crate::application::services::{DatasetService, InferenceService, TrainingService};
use crate::config::AppConfig;
use crate::domain::training::TrainingParams;

/// Estado compartido para los manejadores HTTP de Axum.
/// Siguiendo la Arquitectura Hexagonal, el estado contiene los servicios (Casos de Uso).
#[derive(Clone)]
pub struct HttpState {
    /// Estadísticas y subida de ficheros a las carpetas de cada split.
    pub dataset: Arc<DatasetService>,
    /// Inferencia sobre imágenes sueltas.
    pub inference: Arc<InferenceService>,
    /// Entrenamiento en segundo plano.
    pub training: Arc<TrainingService>,
    pub defaults: RequestDefaults,
}

/// Valores usados cuando la petición no los indica.
#[derive(Debug, Clone, Copy)]
pub struct RequestDefaults {
    pub confidence: f32,
    pub training: TrainingParams,
}

/// Crea las carpetas de subida e instancia adaptadores y servicios a partir de la configuración.
pub fn build_state(cfg: &AppConfig) -> anyhow::Result<HttpState> {
    let store = Arc::new(FsDatasetStore::bootstrap(cfg.datasets.upload_folders())?);

    let infer = cfg.inference_config();
    let model_cfg = DetectorModelConfig::from(&cfg.training);
    let predictor = Arc::new(DetectorHost::new(infer.clone(), model_cfg));
    let catalog = Arc::new(FileModelCatalog::new());
    let trainer = Arc::new(TrainingJob::new(cfg.training.clone(), cfg.inference.checkpoint.clone()));

    Ok(HttpState {
        dataset: Arc::new(DatasetService::new(store)),
        inference: Arc::new(InferenceService::new(predictor, catalog, infer.model)),
        training: Arc::new(TrainingService::new(trainer)),
        defaults: RequestDefaults {
            confidence: cfg.inference.confidence,
            training: cfg.training.params(),
        },
    })
}
