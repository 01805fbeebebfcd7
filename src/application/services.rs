use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    application::ports::{DatasetStorePort, ModelCatalogPort, PredictorPort, TrainerPort},
    domain::{
        dataset::{DatasetInfo, DatasetSplit, UploadedFile},
        detection::{filter_by_confidence, Detection},
        errors::{DomainError, DomainResult},
        model::ModelId,
        training::{TrainingParams, TrainingStatus},
    },
};

/// Servicio de gestión de las carpetas de subida (train/valid/test).
#[derive(Clone)]
pub struct DatasetService {
    store: Arc<dyn DatasetStorePort>,
}

impl DatasetService {
    pub fn new(store: Arc<dyn DatasetStorePort>) -> Self {
        Self { store }
    }

    pub async fn info(&self) -> DomainResult<DatasetInfo> {
        let mut info = DatasetInfo::default();
        for split in DatasetSplit::ALL {
            info.set(split, self.store.split_stats(split).await?);
        }
        Ok(info)
    }

    /// Guarda las imágenes aceptadas y devuelve sus nombres finales.
    /// Se descartan sin error los ficheros sin nombre o cuyo content-type no es `image/*`.
    /// Un fallo al escribir un fichero no aborta el resto: simplemente no aparece en la respuesta.
    pub async fn upload(&self, split: DatasetSplit, files: Vec<UploadedFile>) -> DomainResult<Vec<String>> {
        let mut saved = Vec::new();
        for file in files {
            let is_image = file
                .content_type
                .as_deref()
                .is_some_and(|ct| ct.starts_with("image/"));
            let Some(name) = file.filename.as_deref().filter(|n| !n.is_empty()) else {
                continue;
            };
            if !is_image {
                continue;
            }
            let Some(base) = upload_basename(name) else {
                warn!("Nombre de fichero descartado: {:?}", name);
                continue;
            };

            match self.store.save_file(split, &base, &file.bytes).await {
                Ok(()) => saved.push(base),
                Err(e) => warn!("No se pudo guardar {} en {}: {}", base, split, e),
            }
        }
        info!("📥 {} ficheros guardados en '{}'", saved.len(), split);
        Ok(saved)
    }
}

/// Último componente de la ruta enviada por el cliente.
/// `None` si no queda un nombre de fichero utilizable (`..`, `/`, `dir/`...).
pub fn upload_basename(name: &str) -> Option<String> {
    if name.ends_with('/') {
        return None;
    }
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

/// Orquestador de la inferencia sobre una imagen suelta.
#[derive(Clone)]
pub struct InferenceService {
    predictor: Arc<dyn PredictorPort>,
    model_catalog: Arc<dyn ModelCatalogPort>,
    model: ModelId,
}

impl InferenceService {
    pub fn new(
        predictor: Arc<dyn PredictorPort>,
        model_catalog: Arc<dyn ModelCatalogPort>,
        model: ModelId,
    ) -> Self {
        Self { predictor, model_catalog, model }
    }

    /// Comprueba que el modelo configurado existe.
    pub async fn check_model(&self) -> DomainResult<()> {
        self.model_catalog.validate_model(&self.model).await
    }

    pub async fn predict(&self, image: Vec<u8>, threshold: f32) -> DomainResult<Vec<Detection>> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(DomainError::InvalidInput(format!(
                "confidence must be within [0, 1], got {threshold}"
            )));
        }
        if image.is_empty() {
            return Err(DomainError::InvalidInput("empty image".into()));
        }
        if let Err(e) = self.check_model().await {
            return Err(DomainError::Unavailable(e.to_string()));
        }
        let detections = self.predictor.detect(image).await?;
        Ok(filter_by_confidence(detections, threshold))
    }
}

/// Lanza y consulta el trabajo de entrenamiento en segundo plano.
#[derive(Clone)]
pub struct TrainingService {
    trainer: Arc<dyn TrainerPort>,
}

impl TrainingService {
    pub fn new(trainer: Arc<dyn TrainerPort>) -> Self {
        Self { trainer }
    }

    pub async fn start(&self, params: TrainingParams) -> DomainResult<()> {
        if params.epochs == 0 || params.batch_size == 0 {
            return Err(DomainError::InvalidInput("epochs and batchSize must be positive".into()));
        }
        if !(params.learning_rate.is_finite() && params.learning_rate > 0.0) {
            return Err(DomainError::InvalidInput("learningRate must be positive".into()));
        }
        self.trainer.start(params).await
    }

    pub async fn status(&self) -> DomainResult<TrainingStatus> {
        self.trainer.status().await
    }
}
