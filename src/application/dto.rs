use serde::{Deserialize, Serialize};

use crate::domain::{detection::Detection, training::TrainingParams};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub files: Vec<String>,
}

impl UploadResponse {
    pub fn saved(files: Vec<String>) -> Self {
        Self {
            success: true,
            message: format!("Successfully uploaded {} files", files.len()),
            files,
        }
    }
}

/// Campos opcionales: lo que falte se toma de la sección `[training]` de la configuración.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainStartRequest {
    pub epochs: Option<usize>,
    pub batch_size: Option<usize>,
    pub learning_rate: Option<f64>,
}

impl TrainStartRequest {
    pub fn resolve(&self, defaults: TrainingParams) -> TrainingParams {
        TrainingParams {
            epochs: self.epochs.unwrap_or(defaults.epochs),
            batch_size: self.batch_size.unwrap_or(defaults.batch_size),
            learning_rate: self.learning_rate.unwrap_or(defaults.learning_rate),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionDto {
    pub label: String,
    pub class_id: usize,
    pub confidence: f32,
    pub bbox: [f32; 4],
}

impl From<Detection> for PredictionDto {
    fn from(d: Detection) -> Self {
        Self {
            bbox: [d.x1, d.y1, d.x2, d.y2],
            label: d.label,
            class_id: d.class_id,
            confidence: d.score,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predictions: Vec<PredictionDto>,
}
