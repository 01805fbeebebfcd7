use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingParams {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self { epochs: 10, batch_size: 4, learning_rate: 1e-3 }
    }
}

/// Pérdidas medias de una época (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpochMetrics {
    pub epoch: usize,
    pub loss: f32,
    pub valid_loss: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub epochs: Vec<EpochMetrics>,
}

impl TrainingReport {
    pub fn last(&self) -> Option<&EpochMetrics> {
        self.epochs.last()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingState {
    Idle,
    Training,
    Completed,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingStatus {
    pub status: TrainingState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<EpochMetrics>,
}

impl Default for TrainingStatus {
    fn default() -> Self {
        Self { status: TrainingState::Idle, progress: None, error: None, metrics: None }
    }
}

impl TrainingStatus {
    pub fn is_running(&self) -> bool {
        self.status == TrainingState::Training
    }
}
