use async_trait::async_trait;
use crate::domain::{
    dataset::{DatasetSplit, SplitStats},
    detection::Detection,
    errors::DomainResult,
    model::ModelId,
    training::{TrainingParams, TrainingStatus},
};

#[async_trait]
pub trait DatasetStorePort: Send + Sync {
    /// `None` si la carpeta del split no contiene ficheros.
    async fn split_stats(&self, split: DatasetSplit) -> DomainResult<Option<SplitStats>>;
    /// Escribe (o sobrescribe) `filename` dentro de la carpeta del split.
    async fn save_file(&self, split: DatasetSplit, filename: &str, bytes: &[u8]) -> DomainResult<()>;
}

#[async_trait]
pub trait ModelCatalogPort: Send + Sync {
    async fn validate_model(&self, model: &ModelId) -> DomainResult<()>;
}

#[async_trait]
pub trait PredictorPort: Send + Sync {
    /// Detecciones sin filtrar por confianza, en el orden que produce el modelo.
    async fn detect(&self, image: Vec<u8>) -> DomainResult<Vec<Detection>>;
}

#[async_trait]
pub trait TrainerPort: Send + Sync {
    async fn start(&self, params: TrainingParams) -> DomainResult<()>;
    async fn status(&self) -> DomainResult<TrainingStatus>;
}
