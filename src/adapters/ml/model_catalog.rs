use async_trait::async_trait;

use super::model::checkpoint_file;
use crate::application::ports::ModelCatalogPort;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::{Architecture, ModelId};

/// Comprueba en disco que el modelo configurado existe antes de cargarlo.
pub struct FileModelCatalog;

impl FileModelCatalog {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FileModelCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelCatalogPort for FileModelCatalog {
    async fn validate_model(&self, model: &ModelId) -> DomainResult<()> {
        if model.path.as_os_str().is_empty() {
            return Err(DomainError::InvalidInput("model path empty".into()));
        }
        let file = match model.architecture {
            Architecture::Detector => checkpoint_file(&model.path),
            Architecture::Yolo => model.path.clone(),
        };
        if !tokio::fs::try_exists(&file).await.unwrap_or(false) {
            return Err(DomainError::NotFound(format!("model file not found: {}", file.display())));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn detector_checkpoint_is_resolved_with_bin_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("weights.bin"), b"x").unwrap();

        let catalog = FileModelCatalog::new();
        let model = ModelId { architecture: Architecture::Detector, path: dir.path().join("weights") };
        assert!(catalog.validate_model(&model).await.is_ok());

        let yolo = ModelId { architecture: Architecture::Yolo, path: dir.path().join("weights") };
        assert!(matches!(catalog.validate_model(&yolo).await, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn empty_path_is_invalid() {
        let model = ModelId { architecture: Architecture::Yolo, path: PathBuf::new() };
        let res = FileModelCatalog::new().validate_model(&model).await;
        assert!(matches!(res, Err(DomainError::InvalidInput(_))));
    }
}
