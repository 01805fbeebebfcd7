use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::domain::{
    dataset::DatasetSplit,
    model::{Architecture, InferenceConfig, ModelId, YoloParams},
    training::TrainingParams,
};

pub const DEFAULT_CONFIG_NAME: &str = "ai-vision.toml";
pub const CONFIG_ENV: &str = "AI_VISION_CONFIG";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub datasets: DatasetsConfig,
    pub training: TrainingConfig,
    pub inference: InferenceSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Carpeta con el frontend compilado; se sirve como fallback si existe.
    pub static_dir: Option<PathBuf>,
    pub max_upload_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3001,
            static_dir: None,
            max_upload_mb: 256,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatasetsConfig {
    pub root: PathBuf,
}

impl Default for DatasetsConfig {
    fn default() -> Self {
        Self { root: PathBuf::from("datasets") }
    }
}

impl DatasetsConfig {
    pub fn upload_folders(&self) -> UploadFolders {
        UploadFolders::under(&self.root)
    }
}

/// Carpeta de destino de cada split. Se construye una vez al arrancar y se pasa al store.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFolders {
    pub train: PathBuf,
    pub valid: PathBuf,
    pub test: PathBuf,
}

impl UploadFolders {
    pub fn under(root: &Path) -> Self {
        Self {
            train: root.join(DatasetSplit::Train.as_str()),
            valid: root.join(DatasetSplit::Valid.as_str()),
            test: root.join(DatasetSplit::Test.as_str()),
        }
    }

    pub fn folder(&self, split: DatasetSplit) -> &Path {
        match split {
            DatasetSplit::Train => &self.train,
            DatasetSplit::Valid => &self.valid,
            DatasetSplit::Test => &self.test,
        }
    }

    pub fn ensure(&self) -> std::io::Result<()> {
        for split in DatasetSplit::ALL {
            std::fs::create_dir_all(self.folder(split))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Debe contener `images/` y `labels/`.
    pub train_dir: PathBuf,
    pub valid_dir: PathBuf,
    pub num_classes: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub input_size: u32,
    pub grid_size: usize,
    pub backbone_weights: Option<PathBuf>,
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        let params = TrainingParams::default();
        Self {
            train_dir: PathBuf::from("data/train"),
            valid_dir: PathBuf::from("data/valid"),
            num_classes: 2,
            epochs: params.epochs,
            batch_size: params.batch_size,
            learning_rate: params.learning_rate,
            input_size: 320,
            grid_size: 10,
            backbone_weights: None,
            seed: None,
        }
    }
}

impl TrainingConfig {
    pub fn params(&self) -> TrainingParams {
        TrainingParams {
            epochs: self.epochs,
            batch_size: self.batch_size,
            learning_rate: self.learning_rate,
        }
    }

    pub fn with_params(mut self, params: TrainingParams) -> Self {
        self.epochs = params.epochs;
        self.batch_size = params.batch_size;
        self.learning_rate = params.learning_rate;
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InferenceSettings {
    pub architecture: Architecture,
    /// Pesos guardados tras entrenar (arquitectura `detector`).
    pub checkpoint: PathBuf,
    /// Modelo YOLO exportado (arquitectura `yolo`).
    pub onnx_path: PathBuf,
    pub confidence: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
    pub class_names: Vec<String>,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            architecture: Architecture::Detector,
            checkpoint: PathBuf::from("checkpoints/detector.bin"),
            onnx_path: PathBuf::from("models/yolov8n.onnx"),
            confidence: 0.5,
            iou_threshold: 0.45,
            max_detections: 100,
            class_names: Vec::new(),
        }
    }
}

impl AppConfig {
    /// `AI_VISION_CONFIG` si está definida; si no `ai-vision.toml` en el directorio actual;
    /// si tampoco existe, valores por defecto.
    pub fn load() -> anyhow::Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::from_path(Path::new(&path));
        }
        let default = Path::new(DEFAULT_CONFIG_NAME);
        if default.exists() {
            return Self::from_path(default);
        }
        Ok(Self::default())
    }

    pub fn load_or(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => Self::from_path(p),
            None => Self::load(),
        }
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.training.num_classes == 0 {
            anyhow::bail!("training.num_classes must be positive");
        }
        if self.training.grid_size == 0 || self.training.input_size == 0 {
            anyhow::bail!("training.grid_size and training.input_size must be positive");
        }
        if !(0.0..=1.0).contains(&self.inference.confidence) {
            anyhow::bail!("inference.confidence must be within [0, 1]");
        }
        Ok(())
    }

    pub fn inference_config(&self) -> InferenceConfig {
        let path = match self.inference.architecture {
            Architecture::Detector => self.inference.checkpoint.clone(),
            Architecture::Yolo => self.inference.onnx_path.clone(),
        };
        let input_size = match self.inference.architecture {
            Architecture::Detector => self.training.input_size,
            Architecture::Yolo => YoloParams::default().input_size,
        };
        InferenceConfig {
            model: ModelId { architecture: self.inference.architecture, path },
            params: YoloParams {
                input_size,
                iou_threshold: self.inference.iou_threshold,
                max_detections: self.inference.max_detections,
                ..YoloParams::default()
            },
            num_classes: self.training.num_classes,
            class_names: self.inference.class_names.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_deployment() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.server.port, 3001);
        let folders = cfg.datasets.upload_folders();
        assert_eq!(folders.folder(DatasetSplit::Valid), Path::new("datasets/valid"));
        assert_eq!(cfg.training.params(), TrainingParams::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let cfg = AppConfig::from_toml(
            r#"
            [server]
            port = 8080

            [training]
            num_classes = 5
            seed = 7

            [inference]
            architecture = "yolo"
            onnx_path = "models/custom.onnx"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.training.num_classes, 5);
        assert_eq!(cfg.training.seed, Some(7));
        assert_eq!(cfg.training.epochs, 10);

        let infer = cfg.inference_config();
        assert_eq!(infer.model.architecture, Architecture::Yolo);
        assert_eq!(infer.model.path, PathBuf::from("models/custom.onnx"));
        assert_eq!(infer.params.input_size, 640);
    }

    #[test]
    fn zero_classes_is_rejected() {
        assert!(AppConfig::from_toml("[training]\nnum_classes = 0\n").is_err());
    }
}
