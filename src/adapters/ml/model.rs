//! Detector de una sola etapa sobre rejilla.
//!
//! El backbone es un bloque convolucional intercambiable: puede cargarse desde un
//! fichero de pesos preentrenados y reutilizarse con cualquier número de clases
//! sustituyendo únicamente la cabeza.

use anyhow::{anyhow, bail, Result};
use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig};
use burn::nn::PaddingConfig2d;
use burn::record::{BinFileRecorder, FullPrecisionSettings};
use burn::tensor::activation::relu;
use burn::tensor::{backend::Backend, Tensor};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::TrainingConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct DetectorModelConfig {
    pub num_classes: usize,
    pub grid_size: usize,
    /// Canales de salida de cada etapa del backbone (cada etapa reduce a la mitad).
    pub channels: Vec<usize>,
    pub backbone_weights: Option<PathBuf>,
}

impl DetectorModelConfig {
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            grid_size: 10,
            channels: vec![16, 32, 64, 128],
            backbone_weights: None,
        }
    }

    pub fn with_grid_size(mut self, grid_size: usize) -> Self {
        self.grid_size = grid_size;
        self
    }

    pub fn with_backbone_weights(mut self, path: Option<PathBuf>) -> Self {
        self.backbone_weights = path;
        self
    }
}

impl From<&TrainingConfig> for DetectorModelConfig {
    fn from(cfg: &TrainingConfig) -> Self {
        Self::new(cfg.num_classes)
            .with_grid_size(cfg.grid_size)
            .with_backbone_weights(cfg.backbone_weights.clone())
    }
}

#[derive(Module, Debug)]
pub struct Backbone<B: Backend> {
    stages: Vec<Conv2d<B>>,
    pool: AdaptiveAvgPool2d,
    out_channels: usize,
}

impl<B: Backend> Backbone<B> {
    pub fn new(channels: &[usize], grid_size: usize, device: &B::Device) -> Self {
        let mut stages = Vec::with_capacity(channels.len());
        let mut in_ch = 3;
        for &out_ch in channels {
            stages.push(
                Conv2dConfig::new([in_ch, out_ch], [3, 3])
                    .with_stride([2, 2])
                    .with_padding(PaddingConfig2d::Explicit(1, 1))
                    .init(device),
            );
            in_ch = out_ch;
        }
        Self {
            stages,
            pool: AdaptiveAvgPool2dConfig::new([grid_size, grid_size]).init(),
            out_channels: in_ch,
        }
    }

    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    /// [B, 3, H, W] -> [B, C, grid, grid]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        let mut x = images;
        for stage in &self.stages {
            x = relu(stage.forward(x));
        }
        self.pool.forward(x)
    }
}

/// Cabeza por celda: `cls_score` da `num_classes` logits, `bbox_pred` da objectness + 4 de caja.
#[derive(Module, Debug)]
pub struct DetectionHead<B: Backend> {
    cls_score: Conv2d<B>,
    bbox_pred: Conv2d<B>,
    num_classes: usize,
}

impl<B: Backend> DetectionHead<B> {
    pub fn new(in_channels: usize, num_classes: usize, device: &B::Device) -> Self {
        Self {
            cls_score: Conv2dConfig::new([in_channels, num_classes], [1, 1]).init(device),
            bbox_pred: Conv2dConfig::new([in_channels, 5], [1, 1]).init(device),
            num_classes,
        }
    }

    pub fn forward(&self, features: Tensor<B, 4>) -> DetectorOutput<B> {
        let [batch, _, gh, gw] = features.dims();
        let cells = gh * gw;

        let class_logits = self
            .cls_score
            .forward(features.clone())
            .reshape([batch, self.num_classes, cells])
            .swap_dims(1, 2);
        let reg = self.bbox_pred.forward(features).reshape([batch, 5, cells]).swap_dims(1, 2);

        let objectness = reg.clone().slice([0..batch, 0..cells, 0..1]).reshape([batch, cells]);
        let boxes = reg.slice([0..batch, 0..cells, 1..5]);

        DetectorOutput { objectness, boxes, class_logits }
    }
}

/// Salida cruda (sin activar) del detector.
#[derive(Debug, Clone)]
pub struct DetectorOutput<B: Backend> {
    /// [batch, cells]
    pub objectness: Tensor<B, 2>,
    /// [batch, cells, 4]
    pub boxes: Tensor<B, 3>,
    /// [batch, cells, num_classes]
    pub class_logits: Tensor<B, 3>,
}

#[derive(Module, Debug)]
pub struct DetectorModel<B: Backend> {
    backbone: Backbone<B>,
    head: DetectionHead<B>,
    grid_size: usize,
}

impl<B: Backend> DetectorModel<B> {
    pub fn forward(&self, images: Tensor<B, 4>) -> DetectorOutput<B> {
        self.head.forward(self.backbone.forward(images))
    }

    pub fn num_classes(&self) -> usize {
        self.head.num_classes
    }

    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    pub fn backbone(&self) -> &Backbone<B> {
        &self.backbone
    }

    /// Conserva el backbone y crea una cabeza nueva (sin entrenar) para `num_classes`.
    pub fn replace_head(self, num_classes: usize, device: &B::Device) -> Result<Self> {
        if num_classes == 0 {
            bail!("num_classes must be positive");
        }
        let head = DetectionHead::new(self.backbone.out_channels(), num_classes, device);
        Ok(Self { head, ..self })
    }
}

/// Construye el detector. Si hay `backbone_weights`, el backbone se carga desde ese fichero.
pub fn create_model<B: Backend>(cfg: &DetectorModelConfig, device: &B::Device) -> Result<DetectorModel<B>> {
    if cfg.num_classes == 0 {
        bail!("num_classes must be positive");
    }
    if cfg.grid_size == 0 || cfg.channels.is_empty() {
        bail!("grid_size and backbone channels must be non-empty");
    }

    let mut backbone = Backbone::new(&cfg.channels, cfg.grid_size, device);
    match &cfg.backbone_weights {
        Some(path) => {
            backbone = backbone
                .load_file(path.clone(), &recorder(), device)
                .map_err(|e| anyhow!("failed to load backbone weights {}: {e}", path.display()))?;
            info!("Backbone cargado desde {}", path.display());
        }
        None => warn!("Backbone sin pesos preentrenados: inicialización aleatoria"),
    }

    let head = DetectionHead::new(backbone.out_channels(), cfg.num_classes, device);
    Ok(DetectorModel { backbone, head, grid_size: cfg.grid_size })
}

/// Ruta real en disco: el recorder fuerza la extensión `.bin`.
pub fn checkpoint_file(path: &Path) -> PathBuf {
    path.with_extension("bin")
}

pub fn save_model<B: Backend>(model: DetectorModel<B>, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    model
        .save_file(path.to_path_buf(), &recorder())
        .map_err(|e| anyhow!("failed to save model {}: {e}", path.display()))
}

/// Guarda solo el backbone, para usarlo como `backbone_weights` en otro entrenamiento.
pub fn save_backbone<B: Backend>(model: &DetectorModel<B>, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    model
        .backbone
        .clone()
        .save_file(path.to_path_buf(), &recorder())
        .map_err(|e| anyhow!("failed to save backbone {}: {e}", path.display()))
}

pub fn load_model<B: Backend>(cfg: &DetectorModelConfig, path: &Path, device: &B::Device) -> Result<DetectorModel<B>> {
    let file = checkpoint_file(path);
    if !file.exists() {
        bail!("checkpoint not found: {}", file.display());
    }
    let blank = DetectorModelConfig { backbone_weights: None, ..cfg.clone() };
    let backbone = Backbone::new(&blank.channels, blank.grid_size, device);
    let head = DetectionHead::new(backbone.out_channels(), blank.num_classes, device);
    DetectorModel { backbone, head, grid_size: blank.grid_size }
        .load_file(path.to_path_buf(), &recorder(), device)
        .map_err(|e| anyhow!("failed to load model {}: {e}", file.display()))
}

fn recorder() -> BinFileRecorder<FullPrecisionSettings> {
    BinFileRecorder::<FullPrecisionSettings>::new()
}
