use anyhow::{bail, Result};
use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::backend::Backend;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::info;

use super::collate::{collate_batch, Batch};
use super::dataset::YoloDataset;
use super::loss::{detection_loss, scalar};
use super::model::{create_model, DetectorModel, DetectorModelConfig};
use super::transform::ImageTransform;
use super::{AutodiffBackend, TrainBackend};
use crate::config::TrainingConfig;
use crate::domain::training::{EpochMetrics, TrainingReport};

#[derive(Debug)]
pub struct TrainedModel {
    pub model: DetectorModel<TrainBackend>,
    pub config: DetectorModelConfig,
    pub report: TrainingReport,
}

/// Entrena sobre `train_dir/{images,labels}` y valida sobre `valid_dir/{images,labels}`.
/// Cualquier lote defectuoso aborta el entrenamiento completo.
pub fn train_model(cfg: &TrainingConfig, observer: &mut dyn FnMut(&EpochMetrics)) -> Result<TrainedModel> {
    let device = <AutodiffBackend as Backend>::Device::default();
    let transform = ImageTransform::new(cfg.input_size);

    let train = YoloDataset::from_split_dir(&cfg.train_dir, transform.clone())?;
    let valid = YoloDataset::from_split_dir(&cfg.valid_dir, transform)?;
    if train.is_empty() {
        bail!("no training images under {}", cfg.train_dir.join("images").display());
    }
    if valid.is_empty() {
        bail!("no validation images under {}", cfg.valid_dir.join("images").display());
    }

    let model_cfg = DetectorModelConfig::from(cfg);
    let mut model = create_model::<AutodiffBackend>(&model_cfg, &device)?;
    let mut optim = AdamConfig::new().init();
    let mut rng = match cfg.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    info!(
        "Entrenando {} épocas: {} imágenes de entrenamiento, {} de validación, {} clases",
        cfg.epochs,
        train.len(),
        valid.len(),
        cfg.num_classes
    );

    let batch_size = cfg.batch_size.max(1);
    let mut order: Vec<usize> = (0..train.len()).collect();
    let mut report = TrainingReport::default();

    for epoch in 1..=cfg.epochs {
        order.shuffle(&mut rng);

        let mut train_loss = 0.0f32;
        let mut train_batches = 0usize;
        for chunk in order.chunks(batch_size) {
            let batch = load_batch(&train, chunk)?;
            let tensors = batch.to_tensors::<AutodiffBackend>(model_cfg.grid_size, cfg.num_classes, &device)?;
            let output = model.forward(tensors.images);
            let loss = detection_loss(output, tensors.targets).total();
            train_loss += scalar(loss.clone().detach());

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(cfg.learning_rate, model, grads);
            train_batches += 1;
        }

        let valid_loss = validation_loss(&model.valid(), &valid, batch_size, &model_cfg)?;
        let metrics = EpochMetrics {
            epoch,
            loss: train_loss / train_batches.max(1) as f32,
            valid_loss,
        };
        info!(
            "Época {}/{} | pérdida entrenamiento {:.4} | pérdida validación {:.4}",
            epoch, cfg.epochs, metrics.loss, metrics.valid_loss
        );
        observer(&metrics);
        report.epochs.push(metrics);
    }

    Ok(TrainedModel { model: model.valid(), config: model_cfg, report })
}

/// Pérdida media por lote, sin gradientes y en orden fijo.
pub fn validation_loss<B: Backend>(
    model: &DetectorModel<B>,
    dataset: &YoloDataset,
    batch_size: usize,
    cfg: &DetectorModelConfig,
) -> Result<f32> {
    let device = B::Device::default();
    let indices: Vec<usize> = (0..dataset.len()).collect();
    let mut total = 0.0f32;
    let mut batches = 0usize;
    for chunk in indices.chunks(batch_size.max(1)) {
        let batch = load_batch(dataset, chunk)?;
        let tensors = batch.to_tensors::<B>(cfg.grid_size, cfg.num_classes, &device)?;
        let output = model.forward(tensors.images);
        total += scalar(detection_loss(output, tensors.targets).total());
        batches += 1;
    }
    Ok(total / batches.max(1) as f32)
}

fn load_batch(dataset: &YoloDataset, indices: &[usize]) -> Result<Batch> {
    let samples = indices
        .iter()
        .map(|&i| dataset.get(i))
        .collect::<Result<Vec<_>>>()?;
    Ok(collate_batch(samples))
}
