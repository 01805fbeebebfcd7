use anyhow::{bail, Result};
use burn::tensor::{backend::Backend, Tensor, TensorData};

use crate::domain::dataset::{ImageTensor, Sample, Target};

/// Lote en secuencias alineadas: `images[i]` y `targets[i]` son la misma muestra.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    pub images: Vec<ImageTensor>,
    pub targets: Vec<Target>,
}

/// Agrupa muestras individuales en un `Batch`, conservando el orden de entrada.
pub fn collate_batch(samples: Vec<Sample>) -> Batch {
    let mut batch = Batch {
        images: Vec::with_capacity(samples.len()),
        targets: Vec::with_capacity(samples.len()),
    };
    for sample in samples {
        batch.images.push(sample.image);
        batch.targets.push(sample.target);
    }
    batch
}

/// Objetivos por celda de la rejilla `grid x grid` (celda = fila * grid + columna).
#[derive(Debug, Clone)]
pub struct EncodedTargets<B: Backend> {
    /// [batch, cells]: 1.0 si la celda es responsable de un objeto.
    pub objectness: Tensor<B, 2>,
    /// [batch, cells, num_classes], one-hot en celdas positivas.
    pub class_onehot: Tensor<B, 3>,
    /// [batch, cells, 4]: (dx, dy) del centro dentro de la celda y (w, h) normalizados.
    pub boxes: Tensor<B, 3>,
    /// [batch, cells, 4]: 1.0 en celdas positivas.
    pub box_weights: Tensor<B, 3>,
    pub num_positive: usize,
}

#[derive(Debug, Clone)]
pub struct BatchTensors<B: Backend> {
    /// [batch, 3, H, W]
    pub images: Tensor<B, 4>,
    pub targets: EncodedTargets<B>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn to_tensors<B: Backend>(
        &self,
        grid: usize,
        num_classes: usize,
        device: &B::Device,
    ) -> Result<BatchTensors<B>> {
        if self.is_empty() {
            bail!("cannot collate empty batch");
        }
        let [channels, height, width] = self.images[0].dims();
        let mut image_buf = Vec::with_capacity(self.len() * channels * height * width);
        for (i, img) in self.images.iter().enumerate() {
            if img.dims() != [channels, height, width] {
                bail!(
                    "image dimensions differ within batch: sample {i} is {:?}, expected {:?}",
                    img.dims(),
                    [channels, height, width]
                );
            }
            image_buf.extend_from_slice(&img.data);
        }

        let images = Tensor::<B, 4>::from_data(
            TensorData::new(image_buf, [self.len(), channels, height, width]),
            device,
        );
        let targets = encode_targets::<B>(&self.targets, grid, num_classes, device)?;
        Ok(BatchTensors { images, targets })
    }
}

/// Asigna cada caja a la celda que contiene su centro. Si dos cajas caen en la misma
/// celda, prevalece la última.
pub fn encode_targets<B: Backend>(
    targets: &[Target],
    grid: usize,
    num_classes: usize,
    device: &B::Device,
) -> Result<EncodedTargets<B>> {
    if grid == 0 || num_classes == 0 {
        bail!("grid and num_classes must be positive");
    }
    let batch = targets.len();
    let cells = grid * grid;

    let mut obj = vec![0.0f32; batch * cells];
    let mut onehot = vec![0.0f32; batch * cells * num_classes];
    let mut boxes = vec![0.0f32; batch * cells * 4];
    let mut weights = vec![0.0f32; batch * cells * 4];

    for (b, target) in targets.iter().enumerate() {
        if target.boxes.len() != target.labels.len() {
            bail!("sample {b}: {} boxes but {} labels", target.boxes.len(), target.labels.len());
        }
        for (bbox, &class_id) in target.boxes.iter().zip(&target.labels) {
            if class_id >= num_classes {
                bail!("sample {b}: class id {class_id} out of range (num_classes {num_classes})");
            }
            let (cx, cy) = bbox.center();
            let gx = cx.clamp(0.0, 1.0) * grid as f32;
            let gy = cy.clamp(0.0, 1.0) * grid as f32;
            let col = (gx as usize).min(grid - 1);
            let row = (gy as usize).min(grid - 1);
            let cell = b * cells + row * grid + col;

            obj[cell] = 1.0;
            let cls = &mut onehot[cell * num_classes..(cell + 1) * num_classes];
            cls.fill(0.0);
            cls[class_id] = 1.0;
            boxes[cell * 4..cell * 4 + 4].copy_from_slice(&[
                (gx - col as f32).clamp(0.0, 1.0),
                (gy - row as f32).clamp(0.0, 1.0),
                bbox.width().clamp(0.0, 1.0),
                bbox.height().clamp(0.0, 1.0),
            ]);
            weights[cell * 4..cell * 4 + 4].fill(1.0);
        }
    }

    let num_positive = obj.iter().filter(|v| **v > 0.0).count();
    Ok(EncodedTargets {
        objectness: Tensor::from_data(TensorData::new(obj, [batch, cells]), device),
        class_onehot: Tensor::from_data(TensorData::new(onehot, [batch, cells, num_classes]), device),
        boxes: Tensor::from_data(TensorData::new(boxes, [batch, cells, 4]), device),
        box_weights: Tensor::from_data(TensorData::new(weights, [batch, cells, 4]), device),
        num_positive,
    })
}
