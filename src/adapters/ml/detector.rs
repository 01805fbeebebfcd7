use anyhow::{anyhow, Context, Result};
use burn::tensor::activation::{sigmoid, softmax};
use burn::tensor::{backend::Backend, Tensor, TensorData};
use image::RgbImage;
use std::path::Path;

use super::model::{load_model, DetectorModel, DetectorModelConfig};
use super::transform::ImageTransform;
use crate::domain::detection::{non_max_suppression, Detection, Predictions};
use crate::domain::errors::DomainError;
use crate::domain::model::YoloParams;

/// Cualquier modelo capaz de producir detecciones en coordenadas de píxel de la imagen original.
pub trait Detector: Send {
    fn num_classes(&self) -> usize;
    /// Detecciones ordenadas por score descendente, sin filtrar por el umbral del usuario.
    fn detect(&mut self, rgb: &RgbImage) -> Result<Vec<Detection>>;
}

pub struct BurnDetector<B: Backend> {
    model: DetectorModel<B>,
    transform: ImageTransform,
    device: B::Device,
    params: YoloParams,
    class_names: Vec<String>,
}

impl<B: Backend> BurnDetector<B> {
    pub fn new(model: DetectorModel<B>, params: YoloParams, class_names: Vec<String>, device: B::Device) -> Self {
        Self {
            model,
            transform: ImageTransform::new(params.input_size),
            device,
            params,
            class_names,
        }
    }

    pub fn from_checkpoint(
        cfg: &DetectorModelConfig,
        path: &Path,
        params: YoloParams,
        class_names: Vec<String>,
    ) -> Result<Self> {
        let device = B::Device::default();
        let model = load_model::<B>(cfg, path, &device)?;
        Ok(Self::new(model, params, class_names, device))
    }

    fn label(&self, class_id: usize) -> String {
        self.class_names
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("class_{class_id}"))
    }

    fn decode(&self, rgb: &RgbImage, objectness: Vec<f32>, boxes: Vec<f32>, probs: Vec<f32>) -> Vec<Detection> {
        let grid = self.model.grid_size();
        let classes = self.model.num_classes();
        let (img_w, img_h) = (rgb.width() as f32, rgb.height() as f32);

        let mut detections = Vec::new();
        for cell in 0..grid * grid {
            let cls = &probs[cell * classes..(cell + 1) * classes];
            let Some((class_id, &p)) = cls.iter().enumerate().max_by(|a, b| a.1.total_cmp(b.1)) else {
                continue;
            };
            let score = objectness[cell] * p;
            if score <= self.params.conf_threshold {
                continue;
            }

            let (row, col) = (cell / grid, cell % grid);
            let b = &boxes[cell * 4..cell * 4 + 4];
            let cx = (col as f32 + b[0]) / grid as f32;
            let cy = (row as f32 + b[1]) / grid as f32;
            let (w, h) = (b[2], b[3]);

            detections.push(Detection {
                x1: ((cx - w / 2.0) * img_w).clamp(0.0, img_w),
                y1: ((cy - h / 2.0) * img_h).clamp(0.0, img_h),
                x2: ((cx + w / 2.0) * img_w).clamp(0.0, img_w),
                y2: ((cy + h / 2.0) * img_h).clamp(0.0, img_h),
                score,
                class_id,
                label: self.label(class_id),
            });
        }

        let mut kept = non_max_suppression(detections, self.params.iou_threshold);
        kept.truncate(self.params.max_detections);
        kept
    }
}

impl<B: Backend> Detector for BurnDetector<B>
where
    B::Device: Send,
    DetectorModel<B>: Send,
{
    fn num_classes(&self) -> usize {
        self.model.num_classes()
    }

    fn detect(&mut self, rgb: &RgbImage) -> Result<Vec<Detection>> {
        let input = self.transform.apply(rgb);
        let [c, h, w] = input.dims();
        let images = Tensor::<B, 4>::from_data(TensorData::new(input.data, [1, c, h, w]), &self.device);

        let out = self.model.forward(images);
        let objectness = to_vec(sigmoid(out.objectness))?;
        let boxes = to_vec(sigmoid(out.boxes))?;
        let probs = to_vec(softmax(out.class_logits, 2))?;

        Ok(self.decode(rgb, objectness, boxes, probs))
    }
}

fn to_vec<B: Backend, const D: usize>(t: Tensor<B, D>) -> Result<Vec<f32>> {
    t.into_data()
        .to_vec::<f32>()
        .map_err(|e| anyhow!("failed to read tensor: {e:?}"))
}

pub fn load_rgb(path: &Path) -> Result<RgbImage> {
    if !path.exists() {
        return Err(DomainError::NotFound(format!("image not found: {}", path.display())).into());
    }
    let img = image::open(path).with_context(|| format!("failed to decode image {}", path.display()))?;
    Ok(img.to_rgb8())
}

/// Ejecuta el detector sobre una imagen en disco y conserva las detecciones con
/// `score >= threshold`, en el mismo orden que las produjo el modelo.
pub fn predict(detector: &mut dyn Detector, image_path: &Path, threshold: f32) -> Result<Predictions> {
    let rgb = load_rgb(image_path)?;
    let detections = detector.detect(&rgb)?;
    let kept = crate::domain::detection::filter_by_confidence(detections, threshold);
    Ok(Predictions::from(kept.as_slice()))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<Detection>);

    impl Detector for Fixed {
        fn num_classes(&self) -> usize {
            2
        }

        fn detect(&mut self, _rgb: &RgbImage) -> Result<Vec<Detection>> {
            Ok(self.0.clone())
        }
    }

    fn det(score: f32) -> Detection {
        Detection { x1: 0.0, y1: 0.0, x2: 1.0, y2: 1.0, score, class_id: 1, label: "b".into() }
    }

    #[test]
    fn predict_filters_by_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img.png");
        RgbImage::new(4, 4).save(&path).unwrap();

        let mut detector = Fixed(vec![det(0.95), det(0.5), det(0.9)]);
        let p = predict(&mut detector, &path, 0.9).unwrap();
        assert_eq!(p.scores, vec![0.95, 0.9]);
        assert_eq!(p.labels, vec![1, 1]);
    }

    #[test]
    fn missing_image_is_not_found() {
        let mut detector = Fixed(Vec::new());
        let err = predict(&mut detector, Path::new("does/not/exist.jpg"), 0.5).unwrap_err();
        assert!(matches!(err.downcast_ref::<DomainError>(), Some(DomainError::NotFound(_))));
    }
}
