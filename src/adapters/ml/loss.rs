use burn::tensor::activation::{log_softmax, sigmoid};
use burn::tensor::{backend::Backend, Tensor};

use super::collate::EncodedTargets;
use super::model::DetectorOutput;

const EPS: f32 = 1e-6;

/// Términos de la pérdida de detección, cada uno como escalar de rango 1.
#[derive(Debug, Clone)]
pub struct LossTerms<B: Backend> {
    /// BCE sobre todas las celdas.
    pub objectness: Tensor<B, 1>,
    /// Entropía cruzada en celdas positivas.
    pub classification: Tensor<B, 1>,
    /// L1 sobre la caja en celdas positivas.
    pub localization: Tensor<B, 1>,
}

impl<B: Backend> LossTerms<B> {
    pub fn total(self) -> Tensor<B, 1> {
        self.objectness + self.classification + self.localization
    }
}

pub fn detection_loss<B: Backend>(output: DetectorOutput<B>, targets: EncodedTargets<B>) -> LossTerms<B> {
    let [batch, cells] = targets.objectness.dims();
    let positives = targets.num_positive.max(1) as f32;

    let p = sigmoid(output.objectness).clamp(EPS, 1.0 - EPS);
    let t = targets.objectness;
    let objectness = -((t.clone() * p.clone().log()) + (t.neg().add_scalar(1.0) * p.neg().add_scalar(1.0).log()))
        .sum()
        .div_scalar((batch * cells) as f32);

    let log_probs = log_softmax(output.class_logits, 2);
    let classification = -(targets.class_onehot * log_probs).sum().div_scalar(positives);

    let localization = ((sigmoid(output.boxes) - targets.boxes).abs() * targets.box_weights)
        .sum()
        .div_scalar(positives);

    LossTerms { objectness, classification, localization }
}

/// Valor de un escalar de rango 1 (NaN si el tensor está vacío).
pub fn scalar<B: Backend>(t: Tensor<B, 1>) -> f32 {
    t.into_data()
        .to_vec::<f32>()
        .unwrap_or_default()
        .first()
        .copied()
        .unwrap_or(f32::NAN)
}
