use serde::{Deserialize, Serialize};

use super::label::BoundingBox;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub score: f32,
    pub class_id: usize,
    pub label: String,
}

impl Detection {
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox { x1: self.x1, y1: self.y1, x2: self.x2, y2: self.y2 }
    }
}

/// Resultado de inferencia como arrays paralelos: `boxes[i]`, `scores[i]`, `labels[i]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Predictions {
    pub boxes: Vec<[f32; 4]>,
    pub scores: Vec<f32>,
    pub labels: Vec<usize>,
}

impl Predictions {
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

impl From<&[Detection]> for Predictions {
    fn from(detections: &[Detection]) -> Self {
        let mut out = Predictions::default();
        for d in detections {
            out.boxes.push([d.x1, d.y1, d.x2, d.y2]);
            out.scores.push(d.score);
            out.labels.push(d.class_id);
        }
        out
    }
}

/// Conserva las detecciones con `score >= threshold`, sin alterar su orden.
pub fn filter_by_confidence(detections: Vec<Detection>, threshold: f32) -> Vec<Detection> {
    detections.into_iter().filter(|d| d.score >= threshold).collect()
}

/// NMS voraz por clase. La salida queda ordenada por score descendente.
pub fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.score.total_cmp(&a.score));
    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for det in detections {
        let overlaps = kept
            .iter()
            .any(|k| k.class_id == det.class_id && k.bbox().iou(&det.bbox()) > iou_threshold);
        if !overlaps {
            kept.push(det);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x: f32, score: f32, class_id: usize) -> Detection {
        Detection {
            x1: x,
            y1: 0.0,
            x2: x + 10.0,
            y2: 10.0,
            score,
            class_id,
            label: class_id.to_string(),
        }
    }

    #[test]
    fn threshold_is_inclusive_and_keeps_order() {
        let dets = vec![det(0.0, 0.95, 0), det(20.0, 0.9, 1), det(40.0, 0.3, 0)];
        let kept = filter_by_confidence(dets, 0.9);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].score, 0.95);
        assert_eq!(kept[1].score, 0.9);
    }

    #[test]
    fn nms_drops_overlapping_same_class() {
        let dets = vec![det(1.0, 0.6, 0), det(0.0, 0.9, 0), det(0.0, 0.8, 1), det(50.0, 0.7, 0)];
        let kept = non_max_suppression(dets, 0.5);
        let scores: Vec<f32> = kept.iter().map(|d| d.score).collect();
        assert_eq!(scores, vec![0.9, 0.8, 0.7]);
    }

    #[test]
    fn predictions_are_parallel_arrays() {
        let dets = vec![det(0.0, 0.9, 2), det(20.0, 0.4, 1)];
        let p = Predictions::from(dets.as_slice());
        assert_eq!(p.len(), 2);
        assert_eq!(p.labels, vec![2, 1]);
        assert_eq!(p.boxes[1], [20.0, 0.0, 30.0, 10.0]);
    }
}
