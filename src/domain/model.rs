use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    /// Detector burn entrenado con este mismo crate.
    Detector,
    /// Modelo YOLO preentrenado exportado a ONNX.
    Yolo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelId {
    pub architecture: Architecture,
    pub path: PathBuf, // checkpoint .bin o fichero .onnx
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoloParams {
    pub input_size: u32,        // 640 typical
    pub conf_threshold: f32,    // prefiltro interno, 0..1
    pub iou_threshold: f32,     // 0..1
    pub max_detections: usize,  // e.g. 100
}

impl Default for YoloParams {
    fn default() -> Self {
        Self {
            input_size: 640,
            conf_threshold: 0.01,
            iou_threshold: 0.45,
            max_detections: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    pub model: ModelId,
    pub params: YoloParams,
    pub num_classes: usize,
    pub class_names: Vec<String>,
}
