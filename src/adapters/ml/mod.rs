//! Entrenamiento e inferencia con burn.
//!
//! - `dataset`: lector de carpetas `images/` + `labels/` en formato YOLO.
//! - `collate`: ensamblado de lotes y codificación de objetivos por celda.
//! - `model`: backbone + cabeza de detección, intercambiable por número de clases.
//! - `train`: bucle de entrenamiento/validación.
//! - `detector`: capacidad `Detector` común a burn y ONNX, y la función `predict`.

pub mod collate;
pub mod dataset;
pub mod detector;
pub mod job;
pub mod loss;
pub mod model;
pub mod model_catalog;
pub mod predictor;
pub mod train;
pub mod transform;

/// Backend de entrenamiento/inferencia (NdArray por defecto; WGPU si se activa).
#[cfg(feature = "backend-wgpu")]
pub type TrainBackend = burn::backend::Wgpu<f32>;
#[cfg(not(feature = "backend-wgpu"))]
pub type TrainBackend = burn::backend::NdArray<f32>;

pub type AutodiffBackend = burn::backend::Autodiff<TrainBackend>;
