use anyhow::{anyhow, Result};
use image::{imageops::FilterType, RgbImage};
use ndarray::{s, Array4, ArrayViewD, Axis, IxDyn};
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::Session;
use ort::value::Value;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::adapters::ml::detector::Detector;
use crate::domain::detection::{non_max_suppression, Detection};
use crate::domain::model::YoloParams;

const COCO_CLASSES: [&str; 80] = [
    "persona", "bicicleta", "coche", "motocicleta", "avión", "autobús", "tren", "camión", "barco",
    "semáforo", "hidrante", "señal de stop", "parquímetro", "banco", "pájaro", "gato", "perro",
    "caballo", "oveja", "vaca", "elefante", "oso", "cebra", "jirafa", "mochila", "paraguas",
    "bolso", "corbata", "maleta", "frisbee", "esquís", "snowboard", "pelota", "cometa",
    "bate de béisbol", "guante de béisbol", "monopatín", "tabla de surf", "raqueta de tenis",
    "botella", "copa de vino", "taza", "tenedor", "cuchillo", "cuchara", "tazón", "plátano",
    "manzana", "sándwich", "naranja", "brócoli", "zanahoria", "perrito caliente", "pizza",
    "donut", "pastel", "silla", "sofá", "planta", "cama", "mesa", "inodoro", "televisor",
    "portátil", "ratón", "mando", "teclado", "móvil", "microondas", "horno", "tostadora",
    "fregadero", "nevera", "libro", "reloj", "jarrón", "tijeras", "peluche", "secador", "cepillo",
];

/// YOLOv8 exportado a ONNX. Salida esperada: `[1, 4 + C, N]` con (cx, cy, w, h) en píxeles
/// de la entrada redimensionada seguidos de C scores por candidato.
pub struct OnnxYoloEngine {
    session: Session,
    params: YoloParams,
    class_names: Vec<String>,
}

impl OnnxYoloEngine {
    /// Sin `class_names` se usan los nombres COCO.
    pub fn load(path: &Path, params: YoloParams, class_names: Option<Vec<String>>) -> Result<Self> {
        let mut builder = Session::builder()?.with_intra_threads(4)?;

        // CUDA es opcional: si está disponible se registra, si no continuamos en CPU.
        let cuda = CUDAExecutionProvider::default().build();
        if let Ok(builder_with_cuda) = builder.clone().with_execution_providers([cuda]) {
            builder = builder_with_cuda;
        }

        let model_bytes = fs::read(path).map_err(|e| anyhow!("failed to read {}: {e}", path.display()))?;
        let session = builder.commit_from_memory(&model_bytes)?;
        info!("Modelo ONNX cargado: {}", path.display());

        let class_names = class_names.unwrap_or_else(|| COCO_CLASSES.iter().map(|c| c.to_string()).collect());
        Ok(Self { session, params, class_names })
    }

    fn infer(&mut self, rgb: &RgbImage) -> Result<Vec<Detection>> {
        let imgsz = self.params.input_size as usize;
        let resized = image::imageops::resize(rgb, imgsz as u32, imgsz as u32, FilterType::Nearest);

        let mut input = Array4::<f32>::zeros((1, 3, imgsz, imgsz));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                input[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
            }
        }

        let input_shape = vec![1, 3, imgsz as i64, imgsz as i64];
        let input_tensor = Value::from_array((input_shape, input.into_raw_vec_and_offset().0))?;

        let outputs = self.session.run(ort::inputs![input_tensor])?;
        let (shape_out, data_out) = outputs[0].try_extract_tensor::<f32>()?;

        let dims: Vec<usize> = shape_out.iter().map(|&x| x as usize).collect();
        let array_view = ArrayViewD::from_shape(IxDyn(&dims), data_out)?;
        let view = array_view.index_axis(Axis(0), 0);
        if view.ndim() != 2 || view.shape()[0] <= 4 {
            return Err(anyhow!("unexpected YOLO output shape {:?}", dims));
        }

        let num_candidates = view.shape()[1];
        let sx = rgb.width() as f32 / imgsz as f32;
        let sy = rgb.height() as f32 / imgsz as f32;

        let mut detections = Vec::new();
        for i in 0..num_candidates {
            let scores = view.slice(s![4.., i]);
            let Some((class_id, &max_score)) = scores.indexed_iter().max_by(|(_, a), (_, b)| a.total_cmp(b)) else {
                continue;
            };
            if max_score <= self.params.conf_threshold {
                continue;
            }

            let cx = view[[0, i]];
            let cy = view[[1, i]];
            let w = view[[2, i]];
            let h = view[[3, i]];

            detections.push(Detection {
                x1: (cx - w / 2.0) * sx,
                y1: (cy - h / 2.0) * sy,
                x2: (cx + w / 2.0) * sx,
                y2: (cy + h / 2.0) * sy,
                score: max_score,
                class_id,
                label: self.class_names.get(class_id).map_or("objeto", String::as_str).to_string(),
            });
        }

        let mut kept = non_max_suppression(detections, self.params.iou_threshold);
        kept.truncate(self.params.max_detections);
        Ok(kept)
    }
}

impl Detector for OnnxYoloEngine {
    fn num_classes(&self) -> usize {
        self.class_names.len()
    }

    fn detect(&mut self, rgb: &RgbImage) -> Result<Vec<Detection>> {
        self.infer(rgb)
    }
}
