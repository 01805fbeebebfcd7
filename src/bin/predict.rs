use std::path::PathBuf;

use ai_vision::adapters::ml::{detector::predict, model::DetectorModelConfig, predictor::build_detector};
use ai_vision::config::AppConfig;
use ai_vision::domain::model::Architecture;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "predict", about = "Detecta objetos en una imagen e imprime el resultado en JSON")]
struct Args {
    image: PathBuf,
    #[arg(long)]
    config: Option<PathBuf>,
    /// Umbral de confianza (por defecto `inference.confidence`).
    #[arg(long)]
    threshold: Option<f32>,
    /// Modelo a usar: checkpoint `.bin` del detector o fichero `.onnx`.
    #[arg(long)]
    model: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    ai_vision::init_tracing();
    let args = Args::parse();
    let cfg = AppConfig::load_or(args.config.as_deref())?;

    let mut settings = cfg.clone();
    if let Some(model) = args.model {
        if model.extension().is_some_and(|e| e == "onnx") {
            settings.inference.architecture = Architecture::Yolo;
            settings.inference.onnx_path = model;
        } else {
            settings.inference.architecture = Architecture::Detector;
            settings.inference.checkpoint = model;
        }
    }
    let infer = settings.inference_config();

    let threshold = args.threshold.unwrap_or(cfg.inference.confidence);
    let mut detector = build_detector(&infer, &DetectorModelConfig::from(&cfg.training))?;
    let predictions = predict(detector.as_mut(), &args.image, threshold)?;
    println!("{}", serde_json::to_string_pretty(&predictions)?);
    Ok(())
}
