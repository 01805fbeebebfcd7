use std::path::PathBuf;

use ai_vision::adapters::ml::{model::save_model, train::train_model};
use ai_vision::config::AppConfig;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "train", about = "Entrena el detector sobre carpetas images/ + labels/ en formato YOLO")]
struct Args {
    #[arg(long)]
    config: Option<PathBuf>,
    /// Carpeta con images/ y labels/ de entrenamiento.
    #[arg(long)]
    train_dir: Option<PathBuf>,
    #[arg(long)]
    valid_dir: Option<PathBuf>,
    #[arg(long)]
    num_classes: Option<usize>,
    #[arg(long)]
    epochs: Option<usize>,
    #[arg(long)]
    batch_size: Option<usize>,
    #[arg(long)]
    lr: Option<f64>,
    /// Pesos preentrenados del backbone.
    #[arg(long)]
    backbone: Option<PathBuf>,
    #[arg(long)]
    seed: Option<u64>,
    /// Destino del modelo entrenado (por defecto `inference.checkpoint`).
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    ai_vision::init_tracing();
    let args = Args::parse();
    let cfg = AppConfig::load_or(args.config.as_deref())?;

    let mut training = cfg.training.clone();
    if let Some(v) = args.train_dir {
        training.train_dir = v;
    }
    if let Some(v) = args.valid_dir {
        training.valid_dir = v;
    }
    if let Some(v) = args.num_classes {
        training.num_classes = v;
    }
    if let Some(v) = args.epochs {
        training.epochs = v;
    }
    if let Some(v) = args.batch_size {
        training.batch_size = v;
    }
    if let Some(v) = args.lr {
        training.learning_rate = v;
    }
    if args.backbone.is_some() {
        training.backbone_weights = args.backbone;
    }
    if args.seed.is_some() {
        training.seed = args.seed;
    }

    let trained = train_model(&training, &mut |_: &_| {})?;
    let out = args.out.unwrap_or(cfg.inference.checkpoint);
    save_model(trained.model, &out)?;
    tracing::info!("💾 Modelo guardado en {}", out.display());
    Ok(())
}
