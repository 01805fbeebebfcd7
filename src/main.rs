use std::path::PathBuf;

use ai_vision::adapters::http::{router, state::build_state};
use ai_vision::config::AppConfig;
use clap::Parser;
use tower_http::services::ServeDir;

#[derive(Parser, Debug)]
#[command(name = "ai-vision", about = "Servidor de datasets, entrenamiento e inferencia")]
struct Args {
    /// Fichero TOML de configuración (por defecto AI_VISION_CONFIG o ./ai-vision.toml).
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ai_vision::init_tracing();
    let args = Args::parse();

    let mut cfg = AppConfig::load_or(args.config.as_deref())?;
    if let Some(host) = args.host {
        cfg.server.host = host;
    }
    if let Some(port) = args.port {
        cfg.server.port = port;
    }

    tracing::info!("🔧 Inicializando adaptadores de infraestructura...");
    let state = build_state(&cfg)?;
    tracing::info!("📁 Carpetas de subida en '{}'", cfg.datasets.root.display());

    if let Err(e) = state.inference.check_model().await {
        tracing::warn!("⚠️ Modelo no disponible todavía ({}); /api/predict responderá 503", e);
    }

    let mut app = router(state, cfg.server.max_upload_mb * 1024 * 1024);
    if let Some(dir) = cfg.server.static_dir.as_ref().filter(|d| d.is_dir()) {
        tracing::info!("📂 Archivos estáticos servidos desde '{}'", dir.display());
        app = app.fallback_service(ServeDir::new(dir));
    }

    let addr = format!("{}:{}", cfg.server.host, cfg.server.port);
    tracing::info!("🚀 Servidor iniciado en http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
