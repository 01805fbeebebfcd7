pub mod routes;
pub mod state;

use axum::{extract::DefaultBodyLimit, routing::{get, post}, Router};
use tower_http::cors::{Any, CorsLayer};

use crate::adapters::http::state::HttpState;

pub fn router(state: HttpState, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/dataset/info", get(routes::dataset_info).post(routes::invalid_split))
        .route("/api/dataset/:type", post(routes::upload_dataset))
        .route("/api/predict", post(routes::predict))
        .route("/api/train/start", post(routes::start_training))
        .route("/api/train/status", get(routes::training_status))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .with_state(state)
}
