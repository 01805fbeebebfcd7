use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, warn};

use crate::adapters::http::state::HttpState;
use crate::application::dto::{
    ErrorResponse, HealthResponse, PredictResponse, PredictionDto, TrainStartRequest, UploadResponse,
};
use crate::domain::{dataset::{DatasetSplit, UploadedFile}, errors::DomainError};

fn error_json(code: StatusCode, message: impl Into<String>) -> Response {
    (code, Json(ErrorResponse { error: message.into() })).into_response()
}

fn domain_error(e: DomainError) -> Response {
    let code = match &e {
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        DomainError::Busy(_) => StatusCode::CONFLICT,
        DomainError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        DomainError::OperationFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if code == StatusCode::INTERNAL_SERVER_ERROR {
        error!("{}", e);
    }
    error_json(code, e.to_string())
}

pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok".into() })
}

pub async fn dataset_info(State(st): State<HttpState>) -> Response {
    match st.dataset.info().await {
        Ok(info) => Json(info).into_response(),
        Err(e) => {
            error!("Error leyendo carpetas de datasets: {}", e);
            error_json(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// `POST /api/dataset/info` comparte ruta con la consulta; no es un split válido.
pub async fn invalid_split() -> Response {
    error_json(StatusCode::BAD_REQUEST, "Invalid dataset type")
}

pub async fn upload_dataset(
    State(st): State<HttpState>,
    Path(kind): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    // El split se valida antes de leer el cuerpo.
    let Ok(split) = kind.parse::<DatasetSplit>() else {
        return error_json(StatusCode::BAD_REQUEST, "Invalid dataset type");
    };
    let mut multipart = match multipart {
        Ok(m) => m,
        Err(_) => return error_json(StatusCode::BAD_REQUEST, "No files provided"),
    };

    let mut files = Vec::new();
    let mut has_files_field = false;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!("Multipart inválido: {}", e);
                return error_json(StatusCode::BAD_REQUEST, e.body_text());
            }
        };
        // Las partes sin `filename` son campos de formulario, no ficheros.
        if field.name() != Some("files") || field.file_name().is_none() {
            continue;
        }
        has_files_field = true;

        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        match field.bytes().await {
            Ok(bytes) => files.push(UploadedFile { filename, content_type, bytes: bytes.to_vec() }),
            Err(e) => return error_json(StatusCode::BAD_REQUEST, e.body_text()),
        }
    }

    if !has_files_field {
        return error_json(StatusCode::BAD_REQUEST, "No files provided");
    }

    match st.dataset.upload(split, files).await {
        Ok(saved) => Json(UploadResponse::saved(saved)).into_response(),
        Err(e) => domain_error(e),
    }
}

pub async fn predict(State(st): State<HttpState>, multipart: Result<Multipart, MultipartRejection>) -> Response {
    let mut multipart = match multipart {
        Ok(m) => m,
        Err(e) => return error_json(StatusCode::BAD_REQUEST, e.body_text()),
    };

    let mut image = None;
    let mut confidence = st.defaults.confidence;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return error_json(StatusCode::BAD_REQUEST, e.body_text()),
        };
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => match field.bytes().await {
                Ok(bytes) => image = Some(bytes.to_vec()),
                Err(e) => return error_json(StatusCode::BAD_REQUEST, e.body_text()),
            },
            "confidence" => {
                let raw = field.text().await.unwrap_or_default();
                match raw.trim().parse::<f32>() {
                    Ok(c) => confidence = c,
                    Err(_) => return error_json(StatusCode::BAD_REQUEST, format!("invalid confidence: {raw}")),
                }
            }
            "task" => {
                let task = field.text().await.unwrap_or_default();
                if task != "detection" {
                    return error_json(StatusCode::BAD_REQUEST, format!("unsupported task: {task}"));
                }
            }
            _ => {}
        }
    }

    let Some(image) = image else {
        return error_json(StatusCode::BAD_REQUEST, "No image provided");
    };

    match st.inference.predict(image, confidence).await {
        Ok(detections) => Json(PredictResponse {
            predictions: detections.into_iter().map(PredictionDto::from).collect(),
        })
        .into_response(),
        Err(e) => domain_error(e),
    }
}

/// Cuerpo vacío: todos los parámetros salen de la configuración. JSON inválido: 400.
pub async fn start_training(State(st): State<HttpState>, body: Bytes) -> Response {
    let req = if body.iter().all(u8::is_ascii_whitespace) {
        TrainStartRequest::default()
    } else {
        match serde_json::from_slice::<TrainStartRequest>(&body) {
            Ok(req) => req,
            Err(e) => return error_json(StatusCode::BAD_REQUEST, format!("invalid training request: {e}")),
        }
    };
    let params = req.resolve(st.defaults.training);
    match st.training.start(params).await {
        Ok(()) => (StatusCode::ACCEPTED, Json(params)).into_response(),
        Err(e) => domain_error(e),
    }
}

pub async fn training_status(State(st): State<HttpState>) -> Response {
    match st.training.status().await {
        Ok(status) => Json(status).into_response(),
        Err(e) => domain_error(e),
    }
}
