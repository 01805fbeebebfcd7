use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("No encontrado: {0}")]
    NotFound(String),
    #[error("Entrada inválida: {0}")]
    InvalidInput(String),
    #[error("Recurso ocupado: {0}")]
    Busy(String),
    #[error("No disponible: {0}")]
    Unavailable(String),
    #[error("Error de operación: {0}")]
    OperationFailed(String),
}

impl From<std::io::Error> for DomainError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => DomainError::NotFound(e.to_string()),
            _ => DomainError::OperationFailed(e.to_string()),
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
