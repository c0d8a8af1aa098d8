use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A database error.
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// A connection pool error.
    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// An I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A resource not found error.
    #[error("Session not found")]
    NotFound,

    /// A validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An encryption error.
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// A decryption error (malformed, tampered, or wrong-keypair envelope).
    #[error("Decryption error: {0}")]
    Decryption(String),

    /// Keypair generation failed.
    #[error("Key generation error: {0}")]
    KeyGeneration(String),

    /// Persisted key material is corrupt or unreadable.
    #[error("Key load error: {0}")]
    KeyLoad(String),

    /// A configuration value that can never work (e.g. undersized RSA modulus).
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }

            AppError::Pool(ref e) => {
                tracing::error!("Pool error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }

            AppError::Io(ref e) => {
                tracing::error!("IO error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "File system error".to_string())
            }

            AppError::NotFound => {
                tracing::debug!("Session not found");
                (StatusCode::NOT_FOUND, "Session not found".to_string())
            }

            AppError::Validation(ref msg) => {
                tracing::debug!("Validation error: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }

            AppError::Encryption(ref msg) => {
                tracing::error!("Encryption error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Encryption error".to_string())
            }

            AppError::Decryption(ref msg) => {
                tracing::error!("Decryption error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Decryption error".to_string())
            }

            AppError::KeyGeneration(ref msg) => {
                tracing::error!("Key generation error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Key material error".to_string())
            }

            AppError::KeyLoad(ref msg) => {
                tracing::error!("Key load error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Key material error".to_string())
            }

            AppError::InvalidConfiguration(ref msg) => {
                tracing::error!("Invalid configuration: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Configuration error".to_string())
            }

            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = sonic_rs::to_string(&sonic_rs::json!({
            "error": message
        }))
        .unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string());

        (status, body).into_response()
    }
}
