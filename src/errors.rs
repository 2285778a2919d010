use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

// --- Storage Errors ---

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("A {resource} with that {field} already exists")]
    Conflict {
        resource: &'static str,
        field: &'static str,
    },

    #[error("No {resource} matched the request")]
    NotFound { resource: &'static str },

    /// Optimistic writes kept losing to concurrent writers.
    #[error("Concurrent modification, retries exhausted")]
    Contention,

    #[error("Stored data could not be decoded: {0}")]
    DataCorruption(String),

    #[error("Database backend error: {0}")]
    BackendError(#[from] anyhow::Error),
}

// --- Core Errors ---

/// Error taxonomy shared by every core component.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Invalid {field}: {reason}")]
    Validation {
        field: &'static str,
        reason: &'static str,
    },

    #[error("A {resource} with that {field} already exists")]
    Conflict {
        resource: &'static str,
        field: &'static str,
    },

    #[error("Failed to find the {resource}")]
    NotFound { resource: &'static str },

    /// `operation` is phrased for the client ("favourite the community").
    #[error("Failed to {operation}")]
    Unavailable {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl ServiceError {
    pub fn unavailable(operation: &'static str, source: impl Into<anyhow::Error>) -> Self {
        ServiceError::Unavailable {
            operation,
            source: source.into(),
        }
    }

    /// Maps a storage failure observed while performing `operation`.
    pub fn from_repo(operation: &'static str, err: RepoError) -> Self {
        match err {
            RepoError::Conflict { resource, field } => ServiceError::Conflict { resource, field },
            RepoError::NotFound { resource } => ServiceError::NotFound { resource },
            other => ServiceError::unavailable(operation, other),
        }
    }
}

// --- Web Layer Error ---

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Authentication required")]
    Unauthorized,

    // Configuration / Startup errors
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Initialization error: {0}")]
    InitError(String),

    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl From<crate::config::ConfigError> for AppError {
    fn from(err: crate::config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(err: JsonRejection) -> Self {
        AppError::InvalidInput(err.body_text())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Service(ServiceError::Validation { .. })
            | AppError::Service(ServiceError::Conflict { .. })
            | AppError::Service(ServiceError::NotFound { .. })
            | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Service(ServiceError::Unavailable { .. })
            | AppError::ConfigError(_)
            | AppError::InitError(_)
            | AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// --- Axum Response Implementation ---

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match &self {
            AppError::Service(ServiceError::Unavailable { operation, source }) => {
                tracing::error!(error.source = ?source, operation, "Store operation failed");
                format!("Failed to {}", operation)
            }
            AppError::ConfigError(msg) | AppError::InitError(msg) | AppError::InternalServerError(msg) => {
                tracing::error!(error.detail = %msg, "Internal error");
                "An internal server error occurred".to_string()
            }
            other => other.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(error.message = %error_message, error.status = %status, "Responding with error");
        } else {
            tracing::debug!(error.message = %error_message, error.status = %status, "Responding with error");
        }

        (status, Json(serde_json::json!({ "error": error_message }))).into_response()
    }
}
