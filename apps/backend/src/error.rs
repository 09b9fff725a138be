//! Error handling for the backend API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::services::import::ImportError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Import failed: {0}")]
    Import(#[from] ImportError),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ApiError::Import(e) if e.is_input_error() => (StatusCode::BAD_REQUEST, "invalid_input"),
            ApiError::Import(_) => (StatusCode::INTERNAL_SERVER_ERROR, "import_failed"),
            ApiError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            ApiError::Migration(_) => (StatusCode::INTERNAL_SERVER_ERROR, "migration_error"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

/// Result type alias for API operations
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::store::StoreError;

    #[test]
    fn test_invalid_import_input_status() {
        let error = ApiError::Import(ImportError::InvalidInput("empty search term".to_string()));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_persistence_failure_status() {
        let error = ApiError::Import(ImportError::Persistence(StoreError::Backend(
            "connection reset".to_string(),
        )));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_migration_error_status() {
        let error = ApiError::Migration("migration failed".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_display_names_failing_stage() {
        let error = ApiError::Import(ImportError::Persistence(StoreError::Backend(
            "connection reset".to_string(),
        )));
        assert_eq!(
            error.to_string(),
            "Import failed: persisting records failed: Store error: connection reset"
        );
    }
}
