use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("Recipe not found: {0}")]
    RecipeNotFound(Uuid),

    #[error("Recipe not saved: {0}")]
    NotSaved(Uuid),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status this error maps to at the API boundary
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::SessionNotFound(_) | AppError::RecipeNotFound(_) | AppError::NotSaved(_) => {
                StatusCode::NOT_FOUND
            }
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) | AppError::Cache(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_variants_map_to_404() {
        let id = Uuid::new_v4();
        assert_eq!(AppError::SessionNotFound(id).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::RecipeNotFound(id).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::NotSaved(id).status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_store_unavailable_maps_to_503() {
        let err = AppError::StoreUnavailable("lock timeout".to_string());
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.to_string(), "Store unavailable: lock timeout");
    }

    #[test]
    fn test_session_not_found_message_names_session() {
        let id = Uuid::nil();
        assert_eq!(
            AppError::SessionNotFound(id).to_string(),
            "Session not found: 00000000-0000-0000-0000-000000000000"
        );
    }
}
