use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use content_rest_core::auth::AuthError;
use content_rest_core::document::ValidationError;
use content_rest_core::mutation::WriteError;
use content_rest_core::permission::PermissionDenied;
use content_rest_core::StoreError;
use serde_json::json;

/// API error type that maps to JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("Invalid fields provided: {}", invalid.join(", "))]
    InvalidFields {
        invalid: Vec<String>,
        valid: Vec<String>,
    },

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    /// A create, update or delete failed unexpectedly. The message reaches
    /// the caller.
    #[error("write failed: {0}")]
    WriteFailed(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "notFound", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "badRequest", msg.clone()),
            ApiError::InvalidFields { .. } => {
                (StatusCode::BAD_REQUEST, "invalidFields", self.to_string())
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            ApiError::WriteFailed(msg) => {
                tracing::error!("Write failed: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, "writeFailed", msg.clone())
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internalError",
                    "An internal error occurred".to_string(),
                )
            }
            ApiError::Store(err) => {
                tracing::error!("Store error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internalError",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let mut error = json!({
            "type": error_type,
            "message": message,
            "statusCode": status.as_u16(),
        });
        if let ApiError::InvalidFields { invalid, valid } = &self {
            error["invalidFields"] = json!(invalid);
            error["validFields"] = json!(valid);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::EmptyBody => ApiError::BadRequest(err.to_string()),
            ValidationError::InvalidFields { invalid, valid } => {
                ApiError::InvalidFields { invalid, valid }
            }
        }
    }
}

impl From<WriteError> for ApiError {
    fn from(err: WriteError) -> Self {
        match err {
            WriteError::Validation(err) => err.into(),
            WriteError::NotFound => ApiError::NotFound(err.to_string()),
            WriteError::Store(err) => ApiError::WriteFailed(err.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Token(_) | AuthError::InvalidCredentials => {
                ApiError::Unauthorized(err.to_string())
            }
            AuthError::MissingCredentials => ApiError::BadRequest(err.to_string()),
            AuthError::UsernameTaken(_) => ApiError::Conflict(err.to_string()),
            AuthError::Hash(_) => ApiError::Internal(err.to_string()),
            AuthError::Store(err) => ApiError::Store(err),
        }
    }
}

impl From<PermissionDenied> for ApiError {
    fn from(err: PermissionDenied) -> Self {
        ApiError::Forbidden(err.to_string())
    }
}

/// Convenience type alias for route handlers.
pub type ApiResult<T> = Result<T, ApiError>;
