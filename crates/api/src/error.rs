use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use autorender_core::error::CoreError;
use autorender_dispatch::artifacts::ArtifactStoreError;
use autorender_dispatch::templates::TemplateError;
use autorender_dispatch::DispatchError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`], [`DispatchError`] and database failures.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `autorender_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A render dispatch failure.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<TemplateError> for AppError {
    fn from(err: TemplateError) -> Self {
        AppError::Dispatch(err.into())
    }
}

/// Seconds a client should wait before retrying a busy render.
const RETRY_AFTER_SECS: &str = "1";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
            },

            // --- Dispatch errors ---
            AppError::Dispatch(err) => classify_dispatch_error(err),

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(err),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        let mut response = (status, axum::Json(body)).into_response();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from_static(RETRY_AFTER_SECS));
        }
        response
    }
}

/// Classify a dispatch failure into an HTTP status, error code, and message.
///
/// Worker availability problems are 503 so clients retry; a worker that
/// never answered is 504.
fn classify_dispatch_error(err: &DispatchError) -> (StatusCode, &'static str, String) {
    match err {
        DispatchError::TemplateNotFound(_) => {
            (StatusCode::NOT_FOUND, "TEMPLATE_NOT_FOUND", err.to_string())
        }
        DispatchError::Template(_) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "TEMPLATE_ERROR",
            err.to_string(),
        ),
        DispatchError::NoWorkersAvailable => (
            StatusCode::SERVICE_UNAVAILABLE,
            "NO_WORKERS_AVAILABLE",
            err.to_string(),
        ),
        DispatchError::WorkerLost { .. } => (
            StatusCode::SERVICE_UNAVAILABLE,
            "WORKER_LOST",
            err.to_string(),
        ),
        DispatchError::Timeout { .. } => {
            (StatusCode::GATEWAY_TIMEOUT, "RENDER_TIMEOUT", err.to_string())
        }
        DispatchError::ArtifactStoreDisabled => (
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "Artifact storage is not configured on this server".to_string(),
        ),
        DispatchError::ArtifactStore(ArtifactStoreError::InvalidCategory(msg)) => {
            (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
        }
        DispatchError::ArtifactStore(inner) => {
            tracing::error!(error = %inner, "Artifact store failed");
            (
                StatusCode::BAD_GATEWAY,
                "ARTIFACT_STORE_ERROR",
                err.to_string(),
            )
        }
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        other => {
            tracing::error!(error = %other, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}
