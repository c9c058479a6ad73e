//! HTTP surface
//!
//! - `handlers.rs` - one async handler per endpoint
//! - `routes.rs` - router assembly, method fallbacks and tower layers
//! - `state.rs` - shared handler state
//!
//! Every response body carries `success`. Failures are rendered by
//! [`WebError`]'s `IntoResponse` as `{success, error, code, errors?}`.

mod handlers;
mod routes;
mod state;

pub use routes::build_router;
pub use state::AppState;

use crate::core::{DeskError, ValidationErrors};
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::error;

/// Successful envelope: `{success: true, data}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, String>>,
}

#[derive(Debug)]
pub enum WebError {
    Validation(ValidationErrors),
    NotFound(String),
    Malformed(String),
    Unavailable(String),
    Internal(String),
}

impl From<DeskError> for WebError {
    fn from(err: DeskError) -> Self {
        match err {
            DeskError::Validation(errors) => Self::Validation(errors),
            DeskError::NotFound(_) => Self::NotFound("Project not found".to_string()),
            DeskError::MalformedRequest(msg) => Self::Malformed(msg),
            DeskError::StoreUnavailable(msg) => Self::Unavailable(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for WebError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Malformed(rejection.body_text())
    }
}

impl From<QueryRejection> for WebError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Malformed(rejection.body_text())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, message, code, errors) = match self {
            WebError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                errors.to_string(),
                "validation_error",
                Some(errors.into_fields()),
            ),
            WebError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, "not_found", None),
            WebError::Malformed(msg) => (StatusCode::BAD_REQUEST, msg, "malformed_request", None),
            WebError::Unavailable(msg) => {
                error!(error = %msg, "Store unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Store temporarily unavailable".to_string(),
                    "store_unavailable",
                    None,
                )
            }
            WebError::Internal(msg) => {
                error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    "internal_error",
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            success: false,
            error: message,
            code,
            errors,
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, WebError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value as JsonValue;

    async fn render(err: WebError) -> (StatusCode, JsonValue) {
        let response = err.into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn validation_errors_carry_field_detail() {
        let err = WebError::from(DeskError::from(ValidationErrors::single(
            "budget",
            "Budget cannot be negative",
        )));
        let (status, body) = render(err).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "validation_error");
        assert_eq!(body["errors"]["budget"], "Budget cannot be negative");
    }

    #[tokio::test]
    async fn store_failures_map_to_503_and_500() {
        let (status, body) = render(DeskError::unavailable("offline").into()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "store_unavailable");
        assert!(body.get("errors").is_none());

        let (status, _) = render(DeskError::IoError("disk".into()).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn not_found_hides_the_raw_id() {
        let (status, body) = render(DeskError::not_found("abc").into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Project not found");
    }
}
