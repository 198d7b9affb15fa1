//! Mapping of core errors onto HTTP responses

use crate::error::CoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Body returned for every unexpected failure; details stay in the logs
pub const INTERNAL_SERVER_ERROR_BODY: &str = "Internal Server Error";

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        match self {
            CoreError::Validation(errors) => {
                tracing::debug!(errors = %errors, "Rejected memo payload");
                (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({ "errors": errors })),
                )
                    .into_response()
            }
            CoreError::NotFound(kind, id) => {
                tracing::warn!(kind, id = %id, "Lookup found nothing");
                (
                    StatusCode::NOT_FOUND,
                    Json(serde_json::json!({
                        "errors": { "detail": format!("{} not found", kind) }
                    })),
                )
                    .into_response()
            }
            other => {
                tracing::error!(error = %other, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(INTERNAL_SERVER_ERROR_BODY),
                )
                    .into_response()
            }
        }
    }
}
