//! Authorization gate for the memo API
//!
//! Every caller presents `Authorization: Bearer <token>`. The token must
//! resolve to an active manager whose role grants the customer-facing
//! capability. The resolved [`Manager`] is attached to the request so
//! handlers can record who authored a memo.

use super::AppState;
use crate::handlers::{AccountHandler, Capability, Manager};
use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

/// Why the gate refused a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// No Authorization header
    MissingCredentials,
    /// Malformed header, unknown or revoked token
    InvalidToken,
    /// Authenticated, but the role lacks the capability
    PermissionDenied,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            AuthError::MissingCredentials => (
                StatusCode::UNAUTHORIZED,
                "Authentication credentials were not provided.",
            ),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token."),
            AuthError::PermissionDenied => (
                StatusCode::FORBIDDEN,
                "You do not have permission to perform this action.",
            ),
        };

        (status, Json(serde_json::json!({ "detail": detail }))).into_response()
    }
}

/// Extract the token from a `Bearer <token>` header value
fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Authorization middleware for customer-facing routes
pub async fn require_customer_facing(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .map(|h| h.to_str().ok());

    let token = match header {
        None => return AuthError::MissingCredentials.into_response(),
        Some(value) => match value.and_then(bearer_token) {
            Some(token) => token.to_string(),
            None => return AuthError::InvalidToken.into_response(),
        },
    };

    let manager: Manager = match AccountHandler::new(state.db.clone())
        .find_manager_by_token(&token)
        .await
    {
        Ok(Some(manager)) => manager,
        Ok(None) => {
            tracing::debug!("Rejected unknown or inactive token");
            return AuthError::InvalidToken.into_response();
        }
        Err(e) => return e.into_response(),
    };

    if !manager.role.allows(Capability::CustomerFacing) {
        tracing::warn!(
            manager_id = manager.id,
            role = %manager.role,
            "Manager lacks customer-facing capability"
        );
        return AuthError::PermissionDenied.into_response();
    }

    request.extensions_mut().insert(manager);
    next.run(request).await
}
