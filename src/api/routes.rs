//! HTTP route handlers for the API

use super::AppState;
use crate::error::Result;
use crate::handlers::{Manager, Memo, MemoHandler, MemoPage, Paging};
use crate::validation::{validate_memo, ValidationErrors};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

// Messages the web client displays verbatim
pub const MEMO_CREATED: &str = "メモが正常に作成されました。";
pub const MEMO_UPDATED: &str = "メモが正常に更新されました。";
pub const MEMO_DELETED: &str = "メモが削除されました。";

// ============================================================================
// Health Check
// ============================================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// ============================================================================
// Customer Memos
// ============================================================================

/// Response for create and update
#[derive(Debug, Serialize, Deserialize)]
pub struct MemoEnvelope {
    pub msg: String,
    pub data: Memo,
}

impl MemoEnvelope {
    fn new(msg: &str, data: Memo) -> Self {
        MemoEnvelope {
            msg: msg.to_string(),
            data,
        }
    }
}

/// A body that failed to parse is handed to the validator as "no payload"
fn payload_value(payload: std::result::Result<Json<serde_json::Value>, JsonRejection>) -> Option<serde_json::Value> {
    match payload {
        Ok(Json(value)) => Some(value),
        Err(rejection) => {
            tracing::debug!("Unreadable memo payload: {}", rejection);
            None
        }
    }
}

/// Malformed path segments (e.g. a non-numeric id) use the validation envelope
fn path_params<T>(path: std::result::Result<Path<T>, PathRejection>) -> Result<T> {
    path.map(|Path(params)| params)
        .map_err(|rejection| ValidationErrors::single("path", rejection.body_text()).into())
}

fn query_params<T>(query: std::result::Result<Query<T>, QueryRejection>) -> Result<T> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| ValidationErrors::single("query", rejection.body_text()).into())
}

pub async fn list_memos(
    State(state): State<AppState>,
    path: std::result::Result<Path<i64>, PathRejection>,
    query: std::result::Result<Query<Paging>, QueryRejection>,
) -> Result<Json<MemoPage>> {
    let customer_id = path_params(path)?;
    let paging = query_params(query)?;
    let page = MemoHandler::new(state.db.clone())
        .list(customer_id, paging)
        .await?;
    Ok(Json(page))
}

pub async fn create_memo(
    State(state): State<AppState>,
    Extension(manager): Extension<Manager>,
    path: std::result::Result<Path<i64>, PathRejection>,
    payload: std::result::Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<MemoEnvelope>> {
    let customer_id = path_params(path)?;
    let payload = payload_value(payload);
    let input = validate_memo(payload.as_ref(), state.max_content_length)?;

    let memo = MemoHandler::new(state.db.clone())
        .create(customer_id, &manager, input)
        .await?;
    Ok(Json(MemoEnvelope::new(MEMO_CREATED, memo)))
}

pub async fn update_memo(
    State(state): State<AppState>,
    path: std::result::Result<Path<(i64, i64)>, PathRejection>,
    payload: std::result::Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<MemoEnvelope>> {
    let (customer_id, memo_id) = path_params(path)?;
    let payload = payload_value(payload);
    let input = validate_memo(payload.as_ref(), state.max_content_length)?;

    let memo = MemoHandler::new(state.db.clone())
        .update(customer_id, memo_id, input)
        .await?;
    Ok(Json(MemoEnvelope::new(MEMO_UPDATED, memo)))
}

pub async fn delete_memo(
    State(state): State<AppState>,
    path: std::result::Result<Path<(i64, i64)>, PathRejection>,
) -> Result<Json<&'static str>> {
    let (customer_id, memo_id) = path_params(path)?;
    MemoHandler::new(state.db.clone())
        .delete(customer_id, memo_id)
        .await?;
    Ok(Json(MEMO_DELETED))
}
