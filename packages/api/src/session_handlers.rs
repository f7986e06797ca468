// ABOUTME: HTTP request handlers for session listing, detail and deletion
// ABOUTME: Session detail includes the PRD and the full message history

use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;
use tracing::info;

use crate::response::{ok, ApiResult};
use crate::AppState;

pub async fn list_sessions(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let sessions = state.workflow.list_sessions().await?;
    Ok(ok(sessions))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    info!("Getting session: {}", session_id);
    let detail = state.workflow.get_session_detail(&session_id).await?;
    Ok(ok(detail))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    info!("Deleting session: {}", session_id);
    state.workflow.delete_session(&session_id).await?;
    Ok(ok(json!({ "message": "Session deleted" })))
}
