// ABOUTME: Health check and anonymous page-view tracking handlers
// ABOUTME: Page views feed the per-day visit counter

use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::response::{ok, ApiResult};
use crate::AppState;

pub async fn health() -> impl IntoResponse {
    ok(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageViewRequest {
    pub anonymous_id: String,
    pub session_id: Option<String>,
    pub path: Option<String>,
}

pub async fn track_page_view(
    State(state): State<AppState>,
    payload: Result<Json<PageViewRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    state
        .workflow
        .track_page_view(
            &request.anonymous_id,
            request.session_id.as_deref(),
            request.path.as_deref(),
        )
        .await?;
    Ok(ok(()))
}
