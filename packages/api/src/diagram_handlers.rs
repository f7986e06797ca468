// ABOUTME: HTTP request handlers for Mermaid diagram generation and editing
// ABOUTME: Validation failures come back in the payload, not as request errors

use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use prdsmith_core::DiagramKind;
use serde::Deserialize;
use tracing::info;

use crate::response::{ok, ApiResult};
use crate::AppState;

/// Request body for generating diagrams; without a type all four are generated
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateDiagramsRequest {
    pub session_id: String,
    pub diagram_type: Option<DiagramKind>,
}

pub async fn generate_diagrams(
    State(state): State<AppState>,
    payload: Result<Json<GenerateDiagramsRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    info!(
        "Generating diagrams for session {} (type: {:?})",
        request.session_id, request.diagram_type
    );

    let generated = state
        .workflow
        .generate_diagrams(&request.session_id, request.diagram_type)
        .await?;
    Ok(ok(generated))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditDiagramRequest {
    pub session_id: String,
    pub diagram_type: DiagramKind,
    pub instruction: String,
}

pub async fn edit_diagram(
    State(state): State<AppState>,
    payload: Result<Json<EditDiagramRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    info!(
        "Editing {} diagram for session {}",
        request.diagram_type, request.session_id
    );

    let edited = state
        .workflow
        .edit_diagram(
            &request.session_id,
            request.diagram_type,
            &request.instruction,
        )
        .await?;
    Ok(ok(edited))
}
