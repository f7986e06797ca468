// ABOUTME: HTTP request handlers for PRD generation, editing, finalization and export
// ABOUTME: Validates request bodies and delegates to the PRD workflow

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use prdsmith_export::{export_document, ExportFormat};
use serde::Deserialize;
use tracing::info;

use crate::response::{ok, ApiError, ApiResult};
use crate::AppState;

/// Request body for generating a PRD from an idea
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePrdRequest {
    pub idea: String,
    pub anonymous_id: Option<String>,
}

pub async fn generate_prd(
    State(state): State<AppState>,
    payload: Result<Json<GeneratePrdRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    info!("Generating PRD from idea ({} chars)", request.idea.chars().count());

    let generated = state
        .workflow
        .generate(&request.idea, request.anonymous_id.as_deref())
        .await?;
    Ok(ok(generated))
}

/// Request body for editing a PRD
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditPrdRequest {
    pub session_id: String,
    pub instruction: String,
    pub target_field: Option<String>,
}

pub async fn edit_prd(
    State(state): State<AppState>,
    payload: Result<Json<EditPrdRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    info!("Editing PRD for session: {}", request.session_id);

    let edited = state
        .workflow
        .edit(
            &request.session_id,
            &request.instruction,
            request.target_field.as_deref(),
        )
        .await?;
    Ok(ok(edited))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub session_id: String,
}

pub async fn finalize_prd(
    State(state): State<AppState>,
    payload: Result<Json<SessionRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    info!("Finalizing PRD for session: {}", request.session_id);

    let finalized = state.workflow.finalize(&request.session_id).await?;
    Ok(ok(finalized))
}

/// Query string for exporting a final PRD
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportQuery {
    pub session_id: Option<String>,
    pub format: Option<String>,
}

/// Download the final PRD as md, pdf or docx
pub async fn export_prd(
    State(state): State<AppState>,
    query: Result<Query<ExportQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(query) = query?;
    let (Some(session_id), Some(format)) = (query.session_id, query.format) else {
        return Err(ApiError::BadRequest(
            "sessionId and format are required".to_string(),
        ));
    };
    let format: ExportFormat = format.parse()?;
    info!("Exporting PRD for session {} as {}", session_id, format);

    // Fails with NotFinalized before any renderer exists
    let document = state.workflow.get_final(&session_id).await?;

    let file = tokio::task::spawn_blocking(move || {
        export_document(format, &document.title, &document.markdown)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("export task failed: {}", e)))??;

    Ok((
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (header::CONTENT_DISPOSITION, file.content_disposition()),
        ],
        file.bytes,
    )
        .into_response())
}
