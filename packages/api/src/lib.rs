// ABOUTME: HTTP API layer for prdsmith providing REST endpoints and routing
// ABOUTME: Integration layer over the PRD workflow and the export renderers

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use prdsmith_prd::PrdWorkflow;

pub mod diagram_handlers;
pub mod prd_handlers;
pub mod response;
pub mod session_handlers;
pub mod system_handlers;

pub use response::{ApiError, ApiResponse, ApiResult};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<PrdWorkflow>,
}

impl AppState {
    pub fn new(workflow: PrdWorkflow) -> Self {
        Self {
            workflow: Arc::new(workflow),
        }
    }
}

/// Creates the PRD API router (nested under /api/prd)
pub fn create_prd_router() -> Router<AppState> {
    Router::new()
        .route("/generate", post(prd_handlers::generate_prd))
        .route("/edit", post(prd_handlers::edit_prd))
        .route("/finalize", post(prd_handlers::finalize_prd))
        .route("/export", get(prd_handlers::export_prd))
}

/// Creates the diagrams API router (nested under /api/diagrams)
pub fn create_diagrams_router() -> Router<AppState> {
    Router::new()
        .route("/generate", post(diagram_handlers::generate_diagrams))
        .route("/edit", post(diagram_handlers::edit_diagram))
}

/// Creates the sessions API router (nested under /api/sessions)
pub fn create_sessions_router() -> Router<AppState> {
    Router::new()
        .route("/", get(session_handlers::list_sessions))
        .route(
            "/{id}",
            get(session_handlers::get_session).delete(session_handlers::delete_session),
        )
}

/// Full application router with every endpoint under /api
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/prd", create_prd_router())
        .nest("/diagrams", create_diagrams_router())
        .nest("/sessions", create_sessions_router())
        .route("/track/page-view", post(system_handlers::track_page_view))
        .route("/health", get(system_handlers::health));

    Router::new().nest("/api", api).with_state(state)
}
