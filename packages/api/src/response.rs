// ABOUTME: Shared API response types and error handling
// ABOUTME: Uniform success/error envelope and error-to-status mapping for every endpoint

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json as ResponseJson, Response},
};
use prdsmith_export::ExportError;
use prdsmith_prd::PrdError;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// Standard API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// Wrap a value in a 200 success envelope
pub fn ok<T: Serialize>(data: T) -> ResponseJson<ApiResponse<T>> {
    ResponseJson(ApiResponse::success(data))
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Prd(#[from] PrdError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Prd(err) => match err {
                PrdError::Validation(_) | PrdError::NotFinalized(_) => StatusCode::BAD_REQUEST,
                PrdError::NotFound(_) => StatusCode::NOT_FOUND,
                PrdError::Upstream(_)
                | PrdError::MalformedResponse(_)
                | PrdError::IncompleteDocument(_)
                | PrdError::Render(_)
                | PrdError::Storage(_)
                | PrdError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Export(ExportError::UnsupportedFormat(_)) => StatusCode::BAD_REQUEST,
            ApiError::Export(ExportError::Render(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            error!("Request failed ({}): {}", status, message);
        } else {
            warn!("Request rejected ({}): {}", status, message);
        }

        (status, ResponseJson(ApiResponse::<()>::error(message))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
