//! Response strategies for finished uploads

use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::types::UploadError;

/// Turns the result of an upload request into an HTTP response
pub trait UploadResponder: Send + Sync {
    /// All parts were stored; `names` are canonical paths in part order
    fn on_success(&self, names: Vec<PathBuf>) -> Response;

    /// The request failed and nothing further was processed
    fn on_failure(&self, error: UploadError) -> Response;
}

/// Bare status codes: 200 on success, 500 on any failure, empty bodies
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusResponder;

impl UploadResponder for StatusResponder {
    fn on_success(&self, _names: Vec<PathBuf>) -> Response {
        StatusCode::OK.into_response()
    }

    fn on_failure(&self, _error: UploadError) -> Response {
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}

/// JSON bodies listing stored files, or describing the failure
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonResponder;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub files: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
}

impl UploadResponder for JsonResponder {
    fn on_success(&self, names: Vec<PathBuf>) -> Response {
        let files = names
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        Json(UploadResponse { files }).into_response()
    }

    fn on_failure(&self, error: UploadError) -> Response {
        let status = error.status_code();
        // IO details stay in the logs
        let message = if error.is_client_error() {
            error.to_string()
        } else {
            "Failed to store upload".to_string()
        };

        let body = Json(ErrorResponse {
            error: message,
            code: error.code(),
        });

        (status, body).into_response()
    }
}
