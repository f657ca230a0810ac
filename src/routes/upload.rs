//! Upload Routes
//!
//! Endpoints:
//! - POST /upload - Store every file part of a multipart/form-data body
//! - OPTIONS /upload - Advertise the accepted methods

use std::io;

use async_trait::async_trait;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    response::Response,
    routing::{any, MethodRouter},
};
use futures::TryStreamExt;
use tokio_util::io::StreamReader;

use crate::middleware::methods::{filter_methods, MethodFilter};
use crate::state::AppState;
use crate::upload::{PartSource, UploadError, UploadedPart};
use crate::util::PreferredLanguage;

#[async_trait]
impl PartSource for Multipart {
    async fn next_part<'s>(&'s mut self) -> Result<Option<UploadedPart<'s>>, UploadError> {
        let field = self.next_field().await.map_err(|e| {
            tracing::error!("Failed to read multipart field: {}", e);
            UploadError::Parse(e.body_text())
        })?;

        let Some(field) = field else {
            return Ok(None);
        };

        let field_name = field.name().unwrap_or_default().to_string();
        let original_filename = field.file_name().unwrap_or_default().to_string();

        // Errors while reading the body surface as IO errors of this part
        let body = StreamReader::new(field.map_err(|e| io::Error::new(io::ErrorKind::Other, e)));

        Ok(Some(UploadedPart::new(field_name, original_filename, body)))
    }
}

/// Route for the upload endpoint, restricted to the methods in `filter`
pub fn route(filter: MethodFilter) -> MethodRouter<AppState> {
    any(upload_files).layer(axum::middleware::from_fn_with_state(filter, filter_methods))
}

/// POST /upload
async fn upload_files(
    State(state): State<AppState>,
    PreferredLanguage(language): PreferredLanguage,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let processor = state.processor();
    tracing::debug!(language = %language, "Upload request");

    match multipart {
        Ok(mut multipart) => processor.process(&mut multipart).await,
        Err(rejection) => {
            tracing::warn!("Rejected upload body: {}", rejection.body_text());
            processor.respond(Err(UploadError::Parse(rejection.body_text())))
        }
    }
}
