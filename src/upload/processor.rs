//! Upload request processor
//!
//! Walks the file parts of one request in order. Each part is checked against
//! the extension allow-list, staged, then committed to the store. The first
//! failure ends the request; parts after it are never read.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use axum::response::Response;

use super::staging::StagingArea;
use super::store::ContentStore;
use super::types::{UploadConfig, UploadError, UploadedPart};

/// Source of the parts of one upload request
#[async_trait]
pub trait PartSource: Send {
    /// Next part in transport order, `None` once the request is exhausted
    async fn next_part<'s>(&'s mut self) -> Result<Option<UploadedPart<'s>>, UploadError>;
}

/// Handles upload requests for one configuration
#[derive(Clone)]
pub struct UploadProcessor {
    inner: Arc<UploadProcessorInner>,
}

struct UploadProcessorInner {
    config: UploadConfig,
    staging: StagingArea,
    store: ContentStore,
}

impl UploadProcessor {
    pub fn new(config: UploadConfig) -> Self {
        let staging = StagingArea::new(&config.temp_dir);
        let store = ContentStore::new(&config.storage_path);
        Self {
            inner: Arc::new(UploadProcessorInner {
                config,
                staging,
                store,
            }),
        }
    }

    /// Process every part of `source` and build the response
    pub async fn process<S>(&self, source: &mut S) -> Response
    where
        S: PartSource + ?Sized,
    {
        let result = self.store_parts(source).await;
        self.respond(result)
    }

    /// Hand a finished request to the configured responder
    pub fn respond(&self, result: Result<Vec<PathBuf>, UploadError>) -> Response {
        let responder = &self.inner.config.responder;
        match result {
            Ok(names) => {
                tracing::debug!(files = names.len(), "Upload request complete");
                responder.on_success(names)
            }
            Err(e) => {
                if e.is_client_error() {
                    tracing::warn!(error = %e, "Upload request rejected");
                } else {
                    tracing::error!(error = %e, "Upload request failed");
                }
                responder.on_failure(e)
            }
        }
    }

    /// Store every file part of `source`, returning canonical paths in order
    pub async fn store_parts<S>(&self, source: &mut S) -> Result<Vec<PathBuf>, UploadError>
    where
        S: PartSource + ?Sized,
    {
        let mut names = Vec::new();

        while let Some(part) = source.next_part().await? {
            if !part.is_file() {
                tracing::debug!(field = %part.field_name, "Skipping non-file form field");
                continue;
            }
            names.push(self.store_part(part).await?);
        }

        Ok(names)
    }

    /// Validate, stage and commit a single part
    pub async fn store_part(&self, mut part: UploadedPart<'_>) -> Result<PathBuf, UploadError> {
        tracing::debug!(
            field = %part.field_name,
            filename = %part.original_filename,
            "Receiving upload part"
        );

        self.check_extension(&part)?;

        let staged = self.inner.staging.stage(&mut part.body).await?;
        let outcome = self
            .inner
            .store
            .commit(staged, &part.original_filename)
            .await?;

        Ok(outcome.into_path())
    }

    fn check_extension(&self, part: &UploadedPart<'_>) -> Result<(), UploadError> {
        let extension = part.extension();
        if self.inner.config.is_extension_allowed(extension) {
            Ok(())
        } else {
            Err(UploadError::ExtensionNotAllowed(extension.to_string()))
        }
    }
}
