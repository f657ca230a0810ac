//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::upload::UploadProcessor;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    processor: UploadProcessor,
}

impl AppState {
    /// Create the state for `config`
    pub fn new(config: Config) -> Self {
        let processor = UploadProcessor::new(config.upload.to_upload_config());
        Self::with_processor(config, processor)
    }

    /// Create the state around an already configured processor
    pub fn with_processor(config: Config, processor: UploadProcessor) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, processor }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the upload processor
    pub fn processor(&self) -> &UploadProcessor {
        &self.inner.processor
    }
}
