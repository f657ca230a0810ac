//! Upload types for content-addressed ingestion

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use tokio::io::AsyncRead;

use super::responder::{StatusResponder, UploadResponder};

// ============================================================================
// Constants
// ============================================================================

/// Read size used when streaming a part to its staging file
pub const COPY_CHUNK_SIZE: usize = 4096;

/// Prefix of staging files in the scratch directory
pub const STAGING_PREFIX: &str = "tmp-upload-";

/// Prefix of stored objects in the storage directory
pub const OBJECT_PREFIX: &str = "upload_";

/// Prefix of in-flight copies inside the storage directory
pub const PARTIAL_PREFIX: &str = ".upload-partial-";

// ============================================================================
// Configuration
// ============================================================================

/// Configuration of one upload handler instance
#[derive(Clone)]
pub struct UploadConfig {
    /// Accepted extensions including the leading dot (empty = accept all)
    pub allowed_extensions: HashSet<String>,

    /// Directory holding stored objects; must already exist
    pub storage_path: PathBuf,

    /// Scratch directory for staging files
    pub temp_dir: PathBuf,

    /// Builds the HTTP response once the request has been processed
    pub responder: Arc<dyn UploadResponder>,
}

impl UploadConfig {
    /// Create a configuration storing into `storage_path` with the default
    /// responder and the OS temp directory for staging
    pub fn new(storage_path: impl Into<PathBuf>) -> Self {
        Self {
            allowed_extensions: HashSet::new(),
            storage_path: storage_path.into(),
            temp_dir: std::env::temp_dir(),
            responder: Arc::new(StatusResponder),
        }
    }

    /// Restrict uploads to the given extensions (e.g. `".jpg"`)
    pub fn allow_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Stage uploads in `temp_dir` instead of the OS temp directory
    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = temp_dir.into();
        self
    }

    /// Replace the responder
    pub fn with_responder<R>(mut self, responder: R) -> Self
    where
        R: UploadResponder + 'static,
    {
        self.responder = Arc::new(responder);
        self
    }

    /// Whether a file with this extension may be uploaded.
    ///
    /// Comparison is exact: case-sensitive and without dot normalization.
    pub fn is_extension_allowed(&self, extension: &str) -> bool {
        self.allowed_extensions.is_empty() || self.allowed_extensions.contains(extension)
    }
}

impl fmt::Debug for UploadConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadConfig")
            .field("allowed_extensions", &self.allowed_extensions)
            .field("storage_path", &self.storage_path)
            .field("temp_dir", &self.temp_dir)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Parts
// ============================================================================

/// One file field of an incoming multipart request
pub struct UploadedPart<'a> {
    /// Form field name
    pub field_name: String,

    /// Client-supplied file name (empty for plain form values)
    pub original_filename: String,

    /// Part content
    pub body: Pin<Box<dyn AsyncRead + Send + 'a>>,
}

impl<'a> UploadedPart<'a> {
    pub fn new(
        field_name: impl Into<String>,
        original_filename: impl Into<String>,
        body: impl AsyncRead + Send + 'a,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            original_filename: original_filename.into(),
            body: Box::pin(body),
        }
    }

    /// Whether this part carries a file rather than a plain form value
    pub fn is_file(&self) -> bool {
        !self.original_filename.is_empty()
    }

    /// Extension of the client file name, see [`file_extension`]
    pub fn extension(&self) -> &str {
        file_extension(&self.original_filename)
    }
}

impl fmt::Debug for UploadedPart<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedPart")
            .field("field_name", &self.field_name)
            .field("original_filename", &self.original_filename)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Digest
// ============================================================================

/// SHA-256 digest of an uploaded object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex form (64 chars)
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Extension of a file name: everything from the last `.` of its final path
/// element, or `""` when that element has no dot.
///
/// The result is returned verbatim, case included.
pub fn file_extension(file_name: &str) -> &str {
    for (index, ch) in file_name.char_indices().rev() {
        if std::path::is_separator(ch) {
            break;
        }
        if ch == '.' {
            return &file_name[index..];
        }
    }
    ""
}

/// Name of the stored object for a digest and extension
pub fn object_file_name(digest: &ContentDigest, extension: &str) -> String {
    format!("{}{}{}", OBJECT_PREFIX, digest.to_hex(), extension)
}

/// Canonical path of the stored object under `storage_path`
pub fn canonical_path(storage_path: &Path, digest: &ContentDigest, extension: &str) -> PathBuf {
    storage_path.join(object_file_name(digest, extension))
}

// ============================================================================
// Error Types
// ============================================================================

/// Upload error types
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("upload {0} is not allowed")]
    ExtensionNotAllowed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed multipart request: {0}")]
    Parse(String),
}

impl UploadError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::ExtensionNotAllowed(_) => StatusCode::BAD_REQUEST,
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Parse(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::ExtensionNotAllowed(_) => "EXTENSION_NOT_ALLOWED",
            Self::Io(_) => "IO_ERROR",
            Self::Parse(_) => "MALFORMED_REQUEST",
        }
    }

    /// Whether the failure was caused by the client's request
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}
