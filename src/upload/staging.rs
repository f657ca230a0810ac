//! Temporary staging area
//!
//! Upload bytes land in a scratch file before their digest (and therefore
//! their final name) is known. The scratch file is owned by a [`StagedFile`]
//! and removed when it is dropped or discarded, whatever the outcome.

use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tokio::io::{AsyncRead, AsyncWriteExt};

use super::hashing::copy_hashing;
use super::types::{ContentDigest, UploadError, STAGING_PREFIX};

/// A fully written staging file and its content digest
#[derive(Debug)]
pub struct StagedFile {
    path: TempPath,
    digest: ContentDigest,
    byte_count: u64,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn digest(&self) -> &ContentDigest {
        &self.digest
    }

    pub fn byte_count(&self) -> u64 {
        self.byte_count
    }

    /// Delete the staging file now.
    ///
    /// Removal failures are logged and otherwise ignored.
    pub fn discard(self) {
        let path = self.path.to_path_buf();
        if let Err(e) = self.path.close() {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to remove staging file"
            );
        }
    }
}

/// Scratch directory where uploads are staged
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Stream `source` into a fresh staging file
    pub async fn stage<R>(&self, source: &mut R) -> Result<StagedFile, UploadError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let (file, path) = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempfile_in(&self.dir)?
            .into_parts();

        // `file` is declared after `path`, so on early return the descriptor
        // is closed before the path guard deletes the file.
        let mut file = tokio::fs::File::from_std(file);
        let (digest, byte_count) = copy_hashing(source, &mut file).await?;
        file.flush().await?;
        drop(file);

        tracing::debug!(
            path = %path.display(),
            digest = %digest,
            bytes = byte_count,
            "Staged upload"
        );

        Ok(StagedFile {
            path,
            digest,
            byte_count,
        })
    }
}
