//! Content-addressed store
//!
//! Objects live at `<root>/upload_<sha256-hex><ext>`. An object already
//! present at its canonical path is proof that identical content was stored
//! before, so the new upload is dropped instead of rewritten.
//!
//! New objects are copied (the staging directory may sit on another volume)
//! into a hidden sibling inside the root and renamed into place once
//! complete. Two requests racing on the same digest both write identical
//! bytes; whichever rename lands last wins.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use super::staging::StagedFile;
use super::types::{canonical_path, file_extension, ContentDigest, UploadError, PARTIAL_PREFIX};

/// Outcome of a commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The object was written by this commit
    Stored(PathBuf),
    /// An object with the same digest and extension already existed
    Duplicate(PathBuf),
}

impl CommitOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Stored(path) | Self::Duplicate(path) => path,
        }
    }

    pub fn into_path(self) -> PathBuf {
        match self {
            Self::Stored(path) | Self::Duplicate(path) => path,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }
}

/// Local directory of content-addressed objects
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    /// Store objects under `root`. The directory is never created here.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Where content with `digest`, uploaded as `original_filename`, lives
    pub fn object_path(&self, digest: &ContentDigest, original_filename: &str) -> PathBuf {
        canonical_path(&self.root, digest, file_extension(original_filename))
    }

    /// Move a staged upload into the store.
    ///
    /// The staging file is removed before returning, on success and failure.
    pub async fn commit(
        &self,
        staged: StagedFile,
        original_filename: &str,
    ) -> Result<CommitOutcome, UploadError> {
        let destination = self.object_path(staged.digest(), original_filename);

        if tokio::fs::try_exists(&destination).await? {
            tracing::debug!(
                path = %destination.display(),
                digest = %staged.digest(),
                "Object already stored, dropping duplicate upload"
            );
            staged.discard();
            return Ok(CommitOutcome::Duplicate(destination));
        }

        self.materialize(&staged, &destination).await?;

        tracing::info!(
            path = %destination.display(),
            digest = %staged.digest(),
            size = staged.byte_count(),
            "Stored object"
        );

        staged.discard();
        Ok(CommitOutcome::Stored(destination))
    }

    /// Copy the staged bytes to `destination`
    async fn materialize(&self, staged: &StagedFile, destination: &Path) -> Result<(), UploadError> {
        let (file, partial) = tempfile::Builder::new()
            .prefix(PARTIAL_PREFIX)
            .tempfile_in(&self.root)?
            .into_parts();

        let mut writer = tokio::fs::File::from_std(file);
        let mut reader = tokio::fs::File::open(staged.path()).await?;
        tokio::io::copy(&mut reader, &mut writer).await?;
        writer.flush().await?;
        writer.sync_all().await?;
        drop(writer);

        partial.persist(destination).map_err(|e| UploadError::Io(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::hashing::compute_hash;
    use crate::upload::staging::StagingArea;
    use tempfile::TempDir;

    struct Fixture {
        scratch: TempDir,
        storage: TempDir,
        staging: StagingArea,
        store: ContentStore,
    }

    fn fixture() -> Fixture {
        let scratch = TempDir::new().unwrap();
        let storage = TempDir::new().unwrap();
        let staging = StagingArea::new(scratch.path());
        let store = ContentStore::new(storage.path());
        Fixture {
            scratch,
            storage,
            staging,
            store,
        }
    }

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_commit_stores_under_digest_name() {
        let f = fixture();
        let data = b"hello, world\nthis is log test\n";

        let staged = f.staging.stage(&mut &data[..]).await.unwrap();
        let outcome = f.store.commit(staged, "notes.txt").await.unwrap();

        let expected = f.storage.path().join(format!("upload_{}.txt", compute_hash(data)));
        assert_eq!(outcome, CommitOutcome::Stored(expected.clone()));
        assert_eq!(std::fs::read(&expected).unwrap(), data);
        assert_eq!(file_names(f.storage.path()).len(), 1);
        assert!(file_names(f.scratch.path()).is_empty());
    }

    #[tokio::test]
    async fn test_commit_twice_deduplicates() {
        let f = fixture();
        let data = b"same bytes";

        let first = f
            .store
            .commit(f.staging.stage(&mut &data[..]).await.unwrap(), "a.bin")
            .await
            .unwrap();
        let second = f
            .store
            .commit(f.staging.stage(&mut &data[..]).await.unwrap(), "b.bin")
            .await
            .unwrap();

        assert!(!first.is_duplicate());
        assert!(second.is_duplicate());
        assert_eq!(first.path(), second.path());
        assert_eq!(std::fs::read(first.path()).unwrap(), data);
        assert_eq!(file_names(f.storage.path()).len(), 1);
        assert!(file_names(f.scratch.path()).is_empty());
    }

    #[tokio::test]
    async fn test_different_content_gets_different_paths() {
        let f = fixture();

        let a = f
            .store
            .commit(f.staging.stage(&mut &b"content A"[..]).await.unwrap(), "x.txt")
            .await
            .unwrap();
        let b = f
            .store
            .commit(f.staging.stage(&mut &b"content B"[..]).await.unwrap(), "x.txt")
            .await
            .unwrap();

        assert_ne!(a.path(), b.path());
        assert_eq!(file_names(f.storage.path()).len(), 2);
    }

    #[tokio::test]
    async fn test_extension_is_part_of_identity() {
        let f = fixture();

        let lower = f
            .store
            .commit(f.staging.stage(&mut &b"pic"[..]).await.unwrap(), "a.jpg")
            .await
            .unwrap();
        let upper = f
            .store
            .commit(f.staging.stage(&mut &b"pic"[..]).await.unwrap(), "a.JPG")
            .await
            .unwrap();

        assert_ne!(lower.path(), upper.path());
        assert!(upper.path().to_string_lossy().ends_with(".JPG"));
    }

    #[tokio::test]
    async fn test_existing_object_is_not_overwritten() {
        let f = fixture();
        let data = b"original";
        let staged = f.staging.stage(&mut &data[..]).await.unwrap();
        let path = f.store.object_path(staged.digest(), "doc.txt");
        std::fs::write(&path, b"already here").unwrap();

        let outcome = f.store.commit(staged, "doc.txt").await.unwrap();

        assert_eq!(outcome, CommitOutcome::Duplicate(path.clone()));
        assert_eq!(std::fs::read(&path).unwrap(), b"already here");
    }

    #[tokio::test]
    async fn test_missing_storage_dir_fails_and_cleans_up() {
        let scratch = TempDir::new().unwrap();
        let storage = TempDir::new().unwrap();
        let missing = storage.path().join("not-created");
        let staging = StagingArea::new(scratch.path());
        let store = ContentStore::new(&missing);

        let staged = staging.stage(&mut &b"data"[..]).await.unwrap();
        let result = store.commit(staged, "a.txt").await;

        assert!(matches!(result, Err(UploadError::Io(_))));
        assert!(!missing.exists());
        assert!(file_names(scratch.path()).is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_commits_of_same_content() {
        let f = fixture();
        let data = vec![7u8; 64 * 1024];

        let a = f.staging.stage(&mut data.as_slice()).await.unwrap();
        let b = f.staging.stage(&mut data.as_slice()).await.unwrap();
        let (a, b) = tokio::join!(f.store.commit(a, "blob.dat"), f.store.commit(b, "blob.dat"));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(a.path(), b.path());
        assert_eq!(std::fs::read(a.path()).unwrap(), data);
        assert_eq!(file_names(f.storage.path()).len(), 1);
        assert!(file_names(f.scratch.path()).is_empty());
    }
}
