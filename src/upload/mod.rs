//! Content-Addressed Upload Module
//!
//! Accepts file parts from multipart requests and stores each one under a
//! name derived from its SHA-256 digest:
//! - Parts are streamed to a staging file while being hashed
//! - Identical content with the same extension is stored once
//! - Staging files never outlive the request
//!
//! Flow per part:
//! 1. Check the client file extension against the allow-list
//! 2. Stage the bytes and compute the digest
//! 3. Commit to `<storage>/upload_<digest><ext>` unless already present

pub mod hashing;
pub mod processor;
pub mod responder;
pub mod staging;
pub mod store;
pub mod types;

pub use hashing::{compute_hash, copy_hashing};
pub use processor::{PartSource, UploadProcessor};
pub use responder::{JsonResponder, StatusResponder, UploadResponder};
pub use staging::{StagedFile, StagingArea};
pub use store::{CommitOutcome, ContentStore};
pub use types::*;
