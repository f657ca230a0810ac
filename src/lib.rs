//! Ingest Server Library
//!
//! HTTP upload handling with content-addressed, deduplicating storage, plus
//! the middleware the server binary wraps it in.
//!
//! # Modules
//!
//! - `upload`: Streaming, hashing and storing of multipart file parts
//! - `middleware`: Access logging, panic recovery, method filtering
//! - `routes`: axum router wiring
//! - `config`: Environment configuration

pub mod config;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod upload;
pub mod util;

#[cfg(test)]
mod test_support;
