//! Request middleware
//!
//! - `access_log`: one record per request with status, size and timing
//! - `recovery`: turns handler panics into an empty 500
//! - `methods`: per-route method allow-list with `OPTIONS` handling

pub mod access_log;
pub mod methods;
pub mod recovery;

pub use access_log::{log_access, AccessRecord, REQUEST_ID_HEADER};
pub use methods::{filter_methods, MethodFilter};
pub use recovery::recover_panic;
