//! Panic recovery
//!
//! A panic inside a handler is logged with a backtrace and answered with an
//! empty 500 instead of tearing down the connection task.

use std::any::Any;
use std::backtrace::Backtrace;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tower_http::catch_panic::CatchPanicLayer;

/// Layer catching handler panics
pub fn layer() -> CatchPanicLayer<fn(Box<dyn Any + Send + 'static>) -> Response> {
    CatchPanicLayer::custom(recover_panic as fn(Box<dyn Any + Send + 'static>) -> Response)
}

/// Convert a caught panic payload into the generic error response
pub fn recover_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };

    let backtrace = Backtrace::force_capture();
    tracing::error!(panic = %message, "Request handler panicked\n{}", backtrace);

    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}
