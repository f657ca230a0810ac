//! Access log middleware
//!
//! Emits one record per request on the `ingest_server::access` target once the
//! response body has been sent (or dropped), so the byte count and elapsed
//! time cover the whole exchange.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, Uri, Version},
    middleware::Next,
    response::Response,
};
use http_body::{Body as HttpBody, Frame, SizeHint};

use crate::util::generate_uuid;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// One completed request
#[derive(Debug, Clone)]
pub struct AccessRecord {
    pub request_id: String,
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub status: u16,
    pub bytes: u64,
    pub referer: String,
    pub user_agent: String,
    pub elapsed: Duration,
}

impl AccessRecord {
    pub fn emit(&self) {
        tracing::info!(
            target: "ingest_server::access",
            request_id = %self.request_id,
            method = %self.method,
            uri = %self.uri,
            version = ?self.version,
            status = self.status,
            bytes = self.bytes,
            referer = %self.referer,
            user_agent = %self.user_agent,
            elapsed_ms = self.elapsed.as_secs_f64() * 1000.0,
            "{}",
            self
        );
    }
}

impl fmt::Display for AccessRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {:?} {} {} \"{}\" \"{}\" {:?}",
            self.method,
            self.uri,
            self.version,
            self.status,
            self.bytes,
            self.referer,
            self.user_agent,
            self.elapsed
        )
    }
}

/// Request half of a record, completed when the body is done
struct PendingRecord {
    request_id: String,
    method: Method,
    uri: Uri,
    version: Version,
    status: u16,
    referer: String,
    user_agent: String,
    started: Instant,
}

impl PendingRecord {
    fn finish(self, bytes: u64) -> AccessRecord {
        AccessRecord {
            request_id: self.request_id,
            method: self.method,
            uri: self.uri,
            version: self.version,
            status: self.status,
            bytes,
            referer: self.referer,
            user_agent: self.user_agent,
            elapsed: self.started.elapsed(),
        }
    }
}

/// Response body that counts data bytes and logs on drop
struct CountingBody {
    inner: Body,
    bytes: u64,
    pending: Option<PendingRecord>,
}

impl HttpBody for CountingBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let polled = Pin::new(&mut self.inner).poll_frame(cx);
        if let Poll::Ready(Some(Ok(frame))) = &polled {
            if let Some(data) = frame.data_ref() {
                self.bytes += data.len() as u64;
            }
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for CountingBody {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.finish(self.bytes).emit();
        }
    }
}

fn header_text(headers: &HeaderMap, name: HeaderName) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub async fn log_access(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let request_id = generate_uuid();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let version = request.version();
    let referer = header_text(request.headers(), header::REFERER);
    let user_agent = header_text(request.headers(), header::USER_AGENT);

    let response = next.run(request).await;

    let pending = PendingRecord {
        status: response.status().as_u16(),
        request_id,
        method,
        uri,
        version,
        referer,
        user_agent,
        started,
    };

    let (mut parts, body) = response.into_parts();
    if let Ok(value) = HeaderValue::from_str(&pending.request_id) {
        parts.headers.insert(REQUEST_ID_HEADER, value);
    }

    let body = CountingBody {
        inner: body,
        bytes: 0,
        pending: Some(pending),
    };

    Response::from_parts(parts, Body::new(body))
}
