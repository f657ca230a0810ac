//! Method allow-list middleware
//!
//! `OPTIONS` is answered directly with an `Allow` header, listed methods reach
//! the wrapped handler, anything else gets 405.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Methods accepted by a route
#[derive(Debug, Clone)]
pub struct MethodFilter {
    allowed: Arc<[Method]>,
    allow_header: HeaderValue,
}

impl MethodFilter {
    pub fn new<I>(methods: I) -> Self
    where
        I: IntoIterator<Item = Method>,
    {
        let allowed: Arc<[Method]> = methods.into_iter().collect();

        let mut listed = vec![Method::OPTIONS.as_str()];
        listed.extend(allowed.iter().map(Method::as_str));
        // Method names are HTTP tokens and always valid header values
        let allow_header = HeaderValue::from_str(&listed.join(", "))
            .unwrap_or_else(|_| HeaderValue::from_static("OPTIONS"));

        Self {
            allowed,
            allow_header,
        }
    }

    pub fn allows(&self, method: &Method) -> bool {
        self.allowed.contains(method)
    }

    /// Value sent in the `Allow` header
    pub fn allow_header(&self) -> &HeaderValue {
        &self.allow_header
    }
}

impl Default for MethodFilter {
    fn default() -> Self {
        Self::new([Method::POST])
    }
}

pub async fn filter_methods(
    State(filter): State<MethodFilter>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method();

    if method == Method::OPTIONS {
        return (
            StatusCode::OK,
            [(header::ALLOW, filter.allow_header().clone())],
        )
            .into_response();
    }

    if filter.allows(method) {
        return next.run(request).await;
    }

    tracing::debug!(method = %method, uri = %request.uri(), "Method not allowed");
    (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, routing::any, Router};
    use tower::ServiceExt;

    fn app(filter: MethodFilter) -> Router {
        Router::new().route(
            "/",
            any(|| async { "handled" })
                .layer(axum::middleware::from_fn_with_state(filter, filter_methods)),
        )
    }

    fn request(method: Method) -> Request {
        Request::builder()
            .method(method)
            .uri("/")
            .body(Body::empty())
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_options_lists_methods() {
        let response = app(MethodFilter::new([Method::POST]))
            .oneshot(request(Method::OPTIONS))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ALLOW], "OPTIONS, POST");
        assert!(body_string(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_allowed_method_reaches_handler() {
        let response = app(MethodFilter::new([Method::POST]))
            .oneshot(request(Method::POST))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "handled");
    }

    #[tokio::test]
    async fn test_other_methods_rejected() {
        let app = app(MethodFilter::new([Method::POST]));

        for method in [Method::GET, Method::PUT, Method::DELETE] {
            let response = app.clone().oneshot(request(method)).await.unwrap();
            assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        }
    }

    #[test]
    fn test_allow_header_with_several_methods() {
        let filter = MethodFilter::new([Method::GET, Method::POST]);
        assert_eq!(filter.allow_header(), "OPTIONS, GET, POST");
    }

    #[test]
    fn test_allow_header_without_methods() {
        let filter = MethodFilter::new(Vec::new());
        assert_eq!(filter.allow_header(), "OPTIONS");
        assert!(!filter.allows(&Method::POST));
    }
}
