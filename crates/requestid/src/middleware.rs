//! axum adapter for [`RequestIdPropagator`].
//!
//! ```no_run
//! use axum::{middleware, routing::get, Router};
//! use requestid::{propagate_request_id, RequestId, RequestIdPropagator};
//!
//! # fn build() -> Result<Router, requestid::Error> {
//! let propagator = RequestIdPropagator::from_global()?;
//! let app: Router = Router::new()
//!     .route("/", get(|id: RequestId| async move { format!("RequestID: {id}") }))
//!     .layer(middleware::from_fn_with_state(propagator, propagate_request_id));
//! # Ok(app)
//! # }
//! ```

use std::convert::Infallible;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;

use crate::propagation::{RequestId, RequestIdPropagator};
use crate::scope;

/// Resolve the request's identifier, bind it, run the rest of the stack inside
/// a `request` span and the task-local scope, then echo it on the response.
///
/// Meant for `axum::middleware::from_fn_with_state`.
pub async fn propagate_request_id(
    State(propagator): State<RequestIdPropagator>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some((request_id, header_value)) = propagator.on_request(&mut request) else {
        return next.run(request).await;
    };

    let span = crate::request_span!(request_id, request.method(), request.uri().path());

    let mut response = scope::scope(request_id.clone(), next.run(request))
        .instrument(span)
        .await;

    propagator.on_response(&mut response, header_value);
    response
}

/// Extracts the bound identifier. Never rejects: without the middleware the
/// extracted value is empty.
impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<RequestId>().cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{HeaderMap, StatusCode};
    use axum::middleware::from_fn_with_state;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    use super::*;
    use crate::generator::RequestIdGenerator;
    use crate::propagation::{RequestIdExt, X_TRACE_ID};

    const PREFIX: &str = "host-7-abcdefghijklmnop-";

    fn propagator() -> RequestIdPropagator {
        RequestIdPropagator::new(Arc::new(RequestIdGenerator::with_prefix(PREFIX)))
    }

    fn app(propagator: RequestIdPropagator) -> Router {
        Router::new()
            .route("/", get(|id: RequestId| async move { format!("RequestID: {id}") }))
            .route(
                "/request",
                get(|request: Request| async move { request.request_id().to_string() }),
            )
            .route("/current", get(|| async { crate::current() }))
            .route(
                "/headers",
                get(|headers: HeaderMap| async move {
                    headers
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string()
                }),
            )
            .layer(from_fn_with_state(propagator, propagate_request_id))
    }

    async fn get_with(app: Router, uri: &str, header: Option<(&str, &str)>) -> (String, String) {
        let mut builder = axum::http::Request::builder().uri(uri);
        if let Some((name, value)) = header {
            builder = builder.header(name, value);
        }
        let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let echoed = response
            .headers()
            .get("x-request-id")
            .or_else(|| response.headers().get("x-trace-id"))
            .map(|v| String::from_utf8(v.as_bytes().to_vec()).unwrap())
            .unwrap_or_default();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (echoed, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_inbound_id_from_default_header() {
        let (echoed, body) = get_with(app(propagator()), "/", Some(("X-Request-Id", "req-123456"))).await;
        assert_eq!(echoed, "req-123456");
        assert_eq!(body, "RequestID: req-123456");
    }

    #[tokio::test]
    async fn test_inbound_id_from_custom_header() {
        let propagator = propagator().with_header_name(X_TRACE_ID.clone());
        let (echoed, body) = get_with(app(propagator), "/", Some(("X-Trace-Id", "trace:abc123"))).await;
        assert_eq!(echoed, "trace:abc123");
        assert_eq!(body, "RequestID: trace:abc123");
    }

    #[tokio::test]
    async fn test_utf8_inbound_id_round_trips() {
        let (echoed, body) = get_with(app(propagator()), "/", Some(("x-request-id", "café-42"))).await;
        assert_eq!(echoed, "café-42");
        assert_eq!(body, "RequestID: café-42");
    }

    #[tokio::test]
    async fn test_generated_id_matches_response_header() {
        let (echoed, body) = get_with(app(propagator()), "/", None).await;
        assert_eq!(echoed, format!("{PREFIX}000000000001"));
        assert_eq!(body, format!("RequestID: {echoed}"));
    }

    #[tokio::test]
    async fn test_generated_ids_advance_per_request() {
        let app = app(propagator());
        let (first, _) = get_with(app.clone(), "/", None).await;
        let (second, _) = get_with(app, "/", Some(("x-request-id", ""))).await;
        assert_eq!(first, format!("{PREFIX}000000000001"));
        assert_eq!(second, format!("{PREFIX}000000000002"));
    }

    #[tokio::test]
    async fn test_all_accessors_agree() {
        for uri in ["/request", "/current", "/headers"] {
            let (echoed, body) = get_with(app(propagator()), uri, None).await;
            assert_eq!(echoed, format!("{PREFIX}000000000001"), "{uri}");
            assert_eq!(body, echoed, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_extractor_without_middleware_is_empty() {
        let app = Router::new().route("/", get(|id: RequestId| async move { format!("[{id}]") }));
        let response = app
            .oneshot(axum::http::Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("x-request-id").is_none());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"[]");
    }

    #[tokio::test]
    async fn test_unrepresentable_generated_id_is_not_echoed() {
        let propagator = propagator().with_generator(|| "bad\r\nid".to_string());
        let (echoed, body) = get_with(app(propagator), "/", None).await;
        assert_eq!(echoed, "");
        assert_eq!(body, "RequestID: ");
    }
}
