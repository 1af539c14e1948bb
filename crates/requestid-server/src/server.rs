//! Axum HTTP server: router, listener, graceful shutdown.

use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use requestid::{propagate_request_id, RequestId, RequestIdPropagator};
use tower_http::trace::TraceLayer;

/// Build the application router.
///
/// The request id middleware is the outermost layer so the HTTP trace spans
/// and every handler run under the request's `request_id`.
pub fn router(propagator: RequestIdPropagator) -> Router {
    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(from_fn_with_state(propagator, propagate_request_id))
}

/// Build and run the HTTP server.
pub async fn run(listen_addr: &str, propagator: RequestIdPropagator) -> anyhow::Result<()> {
    let app = router(propagator);

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(address = %listen_addr, "requestid server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("requestid server shut down gracefully");
    Ok(())
}

/// Report the identifier this request was tagged with.
async fn handle_root(request_id: RequestId) -> String {
    tracing::info!("Handling request");
    format!("RequestID: {request_id}")
}

/// Health check endpoint.
async fn handle_health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Wait for SIGINT (Ctrl+C) for graceful shutdown.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use requestid::RequestIdGenerator;
    use tower::ServiceExt;

    use super::*;

    async fn call(app: Router, request: Request<Body>) -> (Option<String>, String) {
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let echoed = response
            .headers()
            .iter()
            .find(|(name, _)| name.as_str() == "x-request-id" || name.as_str() == "x-trace-id")
            .map(|(_, value)| value.to_str().unwrap().to_string());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (echoed, String::from_utf8(body.to_vec()).unwrap())
    }

    fn request(uri: &str) -> axum::http::request::Builder {
        Request::builder().uri(uri)
    }

    #[tokio::test]
    async fn test_root_echoes_inbound_id() {
        let app = router(RequestIdPropagator::from_global().unwrap());
        let req = request("/").header("x-request-id", "req-123456").body(Body::empty()).unwrap();

        let (echoed, body) = call(app, req).await;
        assert_eq!(echoed.as_deref(), Some("req-123456"));
        assert_eq!(body, "RequestID: req-123456");
    }

    #[tokio::test]
    async fn test_root_mints_id_with_process_prefix() {
        let generator = Arc::new(RequestIdGenerator::new().unwrap());
        let app = router(RequestIdPropagator::new(Arc::clone(&generator)));

        let (echoed, body) = call(app, request("/").body(Body::empty()).unwrap()).await;
        let echoed = echoed.unwrap();
        assert_eq!(echoed, format!("{}000000000001", generator.prefix()));
        assert_eq!(body, format!("RequestID: {echoed}"));
    }

    #[tokio::test]
    async fn test_configured_trace_header() {
        let propagator = RequestIdPropagator::from_global()
            .unwrap()
            .try_with_header_name("X-Trace-Id")
            .unwrap();
        let req = request("/").header("X-Trace-Id", "trace:abc123").body(Body::empty()).unwrap();

        let (echoed, body) = call(router(propagator), req).await;
        assert_eq!(echoed.as_deref(), Some("trace:abc123"));
        assert_eq!(body, "RequestID: trace:abc123");
    }

    #[tokio::test]
    async fn test_health_is_tagged() {
        let propagator = RequestIdPropagator::from_global()
            .unwrap()
            .with_generator(|| "fixed-id".to_string());

        let (echoed, body) = call(router(propagator), request("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(echoed.as_deref(), Some("fixed-id"));
        assert_eq!(body, "ok");
    }
}
