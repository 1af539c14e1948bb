//! Span builder helpers carrying the request identifier.

/// Create the top-level span for one inbound request.
///
/// Usage: `let span = requestid::request_span!(request_id, method, path);`
///
/// Every event emitted inside the span, including those from handlers and
/// `tower_http::trace`, inherits `request_id`.
#[macro_export]
macro_rules! request_span {
    ($request_id:expr, $method:expr, $path:expr) => {
        tracing::info_span!(
            "request",
            request_id = %$request_id,
            method = %$method,
            path = %$path,
        )
    };
}
