//! Choosing, echoing, and binding the identifier for one request.
//!
//! This module only depends on `http` types, so any server built on them can
//! drive it: call [`RequestIdPropagator::on_request`] before handing the request
//! on, then [`RequestIdPropagator::on_response`] on whatever comes back.

use std::fmt;
use std::sync::Arc;

use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::{Extensions, Request, Response};

use crate::error::Error;
use crate::generator::RequestIdGenerator;

/// Default header for reading and echoing the identifier.
pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Alternate header used by deployments that correlate on trace ids.
pub static X_TRACE_ID: HeaderName = HeaderName::from_static("x-trace-id");

/// Function used to mint an identifier when the caller did not send one.
pub type MakeRequestId = Arc<dyn Fn() -> String + Send + Sync>;

/// The identifier bound to one request.
///
/// Stored in the request's [`Extensions`], which are keyed by type, so no
/// other code can shadow or overwrite it by accident.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct RequestId(Arc<str>);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0.to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self(Arc::from(""))
    }
}

impl From<String> for RequestId {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self(Arc::from(value))
    }
}

impl AsRef<str> for RequestId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RequestId").field(&&*self.0).finish()
    }
}

/// Return the identifier bound in `extensions`, or `""` if none is.
///
/// Absence is normal for code paths that are not behind the middleware.
pub fn request_id(extensions: &Extensions) -> &str {
    extensions.get::<RequestId>().map_or("", RequestId::as_str)
}

/// Read the bound identifier straight off a request.
pub trait RequestIdExt {
    fn request_id(&self) -> &str;
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> &str {
        request_id(self.extensions())
    }
}

/// Per-instance propagation settings: the header to trust and echo, and the
/// function that mints identifiers. Cheap to clone.
#[derive(Clone)]
pub struct RequestIdPropagator {
    header_name: HeaderName,
    make_request_id: MakeRequestId,
}

impl RequestIdPropagator {
    /// Propagate on `x-request-id`, minting from `generator`.
    pub fn new(generator: Arc<RequestIdGenerator>) -> Self {
        Self {
            header_name: X_REQUEST_ID.clone(),
            make_request_id: Arc::new(move || generator.next_id()),
        }
    }

    /// Like [`RequestIdPropagator::new`] over the process-wide generator.
    pub fn from_global() -> Result<Self, Error> {
        Ok(Self::new(RequestIdGenerator::global()?))
    }

    pub fn with_header_name(mut self, header_name: HeaderName) -> Self {
        self.header_name = header_name;
        self
    }

    /// Parse and set the header name, e.g. from configuration.
    pub fn try_with_header_name(self, name: &str) -> Result<Self, Error> {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|source| {
            Error::InvalidHeaderName {
                name: name.to_string(),
                source,
            }
        })?;
        Ok(self.with_header_name(header_name))
    }

    /// Replace the minting function, e.g. with a deterministic one in tests.
    pub fn with_generator<F>(mut self, make_request_id: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.make_request_id = Arc::new(make_request_id);
        self
    }

    pub fn header_name(&self) -> &HeaderName {
        &self.header_name
    }

    /// Pick the identifier for a request with the given headers, together
    /// with the header value that carries it.
    ///
    /// A present, non-empty inbound value that is valid UTF-8 is trusted
    /// verbatim and its header value reused as is. Otherwise one is minted.
    /// Returns `None` only when the minting function produced something that
    /// cannot be sent as a header value; nothing is bound in that case, so the
    /// echoed header and the accessor still agree.
    pub fn resolve(&self, headers: &HeaderMap) -> Option<(RequestId, HeaderValue)> {
        let inbound = headers.get(&self.header_name).and_then(|value| {
            std::str::from_utf8(value.as_bytes())
                .ok()
                .filter(|id| !id.is_empty())
                .map(|id| (RequestId::from(id), value.clone()))
        });
        if inbound.is_some() {
            return inbound;
        }

        let minted = (self.make_request_id)();
        match HeaderValue::from_str(&minted) {
            Ok(value) => Some((RequestId::from(minted), value)),
            Err(_) => {
                tracing::warn!(
                    header = %self.header_name,
                    request_id = ?minted,
                    "Generated request id is not a valid header value, leaving request unbound"
                );
                None
            }
        }
    }

    /// Resolve the identifier for `request`, write it onto the request's own
    /// header and bind it in the request's extensions.
    ///
    /// Returns the header value to hand to [`RequestIdPropagator::on_response`].
    pub fn on_request<B>(&self, request: &mut Request<B>) -> Option<(RequestId, HeaderValue)> {
        let (request_id, value) = self.resolve(request.headers())?;
        request.headers_mut().insert(self.header_name.clone(), value.clone());
        request.extensions_mut().insert(request_id.clone());
        Some((request_id, value))
    }

    /// Echo the resolved header value on the response, replacing any value
    /// already set.
    pub fn on_response<B>(&self, response: &mut Response<B>, value: HeaderValue) {
        response.headers_mut().insert(self.header_name.clone(), value);
    }
}

impl fmt::Debug for RequestIdPropagator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestIdPropagator")
            .field("header_name", &self.header_name)
            .finish_non_exhaustive()
    }
}
