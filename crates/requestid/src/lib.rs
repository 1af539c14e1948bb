//! Request identifiers for HTTP services.
//!
//! Every inbound request gets exactly one identifier: the caller's own value
//! from the configured header when one is supplied, otherwise a freshly minted
//! `{hostname}-{pid}-{token}-{sequence}` string. The identifier is echoed on
//! the response and bound to the request so handlers, logs, and outbound
//! calls can all refer to the same value.

pub mod error;
pub mod generator;
#[cfg(feature = "axum")]
pub mod middleware;
pub mod propagation;
pub mod scope;
pub mod spans;

pub use error::Error;
pub use generator::RequestIdGenerator;
#[cfg(feature = "axum")]
pub use middleware::propagate_request_id;
pub use propagation::{
    request_id, MakeRequestId, RequestId, RequestIdExt, RequestIdPropagator, X_REQUEST_ID,
    X_TRACE_ID,
};
pub use scope::current;
