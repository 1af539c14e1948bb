//! Error types for identifier generation and propagator configuration.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The OS random source could not produce the per-process token.
    #[error("failed to read from the OS random source: {0}")]
    Entropy(#[from] rand::Error),

    /// A configured header name is not a valid HTTP header name.
    #[error("invalid request id header name {name:?}: {source}")]
    InvalidHeaderName {
        name: String,
        #[source]
        source: http::header::InvalidHeaderName,
    },
}
