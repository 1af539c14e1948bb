//! Logging and trace export bootstrap shared by requestid services.

pub mod config;
pub mod otlp;

pub use config::{LogFormat, OtlpProtocol, TracingConfig};
pub use otlp::{init_tracing, TracingGuard};
