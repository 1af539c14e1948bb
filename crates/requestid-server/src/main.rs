//! requestid-server: HTTP server that tags every request with a request id.

mod config;
mod server;

use std::sync::Arc;

use config::AppConfig;
use requestid::{RequestIdGenerator, RequestIdPropagator};

fn main() -> anyhow::Result<()> {
    // Determine config path
    let config_path = {
        let args: Vec<String> = std::env::args().collect();
        args.iter()
            .position(|a| a == "--config")
            .and_then(|i| args.get(i + 1).cloned())
            .or_else(|| args.get(1).filter(|a| !a.starts_with('-')).cloned())
            .or_else(|| std::env::var("REQUESTID_CONFIG").ok())
            .unwrap_or_else(|| "requestid.toml".to_string())
    };

    let config = AppConfig::load(&config_path)?;

    // The tonic OTLP exporter needs a reactor context, so build the runtime first
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let _tracing_guard = requestid_tracing::init_tracing(&config.tracing);
        run(config, &config_path).await
    })
}

async fn run(config: AppConfig, config_path: &str) -> anyhow::Result<()> {
    // A broken OS random source aborts startup instead of serving weak prefixes
    let generator = Arc::new(RequestIdGenerator::new()?);

    let propagator = RequestIdPropagator::new(Arc::clone(&generator))
        .try_with_header_name(&config.request_id.header_name)?;

    tracing::info!(
        config_path = %config_path,
        listen_address = %config.server.listen_address,
        header = %propagator.header_name(),
        prefix = %generator.prefix(),
        "Starting requestid-server"
    );

    server::run(&config.server.listen_address, propagator).await
}
