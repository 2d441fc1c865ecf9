pub mod accounts;
pub mod api;
pub mod config;
pub mod core_state;
pub mod db;
pub mod doctors;
pub mod ledger;
pub mod medications;
pub mod models;
pub mod store;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Start the service and block until Ctrl-C.
pub async fn run() -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = config::AppConfig::from_env();
    let bind_addr = config.bind_addr;
    let core = core_state::CoreState::open(config).map_err(|e| e.to_string())?;

    let mut server = api::start_api_server(Arc::new(core), bind_addr).await?;
    tracing::info!(addr = %server.addr, "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for shutdown signal: {e}");
    }
    server.shutdown();
    server.stopped().await;
    Ok(())
}
