use encrypted_orderbook_agent::{api::start_server, config::AgentConfig, dispatcher::Dispatcher};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AgentConfig::from_env()?;

    info!("🚀 Encrypted Orderbook Agent - API Server");
    info!("📍 Port: {}", config.api_port);
    info!("🔗 Orderbook: {}", config.orderbook_url);

    let dispatcher = Arc::new(Dispatcher::from_config(&config)?);

    info!("✅ Dispatcher initialized");
    info!("📡 Starting API server...");

    start_server(dispatcher, config.api_port).await?;

    Ok(())
}
