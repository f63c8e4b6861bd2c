use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use metadata_api::api::{create_api_router, AppState};
use metadata_api::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    info!("Loaded configuration");

    info!(
        content_store = %config.upstreams.content_store_url,
        need_api = %config.upstreams.need_api_url,
        performance_platform = %config.upstreams.performance_platform_url,
        "Using upstream services"
    );
    if let Some(deadline) = config.performance.deadline() {
        info!(deadline_ms = deadline.as_millis() as u64, "Aggregation deadline enabled");
    }

    let state = Arc::new(AppState::from_config(&config)?);
    let api_router = create_api_router(state);

    let api_addr = format!("{}:{}", config.api_server.host, config.api_server.port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr).await?;
    info!("🚀 Metadata API listening on http://{}", api_addr);
    info!("   - Metadata available at http://{}/info/<slug>", api_addr);

    axum::serve(api_listener, api_router).await?;

    Ok(())
}
