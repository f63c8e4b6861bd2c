pub mod handlers;
pub mod routes;

pub use handlers::AppState;
pub use routes::create_api_router;

use anyhow::Context;
use std::sync::Arc;

use crate::config::Config;
use crate::content::HttpContentStore;
use crate::needs::HttpNeedApi;
use crate::performance::client::USER_AGENT;
use crate::performance::{AggregatorConfig, HttpAnalyticsClient, StatisticsAggregator, TransportConfig};

impl AppState {
    /// Wire the HTTP-backed upstreams onto one shared connection pool.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.upstreams.timeout())
            .build()
            .context("Failed to build HTTP client")?;

        let analytics = HttpAnalyticsClient::with_client(
            config.upstreams.performance_platform_url.clone(),
            client.clone(),
            TransportConfig {
                max_elapsed_time: config.performance.max_elapsed_time(),
                bearer_token: config.auth.performance_platform_bearer_token.clone(),
                request_timeout: config.upstreams.timeout(),
            },
        );

        let statistics = StatisticsAggregator::with_config(
            Arc::new(analytics),
            AggregatorConfig {
                deadline: config.performance.deadline(),
            },
        );

        Ok(Self {
            content_store: Arc::new(HttpContentStore::new(
                config.upstreams.content_store_url.clone(),
                config.upstreams.website_root.clone(),
                client.clone(),
            )),
            need_api: Arc::new(HttpNeedApi::new(
                config.upstreams.need_api_url.clone(),
                config.auth.need_api_bearer_token.clone(),
                client,
            )),
            statistics: Arc::new(statistics),
        })
    }
}
