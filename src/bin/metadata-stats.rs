use anyhow::{Context, Result};
use clap::Parser;
use metadata_api::config::resolve_service_url;
use metadata_api::performance::{AggregatorConfig, HttpAnalyticsClient, StatisticsAggregator, TransportConfig};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "metadata-stats")]
#[command(about = "Fetch performance statistics for a single slug", long_about = None)]
struct Cli {
    /// Page path, e.g. /vat-rates
    slug: String,
    /// Match every page under the slug instead of the exact path
    #[arg(long)]
    multipart: bool,
    /// Performance platform base URL (defaults to PERFORMANCE_PLATFORM_URL or service discovery)
    #[arg(long)]
    base_url: Option<String>,
    #[arg(long, env = "PERFORMANCE_PLATFORM_BEARER_TOKEN")]
    bearer_token: Option<String>,
    /// Retry budget per request
    #[arg(long, default_value_t = 5_000)]
    max_elapsed_ms: u64,
    /// Bound on the whole aggregation
    #[arg(long)]
    deadline_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let base_url = cli.base_url.unwrap_or_else(|| {
        std::env::var("PERFORMANCE_PLATFORM_URL")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| {
                resolve_service_url("performance-platform-read-api", |key| std::env::var(key).ok())
            })
    });

    let client = HttpAnalyticsClient::new(
        base_url.clone(),
        TransportConfig {
            max_elapsed_time: Duration::from_millis(cli.max_elapsed_ms),
            bearer_token: cli.bearer_token,
            ..TransportConfig::default()
        },
    )
    .context("Failed to build analytics client")?;

    let aggregator = StatisticsAggregator::with_config(
        Arc::new(client),
        AggregatorConfig {
            deadline: cli.deadline_ms.map(Duration::from_millis),
        },
    );

    let slug = format!("/{}", cli.slug.trim_matches('/'));
    let statistics = aggregator
        .aggregate(&slug, cli.multipart)
        .await
        .with_context(|| format!("Failed to aggregate statistics for {slug} from {base_url}"))?;

    println!("{}", serde_json::to_string_pretty(&statistics)?);

    Ok(())
}
