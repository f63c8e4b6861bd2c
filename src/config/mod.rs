use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod discovery;

pub use discovery::resolve_service_url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api_server: ServerConfig,
    pub upstreams: UpstreamConfig,
    pub auth: UpstreamAuthConfig,
    pub performance: PerformanceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub content_store_url: String,
    pub need_api_url: String,
    pub performance_platform_url: String,
    /// Public site root used to build artefact web URLs
    pub website_root: String,
    #[serde(default = "UpstreamConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpstreamAuthConfig {
    #[serde(default)]
    pub need_api_bearer_token: Option<String>,
    #[serde(default)]
    pub performance_platform_bearer_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Retry budget for each analytics request
    #[serde(default = "PerformanceConfig::default_max_elapsed_ms")]
    pub max_elapsed_ms: u64,
    /// Optional bound on one whole aggregation
    #[serde(default)]
    pub deadline_ms: Option<u64>,
}

impl UpstreamConfig {
    const fn default_timeout_secs() -> u64 {
        10
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl PerformanceConfig {
    const fn default_max_elapsed_ms() -> u64 {
        5_000
    }

    pub fn max_elapsed_time(&self) -> Duration {
        Duration::from_millis(self.max_elapsed_ms)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            max_elapsed_ms: Self::default_max_elapsed_ms(),
            deadline_ms: None,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_host = var("API_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let api_port = var("API_PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse::<u16>()
            .context("API_PORT must be a valid port number")?;

        let content_store_url =
            var("CONTENT_STORE_URL").unwrap_or_else(|| resolve_service_url("content-store", &lookup));
        let need_api_url = var("NEED_API_URL").unwrap_or_else(|| resolve_service_url("need-api", &lookup));
        let performance_platform_url = var("PERFORMANCE_PLATFORM_URL")
            .unwrap_or_else(|| resolve_service_url("performance-platform-read-api", &lookup));
        let website_root = var("GOVUK_WEBSITE_ROOT").unwrap_or_else(|| "https://www.gov.uk".to_string());

        let timeout_secs = match var("UPSTREAM_TIMEOUT_SECS") {
            Some(v) => v
                .parse::<u64>()
                .context("UPSTREAM_TIMEOUT_SECS must be a whole number of seconds")?,
            None => UpstreamConfig::default_timeout_secs(),
        };

        let max_elapsed_ms = match var("PERFORMANCE_MAX_ELAPSED_MS") {
            Some(v) => v
                .parse::<u64>()
                .context("PERFORMANCE_MAX_ELAPSED_MS must be a whole number of milliseconds")?,
            None => PerformanceConfig::default_max_elapsed_ms(),
        };

        let deadline_ms = var("PERFORMANCE_DEADLINE_MS")
            .map(|v| {
                v.parse::<u64>()
                    .context("PERFORMANCE_DEADLINE_MS must be a whole number of milliseconds")
            })
            .transpose()?;
        if deadline_ms == Some(0) {
            anyhow::bail!("PERFORMANCE_DEADLINE_MS must be greater than zero");
        }

        if deadline_ms.is_some_and(|d| d < max_elapsed_ms) {
            tracing::warn!(
                "PERFORMANCE_DEADLINE_MS is shorter than PERFORMANCE_MAX_ELAPSED_MS; aggregations may time out before retries finish"
            );
        }

        Ok(Config {
            api_server: ServerConfig {
                host: api_host,
                port: api_port,
            },
            upstreams: UpstreamConfig {
                content_store_url,
                need_api_url,
                performance_platform_url,
                website_root,
                timeout_secs,
            },
            auth: UpstreamAuthConfig {
                need_api_bearer_token: var("NEED_API_BEARER_TOKEN"),
                performance_platform_bearer_token: var("PERFORMANCE_PLATFORM_BEARER_TOKEN"),
            },
            performance: PerformanceConfig {
                max_elapsed_ms,
                deadline_ms,
            },
        })
    }
}
