//! HTTP client for the analytics read API
//!
//! Every fetch is one logical GET. Connection failures and 502/503 responses
//! are retried with exponential backoff until the configured elapsed-time
//! budget runs out. Everything else is classified once and returned.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use super::backoff::ExponentialBackoff;
use super::query::QueryDescriptor;

pub const USER_AGENT: &str = concat!("metadata-api/", env!("CARGO_PKG_VERSION"));

/// Raw envelope returned by the read API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyticsResponse {
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AnalyticsResponse {
    /// Decode a response body, rejecting envelopes that report an error.
    pub fn from_body(url: &str, body: &str) -> Result<Self, TransportError> {
        let response: AnalyticsResponse =
            serde_json::from_str(body).map_err(|source| TransportError::InvalidEnvelope {
                url: url.to_string(),
                source,
            })?;

        if response.status.as_deref() == Some("error") {
            return Err(TransportError::UpstreamApplication {
                message: response.message.unwrap_or_default(),
            });
        }

        Ok(response)
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("upstream unavailable after {attempts} attempt(s) to {url}: {reason}")]
    Retryable {
        url: String,
        attempts: u32,
        reason: String,
    },
    #[error("not found: {url}")]
    NotFound { url: String },
    #[error("bad request to {url}: {body}")]
    BadRequest { url: String, body: String },
    #[error("upstream application error: {message}")]
    UpstreamApplication { message: String },
    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus { url: String, status: u16 },
    #[error("invalid response envelope from {url}: {source}")]
    InvalidEnvelope {
        url: String,
        source: serde_json::Error,
    },
    #[error("invalid upstream URL: {0}")]
    InvalidUrl(String),
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

impl TransportError {
    /// True for failures that were retried until the budget ran out
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Retryable { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, TransportError::NotFound { .. })
    }
}

/// Immutable transport settings, fixed at construction
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Total time allowed for retrying one logical request
    pub max_elapsed_time: Duration,
    /// Sent as `Authorization: Bearer <token>` when present
    pub bearer_token: Option<String>,
    /// Timeout for each individual attempt
    pub request_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_elapsed_time: Duration::from_secs(5),
            bearer_token: None,
            request_timeout: Duration::from_secs(10),
        }
    }
}

#[async_trait]
pub trait AnalyticsClient: Send + Sync {
    /// Fetch one dataset query and return its envelope
    async fn fetch(&self, query: &QueryDescriptor) -> Result<AnalyticsResponse, TransportError>;
}

/// Outcome of a single attempt that did not need another try
struct Received {
    status: StatusCode,
    body: String,
}

pub struct HttpAnalyticsClient {
    base_url: String,
    client: Client,
    config: TransportConfig,
}

impl HttpAnalyticsClient {
    pub fn new(base_url: impl Into<String>, config: TransportConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout)
            .build()
            .map_err(TransportError::ClientBuild)?;

        Ok(Self::with_client(base_url, client, config))
    }

    /// Reuse an existing connection pool
    pub fn with_client(base_url: impl Into<String>, client: Client, config: TransportConfig) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            config,
        }
    }

    pub fn build_url(&self, query: &QueryDescriptor) -> Result<Url, TransportError> {
        let raw = format!(
            "{}/data/{}/{}",
            self.base_url, query.data_group, query.data_type
        );
        let mut url = Url::parse(&raw).map_err(|e| TransportError::InvalidUrl(format!("{raw}: {e}")))?;

        let pairs = query.params.to_pairs();
        if !pairs.is_empty() {
            let mut serializer = url.query_pairs_mut();
            for (key, value) in &pairs {
                serializer.append_pair(key, value);
            }
        }

        Ok(url)
    }

    async fn attempt(&self, url: &Url) -> Result<Received, String> {
        let mut request = self
            .client
            .get(url.clone())
            .timeout(self.config.request_timeout)
            .header(header::ACCEPT, "application/json");

        if let Some(token) = self.config.bearer_token.as_deref().filter(|t| !t.is_empty()) {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| e.to_string())?;
        let status = response.status();

        if matches!(status, StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE) {
            return Err(format!("server unavailable ({status})"));
        }

        let body = response.text().await.map_err(|e| e.to_string())?;
        Ok(Received { status, body })
    }

    async fn get_with_retry(&self, url: &Url) -> Result<Received, TransportError> {
        let started = Instant::now();
        let mut backoff = ExponentialBackoff::new(self.config.max_elapsed_time);
        let mut attempts = 0;

        loop {
            attempts += 1;

            let reason = match self.attempt(url).await {
                Ok(received) => return Ok(received),
                Err(reason) => reason,
            };

            match backoff.next_delay(started.elapsed()) {
                Some(delay) => {
                    debug!(%url, attempts, ?delay, %reason, "retrying analytics request");
                    tokio::time::sleep(delay).await;
                }
                None => {
                    warn!(%url, attempts, %reason, "giving up on analytics request");
                    return Err(TransportError::Retryable {
                        url: url.to_string(),
                        attempts,
                        reason,
                    });
                }
            }
        }
    }
}

#[async_trait]
impl AnalyticsClient for HttpAnalyticsClient {
    async fn fetch(&self, query: &QueryDescriptor) -> Result<AnalyticsResponse, TransportError> {
        let url = self.build_url(query)?;
        debug!(%url, "requesting performance data for slug");

        let Received { status, body } = self.get_with_retry(&url).await?;
        let url = url.to_string();

        match status {
            StatusCode::NOT_FOUND => {
                warn!(%url, "analytics dataset not found");
                Err(TransportError::NotFound { url })
            }
            StatusCode::BAD_REQUEST => {
                let upstream_message = serde_json::from_str::<AnalyticsResponse>(&body)
                    .ok()
                    .and_then(|r| r.message);
                error!(%url, message = ?upstream_message, "bad request to analytics API");
                Err(TransportError::BadRequest { url, body })
            }
            s if s.is_success() => {
                let response = AnalyticsResponse::from_body(&url, &body)?;
                if let Some(warning) = response.warning.as_deref().filter(|w| !w.is_empty()) {
                    warn!(%url, warning, "analytics API returned a warning");
                }
                Ok(response)
            }
            s => Err(TransportError::UnexpectedStatus {
                url,
                status: s.as_u16(),
            }),
        }
    }
}
