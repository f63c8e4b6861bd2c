//! Usage statistics from the performance platform read API
//!
//! Fetches page views, searches, search terms and problem reports for a slug
//! concurrently and merges them into one [`Statistics`] value.

pub mod aggregator;
pub mod backoff;
pub mod client;
pub mod models;
pub mod normalizer;
pub mod query;
pub mod ranker;

pub use aggregator::{AggregationError, AggregatorConfig, FetchError, StatisticsAggregator};
pub use client::{AnalyticsClient, AnalyticsResponse, HttpAnalyticsClient, TransportConfig, TransportError};
pub use models::{SearchTerm, Statistic, Statistics};
pub use query::{build_queries, QueryDescriptor, QueryParams, Stream};
pub use ranker::rank_search_terms;
