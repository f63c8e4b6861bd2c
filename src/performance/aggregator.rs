//! Fan-out/fan-in aggregation of the four analytics streams
//!
//! All four sub-queries run concurrently and are joined before anything is
//! inspected. A failure in one stream does not cancel its siblings; once
//! every outcome is in, the first failure in stream order wins and all
//! results are discarded. A stream with no data (`NotFound`) is only
//! reported when no stream failed for any other reason. Only a configured deadline cancels the in-flight
//! queries early.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

use super::client::{AnalyticsClient, TransportError};
use super::models::{SearchTerm, Statistic, Statistics};
use super::normalizer::{parse_path_statistics, parse_search_terms, ParseError};
use super::query::{build_queries, QueryDescriptor, Stream};
use super::ranker::rank_search_terms;

/// Failure of a single stream's fetch-and-parse
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::Transport(err) if err.is_not_found())
    }
}

#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("{stream} statistics unavailable: {source}")]
    Stream { stream: Stream, source: FetchError },
    #[error("statistics aggregation exceeded its deadline of {0:?}")]
    DeadlineExceeded(Duration),
}

impl AggregationError {
    /// The stream whose failure was reported, if any
    pub fn stream(&self) -> Option<Stream> {
        match self {
            AggregationError::Stream { stream, .. } => Some(*stream),
            AggregationError::DeadlineExceeded(_) => None,
        }
    }

    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            AggregationError::Stream {
                source: FetchError::Transport(err),
                ..
            } => Some(err),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.transport().is_some_and(TransportError::is_not_found)
    }

    pub fn is_retryable(&self) -> bool {
        self.transport().is_some_and(TransportError::is_retryable)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AggregatorConfig {
    /// Upper bound on a whole aggregation; `None` waits for every stream
    pub deadline: Option<Duration>,
}

pub struct StatisticsAggregator {
    client: Arc<dyn AnalyticsClient>,
    config: AggregatorConfig,
}

impl StatisticsAggregator {
    pub fn new(client: Arc<dyn AnalyticsClient>) -> Self {
        Self::with_config(client, AggregatorConfig::default())
    }

    pub fn with_config(client: Arc<dyn AnalyticsClient>, config: AggregatorConfig) -> Self {
        Self { client, config }
    }

    pub async fn aggregate(&self, slug: &str, is_multipart: bool) -> Result<Statistics, AggregationError> {
        self.aggregate_at(slug, is_multipart, Utc::now()).await
    }

    /// Aggregate with an explicit reference instant for the query window.
    pub async fn aggregate_at(
        &self,
        slug: &str,
        is_multipart: bool,
        now: DateTime<Utc>,
    ) -> Result<Statistics, AggregationError> {
        let started = Instant::now();
        let [page_views_query, searches_query, search_terms_query, problem_reports_query] =
            build_queries(slug, is_multipart, now);

        let joined = async {
            tokio::join!(
                self.fetch_statistics(Stream::PageViews, &page_views_query),
                self.fetch_statistics(Stream::Searches, &searches_query),
                self.fetch_search_terms(&search_terms_query),
                self.fetch_statistics(Stream::ProblemReports, &problem_reports_query),
            )
        };

        let (page_views, searches, search_terms, problem_reports) = match self.config.deadline {
            Some(deadline) => tokio::time::timeout(deadline, joined).await.map_err(|_| {
                warn!(slug, ?deadline, "statistics aggregation timed out");
                AggregationError::DeadlineExceeded(deadline)
            })?,
            None => joined.await,
        };

        let mut failures = Vec::new();
        let page_views = take_outcome(slug, Stream::PageViews, page_views, &mut failures);
        let searches = take_outcome(slug, Stream::Searches, searches, &mut failures);
        let search_terms = take_outcome(slug, Stream::SearchTerms, search_terms, &mut failures);
        let problem_reports = take_outcome(slug, Stream::ProblemReports, problem_reports, &mut failures);

        // min_by_key keeps the first of equal keys: stream order, with
        // outages ahead of missing data.
        if let Some((stream, source)) = failures.into_iter().min_by_key(|(_, e)| e.is_not_found()) {
            return Err(AggregationError::Stream { stream, source });
        }

        // No failures, so every outcome is present.
        let statistics = Statistics {
            page_views: page_views.unwrap_or_default(),
            searches: searches.unwrap_or_default(),
            search_terms: search_terms.unwrap_or_default(),
            problem_reports: problem_reports.unwrap_or_default(),
        };

        debug!(
            slug,
            is_multipart,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "aggregated statistics"
        );

        Ok(statistics)
    }

    async fn fetch_statistics(
        &self,
        stream: Stream,
        query: &QueryDescriptor,
    ) -> Result<Vec<Statistic>, FetchError> {
        let response = self.client.fetch(query).await?;
        Ok(parse_path_statistics(&response.data, stream.metric())?)
    }

    async fn fetch_search_terms(&self, query: &QueryDescriptor) -> Result<Vec<SearchTerm>, FetchError> {
        let response = self.client.fetch(query).await?;
        let terms = parse_search_terms(&response.data)?;
        Ok(rank_search_terms(terms))
    }
}

/// Log a failed stream and set its error aside for selection.
fn take_outcome<T>(
    slug: &str,
    stream: Stream,
    outcome: Result<T, FetchError>,
    failures: &mut Vec<(Stream, FetchError)>,
) -> Option<T> {
    match outcome {
        Ok(value) => Some(value),
        Err(error) => {
            warn!(slug, %stream, %error, "analytics stream failed");
            failures.push((stream, error));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::performance::client::AnalyticsResponse;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Debug, Clone, Copy)]
    enum Failure {
        NotFound,
        Unavailable,
    }

    /// Answers each stream from a canned result and records every query.
    struct StubClient {
        failing: Vec<(Stream, Failure)>,
        seen: Mutex<Vec<QueryDescriptor>>,
    }

    impl StubClient {
        fn new(failing: Option<Stream>) -> Self {
            Self::failing_with(failing.map(|s| (s, Failure::NotFound)).into_iter().collect())
        }

        fn failing_with(failing: Vec<(Stream, Failure)>) -> Self {
            Self {
                failing,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    fn stream_of(query: &QueryDescriptor) -> Stream {
        match (query.data_type.as_str(), query.params.group_by[0].as_str()) {
            ("page-statistics", _) => Stream::PageViews,
            ("search-terms", "searchKeyword") => Stream::SearchTerms,
            ("search-terms", _) => Stream::Searches,
            _ => Stream::ProblemReports,
        }
    }

    #[async_trait]
    impl AnalyticsClient for StubClient {
        async fn fetch(&self, query: &QueryDescriptor) -> Result<AnalyticsResponse, TransportError> {
            self.seen.lock().unwrap().push(query.clone());
            let stream = stream_of(query);

            if let Some((_, failure)) = self.failing.iter().find(|(s, _)| *s == stream) {
                let url = stream.to_string();
                return Err(match failure {
                    Failure::NotFound => TransportError::NotFound { url },
                    Failure::Unavailable => TransportError::Retryable {
                        url,
                        attempts: 1,
                        reason: "server unavailable (503 Service Unavailable)".to_string(),
                    },
                });
            }

            let data = match stream {
                Stream::SearchTerms => json!([
                    { "searchKeyword": "b", "searchUniques:sum": 3.0, "values": [] },
                    { "searchKeyword": "a", "searchUniques:sum": 7.0, "values": [] }
                ]),
                other => json!([{
                    "pagePath": "/slug",
                    "values": [{ "_start_at": "2014-07-03T00:00:00+00:00", (other.metric()): 5.0 }]
                }]),
            };

            Ok(AnalyticsResponse {
                data,
                ..Default::default()
            })
        }
    }

    #[tokio::test]
    async fn combines_all_four_streams() {
        let client = Arc::new(StubClient::new(None));
        let aggregator = StatisticsAggregator::new(client.clone());

        let statistics = aggregator.aggregate("/slug", false).await.unwrap();

        assert_eq!(statistics.page_views.len(), 1);
        assert_eq!(statistics.searches.len(), 1);
        assert_eq!(statistics.problem_reports.len(), 1);
        assert_eq!(statistics.page_views[0].value, 5);
        assert_eq!(statistics.search_terms[0].keyword, "a");
        assert_eq!(statistics.search_terms[1].keyword, "b");
        assert_eq!(client.seen.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn any_single_failure_fails_the_whole_aggregation() {
        for failing in Stream::ALL {
            let client = Arc::new(StubClient::new(Some(failing)));
            let aggregator = StatisticsAggregator::new(client.clone());

            let err = aggregator.aggregate("/slug", true).await.unwrap_err();

            assert_eq!(err.stream(), Some(failing));
            assert!(err.is_not_found());
            // siblings were not cancelled
            assert_eq!(client.seen.lock().unwrap().len(), 4);
        }
    }

    #[tokio::test]
    async fn outages_are_reported_ahead_of_missing_data() {
        let client = Arc::new(StubClient::failing_with(vec![
            (Stream::PageViews, Failure::NotFound),
            (Stream::ProblemReports, Failure::Unavailable),
        ]));
        let aggregator = StatisticsAggregator::new(client);

        let err = aggregator.aggregate("/slug", false).await.unwrap_err();

        assert_eq!(err.stream(), Some(Stream::ProblemReports));
        assert!(err.is_retryable());
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn first_outage_in_stream_order_wins() {
        let client = Arc::new(StubClient::failing_with(vec![
            (Stream::ProblemReports, Failure::Unavailable),
            (Stream::PageViews, Failure::NotFound),
            (Stream::Searches, Failure::Unavailable),
        ]));
        let aggregator = StatisticsAggregator::new(client);

        let err = aggregator.aggregate("/slug", false).await.unwrap_err();

        assert_eq!(err.stream(), Some(Stream::Searches));
    }

    #[tokio::test]
    async fn missing_data_is_reported_when_nothing_else_failed() {
        let client = Arc::new(StubClient::failing_with(vec![
            (Stream::ProblemReports, Failure::NotFound),
            (Stream::Searches, Failure::NotFound),
        ]));
        let aggregator = StatisticsAggregator::new(client);

        let err = aggregator.aggregate("/slug", false).await.unwrap_err();

        assert_eq!(err.stream(), Some(Stream::Searches));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn parse_failures_are_reported_per_stream() {
        struct Garbage;

        #[async_trait]
        impl AnalyticsClient for Garbage {
            async fn fetch(&self, _: &QueryDescriptor) -> Result<AnalyticsResponse, TransportError> {
                Ok(AnalyticsResponse {
                    data: json!({ "unexpected": true }),
                    ..Default::default()
                })
            }
        }

        let aggregator = StatisticsAggregator::new(Arc::new(Garbage));
        let err = aggregator.aggregate("/slug", false).await.unwrap_err();

        assert_eq!(err.stream(), Some(Stream::PageViews));
        assert!(matches!(
            err,
            AggregationError::Stream {
                source: FetchError::Parse(_),
                ..
            }
        ));
    }
}
