//! Normalization of analytics payloads into typed records
//!
//! The read API returns two shapes depending on `group_by`: path-grouped
//! buckets for page views, searches and problem reports, and keyword-grouped
//! totals for search terms. Both carry float metrics which are truncated
//! toward zero.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use super::models::{SearchTerm, Statistic};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("metric {metric} is not a finite non-negative number: {value}")]
    InvalidMetric { metric: String, value: f64 },
    #[error("metric {metric} has a non-numeric value")]
    NonNumericMetric { metric: String },
}

#[derive(Debug, Deserialize)]
struct PathDataset {
    #[serde(rename = "pagePath")]
    path: String,
    values: Vec<Bucket>,
}

#[derive(Debug, Deserialize)]
struct KeywordDataset {
    #[serde(rename = "searchKeyword")]
    keyword: String,
    #[serde(rename = "searchUniques:sum", default)]
    total: Option<f64>,
    values: Vec<Bucket>,
}

/// One period bucket; the metric key varies by dataset so the remaining
/// fields are kept for lookup.
#[derive(Debug, Deserialize)]
struct Bucket {
    #[serde(rename = "_start_at")]
    start_at: DateTime<Utc>,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl Bucket {
    fn metric(&self, metric: &str) -> Result<u64, ParseError> {
        match self.fields.get(metric) {
            None | Some(Value::Null) => Ok(0),
            Some(Value::Number(n)) => {
                let value = n.as_f64().ok_or_else(|| ParseError::NonNumericMetric {
                    metric: metric.to_string(),
                })?;
                truncate(metric, Some(value))
            }
            Some(_) => Err(ParseError::NonNumericMetric {
                metric: metric.to_string(),
            }),
        }
    }
}

fn truncate(metric: &str, value: Option<f64>) -> Result<u64, ParseError> {
    let value = value.unwrap_or(0.0);
    if !value.is_finite() || value < 0.0 {
        return Err(ParseError::InvalidMetric {
            metric: metric.to_string(),
            value,
        });
    }
    Ok(value.trunc() as u64)
}

/// Flatten a path-grouped payload into one statistic per (path, bucket).
pub fn parse_path_statistics(data: &Value, metric: &str) -> Result<Vec<Statistic>, ParseError> {
    let datasets = Vec::<PathDataset>::deserialize(data)?;

    let mut statistics = Vec::new();
    for dataset in datasets {
        for bucket in &dataset.values {
            statistics.push(Statistic {
                path: dataset.path.clone(),
                timestamp: bucket.start_at,
                value: bucket.metric(metric)?,
            });
        }
    }

    Ok(statistics)
}

/// Parse a keyword-grouped payload into unranked search terms.
pub fn parse_search_terms(data: &Value) -> Result<Vec<SearchTerm>, ParseError> {
    const METRIC: &str = "searchUniques:sum";

    let datasets = Vec::<KeywordDataset>::deserialize(data)?;

    datasets
        .into_iter()
        .map(|dataset| {
            let searches = dataset
                .values
                .iter()
                .map(|bucket| {
                    Ok(Statistic {
                        path: String::new(),
                        timestamp: bucket.start_at,
                        value: bucket.metric(METRIC)?,
                    })
                })
                .collect::<Result<Vec<_>, ParseError>>()?;

            Ok(SearchTerm {
                keyword: dataset.keyword,
                total_searches: truncate(METRIC, dataset.total)?,
                searches,
            })
        })
        .collect()
}
