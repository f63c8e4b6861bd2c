//! Data models for performance statistics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single (path, day) bucketed measurement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistic {
    /// Page path the measurement belongs to (empty for search term buckets)
    pub path: String,

    /// Start of the bucket
    pub timestamp: DateTime<Utc>,

    /// Measured value, truncated from the upstream float
    pub value: u64,
}

/// Search volume for one query phrase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchTerm {
    pub keyword: String,
    pub total_searches: u64,
    pub searches: Vec<Statistic>,
}

/// Unified statistics for a slug
///
/// Only ever built once all four analytics streams have been fetched and
/// parsed, so a value of this type is never partially populated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub page_views: Vec<Statistic>,
    pub searches: Vec<Statistic>,
    pub problem_reports: Vec<Statistic>,

    /// At most ten terms, highest `total_searches` first
    pub search_terms: Vec<SearchTerm>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn statistics_serialize_with_snake_case_fields() {
        let timestamp = Utc.with_ymd_and_hms(2014, 7, 3, 0, 0, 0).unwrap();
        let statistics = Statistics {
            page_views: vec![Statistic {
                path: "/tax-disc".to_string(),
                timestamp,
                value: 25931,
            }],
            searches: vec![],
            problem_reports: vec![],
            search_terms: vec![SearchTerm {
                keyword: "s2s".to_string(),
                total_searches: 104,
                searches: vec![],
            }],
        };

        let json = serde_json::to_value(&statistics).unwrap();

        assert_eq!(json["page_views"][0]["path"], "/tax-disc");
        assert_eq!(json["page_views"][0]["timestamp"], "2014-07-03T00:00:00Z");
        assert_eq!(json["page_views"][0]["value"], 25931);
        assert_eq!(json["search_terms"][0]["total_searches"], 104);
        assert!(json["problem_reports"].as_array().unwrap().is_empty());
    }
}
