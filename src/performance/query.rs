//! Query descriptors for the analytics read API

use chrono::{DateTime, NaiveTime, SecondsFormat, Utc};
use std::fmt;

/// Data group holding every GOV.UK info dataset
pub const DATA_GROUP: &str = "govuk-info";

/// Number of days of history requested for each stream
pub const DURATION_DAYS: u32 = 42;

/// Bucket size requested for each stream
pub const PERIOD: &str = "day";

/// The four analytics streams that make up a slug's statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    PageViews,
    Searches,
    SearchTerms,
    ProblemReports,
}

impl Stream {
    /// All streams in the order their results are inspected after the join
    pub const ALL: [Stream; 4] = [
        Stream::PageViews,
        Stream::Searches,
        Stream::SearchTerms,
        Stream::ProblemReports,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stream::PageViews => "page_views",
            Stream::Searches => "searches",
            Stream::SearchTerms => "search_terms",
            Stream::ProblemReports => "problem_reports",
        }
    }

    pub fn data_type(&self) -> &'static str {
        match self {
            Stream::PageViews => "page-statistics",
            Stream::Searches | Stream::SearchTerms => "search-terms",
            Stream::ProblemReports => "page-contacts",
        }
    }

    /// Metric collected for this stream, also the key of each bucket value
    pub fn metric(&self) -> &'static str {
        match self {
            Stream::PageViews => "uniquePageviews:sum",
            Stream::Searches | Stream::SearchTerms => "searchUniques:sum",
            Stream::ProblemReports => "total:sum",
        }
    }

    pub fn group_by(&self) -> &'static str {
        match self {
            Stream::SearchTerms => "searchKeyword",
            _ => "pagePath",
        }
    }

    /// Build the descriptor for this stream.
    ///
    /// Multipart content spans several sub-paths, so the path-grouped
    /// streams switch to prefix filtering. The keyword stream is always
    /// filtered on the exact slug.
    pub fn descriptor(&self, slug: &str, is_multipart: bool, end_at: DateTime<Utc>) -> QueryDescriptor {
        let filter = format!("pagePath:{slug}");

        let mut params = QueryParams {
            group_by: vec![self.group_by().to_string()],
            collect: vec![self.metric().to_string()],
            duration: Some(DURATION_DAYS),
            period: Some(PERIOD.to_string()),
            end_at: Some(end_at),
            ..Default::default()
        };

        if is_multipart && *self != Stream::SearchTerms {
            params.filter_by_prefix = vec![filter];
        } else {
            params.filter_by = vec![filter];
        }

        QueryDescriptor {
            data_group: DATA_GROUP.to_string(),
            data_type: self.data_type().to_string(),
            params,
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters understood by the read API
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pub filter_by: Vec<String>,
    pub filter_by_prefix: Vec<String>,
    pub group_by: Vec<String>,
    pub collect: Vec<String>,
    pub sort_by: Option<String>,
    pub duration: Option<u32>,
    pub period: Option<String>,
    pub limit: Option<u32>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
}

impl QueryParams {
    /// Flatten into query string pairs.
    ///
    /// List parameters produce one pair per value; empty values are left out
    /// entirely.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();

        let lists = [
            ("filter_by", &self.filter_by),
            ("filter_by_prefix", &self.filter_by_prefix),
            ("group_by", &self.group_by),
            ("collect", &self.collect),
        ];
        for (key, values) in lists {
            pairs.extend(
                values
                    .iter()
                    .filter(|v| !v.is_empty())
                    .map(|v| (key, v.clone())),
            );
        }

        if let Some(sort_by) = self.sort_by.as_ref().filter(|s| !s.is_empty()) {
            pairs.push(("sort_by", sort_by.clone()));
        }
        if let Some(duration) = self.duration.filter(|d| *d > 0) {
            pairs.push(("duration", duration.to_string()));
        }
        if let Some(period) = self.period.as_ref().filter(|p| !p.is_empty()) {
            pairs.push(("period", period.clone()));
        }
        if let Some(limit) = self.limit.filter(|l| *l > 0) {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(start_at) = self.start_at {
            pairs.push(("start_at", format_instant(start_at)));
        }
        if let Some(end_at) = self.end_at {
            pairs.push(("end_at", format_instant(end_at)));
        }

        pairs
    }
}

/// One sub-query against `/data/{data_group}/{data_type}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDescriptor {
    pub data_group: String,
    pub data_type: String,
    pub params: QueryParams,
}

/// Build the four stream descriptors for a slug, in [`Stream::ALL`] order.
///
/// `now` is the reference instant; every query ends at the start of its UTC
/// day.
pub fn build_queries(slug: &str, is_multipart: bool, now: DateTime<Utc>) -> [QueryDescriptor; 4] {
    let end_at = start_of_day(now);
    Stream::ALL.map(|stream| stream.descriptor(slug, is_multipart, end_at))
}

pub fn start_of_day(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant.date_naive().and_time(NaiveTime::MIN).and_utc()
}

fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2014, 9, 3, 15, 42, 7).unwrap()
    }

    #[test]
    fn builds_four_distinct_descriptors() {
        for is_multipart in [false, true] {
            let queries = build_queries("/tax-disc", is_multipart, now());
            let keys: HashSet<_> = queries
                .iter()
                .map(|q| (q.data_group.clone(), q.data_type.clone(), q.params.group_by.clone()))
                .collect();
            assert_eq!(keys.len(), 4);
        }
    }

    #[test]
    fn single_page_uses_exact_filters() {
        let queries = build_queries("/tax-disc", false, now());
        for query in &queries {
            assert_eq!(query.params.filter_by, vec!["pagePath:/tax-disc".to_string()]);
            assert!(query.params.filter_by_prefix.is_empty());
        }
    }

    #[test]
    fn multipart_uses_prefix_filters_except_for_keywords() {
        let queries = build_queries("/tax-disc", true, now());
        for (stream, query) in Stream::ALL.iter().zip(queries.iter()) {
            if *stream == Stream::SearchTerms {
                assert_eq!(query.params.filter_by, vec!["pagePath:/tax-disc".to_string()]);
                assert!(query.params.filter_by_prefix.is_empty());
            } else {
                assert!(query.params.filter_by.is_empty());
                assert_eq!(
                    query.params.filter_by_prefix,
                    vec!["pagePath:/tax-disc".to_string()]
                );
            }
        }
    }

    #[test]
    fn shared_window_ends_at_start_of_utc_day() {
        let queries = build_queries("/tax-disc", false, now());
        let midnight = Utc.with_ymd_and_hms(2014, 9, 3, 0, 0, 0).unwrap();
        for query in &queries {
            assert_eq!(query.params.duration, Some(42));
            assert_eq!(query.params.period.as_deref(), Some("day"));
            assert_eq!(query.params.end_at, Some(midnight));
        }
    }

    #[test]
    fn stream_metrics_and_groupings() {
        let queries = build_queries("/x", false, now());
        assert_eq!(queries[0].data_type, "page-statistics");
        assert_eq!(queries[0].params.collect, vec!["uniquePageviews:sum".to_string()]);
        assert_eq!(queries[1].data_type, "search-terms");
        assert_eq!(queries[1].params.group_by, vec!["pagePath".to_string()]);
        assert_eq!(queries[2].data_type, "search-terms");
        assert_eq!(queries[2].params.group_by, vec!["searchKeyword".to_string()]);
        assert_eq!(queries[3].data_type, "page-contacts");
        assert_eq!(queries[3].params.collect, vec!["total:sum".to_string()]);
    }

    #[test]
    fn pairs_repeat_list_keys_and_omit_empty_values() {
        let params = QueryParams {
            filter_by: vec!["a:1".to_string(), "b:2".to_string()],
            collect: vec![String::new()],
            sort_by: Some(String::new()),
            duration: Some(7),
            end_at: Some(Utc.with_ymd_and_hms(2014, 7, 3, 0, 0, 0).unwrap()),
            ..Default::default()
        };

        let pairs = params.to_pairs();

        assert_eq!(
            pairs,
            vec![
                ("filter_by", "a:1".to_string()),
                ("filter_by", "b:2".to_string()),
                ("duration", "7".to_string()),
                ("end_at", "2014-07-03T00:00:00Z".to_string()),
            ]
        );
    }
}
