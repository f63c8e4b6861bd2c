use super::models::SearchTerm;

/// Maximum number of search terms reported per slug
pub const MAX_SEARCH_TERMS: usize = 10;

/// Order terms by total searches (highest first), breaking ties on keyword
/// so equal totals always come out in the same order, then keep the top ten.
pub fn rank_search_terms(mut terms: Vec<SearchTerm>) -> Vec<SearchTerm> {
    terms.sort_by(|a, b| {
        b.total_searches
            .cmp(&a.total_searches)
            .then_with(|| a.keyword.cmp(&b.keyword))
    });
    terms.truncate(MAX_SEARCH_TERMS);
    terms
}
