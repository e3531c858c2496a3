/// Shown by the WordPress post list when a search matches nothing.
pub const WP_NO_RESULTS: &str = "No posts found";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Duplicate {
    Found,
    NotFound,
}

/// Substring heuristic over a rendered search-result page. A title that is a
/// substring of another post's title counts as found; a search that does not
/// echo the literal title counts as not found.
#[derive(Debug, Clone)]
pub struct DuplicateChecker {
    no_results_sentinel: String,
}

impl Default for DuplicateChecker {
    fn default() -> Self {
        Self::new(WP_NO_RESULTS)
    }
}

impl DuplicateChecker {
    pub fn new(no_results_sentinel: impl Into<String>) -> Self {
        Self {
            no_results_sentinel: no_results_sentinel.into(),
        }
    }

    pub fn check(&self, result_page: &str, canonical_title: &str) -> Duplicate {
        if !result_page.contains(&self.no_results_sentinel) && result_page.contains(canonical_title) {
            Duplicate::Found
        } else {
            Duplicate::NotFound
        }
    }
}
