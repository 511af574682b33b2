// src/core/filter.rs

//! URL-substring denylist applied before rate limiting or forwarding.

/// Rejects requests whose URL contains any configured substring.
#[derive(Debug, Clone)]
pub struct RequestFilter {
    patterns: Vec<String>,
}

impl RequestFilter {
    pub fn new(patterns: Vec<String>) -> Self {
        Self { patterns }
    }

    /// `true` if `url` should be blocked. Matching is case-insensitive.
    pub fn should_filter(&self, url: &str) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let url_lower = url.to_lowercase();
        self.patterns
            .iter()
            .any(|p| !p.is_empty() && url_lower.contains(p.to_lowercase().as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_matching_substring() {
        let filter = RequestFilter::new(vec!["/admin".to_string(), ".git".to_string()]);
        assert!(filter.should_filter("/admin/users"));
        assert!(filter.should_filter("/repo/.git/config"));
    }

    #[test]
    fn allows_non_matching_url() {
        let filter = RequestFilter::new(vec!["/admin".to_string()]);
        assert!(!filter.should_filter("/api/v1/widgets"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let filter = RequestFilter::new(vec!["/ADMIN".to_string()]);
        assert!(filter.should_filter("/admin/users"));
    }

    #[test]
    fn empty_patterns_block_nothing() {
        let filter = RequestFilter::new(vec![]);
        assert!(!filter.should_filter("/anything"));
    }
}
