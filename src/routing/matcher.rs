//! Route matching logic.
//!
//! # Responsibilities
//! - Match path prefix on segment boundaries (case-sensitive)
//! - Report match specificity so the longest prefix wins
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - "/api/auth" matches "/api/auth" and "/api/auth/login", never "/api/authz"
//! - "/" matches everything
//! - No regex to guarantee O(n) matching

/// Trait for matching request paths against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the path matches this condition.
    fn matches(&self, path: &str) -> bool;

    /// Specificity of the condition; higher wins when several match.
    fn specificity(&self) -> usize;
}

/// Matches the request path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    /// A trailing slash is ignored so "/api/" and "/api" behave alike.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let trimmed = prefix.trim_end_matches('/');
        Self {
            prefix: trimmed.to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, path: &str) -> bool {
        if self.prefix.is_empty() {
            return true;
        }
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    fn specificity(&self) -> usize {
        self.prefix.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_matcher() {
        let matcher = PathPrefixMatcher::new("/api");

        assert!(matcher.matches("/api"));
        assert!(matcher.matches("/api/v1"));
        assert!(!matcher.matches("/images"));
        assert!(!matcher.matches("/apis"));
    }

    #[test]
    fn test_trailing_slash_ignored() {
        let matcher = PathPrefixMatcher::new("/api/auth/");
        assert_eq!(matcher.prefix(), "/api/auth");
        assert!(matcher.matches("/api/auth/login"));
    }

    #[test]
    fn test_root_matches_everything() {
        let matcher = PathPrefixMatcher::new("/");
        assert!(matcher.matches("/"));
        assert!(matcher.matches("/anything/at/all"));
        assert_eq!(matcher.specificity(), 0);
    }

    #[test]
    fn test_case_sensitive() {
        let matcher = PathPrefixMatcher::new("/API");
        assert!(!matcher.matches("/api"));
    }
}
