//! Route pattern compilation and matching.
//!
//! Every route path, literal or not, compiles to one anchored regex.
//! Surrounding slashes are normalization noise: the spec string is trimmed
//! of leading and trailing `/` before anchoring, and the request path is
//! trimmed the same way before matching, so `/user/`, `user` and `user/`
//! address the same pattern.

use litespeed_core::PathArgs;
use regex::Regex;

/// A compiled route pattern.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    regex: Regex,
    arg_names: Vec<Option<String>>,
}

impl RoutePattern {
    /// Compile a path spec into an anchored pattern.
    ///
    /// # Errors
    /// [`PatternError`] when the spec is not a valid regex.
    pub fn compile(spec: &str) -> Result<Self, PatternError> {
        let core = spec.trim_matches('/');
        let regex = Regex::new(&format!("^{core}$")).map_err(|source| PatternError {
            spec: spec.to_string(),
            source,
        })?;
        let arg_names = regex
            .capture_names()
            .skip(1) // group 0 is the whole match
            .map(|name| name.map(str::to_string))
            .collect();
        Ok(Self { regex, arg_names })
    }

    /// Match a request path. Returns the extracted arguments (capture groups
    /// in appearance order) on success.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<PathArgs> {
        let trimmed = path.trim_start_matches('/');
        let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
        let captures = self.regex.captures(trimmed)?;
        let entries = self
            .arg_names
            .iter()
            .enumerate()
            .filter_map(|(i, name)| {
                captures
                    .get(i + 1)
                    .map(|m| (name.clone(), m.as_str().to_string()))
            })
            .collect();
        Some(PathArgs::from_entries(entries))
    }

    /// Number of capture groups in the pattern.
    #[must_use]
    pub fn arg_count(&self) -> usize {
        self.arg_names.len()
    }
}

/// A path spec that failed to compile.
#[derive(Debug)]
pub struct PatternError {
    /// The offending spec.
    pub spec: String,
    /// The underlying regex error.
    pub source: regex::Error,
}

impl std::fmt::Display for PatternError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid route pattern {:?}: {}", self.spec, self.source)
    }
}

impl std::error::Error for PatternError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_patterns_match_with_and_without_slashes() {
        let pattern = RoutePattern::compile("user").unwrap();
        assert!(pattern.matches("/user/").is_some());
        assert!(pattern.matches("/user").is_some());
        assert!(pattern.matches("user").is_some());
        assert!(pattern.matches("/users/").is_none());
    }

    #[test]
    fn empty_spec_matches_the_root() {
        let pattern = RoutePattern::compile("").unwrap();
        assert!(pattern.matches("/").is_some());
        assert!(pattern.matches("").is_some());
        assert!(pattern.matches("/x").is_none());
    }

    #[test]
    fn positional_groups_extract_in_order() {
        let pattern = RoutePattern::compile(r"(\d{4})/(\d+)").unwrap();
        let args = pattern.matches("/2024/17/").unwrap();
        assert_eq!(args.get(0), Some("2024"));
        assert_eq!(args.get(1), Some("17"));
        assert!(pattern.matches("/2024/").is_none());
    }

    #[test]
    fn named_groups_carry_their_names() {
        let pattern = RoutePattern::compile(r"(?P<year>\d{4})/(?P<article>\d+)").unwrap();
        let args = pattern.matches("/2023/9/").unwrap();
        assert_eq!(args.named("year"), Some("2023"));
        assert_eq!(args.named("article"), Some("9"));
        // names do not disturb positional order
        assert_eq!(args.get(0), Some("2023"));
    }

    #[test]
    fn anchoring_rejects_partial_matches() {
        let pattern = RoutePattern::compile(r"(\d{2})").unwrap();
        assert!(pattern.matches("/42/").is_some());
        assert!(pattern.matches("/123/").is_none());
        assert!(pattern.matches("/42/extra/").is_none());
    }

    #[test]
    fn bad_regex_is_reported_with_the_spec() {
        let err = RoutePattern::compile(r"(\d{2").unwrap_err();
        assert!(err.to_string().contains(r"(\d{2"));
    }
}
