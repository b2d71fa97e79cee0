//! Path matching logic.
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Media pattern is a search, not anchored, mirroring the deployed gateway
//! - Patterns are compiled once; compilation errors surface at startup

use regex::Regex;

/// Pattern recognizing media endpoints.
pub const MEDIA_PATH_PATTERN: &str = "/_matrix/(client|federation)/v1/media";

/// Trait for matching request paths against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the path matches this condition.
    fn matches(&self, path: &str) -> bool;
}

/// Matches authenticated media endpoints.
#[derive(Debug, Clone)]
pub struct MediaPathMatcher {
    pattern: Regex,
}

impl MediaPathMatcher {
    /// Compile the media pattern.
    pub fn new() -> Result<Self, regex::Error> {
        Self::with_pattern(MEDIA_PATH_PATTERN)
    }

    pub fn with_pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }
}

impl Matcher for MediaPathMatcher {
    fn matches(&self, path: &str) -> bool {
        self.pattern.is_match(path)
    }
}
