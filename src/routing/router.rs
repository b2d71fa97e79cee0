//! Request classification.
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Two outcomes only; everything that is not media is bridged
//! - A media path with dot segments is bridged: the relay cannot forward it
//!   without resolving the segments into another endpoint

use std::fmt;

use crate::routing::matcher::{Matcher, MediaPathMatcher};

/// Where a request is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Byte-stream relay to the origin.
    Media,
    /// Message-oriented transport bridge.
    Api,
}

impl Route {
    pub fn as_str(self) -> &'static str {
        match self {
            Route::Media => "media",
            Route::Api => "api",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decides the route for each inbound request.
#[derive(Debug, Clone)]
pub struct RequestClassifier {
    media: MediaPathMatcher,
}

impl RequestClassifier {
    /// Compile the classifier; fails only if the media pattern is invalid.
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            media: MediaPathMatcher::new()?,
        })
    }

    /// Classify a request by its path (query excluded).
    pub fn classify(&self, path: &str) -> Route {
        if self.media.matches(path) && !has_dot_segment(path) {
            Route::Media
        } else {
            Route::Api
        }
    }
}

/// Whether any segment is `.` or `..`, literal or percent-encoded.
fn has_dot_segment(path: &str) -> bool {
    path.split(['/', '\\']).any(|segment| {
        let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
        decoded == "." || decoded == ".."
    })
}
