//! Structured logging.
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Verbosity comes from `LOG_LEVEL` (default `debug`)
//! - Unknown levels fall back to `debug` instead of failing startup

use std::str::FromStr;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_LEVEL_VAR: &str = "LOG_LEVEL";

/// Parse a log level name, accepting the common aliases.
pub fn parse_level(value: Option<&str>) -> LevelFilter {
    let value = value.map(str::trim).unwrap_or_default();
    match value.to_ascii_lowercase().as_str() {
        "" => LevelFilter::DEBUG,
        "warning" => LevelFilter::WARN,
        "fatal" | "panic" => LevelFilter::ERROR,
        other => LevelFilter::from_str(other).unwrap_or(LevelFilter::DEBUG),
    }
}

/// Filter for the given level; HTTP internals never go below `info`.
pub fn filter_for(level: LevelFilter) -> EnvFilter {
    let internals = level.min(LevelFilter::INFO);
    EnvFilter::new(format!(
        "{level},hyper={internals},hyper_util={internals},reqwest={internals}"
    ))
}

/// Install the global subscriber from `LOG_LEVEL`.
pub fn init_logging() {
    let level = parse_level(std::env::var(LOG_LEVEL_VAR).ok().as_deref());
    tracing_subscriber::registry()
        .with(filter_for(level))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
