//! Diagnostic logging setup.
//!
//! Progress lines go to stdout with `println!`; this configures the `tracing`
//! subscriber for everything else (resolved paths, exact commands, skipped
//! checks), written to stderr.

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_LEVEL_ENV: &str = "CROSSBUILD_LOG_LEVEL";

static INIT: Once = Once::new();

/// Parses a log level, falling back to `WARN` for unknown strings.
pub fn parse_level(level_str: &str) -> Level {
    match level_str.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to WARN. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::WARN
        }
    }
}

/// Pick the level: explicit flag, then `-v`/`-q`, then the environment.
pub fn resolve_level(log_level: Option<&str>, verbose: bool, quiet: bool) -> Level {
    if let Some(level_str) = log_level {
        parse_level(level_str)
    } else if verbose {
        Level::DEBUG
    } else if quiet {
        Level::ERROR
    } else {
        match env::var(LOG_LEVEL_ENV) {
            Ok(level_str) => parse_level(&level_str),
            Err(_) => Level::WARN,
        }
    }
}

/// Install the subscriber. Only the first call has an effect.
///
/// `RUST_LOG`, when set, takes over filtering entirely.
pub fn init(level: Level) {
    INIT.call_once(|| {
        let filter = if env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(format!("crossbuild={}", level))
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("trace"), Level::TRACE);
        assert_eq!(parse_level("Debug"), Level::DEBUG);
        assert_eq!(parse_level("INFO"), Level::INFO);
        assert_eq!(parse_level("bogus"), Level::WARN);
    }

    #[test]
    fn test_resolve_level_precedence() {
        assert_eq!(resolve_level(Some("trace"), true, false), Level::TRACE);
        assert_eq!(resolve_level(None, true, false), Level::DEBUG);
        assert_eq!(resolve_level(None, false, true), Level::ERROR);
    }
}
