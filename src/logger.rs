//! Internal diagnostics logger.
//!
//! The wrapper cannot log through `tracing` from inside the telemetry path:
//! events emitted there would be fed back into the OpenTelemetry layer that is
//! being flushed or configured. This module provides a minimal stdout/stderr
//! logger with level filtering for those code paths.
//!
//! The level is read once per process from `AWS_LAMBDA_LOG_LEVEL` or
//! `LOG_LEVEL` and defaults to `info`.

use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Level {
    Off,
    Error,
    Warn,
    Info,
    Debug,
}

impl Level {
    fn parse(value: &str) -> Option<Level> {
        match value.to_lowercase().as_str() {
            "none" | "off" => Some(Level::Off),
            "error" => Some(Level::Error),
            "warn" | "warning" => Some(Level::Warn),
            "info" => Some(Level::Info),
            "debug" | "trace" => Some(Level::Debug),
            _ => None,
        }
    }
}

static LEVEL: OnceLock<Level> = OnceLock::new();

fn active_level() -> Level {
    *LEVEL.get_or_init(|| {
        env::var("AWS_LAMBDA_LOG_LEVEL")
            .or_else(|_| env::var("LOG_LEVEL"))
            .ok()
            .and_then(|v| Level::parse(&v))
            .unwrap_or(Level::Info)
    })
}

/// Scoped logger with level filtering and a consistent `[scope] message` prefix.
#[derive(Clone)]
pub(crate) struct Logger {
    scope: &'static str,
}

impl Logger {
    pub(crate) const fn new(scope: &'static str) -> Self {
        Self { scope }
    }

    fn enabled(&self, level: Level) -> bool {
        level <= active_level()
    }

    pub(crate) fn debug(&self, message: impl AsRef<str>) {
        if self.enabled(Level::Debug) {
            println!("[{}] {}", self.scope, message.as_ref());
        }
    }

    pub(crate) fn info(&self, message: impl AsRef<str>) {
        if self.enabled(Level::Info) {
            println!("[{}] {}", self.scope, message.as_ref());
        }
    }

    pub(crate) fn warn(&self, message: impl AsRef<str>) {
        if self.enabled(Level::Warn) {
            eprintln!("[{}] {}", self.scope, message.as_ref());
        }
    }

    pub(crate) fn error(&self, message: impl AsRef<str>) {
        if self.enabled(Level::Error) {
            eprintln!("[{}] {}", self.scope, message.as_ref());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parsing() {
        assert_eq!(Level::parse("debug"), Some(Level::Debug));
        assert_eq!(Level::parse("WARN"), Some(Level::Warn));
        assert_eq!(Level::parse("none"), Some(Level::Off));
        assert_eq!(Level::parse("verbose"), None);
    }

    #[test]
    fn test_level_ordering() {
        assert!(Level::Error < Level::Debug);
        assert!(Level::Off < Level::Error);
        assert!(Level::Warn <= Level::Info);
    }

    #[test]
    fn test_logging_does_not_panic() {
        let logger = Logger::new("test");
        logger.debug("debug message");
        logger.info("info message");
        logger.warn("warn message");
        logger.error("error message");
    }
}
