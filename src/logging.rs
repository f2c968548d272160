//! Structured logging setup.
//!
//! The library only emits `tracing` events. Applications that do not install
//! their own subscriber can call [`init`] to get one configured from
//! [`LoggingConfig`].

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error, off
    pub level: String,

    /// Output format: text or json
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl LoggingConfig {
    /// Filter directive for this crate at the configured level.
    fn directive(&self) -> String {
        format!("hostlink={}", self.level)
    }
}

/// Install a global subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Returns `false` when
/// a global subscriber was already installed, which leaves it untouched.
pub fn init(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.directive()));

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.format {
        LogFormat::Text => registry.with(fmt::layer().with_target(true)).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    };
    installed.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive() {
        let config = LoggingConfig {
            level: "debug".to_string(),
            format: LogFormat::Json,
        };
        assert_eq!(config.directive(), "hostlink=debug");
    }

    #[test]
    fn test_format_wire_names() {
        assert_eq!(serde_json::to_string(&LogFormat::Json).unwrap(), "\"json\"");
        let parsed: LogFormat = serde_json::from_str("\"text\"").unwrap();
        assert_eq!(parsed, LogFormat::Text);
    }

    #[test]
    fn test_init_is_idempotent() {
        let config = LoggingConfig::default();
        let first = init(&config);
        let second = init(&config);
        // Only one installation can ever succeed per process.
        assert!(!(first && second));
        assert!(!second);
    }
}
