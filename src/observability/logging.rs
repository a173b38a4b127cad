//! Structured logging configuration.

use crate::config::LoggingSettings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable, multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format name; anything but `json` is pretty.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Event filter.
    pub filter: EnvFilter,
    /// Log file; stderr when `None`.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Builds logging configuration from config settings with env overrides.
    #[must_use]
    pub fn from_settings(settings: &LoggingSettings, verbose: bool) -> Self {
        let directive = filter_directive(
            |key| std::env::var(key).ok(),
            settings.level.as_deref(),
            verbose,
        );
        Self {
            format: settings
                .format
                .as_deref()
                .map(LogFormat::parse)
                .unwrap_or_default(),
            filter: EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info")),
            file: settings.file.clone(),
        }
    }
}

/// Picks the filter directive.
///
/// Precedence: `PROMPTGRAPH_LOG`, `RUST_LOG`, `debug` when verbose, the
/// configured level, then `info`.
pub(crate) fn filter_directive(
    lookup: impl Fn(&str) -> Option<String>,
    configured: Option<&str>,
    verbose: bool,
) -> String {
    let from_env = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
    from_env("PROMPTGRAPH_LOG")
        .or_else(|| from_env("RUST_LOG"))
        .or_else(|| verbose.then(|| "debug".to_string()))
        .or_else(|| configured.map(str::to_string))
        .unwrap_or_else(|| "info".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Some("trace"), Some("warn"), false, None, "trace"; "promptgraph env wins")]
    #[test_case(None, Some("warn"), true, Some("error"), "warn"; "rust log next")]
    #[test_case(None, None, true, Some("error"), "debug"; "verbose beats config")]
    #[test_case(None, None, false, Some("error"), "error"; "configured level")]
    #[test_case(None, Some("  "), false, None, "info"; "blank env ignored")]
    fn test_filter_directive(
        own: Option<&str>,
        rust_log: Option<&str>,
        verbose: bool,
        configured: Option<&str>,
        expected: &str,
    ) {
        let lookup = |key: &str| match key {
            "PROMPTGRAPH_LOG" => own.map(str::to_string),
            "RUST_LOG" => rust_log.map(str::to_string),
            _ => None,
        };
        assert_eq!(filter_directive(lookup, configured, verbose), expected);
    }

    #[test_case("json", LogFormat::Json)]
    #[test_case(" JSON ", LogFormat::Json)]
    #[test_case("pretty", LogFormat::Pretty)]
    #[test_case("xml", LogFormat::Pretty)]
    fn test_log_format_parse(input: &str, expected: LogFormat) {
        assert_eq!(LogFormat::parse(input), expected);
    }
}
