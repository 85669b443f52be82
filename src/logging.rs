//! Structured logging via `tracing`.
//!
//! Output goes to stderr so plan documents on stdout stay machine-readable.
//! `RUST_LOG` overrides the level picked from `-v` flags.

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: Level,
    /// Include file/line info
    pub include_location: bool,
    /// Include module path
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            include_location: false,
            include_target: false,
        }
    }
}

impl LoggingConfig {
    /// Level for a count of `-v` flags: 0 warn, 1 info, 2 debug, 3+ trace.
    pub fn from_verbosity(verbose: u8) -> Self {
        let level = match verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };
        Self {
            level,
            include_location: verbose >= 2,
            include_target: verbose >= 2,
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("noirai={}", self.level)))
    }
}

/// Install the global subscriber. A second call fails instead of panicking.
pub fn init_logging(config: &LoggingConfig) -> Result<(), String> {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_target(config.include_target);

    tracing_subscriber::registry()
        .with(config.filter())
        .with(fmt_layer)
        .try_init()
        .map_err(|e| format!("logging init failed: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(LoggingConfig::from_verbosity(0).level, Level::WARN);
        assert_eq!(LoggingConfig::from_verbosity(1).level, Level::INFO);
        assert_eq!(LoggingConfig::from_verbosity(2).level, Level::DEBUG);
        assert_eq!(LoggingConfig::from_verbosity(9).level, Level::TRACE);
        assert!(!LoggingConfig::from_verbosity(1).include_location);
        assert!(LoggingConfig::from_verbosity(2).include_location);
    }

    #[test]
    fn test_default_is_quiet() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, Level::WARN);
        assert!(!config.include_target);
    }

    #[test]
    fn test_init_twice_errors() {
        let config = LoggingConfig::default();
        let first = init_logging(&config);
        let second = init_logging(&config);
        // Another test may have installed a subscriber first.
        assert!(first.is_err() || second.is_err());
        assert!(second.is_err());
    }
}
