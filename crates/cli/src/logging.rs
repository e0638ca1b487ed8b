//! Logger initialization for the CLI.
//!
//! The library only talks to the `log` facade; this module installs
//! `env_logger` as the backend.

use std::sync::Once;

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info",
/// "shader_fixture_core=debug"). When unset, `RUST_LOG` is consulted,
/// then `warn` is used.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

impl LoggingConfig {
    /// Maps `-v` repetitions to a filter: none defers to `RUST_LOG`,
    /// one is `info`, two or more is `debug`.
    pub fn from_verbosity(verbose: u8) -> Self {
        let env_filter = match verbose {
            0 => None,
            1 => Some("info".to_string()),
            _ => Some("debug".to_string()),
        };
        Self {
            env_filter,
            ..Self::default()
        }
    }
}

static INIT: Once = Once::new();

/// Initializes the global logger once. Later calls are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Some(filter) = config.env_filter {
            builder.parse_filters(&filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(log::LevelFilter::Warn);
        }

        builder.write_style(config.write_style);
        builder.init();

        log::debug!("logging initialized");
    });
}
