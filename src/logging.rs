/*!
 * Logging and tracing initialization
 *
 * Human-readable events go to stderr so stdout stays clean for JSON output.
 * With a log file configured, events are written there as JSON lines instead.
 */

use std::fs::File;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogConfig;
use crate::error::{Result, SaltError};

/// Level actually used for a logging configuration
///
/// The `debug` flag forces DEBUG, which is also the level raw salt-api
/// response bodies are logged at.
pub fn effective_level(config: &LogConfig) -> Level {
    if config.debug {
        Level::DEBUG
    } else {
        config.log_level.to_tracing_level()
    }
}

/// Filter directive for this crate's events at the effective level
pub fn filter_directive(config: &LogConfig) -> String {
    format!("minion_keys={}", effective_level(config))
}

/// Install the global subscriber
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directive(config)))
        .map_err(|e| SaltError::Config(format!("Failed to create log filter: {}", e)))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = match config.log_file {
        Some(ref path) => {
            let file = File::create(path).map_err(|e| {
                SaltError::Config(format!("Failed to create log file {}: {}", path.display(), e))
            })?;
            registry
                .with(fmt::layer().json().with_writer(file).with_ansi(false))
                .try_init()
        }
        None => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init(),
    };

    installed.map_err(|e| SaltError::Config(format!("Failed to install logger: {}", e)))
}
