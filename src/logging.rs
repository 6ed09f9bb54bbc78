//! Logging configuration using the tracing ecosystem.
//!
//! Two layers are installed:
//! - a daily-rotated log file in the user's local data directory, always on
//! - a stderr layer that shows warnings, or full request diagnostics with
//!   `--debug`
//!
//! Request/response diagnostics are ordinary `debug` events emitted by the API
//! layer; `--debug` only changes which events reach stderr.

use std::path::PathBuf;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Default file log level if RUST_LOG is not set.
const DEFAULT_LOG_FILTER: &str = "jira_cli=info,warn";

/// Stderr filter without `--debug`.
const QUIET_STDERR_FILTER: &str = "warn";

/// Stderr filter with `--debug`.
const DEBUG_STDERR_FILTER: &str = "jira_cli=debug,warn";

/// Initialize the logging system.
///
/// `RUST_LOG` overrides the file filter, e.g. `RUST_LOG=jira_cli=trace`.
///
/// # Errors
///
/// Returns an error if:
/// - The log directory cannot be determined or created
/// - The tracing subscriber cannot be set
pub fn init(debug_enabled: bool) -> anyhow::Result<()> {
    let log_dir = get_log_directory()?;
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "jira-cli.log");

    let file_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let subscriber = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(file_filter),
        )
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time()
                .with_filter(stderr_filter(debug_enabled)),
        );

    tracing::subscriber::set_global_default(subscriber)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        debug = debug_enabled,
        "jira-cli starting up"
    );
    tracing::debug!(log_dir = %log_dir.display(), "Log directory");

    Ok(())
}

fn stderr_filter(debug: bool) -> EnvFilter {
    EnvFilter::new(if debug {
        DEBUG_STDERR_FILTER
    } else {
        QUIET_STDERR_FILTER
    })
}

/// Get the log directory path.
///
/// Returns the platform-specific local data directory with `jira-cli/logs` appended.
fn get_log_directory() -> anyhow::Result<PathBuf> {
    let base_dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine local data directory"))?;

    Ok(base_dir.join("jira-cli").join("logs"))
}

/// Get the path where logs are stored.
pub fn log_directory() -> Option<PathBuf> {
    get_log_directory().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_directory_has_expected_structure() {
        if let Some(dir) = log_directory() {
            assert!(dir.ends_with("jira-cli/logs"));
        }
    }

    #[test]
    fn test_stderr_filter_levels() {
        assert_eq!(stderr_filter(false).to_string(), QUIET_STDERR_FILTER);
        assert!(stderr_filter(true).to_string().contains("jira_cli=debug"));
    }
}
