use std::path::PathBuf;

use dash_core::settings::DashboardConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Config location ────────────────────────────────────────────────────────────

/// The config file to read: `explicit` when given, otherwise
/// `~/.campaign-dash/config.json`.
///
/// Only the default location gets its directory created; an explicit path is
/// used as is.
pub fn config_location(explicit: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    config_location_or(explicit, DashboardConfig::config_path())
}

fn config_location_or(explicit: Option<PathBuf>, default: PathBuf) -> anyhow::Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    if let Some(dir) = default.parent() {
        std::fs::create_dir_all(dir)?;
    }
    Ok(default)
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Initialise the global `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `log_level` is used, falling back to
/// `"info"` when it is not a valid directive. Output goes to stderr so the
/// JSON report on stdout stays machine-readable.
pub fn setup_logging(log_level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(normalise_level(log_level)))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false);

    tracing_subscriber::registry().with(filter).with(layer).try_init()?;

    Ok(())
}

/// Map conventional level names onto `tracing` directives.
fn normalise_level(log_level: &str) -> String {
    match log_level.trim().to_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARN" | "WARNING" => "warn".to_string(),
        "ERROR" | "CRITICAL" => "error".to_string(),
        "TRACE" => "trace".to_string(),
        _ => log_level.trim().to_string(),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
