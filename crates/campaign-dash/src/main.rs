mod bootstrap;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use dash_core::formatting::{format_change, format_compact, format_number, format_percent};
use dash_core::settings::{DashboardConfig, Settings};
use dash_core::time_utils::format_date;
use dash_runtime::fetch_cache::FetchCache;
use dash_runtime::fetcher::HttpFetcher;
use dash_runtime::orchestrator::{build_snapshot, DashboardSnapshot, RefreshOrchestrator};
use dash_runtime::resolver::validate_source;

/// Upper bound on a single source download.
const FETCH_DEADLINE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::parse();

    bootstrap::setup_logging(settings.effective_log_level())?;

    tracing::info!("Campaign Dash v{} starting", env!("CARGO_PKG_VERSION"));

    let config_path = bootstrap::config_location(settings.config.clone())?;
    let config = DashboardConfig::load_from(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    if config.files.is_empty() {
        tracing::warn!(path = %config_path.display(), "no sources configured");
    }
    for (name, url) in &config.files {
        let status = validate_source(url);
        if !status.valid {
            tracing::warn!(file = %name, reason = %status.message, "source link is invalid");
        }
    }

    let spec = settings.comparison_spec(Local::now().date_naive())?;
    tracing::info!(
        "Report period {} to {}, {} file(s) configured",
        spec.primary.start(),
        spec.primary.end(),
        config.files.len()
    );

    let cache = Arc::new(
        FetchCache::new(HttpFetcher::new()?, config.files.clone()).with_deadline(FETCH_DEADLINE),
    );

    if !settings.watch {
        let snapshot = build_snapshot(cache.as_ref(), &spec, settings.top).await;
        print_snapshot(&snapshot)?;
        return Ok(());
    }

    // The CLI override applies to this run only.
    let interval = match settings.refresh_minutes {
        Some(minutes) => Duration::from_secs(u64::from(minutes) * 60),
        None => config.refresh_interval(),
    };
    tracing::info!(
        "Watching sources, refreshing every {} minute(s)",
        interval.as_secs() / 60
    );

    let orchestrator = RefreshOrchestrator::new(Arc::clone(&cache), interval, spec, settings.top)
        .with_config_reload(config_path);
    let (mut rx, handle) = orchestrator.start();

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Some(snapshot) => print_snapshot(&snapshot)?,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received; stopping refresh loop");
                break;
            }
        }
    }
    handle.abort();

    Ok(())
}

fn print_snapshot(snapshot: &DashboardSnapshot) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot)?;
    println!("{json}");
    log_summary(snapshot);
    Ok(())
}

/// One human-readable line per refresh, plus a warning per failed source.
fn log_summary(snapshot: &DashboardSnapshot) {
    let current = &snapshot.email.current;
    let m = &current.metrics;
    tracing::info!(
        "{} to {}: {} sent, open rate {}, click rate {}",
        format_date(current.range.start()),
        format_date(current.range.end()),
        format_compact(m.totals.sent as f64),
        format_percent(m.rates.open_rate, 1),
        format_percent(m.rates.click_rate, 1),
    );
    if let Some(cmp) = &snapshot.email.comparison {
        tracing::info!(
            "vs comparison period: sent {}, open rate {}",
            format_change(cmp.sent.change, 1),
            format_change(cmp.open_rate.change, 1),
        );
    }
    for (name, file) in &snapshot.files {
        if file.status.valid {
            tracing::debug!(file = %name, records = %format_number(file.records as f64, 0), "source ok");
        } else {
            tracing::warn!(file = %name, reason = %file.status.message, "source unavailable");
        }
    }
}
