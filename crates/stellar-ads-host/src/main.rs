//! Headless host harness for the Stellar Ads runtime.
//!
//! Loads a page fixture and a host configuration, starts the runtime
//! against the configured backend, and prints one JSON line per slot.
//!
//! ```text
//! stellar-ads-host --page <fixture.yaml> [--config <config.json>] [--origin <url>]
//! ```
//!
//! Without `--config`, the configuration is read from the
//! `STELLAR_ADS_CONFIG` environment variable (JSON), or the defaults are
//! used. `STELLAR_ADS_*` overrides apply on top. When the configuration
//! enables auto-refresh the harness keeps running, printing slot states
//! after each refresh interval, until Ctrl-C.

mod fixture;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use stellar_ads_sdk::{AdRuntime, SdkConfig, SlotState};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::fixture::PageFixture;

/// Run the Stellar Ads runtime against a page fixture.
#[derive(Debug, Parser)]
#[command(name = "stellar-ads-host")]
#[command(about = "Runs the Stellar Ads runtime against a YAML page fixture")]
#[command(version)]
struct Args {
    /// YAML page fixture.
    #[arg(long)]
    page: PathBuf,

    /// JSON host configuration. Falls back to `STELLAR_ADS_CONFIG`.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Page origin, overriding the fixture's.
    #[arg(long)]
    origin: Option<String>,
}

/// One output line.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SlotLine<'a> {
    id: &'a str,
    phase: &'static str,
    campaign_id: Option<&'a str>,
}

impl<'a> From<&'a SlotState> for SlotLine<'a> {
    fn from(state: &'a SlotState) -> Self {
        Self {
            id: state.slot_id().as_str(),
            phase: state.phase.as_str(),
            campaign_id: state.current_ad.as_ref().map(|ad| ad.campaign_id.as_str()),
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<SdkConfig> {
    let mut config = match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            SdkConfig::from_json(&json)?
        }
        None => match std::env::var("STELLAR_ADS_CONFIG") {
            Ok(json) => SdkConfig::from_json(&json)?,
            Err(_) => SdkConfig::default(),
        },
    };
    config.apply_env_overrides()?;
    config.validate()?;
    Ok(config)
}

fn print_slots(runtime: &AdRuntime) -> anyhow::Result<()> {
    for state in runtime.slots() {
        println!("{}", serde_json::to_string(&SlotLine::from(&state))?);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_ref())?;

    let default_filter = if config.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let yaml = std::fs::read_to_string(&args.page)
        .with_context(|| format!("failed to read {}", args.page.display()))?;
    let page = PageFixture::from_yaml(&yaml)?.build(args.origin.as_deref())?;

    let runtime = AdRuntime::start(&config, Arc::new(page)).await?;
    info!(
        version = AdRuntime::version(),
        api_base_url = runtime.api_base_url(),
        slots = runtime.slots().len(),
        "runtime started"
    );
    print_slots(&runtime)?;

    if !runtime.is_auto_refreshing() {
        return Ok(());
    }

    let minutes = config.refresh_interval;
    let period = Duration::from_secs(minutes.saturating_mul(60));
    let mut report = tokio::time::interval_at(
        tokio::time::Instant::now()
            .checked_add(period)
            .unwrap_or_else(tokio::time::Instant::now),
        period,
    );
    info!(interval_minutes = minutes, "auto-refresh running, Ctrl-C to stop");
    loop {
        tokio::select! {
            _ = report.tick() => print_slots(&runtime)?,
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                runtime.stop_auto_refresh();
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn flags_are_parsed() {
        let args = Args::try_parse_from([
            "stellar-ads-host",
            "--page",
            "p.yaml",
            "--origin",
            "http://localhost:5500",
        ])
        .unwrap();
        assert_eq!(args.page, PathBuf::from("p.yaml"));
        assert_eq!(args.origin.as_deref(), Some("http://localhost:5500"));
        assert!(args.config.is_none());
    }

    #[test]
    fn page_is_required() {
        assert!(Args::try_parse_from(["stellar-ads-host", "--config", "c.json"]).is_err());
    }

    #[test]
    fn missing_value_and_unknown_flags_fail() {
        assert!(Args::try_parse_from(["stellar-ads-host", "--page"]).is_err());
        assert!(Args::try_parse_from(["stellar-ads-host", "--page", "p.yaml", "--verbose"]).is_err());
    }
}
