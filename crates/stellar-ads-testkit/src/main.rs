//! Stub ad backend for local development.
//!
//! Serves a fixed campaign catalog so the host harness (or a browser page)
//! can be exercised without the real backend.
//!
//! # Environment
//!
//! - `STUB_HOST` -- bind address (default `127.0.0.1`)
//! - `STUB_PORT` -- port (default `3000`, the local backend port)
//! - `STUB_CATALOG` -- path to a YAML catalog (default: built-in demo)

use std::sync::Arc;

use rust_decimal::Decimal;
use stellar_ads_testkit::{Catalog, ServerConfig, StubState, start_server};
use stellar_ads_types::{AdRecord, CampaignId};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let defaults = ServerConfig::default();
    let config = ServerConfig {
        host: std::env::var("STUB_HOST").unwrap_or(defaults.host),
        port: match std::env::var("STUB_PORT") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.port,
        },
    };

    let catalog = match std::env::var("STUB_CATALOG") {
        Ok(path) => {
            let yaml = std::fs::read_to_string(&path)?;
            info!(path = %path, "loading catalog");
            Catalog::from_yaml(&yaml)?
        }
        Err(_) => demo_catalog(),
    };
    info!(campaigns = catalog.campaigns.len(), "catalog ready");

    start_server(&config, Arc::new(StubState::with_catalog(catalog))).await?;
    Ok(())
}

fn demo_catalog() -> Catalog {
    let campaign = |id: &str, title: &str, description: &str, url: &str| AdRecord {
        campaign_id: CampaignId::from(id),
        title: title.to_owned(),
        description: description.to_owned(),
        image_url: None,
        target_url: Some(url.to_owned()),
    };
    Catalog {
        campaigns: vec![
            campaign(
                "demo-wallet",
                "Get a Stellar wallet",
                "Send and receive XLM in seconds.",
                "https://stellar.org/ecosystem",
            ),
            campaign(
                "demo-build",
                "Build on Stellar",
                "Docs, SDKs, and a testnet ready to go.",
                "https://developers.stellar.org",
            ),
        ],
        impression_reward: Some(Decimal::new(1, 2)),
        click_reward: Some(Decimal::new(5, 1)),
    }
}
