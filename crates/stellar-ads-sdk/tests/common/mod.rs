//! Shared fixtures for the runtime integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use stellar_ads_sdk::{InMemoryPage, SdkConfig};
use stellar_ads_testkit::{Endpoint, StubServer, StubState};
use stellar_ads_types::{AdRecord, CampaignId};

/// Start an empty stub backend.
pub async fn stub() -> StubServer {
    StubServer::spawn(Arc::new(StubState::new())).await.unwrap()
}

/// Configuration pointed at `stub` with short timeouts.
pub fn config(stub: &StubServer) -> SdkConfig {
    SdkConfig {
        api_base_url: Some(stub.base_url()),
        timeout_ms: 500,
        retry_attempts: 3,
        notice_duration_ms: 60_000,
        ..SdkConfig::default()
    }
}

/// An ad with a target URL.
pub fn ad(campaign_id: &str, title: &str) -> AdRecord {
    AdRecord {
        campaign_id: CampaignId::from(campaign_id),
        title: title.to_owned(),
        description: format!("{title} description"),
        image_url: None,
        target_url: Some("https://x".to_owned()),
    }
}

/// A page with one marked slot.
pub fn page_with_slot(id: &str, site_id: &str, tags: &str) -> Arc<InMemoryPage> {
    let page = InMemoryPage::new();
    page.add_element(Some(id), &[("data-site-id", site_id), ("data-tags", tags)]);
    Arc::new(page)
}

/// Poll until `endpoint` has seen at least `count` requests. Returns
/// whether it got there within two seconds.
pub async fn wait_for_requests(stub: &StubServer, endpoint: Endpoint, count: usize) -> bool {
    for _ in 0..200 {
        if stub.state().count(endpoint).await >= count {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Poll until `check` holds. Returns whether it did within two seconds.
pub async fn wait_until(check: impl Fn() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
