//! Delivery cycle against the stub backend: discovery, fetch with retry,
//! render, and the impression that follows a successful render.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

mod common;

use std::time::{Duration, Instant};

use stellar_ads_sdk::{AdRuntime, DeliveryClient, InMemoryPage};
use stellar_ads_testkit::{Endpoint, Reply};
use stellar_ads_types::{AdSize, Phase, SiteId, SlotDeclaration, SlotId};

use common::{ad, config, page_with_slot, stub, wait_for_requests};

#[tokio::test]
async fn loaded_slot_reports_exactly_one_impression() {
    let stub = stub().await;
    stub.state()
        .script(
            Endpoint::Ad,
            Reply::json(serde_json::json!({
                "success": true,
                "ad": { "campaignId": "c1", "title": "X", "targetUrl": "https://x" }
            })),
        )
        .await;
    let page = page_with_slot("s1", "abc", "tech");

    let runtime = AdRuntime::start(&config(&stub), page.clone()).await.unwrap();

    let slot = runtime.slot(&SlotId::from("s1")).unwrap();
    assert_eq!(slot.phase, Phase::Loaded);
    assert_eq!(slot.current_ad.unwrap().campaign_id.as_str(), "c1");

    let fetches = stub.state().requests_to(Endpoint::Ad).await;
    assert_eq!(fetches.len(), 1);
    assert_eq!(fetches[0].param("siteId"), Some("abc"));
    assert_eq!(fetches[0].param("tags"), Some("tech"));

    assert!(wait_for_requests(&stub, Endpoint::Impression, 1).await);
    tokio::time::sleep(Duration::from_millis(100)).await;
    let impressions = stub.state().requests_to(Endpoint::Impression).await;
    assert_eq!(impressions.len(), 1);
    assert_eq!(impressions[0].field("campaignId"), Some(&serde_json::json!("c1")));
    assert_eq!(impressions[0].field("siteId"), Some(&serde_json::json!("abc")));
    assert_eq!(impressions[0].field("hasWallet"), Some(&serde_json::json!(false)));

    assert!(page.content("s1").unwrap().contains("stellar-ad"));
}

#[tokio::test]
async fn unsuccessful_answer_is_no_ad_and_not_retried() {
    let stub = stub().await;
    stub.state().script(Endpoint::Ad, Reply::no_ad()).await;
    let page = page_with_slot("s1", "abc", "");

    let runtime = AdRuntime::start(&config(&stub), page.clone()).await.unwrap();

    let slot = runtime.slot(&SlotId::from("s1")).unwrap();
    assert_eq!(slot.phase, Phase::NoAd);
    assert!(slot.current_ad.is_none());
    assert_eq!(stub.state().count(Endpoint::Ad).await, 1);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(stub.state().count(Endpoint::Impression).await, 0);
    assert!(page.content("s1").unwrap().contains("stellar-ad-empty"));
}

#[tokio::test]
async fn fetch_gives_up_within_its_time_budget() {
    let stub = stub().await;
    let hang = Reply::no_ad().after(Duration::from_secs(5));
    stub.state()
        .script_all(Endpoint::Ad, [hang.clone(), hang.clone(), hang])
        .await;
    let client = DeliveryClient::new(stub.base_url(), Duration::from_millis(200), 3).unwrap();
    let slot = SlotDeclaration {
        slot_id: SlotId::from("s1"),
        site_id: SiteId::from("abc"),
        tags: vec!["tech".to_owned()],
        size: AdSize::Medium,
    };

    let started = Instant::now();
    let result = client.fetch_ad(&slot).await;
    let elapsed = started.elapsed();

    assert!(result.unwrap_err().is_timeout());
    assert_eq!(client.fetch_budget(), Duration::from_millis(600));
    assert!(
        elapsed <= client.fetch_budget().saturating_add(Duration::from_millis(50)),
        "took {elapsed:?}"
    );
    assert_eq!(stub.state().count(Endpoint::Ad).await, 3);
}

#[tokio::test]
async fn timed_out_slot_ends_in_error() {
    let stub = stub().await;
    let hang = Reply::no_ad().after(Duration::from_secs(5));
    stub.state()
        .script_all(Endpoint::Ad, [hang.clone(), hang.clone(), hang])
        .await;
    let page = page_with_slot("s1", "abc", "tech");
    let mut config = config(&stub);
    config.timeout_ms = 200;

    let runtime = AdRuntime::start(&config, page.clone()).await.unwrap();

    let slot = runtime.slot(&SlotId::from("s1")).unwrap();
    assert_eq!(slot.phase, Phase::Error);
    assert!(slot.last_error.is_some());
    assert_eq!(stub.state().count(Endpoint::Ad).await, 3);
    assert_eq!(stub.state().count(Endpoint::Impression).await, 0);
    assert!(page.content("s1").unwrap().contains("stellar-ad-error"));
}

#[tokio::test]
async fn server_errors_are_retried_until_success() {
    let stub = stub().await;
    stub.state()
        .script_all(
            Endpoint::Ad,
            [Reply::status(500), Reply::malformed(), Reply::ad(ad("c2", "Second try"))],
        )
        .await;
    let page = page_with_slot("s1", "abc", "");

    let runtime = AdRuntime::start(&config(&stub), page).await.unwrap();

    assert_eq!(runtime.slot(&SlotId::from("s1")).unwrap().phase, Phase::Loaded);
    assert_eq!(stub.state().count(Endpoint::Ad).await, 3);
}

#[tokio::test]
async fn containers_without_site_id_are_not_tracked() {
    let stub = stub().await;
    let page = InMemoryPage::new();
    page.add_element(Some("plain"), &[("data-tags", "tech")]);
    page.add_element(Some("blank"), &[("data-site-id", "  ")]);

    let runtime = AdRuntime::start(&config(&stub), std::sync::Arc::new(page))
        .await
        .unwrap();

    assert!(runtime.slots().is_empty());
    assert_eq!(stub.state().count(Endpoint::Ad).await, 0);
}

#[tokio::test]
async fn vanished_container_aborts_only_its_own_cycle() {
    let stub = stub().await;
    stub.state()
        .script_all(
            Endpoint::Ad,
            [Reply::ad(ad("c1", "One")), Reply::ad(ad("c2", "Two"))],
        )
        .await;
    let page = InMemoryPage::new();
    page.add_element(Some("a"), &[("data-site-id", "abc")]);
    page.add_element(Some("b"), &[("data-site-id", "abc")]);
    let page = std::sync::Arc::new(page);

    let runtime = AdRuntime::start(&config(&stub), page.clone()).await.unwrap();
    assert!(page.remove_element("a"));
    stub.state().script(Endpoint::Ad, Reply::ad(ad("c3", "Three"))).await;

    let settled = runtime.refresh(None).await;
    let phase_of = |id: &str| {
        settled
            .iter()
            .find(|(slot, _)| slot.as_str() == id)
            .map(|(_, phase)| *phase)
    };
    assert_eq!(phase_of("a"), Some(Phase::Idle));
    assert_eq!(phase_of("b"), Some(Phase::Loaded));
}

#[tokio::test]
async fn wallet_identity_travels_with_impressions() {
    let stub = stub().await;
    stub.state().script(Endpoint::Ad, Reply::ad(ad("c1", "X"))).await;
    let page = InMemoryPage::new().with_wallet("GVIEWERKEY");
    page.add_element(Some("s1"), &[("data-site-id", "abc")]);

    AdRuntime::start(&config(&stub), std::sync::Arc::new(page))
        .await
        .unwrap();

    assert!(wait_for_requests(&stub, Endpoint::Impression, 1).await);
    let impression = &stub.state().requests_to(Endpoint::Impression).await[0];
    assert_eq!(impression.field("userPublicKey"), Some(&serde_json::json!("GVIEWERKEY")));
    assert_eq!(impression.field("hasWallet"), Some(&serde_json::json!(true)));
}
