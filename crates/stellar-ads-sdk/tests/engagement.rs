//! Click handling and reward notices.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

mod common;

use std::str::FromStr;

use rust_decimal::Decimal;
use stellar_ads_sdk::{AdRuntime, ClickOutcome};
use stellar_ads_testkit::{Endpoint, Reply};
use stellar_ads_types::{EngagementKind, SlotId};

use common::{ad, config, page_with_slot, stub, wait_for_requests, wait_until};

#[tokio::test]
async fn click_navigates_even_when_the_report_fails() {
    let stub = stub().await;
    stub.state().script(Endpoint::Ad, Reply::ad(ad("c1", "X"))).await;
    stub.state().script(Endpoint::Click, Reply::status(500)).await;
    let page = page_with_slot("s1", "abc", "tech");
    let runtime = AdRuntime::start(&config(&stub), page.clone()).await.unwrap();

    let outcome = runtime.click(&SlotId::from("s1")).await;

    assert_eq!(
        outcome,
        ClickOutcome::Handled {
            navigated_to: Some("https://x".to_owned()),
            reward: None,
        }
    );
    assert_eq!(page.navigations(), vec!["https://x".to_owned()]);
    assert!(page.notice_history().is_empty());

    let clicks = stub.state().requests_to(Endpoint::Click).await;
    assert_eq!(clicks.len(), 1);
    assert_eq!(clicks[0].param("campaignId"), Some("c1"));
    assert_eq!(clicks[0].param("siteId"), Some("abc"));
}

#[tokio::test]
async fn click_reward_shows_a_notice_and_still_navigates() {
    let stub = stub().await;
    stub.state().script(Endpoint::Ad, Reply::ad(ad("c1", "X"))).await;
    stub.state()
        .script(Endpoint::Click, Reply::engagement(Some(Decimal::from_str("0.5").unwrap())))
        .await;
    let page = page_with_slot("s1", "abc", "");
    let runtime = AdRuntime::start(&config(&stub), page.clone()).await.unwrap();

    let outcome = runtime.click(&SlotId::from("s1")).await;

    assert!(matches!(outcome, ClickOutcome::Handled { reward: Some(_), .. }));
    assert_eq!(page.navigations().len(), 1);
    let notices = page.notice_history();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].kind, EngagementKind::Click);
    assert_eq!(notices[0].message, "You earned 0.5 XLM for clicking this ad!");
}

#[tokio::test]
async fn clicks_are_ignored_unless_an_ad_is_shown() {
    let stub = stub().await;
    stub.state().script(Endpoint::Ad, Reply::no_ad()).await;
    let page = page_with_slot("s1", "abc", "");
    let runtime = AdRuntime::start(&config(&stub), page.clone()).await.unwrap();

    assert_eq!(runtime.click(&SlotId::from("s1")).await, ClickOutcome::Ignored);
    assert_eq!(runtime.click(&SlotId::from("unknown")).await, ClickOutcome::Ignored);
    assert!(page.navigations().is_empty());
    assert_eq!(stub.state().count(Endpoint::Click).await, 0);
}

#[tokio::test]
async fn impression_reward_shows_a_viewing_notice() {
    let stub = stub().await;
    stub.state().script(Endpoint::Ad, Reply::ad(ad("c1", "X"))).await;
    stub.state()
        .script(Endpoint::Impression, Reply::engagement(Some(Decimal::new(25, 3))))
        .await;
    let page = page_with_slot("s1", "abc", "");
    AdRuntime::start(&config(&stub), page.clone()).await.unwrap();

    assert!(wait_for_requests(&stub, Endpoint::Impression, 1).await);
    assert!(wait_until(|| !page.notice_history().is_empty()).await);
    let notice = &page.notice_history()[0];
    assert_eq!(notice.kind, EngagementKind::Impression);
    assert_eq!(notice.message, "You earned 0.025 XLM for viewing this ad!");
}

#[tokio::test]
async fn failed_impression_report_leaves_the_ad_on_screen() {
    let stub = stub().await;
    stub.state().script(Endpoint::Ad, Reply::ad(ad("c1", "Still here"))).await;
    stub.state().script(Endpoint::Impression, Reply::status(503)).await;
    let page = page_with_slot("s1", "abc", "");
    let runtime = AdRuntime::start(&config(&stub), page.clone()).await.unwrap();

    assert!(wait_for_requests(&stub, Endpoint::Impression, 1).await);
    assert!(page.content("s1").unwrap().contains("Still here"));
    assert!(runtime.slot(&SlotId::from("s1")).unwrap().current_ad.is_some());
    assert!(page.notice_history().is_empty());
}
