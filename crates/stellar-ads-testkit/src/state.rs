//! Shared state for the stub backend.
//!
//! Each endpoint has a FIFO queue of scripted [`Reply`] values. A request
//! pops the next reply for its endpoint; when the queue is empty the
//! endpoint falls back to its default behaviour:
//!
//! - `GET /api/ad` rotates through the catalog, or answers
//!   `{"success": false}` when the catalog is empty
//! - `POST /api/impression` and `GET /api/click` answer
//!   `{"success": true}` plus the catalog's reward for that kind, if any
//!
//! Every request is recorded before its reply is produced, so tests can
//! assert on arrival even while a scripted delay is still running.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stellar_ads_types::{AdRecord, AdResponse, EngagementResponse, RewardOffer};
use tokio::sync::{Mutex, RwLock};

use crate::error::StubError;

/// The three backend endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    /// `GET /api/ad`
    Ad,
    /// `POST /api/impression`
    Impression,
    /// `GET /api/click`
    Click,
}

/// One scripted response.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// Time to wait before answering.
    pub delay: Duration,
    /// HTTP status code.
    pub status: u16,
    /// JSON body.
    pub body: serde_json::Value,
}

impl Reply {
    /// `200` with an arbitrary JSON body.
    pub const fn json(body: serde_json::Value) -> Self {
        Self {
            delay: Duration::ZERO,
            status: 200,
            body,
        }
    }

    /// `{"success": true, "ad": ...}`.
    pub fn ad(ad: AdRecord) -> Self {
        Self::json(to_value(&AdResponse {
            success: true,
            ad: Some(ad),
        }))
    }

    /// `{"success": false}`.
    pub fn no_ad() -> Self {
        Self::json(serde_json::json!({ "success": false }))
    }

    /// `{"success": true}` with an optional reward.
    pub fn engagement(reward: Option<Decimal>) -> Self {
        Self::json(to_value(&EngagementResponse {
            success: true,
            user_reward: reward.map(|amount| RewardOffer { amount }),
        }))
    }

    /// An error status with a JSON error body.
    pub fn status(status: u16) -> Self {
        Self {
            delay: Duration::ZERO,
            status,
            body: serde_json::json!({ "success": false, "error": "scripted failure" }),
        }
    }

    /// `200` with a body that is not valid for any endpoint.
    pub fn malformed() -> Self {
        Self::json(serde_json::json!(["not", "an", "object"]))
    }

    /// Delay this reply.
    #[must_use]
    pub const fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

fn to_value<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

/// A request as the stub received it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedRequest {
    /// Which endpoint was hit.
    pub endpoint: Endpoint,
    /// Decoded query string.
    pub query: BTreeMap<String, String>,
    /// JSON body, for `POST` requests.
    pub body: Option<serde_json::Value>,
}

impl RecordedRequest {
    /// A query parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// A top-level body field.
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.body.as_ref().and_then(|body| body.get(name))
    }
}

/// Campaigns and rewards served when no reply is scripted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    /// Ads handed out in rotation.
    #[serde(default)]
    pub campaigns: Vec<AdRecord>,
    /// Reward attached to every impression reply.
    #[serde(default)]
    pub impression_reward: Option<Decimal>,
    /// Reward attached to every click reply.
    #[serde(default)]
    pub click_reward: Option<Decimal>,
}

impl Catalog {
    /// Parse a YAML catalog.
    pub fn from_yaml(yaml: &str) -> Result<Self, StubError> {
        serde_yml::from_str(yaml).map_err(|e| StubError::Catalog(e.to_string()))
    }
}

/// State shared by all stub handlers.
#[derive(Debug, Default)]
pub struct StubState {
    catalog: RwLock<Catalog>,
    rotation: AtomicUsize,
    scripted: Mutex<BTreeMap<Endpoint, VecDeque<Reply>>>,
    requests: RwLock<Vec<RecordedRequest>>,
}

impl StubState {
    /// Empty state: no campaigns, no rewards, nothing scripted.
    pub fn new() -> Self {
        Self::default()
    }

    /// State serving `catalog` by default.
    pub fn with_catalog(catalog: Catalog) -> Self {
        Self {
            catalog: RwLock::new(catalog),
            ..Self::default()
        }
    }

    /// Queue a reply for `endpoint`.
    pub async fn script(&self, endpoint: Endpoint, reply: Reply) {
        self.scripted
            .lock()
            .await
            .entry(endpoint)
            .or_default()
            .push_back(reply);
    }

    /// Queue several replies for `endpoint`, in order.
    pub async fn script_all(&self, endpoint: Endpoint, replies: impl IntoIterator<Item = Reply>) {
        let mut scripted = self.scripted.lock().await;
        scripted.entry(endpoint).or_default().extend(replies);
    }

    /// Replace the default catalog.
    pub async fn set_catalog(&self, catalog: Catalog) {
        *self.catalog.write().await = catalog;
    }

    /// Every request received so far, oldest first.
    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.read().await.clone()
    }

    /// Requests received on `endpoint`, oldest first.
    pub async fn requests_to(&self, endpoint: Endpoint) -> Vec<RecordedRequest> {
        self.requests
            .read()
            .await
            .iter()
            .filter(|r| r.endpoint == endpoint)
            .cloned()
            .collect()
    }

    /// Number of requests received on `endpoint`.
    pub async fn count(&self, endpoint: Endpoint) -> usize {
        self.requests
            .read()
            .await
            .iter()
            .filter(|r| r.endpoint == endpoint)
            .count()
    }

    /// Record `request` and pick its reply.
    pub(crate) async fn answer(&self, request: RecordedRequest) -> Reply {
        let endpoint = request.endpoint;
        self.requests.write().await.push(request);

        if let Some(reply) = self
            .scripted
            .lock()
            .await
            .get_mut(&endpoint)
            .and_then(VecDeque::pop_front)
        {
            return reply;
        }

        let catalog = self.catalog.read().await;
        match endpoint {
            Endpoint::Ad => {
                if catalog.campaigns.is_empty() {
                    return Reply::no_ad();
                }
                let turn = self.rotation.fetch_add(1, Ordering::Relaxed);
                let index = turn.checked_rem(catalog.campaigns.len()).unwrap_or(0);
                catalog
                    .campaigns
                    .get(index)
                    .cloned()
                    .map_or_else(Reply::no_ad, Reply::ad)
            }
            Endpoint::Impression => Reply::engagement(catalog.impression_reward),
            Endpoint::Click => Reply::engagement(catalog.click_reward),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use stellar_ads_types::CampaignId;

    use super::*;

    fn campaign(id: &str) -> AdRecord {
        AdRecord {
            campaign_id: CampaignId::from(id),
            title: id.to_uppercase(),
            description: String::new(),
            image_url: None,
            target_url: None,
        }
    }

    fn request(endpoint: Endpoint) -> RecordedRequest {
        RecordedRequest {
            endpoint,
            query: BTreeMap::new(),
            body: None,
        }
    }

    #[tokio::test]
    async fn scripted_replies_come_first_then_rotation() {
        let state = StubState::with_catalog(Catalog {
            campaigns: vec![campaign("a"), campaign("b")],
            ..Catalog::default()
        });
        state.script(Endpoint::Ad, Reply::status(503)).await;

        assert_eq!(state.answer(request(Endpoint::Ad)).await.status, 503);
        let first = state.answer(request(Endpoint::Ad)).await;
        let second = state.answer(request(Endpoint::Ad)).await;
        let third = state.answer(request(Endpoint::Ad)).await;
        assert_eq!(first.body["ad"]["campaignId"], "a");
        assert_eq!(second.body["ad"]["campaignId"], "b");
        assert_eq!(third.body["ad"]["campaignId"], "a");
        assert_eq!(state.count(Endpoint::Ad).await, 4);
    }

    #[tokio::test]
    async fn empty_catalog_means_no_ad() {
        let state = StubState::new();
        let reply = state.answer(request(Endpoint::Ad)).await;
        assert_eq!(reply.body, serde_json::json!({ "success": false }));
        let click = state.answer(request(Endpoint::Click)).await;
        assert_eq!(click.body["success"], true);
        assert!(click.body.get("userReward").is_none_or(serde_json::Value::is_null));
    }

    #[test]
    fn catalog_parses_from_yaml() {
        let yaml = r"
campaigns:
  - campaignId: c1
    title: Build on Stellar
    targetUrl: https://stellar.org
clickReward: '0.5'
";
        let catalog = Catalog::from_yaml(yaml).unwrap();
        assert_eq!(catalog.campaigns.len(), 1);
        assert_eq!(catalog.click_reward, Some(Decimal::new(5, 1)));
        assert!(catalog.impression_reward.is_none());
    }
}
