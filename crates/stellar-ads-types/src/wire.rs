//! Request and response bodies of the ad backend HTTP API.
//!
//! | Method | Path | Body / query | Response |
//! |--------|------|--------------|----------|
//! | `GET` | `/api/ad` | `siteId`, `tags` (csv) | [`AdResponse`] |
//! | `POST` | `/api/impression` | [`ImpressionRequest`] | [`EngagementResponse`] |
//! | `GET` | `/api/click` | [`ClickQuery`] | [`EngagementResponse`] |

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::{CampaignId, SiteId};
use crate::structs::{AdRecord, EngagementEvent, RewardOffer};

/// Response of `GET /api/ad`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AdResponse {
    /// Whether the backend handled the request.
    #[serde(default)]
    pub success: bool,
    /// The selected creative, if any.
    #[serde(default)]
    pub ad: Option<AdRecord>,
}

impl AdResponse {
    /// The ad to display, if the response carries one.
    ///
    /// `success: false` and a missing `ad` both mean "nothing to show".
    pub fn into_ad(self) -> Option<AdRecord> {
        if self.success { self.ad } else { None }
    }
}

/// Query string of `GET /api/ad`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct AdQuery {
    /// Site requesting an ad.
    pub site_id: SiteId,
    /// Comma-separated targeting keywords, omitted when empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
}

impl AdQuery {
    /// Build the query for a site and its ordered tag list.
    pub fn new(site_id: SiteId, tags: &[String]) -> Self {
        let tags = if tags.is_empty() {
            None
        } else {
            Some(tags.join(","))
        };
        Self { site_id, tags }
    }
}

/// Body of `POST /api/impression`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct ImpressionRequest {
    /// Campaign that was displayed.
    pub campaign_id: CampaignId,
    /// Site it was displayed on.
    pub site_id: SiteId,
    /// Viewer wallet public key, `null` when none was detected.
    pub user_public_key: Option<String>,
    /// Whether a wallet was detected.
    pub has_wallet: bool,
    /// Unix epoch milliseconds at send time.
    pub timestamp: i64,
}

impl From<&EngagementEvent> for ImpressionRequest {
    fn from(event: &EngagementEvent) -> Self {
        Self {
            campaign_id: event.campaign_id.clone(),
            site_id: event.site_id.clone(),
            user_public_key: event.viewer_identity.clone(),
            has_wallet: event.viewer_identity.is_some(),
            timestamp: event.occurred_at.timestamp_millis(),
        }
    }
}

/// Query string of `GET /api/click`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct ClickQuery {
    /// Campaign that was clicked.
    pub campaign_id: CampaignId,
    /// Site the click happened on.
    pub site_id: SiteId,
}

impl From<&EngagementEvent> for ClickQuery {
    fn from(event: &EngagementEvent) -> Self {
        Self {
            campaign_id: event.campaign_id.clone(),
            site_id: event.site_id.clone(),
        }
    }
}

/// Response of both engagement endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct EngagementResponse {
    /// Whether the backend recorded the engagement.
    #[serde(default)]
    pub success: bool,
    /// Reward credited to the viewer, if any.
    #[serde(default)]
    pub user_reward: Option<RewardOffer>,
}
