//! Domain structs: slot declarations, ad records, engagement events.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{AdSize, EngagementKind};
use crate::ids::{CampaignId, SiteId, SlotId};

// ---------------------------------------------------------------------------
// SlotDeclaration
// ---------------------------------------------------------------------------

/// A slot as declared on the host page at discovery time.
///
/// Immutable once built. `slot_id` doubles as the reference to the host
/// element: the runtime never owns the element, it only addresses it by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct SlotDeclaration {
    /// Identifier of the container element (assigned if it had none).
    pub slot_id: SlotId,
    /// Tenant identifier of the publishing site.
    pub site_id: SiteId,
    /// Targeting keywords in declaration order, duplicates preserved.
    pub tags: Vec<String>,
    /// Display size of the slot.
    pub size: AdSize,
}

// ---------------------------------------------------------------------------
// AdRecord
// ---------------------------------------------------------------------------

/// Creative payload returned by the backend for one slot.
///
/// Opaque apart from the fields the renderer consumes. Never mutated on
/// the client; replaced wholesale on refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct AdRecord {
    /// Campaign that produced this creative.
    pub campaign_id: CampaignId,
    /// Headline.
    pub title: String,
    /// Body copy.
    #[serde(default)]
    pub description: String,
    /// Optional thumbnail shown next to the copy.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Destination opened on click.
    #[serde(default)]
    pub target_url: Option<String>,
}

// ---------------------------------------------------------------------------
// RewardOffer
// ---------------------------------------------------------------------------

/// Server-computed incentive returned alongside an engagement report.
///
/// Displayed to the viewer, never computed client-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RewardOffer {
    /// Amount credited to the viewer, in XLM.
    #[ts(as = "String")]
    pub amount: Decimal,
}

// ---------------------------------------------------------------------------
// EngagementEvent
// ---------------------------------------------------------------------------

/// A transient impression or click report.
///
/// Built at send time and dropped once the network call settles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct EngagementEvent {
    /// Impression or click.
    pub kind: EngagementKind,
    /// Campaign being reported on.
    pub campaign_id: CampaignId,
    /// Site the engagement happened on.
    pub site_id: SiteId,
    /// Public key of the viewer's wallet, when one was detected.
    pub viewer_identity: Option<String>,
    /// When the event was constructed.
    pub occurred_at: DateTime<Utc>,
}

impl EngagementEvent {
    /// Build an event stamped with the current time.
    pub fn now(
        kind: EngagementKind,
        campaign_id: CampaignId,
        site_id: SiteId,
        viewer_identity: Option<String>,
    ) -> Self {
        Self {
            kind,
            campaign_id,
            site_id,
            viewer_identity,
            occurred_at: Utc::now(),
        }
    }
}
