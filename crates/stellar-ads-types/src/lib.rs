//! Shared type definitions for the Stellar Ads delivery runtime.
//!
//! This crate is the single source of truth for the values that cross the
//! boundary between the runtime, the ad backend, and the host page. Types
//! flow to `TypeScript` via `ts-rs` so the host page's glue code and the
//! backend agree on field names.
//!
//! # Modules
//!
//! - [`ids`] -- Typed string identifiers (slots, sites, campaigns)
//! - [`enums`] -- Slot size, lifecycle phase, engagement kind
//! - [`structs`] -- Slot declarations, ad records, engagement events, rewards
//! - [`wire`] -- Backend request and response bodies

pub mod enums;
pub mod ids;
pub mod structs;
pub mod wire;

pub use enums::{AdSize, EngagementKind, Phase};
pub use ids::{CampaignId, SiteId, SlotId};
pub use structs::{AdRecord, EngagementEvent, RewardOffer, SlotDeclaration};
pub use wire::{AdQuery, AdResponse, ClickQuery, EngagementResponse, ImpressionRequest};
