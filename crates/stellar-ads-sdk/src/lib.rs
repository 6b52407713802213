//! Stellar Ads delivery runtime.
//!
//! Embeddable client that discovers ad slots on a host page, fetches and
//! renders one sponsored unit per slot, and reports impressions and clicks
//! back to the ad backend. Each slot is tracked independently; no delivery
//! failure ever escapes to the host page.
//!
//! # Components
//!
//! - [`registry`] -- slot discovery from page markers
//! - [`delivery`] -- bounded, retryable backend calls
//! - [`controller`] -- per-slot lifecycle state machine
//! - [`render`] -- markup projection through embedded templates
//! - [`scheduler`] -- optional auto-refresh timer
//! - [`notify`] -- reward notices
//! - [`runtime`] -- the surface exposed to the host page
//!
//! The host page itself is reached only through [`host::HostPage`].

pub mod config;
pub mod controller;
pub mod delivery;
pub mod error;
pub mod host;
pub mod notify;
pub mod registry;
pub mod render;
pub mod runtime;
pub mod scheduler;

pub use config::SdkConfig;
pub use controller::{ClickOutcome, SlotController, SlotState, SlotTable, Transition};
pub use delivery::{DeliveryClient, FetchOutcome};
pub use error::{ConfigError, DeliveryError, RenderError, SdkError};
pub use host::{HostPage, InMemoryPage, Scope};
pub use runtime::{AdRuntime, VERSION};
pub use scheduler::{RefreshScheduler, RefreshTarget};
