//! Enumeration types shared between the runtime and the host page.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Slot size
// ---------------------------------------------------------------------------

/// Declared display size of an ad slot.
///
/// Unknown values read from the host page fall back to [`AdSize::Medium`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum AdSize {
    /// 300x250 rectangle.
    Small,
    /// 728x90 leaderboard.
    #[default]
    Medium,
    /// 970x250 billboard.
    Large,
    /// Full container width, height driven by content.
    Responsive,
}

impl AdSize {
    /// Parse a size keyword, ignoring surrounding whitespace and case.
    ///
    /// Returns `None` for unrecognized keywords so callers can decide on
    /// their own fallback chain.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "small" => Some(Self::Small),
            "medium" => Some(Self::Medium),
            "large" => Some(Self::Large),
            "responsive" => Some(Self::Responsive),
            _ => None,
        }
    }

    /// The lowercase keyword used in markup attributes.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
            Self::Responsive => "responsive",
        }
    }
}

impl core::fmt::Display for AdSize {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Slot lifecycle phase
// ---------------------------------------------------------------------------

/// Lifecycle phase of a single slot.
///
/// `Idle -> Loading -> {Loaded, NoAd, Error}`; every terminal phase may
/// re-enter `Loading` on refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Phase {
    /// Registered, no delivery cycle started yet.
    #[default]
    Idle,
    /// A delivery cycle is in flight.
    Loading,
    /// An ad is displayed.
    Loaded,
    /// The backend had nothing to show.
    NoAd,
    /// Delivery failed after exhausting retries.
    Error,
}

impl Phase {
    /// Whether a refresh may start from this phase without first loading.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Loaded | Self::NoAd | Self::Error)
    }

    /// Stable lowercase label for logs and harness output.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
            Self::NoAd => "no_ad",
            Self::Error => "error",
        }
    }
}

impl core::fmt::Display for Phase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Engagement kind
// ---------------------------------------------------------------------------

/// Kind of engagement reported to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum EngagementKind {
    /// The ad was rendered into its slot.
    Impression,
    /// The viewer activated the ad's click affordance.
    Click,
}

impl EngagementKind {
    /// Lowercase label for logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Impression => "impression",
            Self::Click => "click",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_parse_is_lenient() {
        assert_eq!(AdSize::parse(" Large "), Some(AdSize::Large));
        assert_eq!(AdSize::parse("responsive"), Some(AdSize::Responsive));
        assert_eq!(AdSize::parse("huge"), None);
        assert_eq!(AdSize::default(), AdSize::Medium);
    }

    #[test]
    fn size_serializes_lowercase() {
        let json = serde_json::to_string(&AdSize::Small).ok();
        assert_eq!(json.as_deref(), Some("\"small\""));
    }

    #[test]
    fn terminal_phases() {
        assert!(!Phase::Idle.is_terminal());
        assert!(!Phase::Loading.is_terminal());
        assert!(Phase::Loaded.is_terminal());
        assert!(Phase::NoAd.is_terminal());
        assert!(Phase::Error.is_terminal());
    }
}
