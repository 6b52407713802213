//! Error types for the delivery runtime.
//!
//! Uses `thiserror` for typed errors, one enum per concern. None of these
//! ever reach the host page from a delivery cycle: the slot controller
//! converts delivery and render failures into placeholder states.
//! "No ad available" is deliberately absent here; it is a normal
//! [`FetchOutcome`](crate::delivery::FetchOutcome).

use std::time::Duration;

use stellar_ads_types::SlotId;

/// A failed network call to the ad backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The request could not be sent or the connection broke.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The backend answered with a non-2xx status.
    #[error("backend returned HTTP {0}")]
    Status(u16),

    /// The response body was not the expected JSON shape.
    #[error("malformed response body: {0}")]
    Malformed(String),

    /// No response arrived within the per-attempt budget.
    #[error("no response within {}ms", .0.as_millis())]
    Timeout(Duration),
}

impl DeliveryError {
    /// Classify a `reqwest` failure, keeping timeouts distinct.
    pub(crate) fn from_reqwest(err: &reqwest::Error, budget: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(budget)
        } else if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }

    /// Whether this failure was a timeout.
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// A failure while projecting slot state onto the host page.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// The slot's container element vanished before render.
    #[error("render target for slot {slot_id} is missing")]
    TargetMissing {
        /// The slot whose container is gone.
        slot_id: SlotId,
    },

    /// A markup template failed to load or render.
    #[error("template error: {0}")]
    Template(String),
}

/// Invalid or unreadable host configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration object was not valid JSON for [`SdkConfig`](crate::config::SdkConfig).
    #[error("failed to parse configuration: {source}")]
    Json {
        /// The underlying parse error.
        #[from]
        source: serde_json::Error,
    },

    /// A value is present but unusable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level error for runtime construction.
///
/// Only startup can fail; once slots are registered every delivery
/// failure is absorbed into slot state.
#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The renderer could not be built.
    #[error("render error: {source}")]
    Render {
        /// The underlying render error.
        #[from]
        source: RenderError,
    },

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_reports_budget() {
        let err = DeliveryError::Timeout(Duration::from_millis(8000));
        assert_eq!(err.to_string(), "no response within 8000ms");
        assert!(err.is_timeout());
        assert!(!DeliveryError::Status(502).is_timeout());
    }

    #[test]
    fn config_error_wraps_json() {
        let parse = serde_json::from_str::<serde_json::Value>("{").err();
        let err = parse.map(ConfigError::from).map(SdkError::from);
        assert!(err.is_some_and(|e| e.to_string().starts_with("config error")));
    }
}
