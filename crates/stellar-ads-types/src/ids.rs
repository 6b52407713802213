//! Type-safe identifier wrappers.
//!
//! Identifiers that cross the wire (sites, campaigns) and identifiers that
//! live on the host page (slot containers) are all opaque strings, but they
//! are never interchangeable. Each gets its own newtype so the compiler
//! rejects a campaign id passed where a site id is expected.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Prefix used for synthetic slot identifiers assigned by the registry.
pub const SYNTHETIC_SLOT_PREFIX: &str = "stellar-ad-";

/// Generates a newtype wrapper around [`String`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub String);

        impl $name {
            /// Wrap an existing identifier value.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Return the inner [`String`] value.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id! {
    /// Identifier of a slot container element on the host page.
    SlotId
}

define_id! {
    /// Opaque tenant identifier of the publishing site.
    SiteId
}

define_id! {
    /// Identifier of the advertiser campaign behind an ad record.
    CampaignId
}

impl SlotId {
    /// Generate a fresh synthetic slot identifier.
    ///
    /// Uses UUID v7 so two containers registered within the same
    /// millisecond still receive distinct identifiers.
    pub fn generate() -> Self {
        Self(format!("{SYNTHETIC_SLOT_PREFIX}{}", Uuid::now_v7().simple()))
    }

    /// Whether this identifier was produced by [`SlotId::generate`].
    pub fn is_synthetic(&self) -> bool {
        self.0.starts_with(SYNTHETIC_SLOT_PREFIX)
    }
}
