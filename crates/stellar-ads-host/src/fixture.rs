//! YAML page fixtures.
//!
//! ```yaml
//! origin: http://localhost:5500
//! wallet: GABC...
//! elements:
//!   - id: sidebar
//!   - id: slot-1
//!     parent: sidebar
//!     attributes:
//!       data-site-id: abc
//!       data-tags: tech, defi
//!       data-size: small
//! ```
//!
//! Elements are created in order; a `parent` must name an element that
//! appears earlier in the list.

use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, bail};
use serde::Deserialize;
use stellar_ads_sdk::InMemoryPage;
use stellar_ads_sdk::host::ElementHandle;

/// A page description loaded from YAML.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageFixture {
    /// Origin the page reports.
    #[serde(default)]
    pub origin: Option<String>,
    /// Wallet public key the page reports.
    #[serde(default)]
    pub wallet: Option<String>,
    /// Elements in document order.
    #[serde(default)]
    pub elements: Vec<ElementFixture>,
}

/// One element of a page fixture.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ElementFixture {
    /// Element id.
    #[serde(default)]
    pub id: Option<String>,
    /// Id of the enclosing element.
    #[serde(default)]
    pub parent: Option<String>,
    /// Attributes, including the `data-*` slot markers.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl PageFixture {
    /// Parse a fixture from YAML.
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        serde_yml::from_str(yaml).context("failed to parse page fixture")
    }

    /// Build the in-memory page. `origin_override` wins over the
    /// fixture's own origin.
    pub fn build(&self, origin_override: Option<&str>) -> anyhow::Result<InMemoryPage> {
        let mut page = InMemoryPage::new();
        if let Some(origin) = origin_override.or(self.origin.as_deref()) {
            page = page.with_origin(origin);
        }
        if let Some(wallet) = &self.wallet {
            page = page.with_wallet(wallet.as_str());
        }

        let mut handles: HashMap<&str, ElementHandle> = HashMap::new();
        for element in &self.elements {
            let attributes: Vec<(&str, &str)> = element
                .attributes
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            let id = element.id.as_deref();
            let handle = match element.parent.as_deref() {
                Some(parent) => {
                    let Some(&parent_handle) = handles.get(parent) else {
                        bail!("element {id:?} names unknown parent {parent}");
                    };
                    page.add_child(parent_handle, id, &attributes)
                }
                None => page.add_element(id, &attributes),
            };
            if let Some(id) = id {
                handles.insert(id, handle);
            }
        }
        Ok(page)
    }
}
