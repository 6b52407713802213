//! Slot discovery.
//!
//! Scans a page scope for containers carrying the `data-site-id` marker
//! and turns each into a [`SlotDeclaration`]. Containers without a usable
//! site id are skipped with a debug log, never an error. The only write
//! the registry performs is assigning a synthetic id to containers that
//! lack one, so later renders can address them.

use stellar_ads_types::{AdSize, SiteId, SlotDeclaration, SlotId};
use tracing::debug;

use crate::config::{SdkConfig, parse_tag_list};
use crate::host::{HostElement, HostPage, Scope};

/// Marker attribute holding the site identifier (required).
pub const SITE_ID_ATTR: &str = "data-site-id";

/// Marker attribute holding comma-separated targeting keywords.
pub const TAGS_ATTR: &str = "data-tags";

/// Marker attribute holding the slot size keyword.
pub const SIZE_ATTR: &str = "data-size";

/// Builds slot declarations from page markup.
#[derive(Debug, Clone, Default)]
pub struct SlotRegistry {
    default_size: AdSize,
    configured_container: Option<ConfiguredContainer>,
}

/// A container named in the host configuration rather than by marker.
#[derive(Debug, Clone)]
struct ConfiguredContainer {
    container_id: SlotId,
    site_id: SiteId,
    tags: Vec<String>,
}

impl SlotRegistry {
    /// Build a registry from the host configuration.
    pub fn from_config(config: &SdkConfig) -> Self {
        let configured_container = match (&config.container_id, &config.site_id) {
            (Some(container_id), Some(site_id)) if !site_id.as_str().trim().is_empty() => {
                Some(ConfiguredContainer {
                    container_id: container_id.clone(),
                    site_id: site_id.clone(),
                    tags: config.tags.clone(),
                })
            }
            _ => None,
        };
        Self {
            default_size: config.default_size(),
            configured_container,
        }
    }

    /// Discover every slot inside `scope`.
    ///
    /// Returns declarations in document order. Two containers sharing an
    /// id yield two declarations with the same `slot_id`; the slot table
    /// keeps the later one, matching how [`HostPage`] resolves ids.
    pub fn discover(&self, page: &dyn HostPage, scope: &Scope) -> Vec<SlotDeclaration> {
        page.scan(scope)
            .into_iter()
            .filter_map(|element| self.declare(page, &element))
            .collect()
    }

    fn declare(&self, page: &dyn HostPage, element: &HostElement) -> Option<SlotDeclaration> {
        let marker_site = element
            .attribute(SITE_ID_ATTR)
            .map(str::trim)
            .filter(|site| !site.is_empty());

        let (site_id, tags) = if let Some(site) = marker_site {
            let tags = element.attribute(TAGS_ATTR).map(parse_tag_list).unwrap_or_default();
            (SiteId::from(site), tags)
        } else if let Some(configured) = self.configured_for(element) {
            (configured.site_id.clone(), configured.tags.clone())
        } else {
            if element.attributes.contains_key(SITE_ID_ATTR) {
                debug!(
                    element = ?element.id,
                    "container skipped: blank {SITE_ID_ATTR}"
                );
            }
            return None;
        };

        let slot_id = match &element.id {
            Some(id) => SlotId::from(id.as_str()),
            None => {
                let generated = SlotId::generate();
                if let Err(e) = page.assign_id(element.handle, &generated) {
                    debug!(error = %e, "container skipped: could not assign id");
                    return None;
                }
                generated
            }
        };

        let size = element
            .attribute(SIZE_ATTR)
            .and_then(AdSize::parse)
            .unwrap_or(self.default_size);

        debug!(
            slot_id = %slot_id,
            site_id = %site_id,
            tags = ?tags,
            size = %size,
            "slot declared"
        );

        Some(SlotDeclaration {
            slot_id,
            site_id,
            tags,
            size,
        })
    }

    fn configured_for(&self, element: &HostElement) -> Option<&ConfiguredContainer> {
        self.configured_container
            .as_ref()
            .filter(|c| element.id.as_deref() == Some(c.container_id.as_str()))
    }
}
