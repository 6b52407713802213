//! Slot renderer: a pure projection from slot state to host-page markup.
//!
//! Markup comes from `minijinja` templates compiled into the binary. The
//! template names end in `.html`, so every ad field is HTML-escaped on the
//! way out. Each render replaces the container content wholesale; nothing
//! from a previous ad survives a re-render, and the renderer keeps no
//! reference to the ad after returning.

use minijinja::{Environment, context};
use stellar_ads_types::{AdRecord, AdSize, SlotDeclaration};

use crate::error::RenderError;
use crate::host::{ContainerStyle, HostPage};

const LOADING_TEMPLATE: &str = "loading.html";
const AD_TEMPLATE: &str = "ad.html";
const EMPTY_TEMPLATE: &str = "empty.html";
const ERROR_TEMPLATE: &str = "error.html";

/// The four things a slot can display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderKind {
    /// Delivery in flight.
    Loading,
    /// An ad with its click affordance.
    Loaded,
    /// The backend had nothing to show.
    Empty,
    /// Delivery failed.
    Error,
}

impl PlaceholderKind {
    const fn template(self) -> &'static str {
        match self {
            Self::Loading => LOADING_TEMPLATE,
            Self::Loaded => AD_TEMPLATE,
            Self::Empty => EMPTY_TEMPLATE,
            Self::Error => ERROR_TEMPLATE,
        }
    }
}

/// What to render into a slot.
#[derive(Debug, Clone, Copy)]
pub enum View<'a> {
    /// Loading placeholder.
    Loading,
    /// The given ad.
    Ad(&'a AdRecord),
    /// Empty-state placeholder.
    Empty,
    /// Error placeholder.
    Error,
}

impl View<'_> {
    /// The placeholder kind this view renders as.
    pub const fn kind(self) -> PlaceholderKind {
        match self {
            Self::Loading => PlaceholderKind::Loading,
            Self::Ad(_) => PlaceholderKind::Loaded,
            Self::Empty => PlaceholderKind::Empty,
            Self::Error => PlaceholderKind::Error,
        }
    }
}

/// Renders slot views through the embedded templates.
pub struct Renderer {
    env: Environment<'static>,
}

impl Renderer {
    /// Compile the embedded templates.
    pub fn new() -> Result<Self, RenderError> {
        let mut env = Environment::new();
        for (name, source) in [
            (LOADING_TEMPLATE, include_str!("../templates/loading.html")),
            (AD_TEMPLATE, include_str!("../templates/ad.html")),
            (EMPTY_TEMPLATE, include_str!("../templates/empty.html")),
            (ERROR_TEMPLATE, include_str!("../templates/error.html")),
        ] {
            env.add_template(name, source)
                .map_err(|e| RenderError::Template(format!("failed to add {name}: {e}")))?;
        }
        Ok(Self { env })
    }

    /// Produce the markup for `view` in `slot` without touching the page.
    pub fn markup(&self, slot: &SlotDeclaration, view: View<'_>) -> Result<String, RenderError> {
        let kind = view.kind();
        let template = self
            .env
            .get_template(kind.template())
            .map_err(|e| RenderError::Template(format!("missing {}: {e}", kind.template())))?;

        let ctx = match view {
            View::Ad(ad) => context! {
                slot_id => slot.slot_id.as_str(),
                size => slot.size.as_str(),
                ad => ad,
            },
            View::Loading | View::Empty | View::Error => context! {
                slot_id => slot.slot_id.as_str(),
                size => slot.size.as_str(),
            },
        };

        template
            .render(ctx)
            .map_err(|e| RenderError::Template(format!("{} render failed: {e}", kind.template())))
    }

    /// Replace the slot's content with `view`.
    ///
    /// # Errors
    ///
    /// [`RenderError::TargetMissing`] if the container left the page.
    pub fn render(
        &self,
        page: &dyn HostPage,
        slot: &SlotDeclaration,
        view: View<'_>,
    ) -> Result<(), RenderError> {
        let markup = self.markup(slot, view)?;
        page.replace_content(&slot.slot_id, markup)
            .map_err(|_detached| RenderError::TargetMissing {
                slot_id: slot.slot_id.clone(),
            })
    }
}

/// Container dimensions for a slot size.
pub const fn container_style(size: AdSize) -> ContainerStyle {
    match size {
        AdSize::Small => ContainerStyle {
            width: "300px",
            height: "250px",
            min_height: None,
        },
        AdSize::Medium => ContainerStyle {
            width: "728px",
            height: "90px",
            min_height: None,
        },
        AdSize::Large => ContainerStyle {
            width: "970px",
            height: "250px",
            min_height: None,
        },
        AdSize::Responsive => ContainerStyle {
            width: "100%",
            height: "auto",
            min_height: Some("200px"),
        },
    }
}

/// Size the slot's container according to its declaration.
pub fn apply_container_style(page: &dyn HostPage, slot: &SlotDeclaration) -> Result<(), RenderError> {
    page.apply_style(&slot.slot_id, &container_style(slot.size))
        .map_err(|_detached| RenderError::TargetMissing {
            slot_id: slot.slot_id.clone(),
        })
}
