//! Slot controller: the per-slot lifecycle state machine.
//!
//! ```text
//! Idle -> Loading -> { Loaded | NoAd | Error }
//!           ^                 |
//!           +---- refresh ----+
//! ```
//!
//! Every state change goes through [`SlotState::apply`], and every
//! [`SlotState`] lives in the [`SlotTable`] owned by one controller.
//! Callers (the runtime surface, the refresh scheduler) only ask for
//! transitions; they never write slot state.
//!
//! The table lock is held for the synchronous part of a transition (state
//! change plus render) and released across network calls. Two cycles for
//! the same slot may therefore be in flight at once. By default the one
//! that completes last wins; with stale-response discard enabled, a
//! completion older than the last applied one is dropped.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::join_all;
use stellar_ads_types::{
    AdRecord, EngagementEvent, EngagementKind, Phase, RewardOffer, SlotDeclaration, SlotId,
};
use tracing::{debug, info, warn};

use crate::delivery::{DeliveryClient, FetchOutcome};
use crate::error::{DeliveryError, RenderError};
use crate::host::HostPage;
use crate::notify::NoticeBoard;
use crate::render::{Renderer, View, apply_container_style};

/// Lifecycle record of one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotState {
    /// What the host page declared.
    pub declaration: SlotDeclaration,
    /// Current lifecycle phase.
    pub phase: Phase,
    /// The displayed ad. Present only while `Loaded`.
    pub current_ad: Option<AdRecord>,
    /// Why the last cycle failed. Present only while `Error`.
    pub last_error: Option<String>,
    issued_seq: u64,
    applied_seq: u64,
}

/// A requested state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// A delivery cycle started.
    Begin,
    /// The backend delivered an ad and it was rendered.
    Loaded(AdRecord),
    /// The backend had nothing to show.
    NoAd,
    /// Delivery failed after retries.
    Failed(String),
    /// The container left the page mid-cycle.
    Detached,
}

impl SlotState {
    /// Fresh `Idle` state for a declaration.
    pub const fn new(declaration: SlotDeclaration) -> Self {
        Self {
            declaration,
            phase: Phase::Idle,
            current_ad: None,
            last_error: None,
            issued_seq: 0,
            applied_seq: 0,
        }
    }

    /// The slot identifier.
    pub const fn slot_id(&self) -> &SlotId {
        &self.declaration.slot_id
    }

    /// Apply a transition and return the resulting phase.
    pub fn apply(&mut self, transition: Transition) -> Phase {
        let (phase, ad, error) = match transition {
            Transition::Begin => (Phase::Loading, None, None),
            Transition::Loaded(ad) => (Phase::Loaded, Some(ad), None),
            Transition::NoAd => (Phase::NoAd, None, None),
            Transition::Failed(reason) => (Phase::Error, None, Some(reason)),
            Transition::Detached => (Phase::Idle, None, None),
        };
        self.phase = phase;
        self.current_ad = ad;
        self.last_error = error;
        phase
    }

    /// Start a cycle and return its sequence number.
    fn begin(&mut self) -> u64 {
        self.issued_seq = self.issued_seq.saturating_add(1);
        self.apply(Transition::Begin);
        self.issued_seq
    }

    /// Record that the cycle `seq` completed. Returns `false` if it is
    /// older than a completion already applied.
    const fn accept(&mut self, seq: u64) -> bool {
        if seq < self.applied_seq {
            return false;
        }
        self.applied_seq = seq;
        true
    }
}

/// Mapping from slot identifier to slot state.
///
/// At most one entry per identifier; registering an identifier again
/// replaces the entry.
#[derive(Debug, Default)]
pub struct SlotTable {
    slots: Mutex<BTreeMap<SlotId, SlotState>>,
}

impl SlotTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh `Idle` state for `declaration`. Returns whether an
    /// existing entry was replaced.
    ///
    /// A replaced entry hands its sequence counters to the new one, so
    /// cycles still in flight for the old entry stay older than any cycle
    /// started after the replacement.
    pub fn register(&self, declaration: SlotDeclaration) -> bool {
        let id = declaration.slot_id.clone();
        let mut state = SlotState::new(declaration);
        let mut slots = self.lock();
        let previous = slots.remove(&id);
        if let Some(previous) = &previous {
            state.issued_seq = previous.issued_seq;
            state.applied_seq = previous.applied_seq;
        }
        slots.insert(id, state);
        previous.is_some()
    }

    /// Snapshot of one slot.
    pub fn get(&self, slot_id: &SlotId) -> Option<SlotState> {
        self.lock().get(slot_id).cloned()
    }

    /// Snapshot of every slot, ordered by identifier.
    pub fn snapshot(&self) -> Vec<SlotState> {
        self.lock().values().cloned().collect()
    }

    /// Identifiers of every tracked slot.
    pub fn ids(&self) -> Vec<SlotId> {
        self.lock().keys().cloned().collect()
    }

    /// Number of tracked slots.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no slot is tracked.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<SlotId, SlotState>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Result of a click on a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// The slot is unknown or not showing an ad.
    Ignored,
    /// The click was reported (successfully or not).
    Handled {
        /// URL opened in a new browsing context, if the ad has one.
        navigated_to: Option<String>,
        /// Reward returned by the click report.
        reward: Option<RewardOffer>,
    },
}

/// Drives every slot's lifecycle.
pub struct SlotController {
    table: SlotTable,
    page: Arc<dyn HostPage>,
    client: Arc<DeliveryClient>,
    renderer: Renderer,
    notices: NoticeBoard,
    viewer_identity: Option<String>,
    discard_stale: bool,
}

impl SlotController {
    /// Create a controller over `table`.
    pub fn new(
        table: SlotTable,
        page: Arc<dyn HostPage>,
        client: Arc<DeliveryClient>,
        renderer: Renderer,
        notices: NoticeBoard,
    ) -> Self {
        Self {
            table,
            page,
            client,
            renderer,
            notices,
            viewer_identity: None,
            discard_stale: false,
        }
    }

    /// Attach the viewer identity sent with engagement reports.
    #[must_use]
    pub fn with_viewer_identity(mut self, viewer_identity: Option<String>) -> Self {
        self.viewer_identity = viewer_identity;
        self
    }

    /// Drop completions older than the last applied one per slot.
    #[must_use]
    pub const fn with_stale_discard(mut self, enabled: bool) -> Self {
        self.discard_stale = enabled;
        self
    }

    /// Viewer identity detected at startup.
    pub fn viewer_identity(&self) -> Option<&str> {
        self.viewer_identity.as_deref()
    }

    /// Track a slot and size its container. Re-registering an identifier
    /// resets that slot to `Idle`.
    pub fn register(&self, declaration: SlotDeclaration) {
        if let Err(e) = apply_container_style(self.page.as_ref(), &declaration) {
            debug!(slot_id = %declaration.slot_id, error = %e, "container not styled");
        }
        let slot_id = declaration.slot_id.clone();
        let size = declaration.size;
        if self.table.register(declaration) {
            info!(slot_id = %slot_id, size = size.as_str(), "slot re-registered");
        } else {
            info!(slot_id = %slot_id, size = size.as_str(), "slot registered");
        }
    }

    /// Snapshot of one slot.
    pub fn slot(&self, slot_id: &SlotId) -> Option<SlotState> {
        self.table.get(slot_id)
    }

    /// Snapshot of every slot.
    pub fn slots(&self) -> Vec<SlotState> {
        self.table.snapshot()
    }

    /// Identifiers of every tracked slot.
    pub fn slot_ids(&self) -> Vec<SlotId> {
        self.table.ids()
    }

    /// Run one delivery cycle for `slot_id`.
    ///
    /// Returns the phase the slot settled in, or `None` if the slot is not
    /// tracked. Delivery and render failures end up in the phase, never in
    /// an error.
    pub async fn load(&self, slot_id: &SlotId) -> Option<Phase> {
        let (seq, declaration) = {
            let mut slots = self.table.lock();
            let state = slots.get_mut(slot_id)?;
            let seq = state.begin();
            let declaration = state.declaration.clone();
            if let Err(e) = self.renderer.render(self.page.as_ref(), &declaration, View::Loading) {
                return Some(self.abort(state, &e));
            }
            (seq, declaration)
        };
        debug!(slot_id = %slot_id, seq = seq, "delivery cycle started");

        let outcome = self.client.fetch_ad(&declaration).await;

        let (phase, impression) = {
            let mut slots = self.table.lock();
            let Some(state) = slots.get_mut(slot_id) else {
                debug!(slot_id = %slot_id, "slot dropped while loading");
                return None;
            };
            if self.discard_stale && !state.accept(seq) {
                debug!(
                    slot_id = %slot_id,
                    seq = seq,
                    applied = state.applied_seq,
                    "stale completion discarded"
                );
                return Some(state.phase);
            }
            match self.settle(state, outcome) {
                Ok(impression) => (state.phase, impression),
                Err(e) => return Some(self.abort(state, &e)),
            }
        };

        if let Some(event) = impression {
            self.send_impression(event);
        }
        Some(phase)
    }

    /// Run a delivery cycle for every tracked slot concurrently.
    pub async fn load_all(&self) -> Vec<(SlotId, Phase)> {
        self.load_many(&self.table.ids()).await
    }

    /// Run delivery cycles for `ids` concurrently. Untracked ids are
    /// left out of the result.
    pub async fn load_many(&self, ids: &[SlotId]) -> Vec<(SlotId, Phase)> {
        let phases = join_all(ids.iter().map(|id| self.load(id))).await;
        ids.iter()
            .zip(phases)
            .filter_map(|(id, phase)| phase.map(|p| (id.clone(), p)))
            .collect()
    }

    /// Handle a viewer click on `slot_id`.
    ///
    /// Only a `Loaded` slot reacts. The click is reported first; a reward
    /// in the reply shows a notice. The target URL is opened whether or
    /// not the report succeeded.
    pub async fn click(&self, slot_id: &SlotId) -> ClickOutcome {
        let Some((ad, site_id)) = self.table.get(slot_id).and_then(|state| {
            let site_id = state.declaration.site_id;
            state.current_ad.map(|ad| (ad, site_id))
        }) else {
            debug!(slot_id = %slot_id, "click ignored: no ad displayed");
            return ClickOutcome::Ignored;
        };

        let event = EngagementEvent::now(
            EngagementKind::Click,
            ad.campaign_id.clone(),
            site_id,
            self.viewer_identity.clone(),
        );
        let reward = match self.client.report_event(&event).await {
            Ok(reward) => reward,
            Err(e) => {
                warn!(slot_id = %slot_id, campaign_id = %ad.campaign_id, error = %e, "click report failed");
                None
            }
        };
        if let Some(reward) = &reward {
            info!(slot_id = %slot_id, amount = %reward.amount, "click reward offered");
            self.notices.show(reward, EngagementKind::Click);
        }

        if let Some(url) = &ad.target_url {
            self.page.open_in_new_context(url);
        }
        ClickOutcome::Handled {
            navigated_to: ad.target_url,
            reward,
        }
    }

    /// Apply a fetch outcome and render it. Returns the impression to send,
    /// if an ad was rendered.
    fn settle(
        &self,
        state: &mut SlotState,
        outcome: Result<FetchOutcome, DeliveryError>,
    ) -> Result<Option<EngagementEvent>, RenderError> {
        let page = self.page.as_ref();
        match outcome {
            Ok(FetchOutcome::Ad(ad)) => {
                self.renderer.render(page, &state.declaration, View::Ad(&ad))?;
                let event = EngagementEvent::now(
                    EngagementKind::Impression,
                    ad.campaign_id.clone(),
                    state.declaration.site_id.clone(),
                    self.viewer_identity.clone(),
                );
                info!(slot_id = %state.slot_id(), campaign_id = %ad.campaign_id, "slot loaded");
                state.apply(Transition::Loaded(ad));
                Ok(Some(event))
            }
            Ok(FetchOutcome::NoAd) => {
                self.renderer.render(page, &state.declaration, View::Empty)?;
                info!(slot_id = %state.slot_id(), "no ad available");
                state.apply(Transition::NoAd);
                Ok(None)
            }
            Err(e) => {
                warn!(slot_id = %state.slot_id(), error = %e, "ad delivery failed");
                self.renderer.render(page, &state.declaration, View::Error)?;
                state.apply(Transition::Failed(e.to_string()));
                Ok(None)
            }
        }
    }

    /// End a cycle whose render failed.
    fn abort(&self, state: &mut SlotState, err: &RenderError) -> Phase {
        match err {
            RenderError::TargetMissing { .. } => {
                debug!(slot_id = %state.slot_id(), "container gone, cycle aborted");
                state.apply(Transition::Detached)
            }
            RenderError::Template(reason) => {
                warn!(slot_id = %state.slot_id(), error = %reason, "slot render failed");
                state.apply(Transition::Failed(err.to_string()))
            }
        }
    }

    /// Report an impression without waiting for it.
    fn send_impression(&self, event: EngagementEvent) {
        let client = Arc::clone(&self.client);
        let notices = self.notices.clone();
        tokio::spawn(async move {
            match client.report_event(&event).await {
                Ok(Some(reward)) => {
                    info!(campaign_id = %event.campaign_id, amount = %reward.amount, "impression reward offered");
                    notices.show(&reward, EngagementKind::Impression);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(campaign_id = %event.campaign_id, error = %e, "impression report failed");
                }
            }
        });
    }
}
