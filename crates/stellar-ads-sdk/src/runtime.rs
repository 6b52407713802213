//! Public runtime surface exposed to the host page.
//!
//! [`AdRuntime::start`] wires the components together and runs the first
//! delivery cycle:
//!
//! 1. validate configuration and resolve the backend URL
//! 2. detect the viewer's wallet
//! 3. discover slots and size their containers
//! 4. load every slot concurrently
//! 5. start the refresh scheduler if the host opted in
//!
//! After that the host interacts through [`refresh`](AdRuntime::refresh),
//! [`click`](AdRuntime::click), [`scan`](AdRuntime::scan), and the
//! read-only [`VERSION`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use stellar_ads_types::{Phase, SlotId};
use tracing::{debug, info};

use crate::config::SdkConfig;
use crate::controller::{ClickOutcome, SlotController, SlotState, SlotTable};
use crate::delivery::DeliveryClient;
use crate::error::SdkError;
use crate::host::{HostPage, Scope};
use crate::notify::NoticeBoard;
use crate::registry::SlotRegistry;
use crate::render::Renderer;
use crate::scheduler::{RefreshScheduler, RefreshTarget};

/// Runtime version reported to the host page.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// A running ad-delivery runtime bound to one host page.
///
/// Cheap to clone; clones share the same slots. The refresh timer stops
/// when the last clone is dropped.
#[derive(Clone)]
pub struct AdRuntime {
    inner: Arc<RuntimeInner>,
}

struct RuntimeInner {
    controller: SlotController,
    page: Arc<dyn HostPage>,
    registry: SlotRegistry,
    api_base_url: String,
    refresh_interval_minutes: u64,
    scheduler: Mutex<Option<RefreshScheduler>>,
}

impl RuntimeInner {
    fn scheduler(&self) -> MutexGuard<'_, Option<RefreshScheduler>> {
        self.scheduler.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Scheduler target that re-enters the delivery cycle without keeping the
/// runtime alive.
struct RefreshAll {
    runtime: Weak<RuntimeInner>,
}

impl RefreshTarget for RefreshAll {
    fn on_tick(&self) {
        let Some(inner) = self.runtime.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            let settled = inner.controller.load_all().await;
            debug!(slots = settled.len(), "scheduled refresh settled");
        });
    }
}

impl AdRuntime {
    /// Initialize the runtime on `page` and run the first delivery cycle.
    ///
    /// Only configuration and construction problems are errors. Delivery
    /// failures land in slot phases.
    pub async fn start(config: &SdkConfig, page: Arc<dyn HostPage>) -> Result<Self, SdkError> {
        config.validate()?;

        let api_base_url = config.resolve_api_base_url(page.origin().as_deref());
        let client = DeliveryClient::new(
            api_base_url.clone(),
            config.timeout(),
            config.retry_attempts,
        )
        .map_err(|e| SdkError::Client(e.to_string()))?;
        let renderer = Renderer::new()?;

        let viewer_identity = page.viewer_identity();
        info!(
            version = VERSION,
            api_base_url = %api_base_url,
            has_wallet = viewer_identity.is_some(),
            "ad runtime starting"
        );

        let notices = NoticeBoard::new(Arc::clone(&page), config.notice_duration());
        let controller = SlotController::new(
            SlotTable::new(),
            Arc::clone(&page),
            Arc::new(client),
            renderer,
            notices,
        )
        .with_viewer_identity(viewer_identity)
        .with_stale_discard(config.discard_stale_responses);

        let registry = SlotRegistry::from_config(config);
        for declaration in registry.discover(page.as_ref(), &Scope::Document) {
            controller.register(declaration);
        }

        let runtime = Self {
            inner: Arc::new(RuntimeInner {
                controller,
                page,
                registry,
                api_base_url,
                refresh_interval_minutes: config.refresh_interval,
                scheduler: Mutex::new(None),
            }),
        };

        let settled = runtime.inner.controller.load_all().await;
        info!(slots = settled.len(), "initial delivery cycle settled");

        if config.auto_refresh {
            runtime.start_auto_refresh(config.refresh_interval)?;
        }
        Ok(runtime)
    }

    /// Re-run delivery for one slot, or for every slot when `slot_id` is
    /// `None`. Unknown slots are ignored.
    pub async fn refresh(&self, slot_id: Option<&SlotId>) -> Vec<(SlotId, Phase)> {
        let controller = &self.inner.controller;
        match slot_id {
            Some(id) => controller
                .load(id)
                .await
                .map(|phase| vec![(id.clone(), phase)])
                .unwrap_or_default(),
            None => controller.load_all().await,
        }
    }

    /// Deliver a viewer click to a slot.
    pub async fn click(&self, slot_id: &SlotId) -> ClickOutcome {
        self.inner.controller.click(slot_id).await
    }

    /// Discover slots inside `scope` (for content the host added after
    /// start), register them, and load them. Already-tracked identifiers
    /// are re-registered and reloaded.
    pub async fn scan(&self, scope: &Scope) -> Vec<(SlotId, Phase)> {
        let controller = &self.inner.controller;
        let declarations = self.inner.registry.discover(self.inner.page.as_ref(), scope);
        let ids: Vec<SlotId> = declarations.iter().map(|d| d.slot_id.clone()).collect();
        for declaration in declarations {
            controller.register(declaration);
        }
        controller.load_many(&ids).await
    }

    /// Snapshot of one slot.
    pub fn slot(&self, slot_id: &SlotId) -> Option<SlotState> {
        self.inner.controller.slot(slot_id)
    }

    /// Snapshot of every slot, ordered by identifier.
    pub fn slots(&self) -> Vec<SlotState> {
        self.inner.controller.slots()
    }

    /// Runtime version.
    pub const fn version() -> &'static str {
        VERSION
    }

    /// Backend base URL in use.
    pub fn api_base_url(&self) -> &str {
        &self.inner.api_base_url
    }

    /// Start (or restart) the refresh scheduler.
    pub fn start_auto_refresh(&self, interval_minutes: u64) -> Result<(), SdkError> {
        let scheduler = RefreshScheduler::start(interval_minutes, self.refresh_target())?;
        *self.inner.scheduler() = Some(scheduler);
        Ok(())
    }

    /// Start (or restart) the refresh scheduler with an explicit period.
    /// Each tick reloads every tracked slot.
    pub fn start_auto_refresh_every(&self, period: Duration) -> Result<(), SdkError> {
        let scheduler = RefreshScheduler::start_with_period(period, self.refresh_target())?;
        *self.inner.scheduler() = Some(scheduler);
        Ok(())
    }

    /// Start the refresh scheduler with the configured interval.
    pub fn resume_auto_refresh(&self) -> Result<(), SdkError> {
        self.start_auto_refresh(self.inner.refresh_interval_minutes)
    }

    fn refresh_target(&self) -> Arc<dyn RefreshTarget> {
        Arc::new(RefreshAll {
            runtime: Arc::downgrade(&self.inner),
        })
    }

    /// Stop the refresh scheduler, if running.
    pub fn stop_auto_refresh(&self) {
        if self.inner.scheduler().take().is_some() {
            info!("auto-refresh disabled");
        }
    }

    /// Whether the refresh scheduler is running.
    pub fn is_auto_refreshing(&self) -> bool {
        self.inner
            .scheduler()
            .as_ref()
            .is_some_and(RefreshScheduler::is_running)
    }
}
