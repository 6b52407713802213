//! Host-page surface consumed by the runtime.
//!
//! The runtime never owns page elements. It reads marker attributes,
//! writes a synthetic id onto containers that lack one, and replaces
//! container content wholesale. Everything it needs from the page goes
//! through [`HostPage`], which keeps the slot lifecycle testable without a
//! browser.
//!
//! [`InMemoryPage`] is a complete implementation backed by a flat element
//! list. The host harness and the test suites drive it directly.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use stellar_ads_types::{EngagementKind, SlotId};

/// Opaque reference to an element, stable for the element's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementHandle(pub u64);

/// Identifier of a notice shown through [`HostPage::show_notice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NoticeId(pub u64);

/// Part of the page a scan covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// The whole document.
    Document,
    /// Descendants of the element with this id (the element itself excluded).
    Subtree(String),
}

/// Snapshot of one element taken during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostElement {
    /// Handle used to write back to the element.
    pub handle: ElementHandle,
    /// The element's `id` attribute, if set and non-blank.
    pub id: Option<String>,
    /// All other attributes.
    pub attributes: BTreeMap<String, String>,
}

impl HostElement {
    /// Read an attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Container dimensions derived from a slot's size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerStyle {
    /// CSS width.
    pub width: &'static str,
    /// CSS height.
    pub height: &'static str,
    /// CSS minimum height, for sizes whose height follows content.
    pub min_height: Option<&'static str>,
}

/// A transient viewer-facing notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Text shown to the viewer.
    pub message: String,
    /// The engagement that earned it.
    pub kind: EngagementKind,
}

/// A write addressed an element that is no longer on the page.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("element {element} is not attached to the page")]
pub struct DetachedElement {
    /// Id or handle of the missing element.
    pub element: String,
}

/// Everything the runtime reads from or writes to the host page.
///
/// Writes addressed by [`SlotId`] go to the last element in document order
/// that carries the id. Discovery keeps the later of two containers
/// sharing an id, so the element written is the one the slot describes.
pub trait HostPage: Send + Sync {
    /// Origin the page was served from, used for backend detection.
    fn origin(&self) -> Option<String>;

    /// Snapshot the elements inside `scope`, in document order.
    fn scan(&self, scope: &Scope) -> Vec<HostElement>;

    /// Set the `id` of an element.
    fn assign_id(&self, handle: ElementHandle, id: &SlotId) -> Result<(), DetachedElement>;

    /// Apply container dimensions to a slot element.
    fn apply_style(&self, slot_id: &SlotId, style: &ContainerStyle) -> Result<(), DetachedElement>;

    /// Replace the full content of a slot element.
    fn replace_content(&self, slot_id: &SlotId, markup: String) -> Result<(), DetachedElement>;

    /// Open `url` in a new browsing context.
    fn open_in_new_context(&self, url: &str);

    /// Show a transient notification.
    fn show_notice(&self, notice: Notice) -> NoticeId;

    /// Remove a notification shown earlier. Unknown ids are ignored.
    fn dismiss_notice(&self, id: NoticeId);

    /// Public key of the viewer's wallet or session, if one is present.
    fn viewer_identity(&self) -> Option<String>;
}

// ---------------------------------------------------------------------------
// In-memory page
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct PageElement {
    handle: ElementHandle,
    parent: Option<ElementHandle>,
    id: Option<String>,
    attributes: BTreeMap<String, String>,
    style: Option<ContainerStyle>,
    content: String,
}

#[derive(Debug, Default)]
struct PageState {
    origin: Option<String>,
    wallet: Option<String>,
    elements: Vec<PageElement>,
    next_handle: u64,
    next_notice: u64,
    active_notices: BTreeMap<NoticeId, Notice>,
    notice_history: Vec<Notice>,
    navigations: Vec<String>,
}

impl PageState {
    /// Last element carrying `id`.
    fn by_id(&mut self, id: &str) -> Option<&mut PageElement> {
        self.elements
            .iter_mut()
            .rev()
            .find(|el| el.id.as_deref() == Some(id))
    }

    fn is_descendant(&self, element: &PageElement, ancestor: ElementHandle) -> bool {
        let mut current = element.parent;
        while let Some(handle) = current {
            if handle == ancestor {
                return true;
            }
            current = self
                .elements
                .iter()
                .find(|el| el.handle == handle)
                .and_then(|el| el.parent);
        }
        false
    }
}

/// A page held in memory.
///
/// Records navigations and notices so callers can assert on what the
/// viewer would have seen.
#[derive(Debug, Default)]
pub struct InMemoryPage {
    state: Mutex<PageState>,
}

impl InMemoryPage {
    /// Create an empty page.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the origin the page reports.
    #[must_use]
    pub fn with_origin(self, origin: impl Into<String>) -> Self {
        self.lock().origin = Some(origin.into());
        self
    }

    /// Set the wallet public key the page reports.
    #[must_use]
    pub fn with_wallet(self, public_key: impl Into<String>) -> Self {
        self.lock().wallet = Some(public_key.into());
        self
    }

    /// Append a top-level element.
    pub fn add_element(&self, id: Option<&str>, attributes: &[(&str, &str)]) -> ElementHandle {
        self.insert(None, id, attributes)
    }

    /// Append an element nested under `parent`.
    pub fn add_child(
        &self,
        parent: ElementHandle,
        id: Option<&str>,
        attributes: &[(&str, &str)],
    ) -> ElementHandle {
        self.insert(Some(parent), id, attributes)
    }

    /// Remove the element with `id`. Returns whether it existed.
    pub fn remove_element(&self, id: &str) -> bool {
        let mut state = self.lock();
        let before = state.elements.len();
        state.elements.retain(|el| el.id.as_deref() != Some(id));
        state.elements.len() != before
    }

    /// Current content of the last element with `id`.
    pub fn content(&self, id: &str) -> Option<String> {
        self.lock().by_id(id).map(|el| el.content.clone())
    }

    /// Current style of the last element with `id`.
    pub fn style(&self, id: &str) -> Option<ContainerStyle> {
        self.lock().by_id(id).and_then(|el| el.style.clone())
    }

    /// Id of the element behind `handle`.
    pub fn id_of(&self, handle: ElementHandle) -> Option<String> {
        self.lock()
            .elements
            .iter()
            .find(|el| el.handle == handle)
            .and_then(|el| el.id.clone())
    }

    /// URLs opened so far, oldest first.
    pub fn navigations(&self) -> Vec<String> {
        self.lock().navigations.clone()
    }

    /// Notices currently on screen.
    pub fn active_notices(&self) -> Vec<Notice> {
        self.lock().active_notices.values().cloned().collect()
    }

    /// Every notice ever shown, oldest first.
    pub fn notice_history(&self) -> Vec<Notice> {
        self.lock().notice_history.clone()
    }

    fn insert(
        &self,
        parent: Option<ElementHandle>,
        id: Option<&str>,
        attributes: &[(&str, &str)],
    ) -> ElementHandle {
        let mut state = self.lock();
        let handle = ElementHandle(state.next_handle);
        state.next_handle = state.next_handle.saturating_add(1);
        state.elements.push(PageElement {
            handle,
            parent,
            id: id.map(ToOwned::to_owned),
            attributes: attributes
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
            style: None,
            content: String::new(),
        });
        handle
    }

    fn lock(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl HostPage for InMemoryPage {
    fn origin(&self) -> Option<String> {
        self.lock().origin.clone()
    }

    fn scan(&self, scope: &Scope) -> Vec<HostElement> {
        let state = self.lock();
        let root = match scope {
            Scope::Document => None,
            Scope::Subtree(id) => {
                match state.elements.iter().find(|el| el.id.as_deref() == Some(id)) {
                    Some(el) => Some(el.handle),
                    None => return Vec::new(),
                }
            }
        };
        state
            .elements
            .iter()
            .filter(|el| root.is_none_or(|root| state.is_descendant(el, root)))
            .map(|el| HostElement {
                handle: el.handle,
                id: el.id.clone().filter(|id| !id.trim().is_empty()),
                attributes: el.attributes.clone(),
            })
            .collect()
    }

    fn assign_id(&self, handle: ElementHandle, id: &SlotId) -> Result<(), DetachedElement> {
        let mut state = self.lock();
        let element = state
            .elements
            .iter_mut()
            .find(|el| el.handle == handle)
            .ok_or_else(|| DetachedElement {
                element: format!("#{}", handle.0),
            })?;
        element.id = Some(id.as_str().to_owned());
        Ok(())
    }

    fn apply_style(&self, slot_id: &SlotId, style: &ContainerStyle) -> Result<(), DetachedElement> {
        let mut state = self.lock();
        let element = state.by_id(slot_id.as_str()).ok_or_else(|| DetachedElement {
            element: slot_id.to_string(),
        })?;
        element.style = Some(style.clone());
        Ok(())
    }

    fn replace_content(&self, slot_id: &SlotId, markup: String) -> Result<(), DetachedElement> {
        let mut state = self.lock();
        let element = state.by_id(slot_id.as_str()).ok_or_else(|| DetachedElement {
            element: slot_id.to_string(),
        })?;
        element.content = markup;
        Ok(())
    }

    fn open_in_new_context(&self, url: &str) {
        self.lock().navigations.push(url.to_owned());
    }

    fn show_notice(&self, notice: Notice) -> NoticeId {
        let mut state = self.lock();
        let id = NoticeId(state.next_notice);
        state.next_notice = state.next_notice.saturating_add(1);
        state.notice_history.push(notice.clone());
        state.active_notices.insert(id, notice);
        id
    }

    fn dismiss_notice(&self, id: NoticeId) {
        self.lock().active_notices.remove(&id);
    }

    fn viewer_identity(&self) -> Option<String> {
        self.lock().wallet.clone()
    }
}
