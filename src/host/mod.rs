//! The host environment seam.
//!
//! Everything the engine needs from the surrounding UI runtime goes through
//! [`Host`]: element geometry and style, event listeners, timers, frame
//! scheduling, and the platform intersection primitive. The crate ships one
//! implementation, [`SimHost`], an in-memory page used by tests and the demo
//! binary.
//!
//! All methods take `&self`. Callbacks handed to the host may re-enter it
//! (a scroll handler removing its own listener is the common case), so
//! implementations must not hold internal borrows while invoking them.

use crate::model::{ElementId, ListenerId, Rect, TimerId};
use serde::Deserialize;
use std::rc::Rc;
use std::time::Duration;

pub mod sim;

pub use sim::{SimElement, SimHost};

/// Computed `display` of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Display {
    /// Rendered normally.
    #[default]
    Block,
    /// Not rendered: neither the element nor its descendants have geometry.
    None,
}

/// Computed `overflow` of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Overflow {
    /// Content overflows the box unclipped.
    #[default]
    Visible,
    /// Clipped, not scrollable.
    Hidden,
    /// Clipped and scrollable.
    Auto,
    /// Clipped and scrollable.
    Scroll,
}

impl Overflow {
    /// Whether descendants are clipped to this element's box.
    pub fn clips(self) -> bool {
        self != Overflow::Visible
    }

    /// Whether this element is a scroll container.
    pub fn scrolls(self) -> bool {
        matches!(self, Overflow::Auto | Overflow::Scroll)
    }
}

/// The subset of computed style the engine reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ComputedStyle {
    /// `display`.
    pub display: Display,
    /// `overflow`.
    pub overflow: Overflow,
}

/// Where an event listener is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTarget {
    /// The global window / top-level viewport.
    Window,
    /// A scroll container.
    Element(ElementId),
}

/// Event kinds the engine subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Viewport resized. Window only.
    Resize,
    /// Target scrolled.
    Scroll,
}

/// Options for a platform intersection primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct ObserverOptions {
    /// `None` observes against the global viewport.
    pub root: Option<ElementId>,
    /// Canonical margin string, see `EdgeOffsets::to_root_margin`.
    pub root_margin: String,
    /// Ratio a target must reach to count as intersecting.
    pub threshold: f64,
}

/// One record of a batched intersection notification.
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionEntry {
    /// Observed element.
    pub target: ElementId,
    /// Visible fraction of the target, 0 to 1.
    pub intersection_ratio: f64,
    /// Whether the target touches the root, even with zero area.
    pub is_intersecting: bool,
}

impl IntersectionEntry {
    /// Visible overlap crossed from zero to non-zero.
    pub fn entered(&self) -> bool {
        self.intersection_ratio > 0.0 || self.is_intersecting
    }
}

/// Callback receiving a batch of intersection entries.
pub type BatchCallback = Rc<dyn Fn(&[IntersectionEntry])>;

/// Platform intersection-watching primitive.
pub trait IntersectionPrimitive {
    /// Start reporting `element`. The first batch after this includes it.
    fn observe(&self, element: ElementId);
    /// Stop reporting `element`. Idempotent.
    fn unobserve(&self, element: ElementId);
}

/// The environment the engine runs in.
pub trait Host {
    // ----- geometry -----

    /// Parent in the element tree.
    fn parent(&self, element: ElementId) -> Option<ElementId>;

    /// Border box in client coordinates; `None` for unknown elements.
    fn bounding_rect(&self, element: ElementId) -> Option<Rect>;

    /// Computed style; defaults for unknown elements.
    fn style(&self, element: ElementId) -> ComputedStyle;

    /// The global viewport in client coordinates.
    fn viewport_rect(&self) -> Rect;

    /// First element matching `selector`.
    fn query_selector(&self, selector: &str) -> Option<ElementId>;

    // ----- events -----

    /// Attach `handler` for `kind` events on `target`.
    fn add_listener(&self, target: EventTarget, kind: EventKind, handler: Rc<dyn Fn()>)
        -> ListenerId;

    /// Idempotent.
    fn remove_listener(&self, id: ListenerId);

    // ----- scheduling -----

    /// Monotonic milliseconds.
    fn now_ms(&self) -> u64;

    /// Run `callback` once after `delay`.
    fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce()>) -> TimerId;

    /// Idempotent.
    fn clear_timeout(&self, id: TimerId);

    /// Run `callback` on the next animation frame.
    fn request_frame(&self, callback: Box<dyn FnOnce()>);

    // ----- platform intersection primitive -----

    /// Whether [`Host::create_observer`] is usable.
    fn supports_intersection_observer(&self) -> bool;

    /// New intersection primitive delivering batches to `callback`.
    fn create_observer(
        &self,
        options: ObserverOptions,
        callback: BatchCallback,
    ) -> Rc<dyn IntersectionPrimitive>;
}

/// Nearest scroll container of `element`, or the window when there is none.
///
/// Elements under a `display: none` ancestor still report their structural
/// scroll parent; visibility is checked separately during intersection.
pub fn scroll_parent(host: &dyn Host, element: ElementId) -> EventTarget {
    let mut current = host.parent(element);
    while let Some(ancestor) = current {
        if host.style(ancestor).overflow.scrolls() {
            return EventTarget::Element(ancestor);
        }
        current = host.parent(ancestor);
    }
    EventTarget::Window
}
