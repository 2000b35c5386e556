//! Binding of engine subscriptions to mount and unmount.

use crate::engine::{EngineSubscription, EnterCallback, IntersectionEngine};
use crate::model::ElementId;
use crate::offset::EdgeOffsets;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{debug, warn};

/// Holds at most one engine subscription for a mounted element.
pub struct ListenerLifecycleManager {
    engine: Rc<dyn IntersectionEngine>,
    offsets: EdgeOffsets,
    element: Cell<Option<ElementId>>,
    subscription: RefCell<Option<EngineSubscription>>,
}

impl ListenerLifecycleManager {
    /// Manager subscribing through `engine` with `offsets`.
    pub fn new(engine: Rc<dyn IntersectionEngine>, offsets: EdgeOffsets) -> Self {
        Self {
            engine,
            offsets,
            element: Cell::new(None),
            subscription: RefCell::new(None),
        }
    }

    /// The mounted element.
    pub fn element(&self) -> Option<ElementId> {
        self.element.get()
    }

    /// Offsets passed to every subscription.
    pub fn offsets(&self) -> &EdgeOffsets {
        &self.offsets
    }

    /// Start watching `element`.
    pub fn mount(&self, element: ElementId, on_enter: EnterCallback) {
        self.element.set(Some(element));
        self.subscribe(element, on_enter);
    }

    /// Stop watching and forget the element.
    pub fn unmount(&self) {
        self.cancel();
        self.element.set(None);
    }

    /// Subscribe again after a return to `Unload`.
    ///
    /// Returns `false` when nothing is mounted.
    pub fn rearm(&self, on_enter: EnterCallback) -> bool {
        match self.element.get() {
            Some(element) => {
                self.subscribe(element, on_enter);
                true
            }
            None => {
                warn!("rearm without a mounted element");
                false
            }
        }
    }

    /// Drop the current subscription, if any.
    pub fn cancel(&self) {
        let previous = self.subscription.borrow_mut().take();
        drop(previous);
    }

    /// Subscriptions that can still fire: zero or one.
    pub fn active_subscriptions(&self) -> usize {
        let subscription = self.subscription.borrow();
        usize::from(subscription.as_ref().is_some_and(EngineSubscription::is_active))
    }

    fn subscribe(&self, element: ElementId, on_enter: EnterCallback) {
        // Tear the old subscription down before the new one can fire.
        self.cancel();
        debug!(%element, engine = self.engine.name(), "arming subscription");
        let subscription = self.engine.subscribe(element, &self.offsets, on_enter);
        *self.subscription.borrow_mut() = Some(subscription);
    }
}
