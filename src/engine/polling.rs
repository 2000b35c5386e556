//! Geometric polling strategy.
//!
//! Recomputes the clipped intersection on window resize and on scroll of
//! the element's nearest scroll container, coalesced by a [`RateLimiter`].

use super::intersect::intersection_rect;
use super::{guard, EngineSubscription, EnterCallback, IntersectionEngine, RateLimiter, RatePolicy};
use crate::host::{scroll_parent, EventKind, EventTarget, Host};
use crate::model::{ElementId, ListenerId};
use crate::offset::EdgeOffsets;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{debug, trace};

/// Event-driven rect math against scrollable ancestors.
pub struct GeometricPolling {
    host: Rc<dyn Host>,
    policy: RatePolicy,
}

impl GeometricPolling {
    /// Strategy coalescing checks with `policy`.
    pub fn new(host: Rc<dyn Host>, policy: RatePolicy) -> Self {
        Self { host, policy }
    }
}

/// Per-subscription state.
struct PollWatch {
    host: Rc<dyn Host>,
    element: ElementId,
    offsets: EdgeOffsets,
    root: EventTarget,
    live: Rc<Cell<bool>>,
    fire: RefCell<Option<EnterCallback>>,
    listeners: RefCell<Vec<ListenerId>>,
    limiter: RefCell<Option<RateLimiter>>,
}

impl PollWatch {
    fn in_view(&self) -> bool {
        let (root_element, root_rect) = match self.root {
            EventTarget::Window => (None, self.host.viewport_rect()),
            EventTarget::Element(container) => match self.host.bounding_rect(container) {
                Some(rect) => (Some(container), rect),
                None => return false,
            },
        };
        let expanded = self.offsets.expand(&root_rect);
        intersection_rect(self.host.as_ref(), self.element, root_element, &expanded).is_some()
    }

    fn check(&self) {
        if !self.live.get() {
            return;
        }
        let hit = self.in_view();
        trace!(element = %self.element, hit, "polling check");
        if !hit {
            return;
        }

        self.detach();
        let fire = self.fire.borrow_mut().take();
        if let Some(fire) = fire {
            debug!(element = %self.element, "element entered viewport");
            self.host.request_frame(fire);
        }
    }

    fn detach(&self) {
        let listeners = std::mem::take(&mut *self.listeners.borrow_mut());
        for id in listeners {
            self.host.remove_listener(id);
        }
        let limiter = self.limiter.borrow_mut().take();
        if let Some(limiter) = limiter {
            limiter.cancel();
        }
    }
}

impl IntersectionEngine for GeometricPolling {
    fn subscribe(
        &self,
        element: ElementId,
        offsets: &EdgeOffsets,
        on_enter: EnterCallback,
    ) -> EngineSubscription {
        let (live, fire) = guard(on_enter);
        let root = scroll_parent(self.host.as_ref(), element);

        let watch = Rc::new(PollWatch {
            host: Rc::clone(&self.host),
            element,
            offsets: *offsets,
            root,
            live: Rc::clone(&live),
            fire: RefCell::new(Some(fire)),
            listeners: RefCell::new(Vec::new()),
            limiter: RefCell::new(None),
        });

        let check: Rc<dyn Fn()> = {
            let weak = Rc::downgrade(&watch);
            Rc::new(move || {
                if let Some(watch) = weak.upgrade() {
                    watch.check();
                }
            })
        };
        let limiter = RateLimiter::new(Rc::clone(&self.host), self.policy, check);
        let handler: Rc<dyn Fn()> = {
            let limiter = limiter.clone();
            Rc::new(move || limiter.call())
        };

        let resize = self
            .host
            .add_listener(EventTarget::Window, EventKind::Resize, Rc::clone(&handler));
        let scroll = self.host.add_listener(root, EventKind::Scroll, handler);
        *watch.listeners.borrow_mut() = vec![resize, scroll];
        *watch.limiter.borrow_mut() = Some(limiter);

        debug!(%element, ?root, offsets = %offsets, "polling subscription armed");

        // Elements already in view must not wait for the first event.
        watch.check();

        EngineSubscription::new(live, move || watch.detach())
    }

    fn name(&self) -> &'static str {
        "polling"
    }
}
