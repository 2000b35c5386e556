//! Viewport intersection engine.
//!
//! One contract, [`IntersectionEngine::subscribe`], two strategies:
//!
//! - [`GeometricPolling`]: rect math against scroll/resize events.
//! - [`ObserverBased`]: delegates to a pooled platform primitive.
//!
//! Both fire `on_enter` at most once per subscription, deferred to the next
//! animation frame, and both leave no registrations behind when a
//! subscription is dropped before it fires.

use crate::config::{LazyConfig, RootSpec, Strategy};
use crate::host::Host;
use crate::model::{ActivationError, ElementId};
use crate::offset::EdgeOffsets;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use tracing::debug;

pub mod intersect;
pub mod observer;
pub mod polling;
pub mod pool;
pub mod rate_limit;

pub use observer::ObserverBased;
pub use polling::GeometricPolling;
pub use pool::{ObserverPool, PoolKey, SharedWatcher};
pub use rate_limit::{RateLimiter, RatePolicy};

/// Callback run when a subscribed element enters the viewport.
pub type EnterCallback = Box<dyn FnOnce()>;

/// Watches elements for their first entry into a viewport.
pub trait IntersectionEngine {
    /// Start watching `element`. `on_enter` runs at most once.
    fn subscribe(
        &self,
        element: ElementId,
        offsets: &EdgeOffsets,
        on_enter: EnterCallback,
    ) -> EngineSubscription;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Handle to an active engine subscription.
///
/// `unsubscribe` is idempotent. Dropping the handle unsubscribes.
#[must_use = "dropping a subscription unsubscribes it"]
pub struct EngineSubscription {
    live: Rc<Cell<bool>>,
    teardown: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl EngineSubscription {
    pub(crate) fn new(live: Rc<Cell<bool>>, teardown: impl FnOnce() + 'static) -> Self {
        Self {
            live,
            teardown: RefCell::new(Some(Box::new(teardown))),
        }
    }

    /// Whether `on_enter` can still fire.
    pub fn is_active(&self) -> bool {
        self.live.get()
    }

    /// Stop watching. Safe to call any number of times.
    pub fn unsubscribe(&self) {
        self.live.set(false);
        let teardown = self.teardown.borrow_mut().take();
        if let Some(teardown) = teardown {
            teardown();
        }
    }
}

impl Drop for EngineSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for EngineSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineSubscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Wrap `on_enter` so it runs at most once and never after unsubscribe.
///
/// Returns the shared liveness flag for the subscription handle.
pub(crate) fn guard(on_enter: EnterCallback) -> (Rc<Cell<bool>>, EnterCallback) {
    let live = Rc::new(Cell::new(true));
    let flag = Rc::clone(&live);
    let fire = Box::new(move || {
        if flag.replace(false) {
            on_enter();
        }
    });
    (live, fire)
}

/// Resolve a configured root against the host.
///
/// # Errors
///
/// Returns [`ActivationError::UnknownRoot`] for a selector matching nothing.
pub fn resolve_root(host: &dyn Host, root: &RootSpec) -> Result<Option<ElementId>, ActivationError> {
    match root {
        RootSpec::Viewport => Ok(None),
        RootSpec::Element(id) => Ok(Some(*id)),
        RootSpec::Selector(selector) => host
            .query_selector(selector)
            .map(Some)
            .ok_or_else(|| ActivationError::UnknownRoot(selector.clone())),
    }
}

/// Build the engine selected by `config` for this host.
///
/// `Strategy::Auto` picks the observer strategy when the host supports it.
///
/// # Errors
///
/// Returns [`ActivationError::UnknownRoot`] when the observer strategy is
/// selected and the root selector matches nothing.
pub fn build_engine(
    host: Rc<dyn Host>,
    pool: &Rc<ObserverPool>,
    config: &LazyConfig,
) -> Result<Rc<dyn IntersectionEngine>, ActivationError> {
    let use_observer = match config.strategy {
        Strategy::Observer => true,
        Strategy::Polling => false,
        Strategy::Auto => host.supports_intersection_observer(),
    };

    let engine: Rc<dyn IntersectionEngine> = if use_observer {
        let root = resolve_root(host.as_ref(), &config.root)?;
        Rc::new(ObserverBased::new(Rc::clone(pool), root, config.threshold))
    } else {
        let policy = RatePolicy::from_interval(config.throttle_interval_ms, config.debounce);
        Rc::new(GeometricPolling::new(host, policy))
    };

    debug!(engine = engine.name(), strategy = ?config.strategy, "intersection engine selected");
    Ok(engine)
}
