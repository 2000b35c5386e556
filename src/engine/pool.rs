//! Pool of shared intersection primitives.
//!
//! Creating a platform primitive is expensive, so subscriptions that share
//! `(root, root_margin, threshold)` share one. The pool is an explicit
//! object rather than a process global: whoever owns it decides its
//! lifetime, and tests get a fresh one per case.

use super::EnterCallback;
use crate::host::{BatchCallback, Host, IntersectionEntry, IntersectionPrimitive, ObserverOptions};
use crate::model::ElementId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, warn};

/// Configuration identity of a pooled primitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PoolKey {
    root: Option<ElementId>,
    root_margin: String,
    // Thresholds compare by bit pattern so the key can be hashed.
    threshold_bits: u64,
}

impl PoolKey {
    /// Key for a root (`None` is the viewport), a canonical margin and a threshold.
    pub fn new(root: Option<ElementId>, root_margin: impl Into<String>, threshold: f64) -> Self {
        Self {
            root,
            root_margin: root_margin.into(),
            threshold_bits: threshold.to_bits(),
        }
    }

    /// Canonical four-token margin.
    pub fn root_margin(&self) -> &str {
        &self.root_margin
    }

    /// Intersection ratio threshold.
    pub fn threshold(&self) -> f64 {
        f64::from_bits(self.threshold_bits)
    }

    fn options(&self) -> ObserverOptions {
        ObserverOptions {
            root: self.root,
            root_margin: self.root_margin.clone(),
            threshold: self.threshold(),
        }
    }
}

/// One pooled primitive plus its pending one-shot callbacks.
pub struct SharedWatcher {
    key: PoolKey,
    host: Rc<dyn Host>,
    primitive: Rc<dyn IntersectionPrimitive>,
    callbacks: RefCell<HashMap<ElementId, EnterCallback>>,
}

impl SharedWatcher {
    fn create(host: Rc<dyn Host>, key: PoolKey) -> Rc<Self> {
        Rc::new_cyclic(|weak: &Weak<SharedWatcher>| {
            let weak = weak.clone();
            let on_batch: BatchCallback = Rc::new(move |entries: &[IntersectionEntry]| {
                if let Some(watcher) = weak.upgrade() {
                    watcher.dispatch(entries);
                }
            });
            let primitive = host.create_observer(key.options(), on_batch);
            Self {
                key,
                host,
                primitive,
                callbacks: RefCell::new(HashMap::new()),
            }
        })
    }

    /// Configuration this watcher was created for.
    pub fn key(&self) -> &PoolKey {
        &self.key
    }

    /// Register a one-shot callback for `element`.
    ///
    /// A callback already pending for the same element is replaced.
    pub fn watch(&self, element: ElementId, on_cross: EnterCallback) {
        let replaced = self
            .callbacks
            .borrow_mut()
            .insert(element, on_cross)
            .is_some();
        if replaced {
            warn!(%element, root_margin = %self.key.root_margin, "pending callback replaced");
        }
        self.primitive.observe(element);
    }

    /// Drop the pending callback for `element`, if any. Idempotent.
    pub fn unwatch(&self, element: ElementId) {
        let removed = self.callbacks.borrow_mut().remove(&element);
        drop(removed);
        self.primitive.unobserve(element);
    }

    /// Whether a callback is pending for `element`.
    pub fn is_watching(&self, element: ElementId) -> bool {
        self.callbacks.borrow().contains_key(&element)
    }

    /// Pending callbacks.
    pub fn pending(&self) -> usize {
        self.callbacks.borrow().len()
    }

    fn dispatch(&self, entries: &[IntersectionEntry]) {
        for entry in entries {
            let target = entry.target;
            let callback = if entry.entered() {
                self.callbacks.borrow_mut().remove(&target)
            } else {
                None
            };

            match callback {
                Some(callback) => {
                    self.primitive.unobserve(target);
                    debug!(element = %target, ratio = entry.intersection_ratio, "element entered root");
                    self.host.request_frame(callback);
                }
                None if !self.is_watching(target) => self.primitive.unobserve(target),
                None => {}
            }
        }
    }
}

impl fmt::Debug for SharedWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedWatcher")
            .field("key", &self.key)
            .field("pending", &self.pending())
            .finish()
    }
}

/// Registry of shared watchers keyed by configuration.
///
/// Entries live as long as the pool; the key space is bounded by the
/// distinct configurations in use, not by the number of elements.
pub struct ObserverPool {
    host: Rc<dyn Host>,
    entries: RefCell<HashMap<PoolKey, Rc<SharedWatcher>>>,
}

impl ObserverPool {
    /// Empty pool creating primitives through `host`.
    pub fn new(host: Rc<dyn Host>) -> Self {
        Self {
            host,
            entries: RefCell::new(HashMap::new()),
        }
    }

    /// Watcher for `key`, created on first use.
    pub fn get(&self, key: &PoolKey) -> Rc<SharedWatcher> {
        let existing = self.entries.borrow().get(key).cloned();
        if let Some(watcher) = existing {
            return watcher;
        }

        debug!(?key, "creating pooled intersection primitive");
        let watcher = SharedWatcher::create(Rc::clone(&self.host), key.clone());
        self.entries
            .borrow_mut()
            .insert(key.clone(), Rc::clone(&watcher));
        watcher
    }

    /// Distinct configurations pooled.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Whether nothing has been pooled yet.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Forget every pooled watcher.
    pub fn clear(&self) {
        let drained: Vec<_> = self.entries.borrow_mut().drain().collect();
        drop(drained);
    }
}
