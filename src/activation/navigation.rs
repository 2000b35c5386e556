//! Navigation change notifications.
//!
//! An explicit, passable registry: whoever owns the router calls
//! [`NavigationNotifier::notify`], and machines built with `auto_reset`
//! subscribe to it.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::trace;

type Listener = Rc<dyn Fn(&str)>;

#[derive(Default)]
struct Registry {
    listeners: RefCell<Vec<(u64, Listener)>>,
    next_id: Cell<u64>,
}

/// Registry of navigation listeners. Clones share the registry.
#[derive(Clone, Default)]
pub struct NavigationNotifier {
    registry: Rc<Registry>,
}

impl NavigationNotifier {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener`. It stays registered until the returned handle
    /// is dropped or unsubscribed.
    pub fn subscribe(&self, listener: impl Fn(&str) + 'static) -> NavigationSubscription {
        let id = self.registry.next_id.get();
        self.registry.next_id.set(id + 1);
        self.registry
            .listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));
        NavigationSubscription {
            registry: Rc::downgrade(&self.registry),
            id,
        }
    }

    /// Call every registered listener with the new location.
    pub fn notify(&self, location: &str) {
        let snapshot: Vec<(u64, Listener)> = self.registry.listeners.borrow().clone();
        trace!(location, listeners = snapshot.len(), "navigation");
        for (id, listener) in snapshot {
            let still_registered = self
                .registry
                .listeners
                .borrow()
                .iter()
                .any(|(other, _)| *other == id);
            if still_registered {
                listener(location);
            }
        }
    }

    /// Listeners currently registered.
    pub fn listener_count(&self) -> usize {
        self.registry.listeners.borrow().len()
    }
}

impl fmt::Debug for NavigationNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationNotifier")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Registration handle. Dropping it unsubscribes.
#[must_use = "dropping a subscription unsubscribes it"]
#[derive(Debug)]
pub struct NavigationSubscription {
    registry: Weak<Registry>,
    id: u64,
}

impl NavigationSubscription {
    /// Remove the listener. Idempotent.
    pub fn unsubscribe(&self) {
        if let Some(registry) = self.registry.upgrade() {
            let removed = {
                let mut listeners = registry.listeners.borrow_mut();
                listeners
                    .iter()
                    .position(|(id, _)| *id == self.id)
                    .map(|index| listeners.remove(index))
            };
            drop(removed);
        }
    }
}

impl Drop for NavigationSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
