//! Observer-based strategy: one pooled platform primitive per configuration.

use super::pool::{ObserverPool, PoolKey};
use super::{guard, EngineSubscription, EnterCallback, IntersectionEngine};
use crate::model::ElementId;
use crate::offset::EdgeOffsets;
use std::rc::Rc;
use tracing::debug;

/// Delegates intersection detection to pooled [`SharedWatcher`](super::SharedWatcher)s.
pub struct ObserverBased {
    pool: Rc<ObserverPool>,
    root: Option<ElementId>,
    threshold: f64,
}

impl ObserverBased {
    /// Strategy sharing primitives from `pool`.
    pub fn new(pool: Rc<ObserverPool>, root: Option<ElementId>, threshold: f64) -> Self {
        Self {
            pool,
            root,
            threshold,
        }
    }
}

impl IntersectionEngine for ObserverBased {
    fn subscribe(
        &self,
        element: ElementId,
        offsets: &EdgeOffsets,
        on_enter: EnterCallback,
    ) -> EngineSubscription {
        let (live, fire) = guard(on_enter);
        let key = PoolKey::new(self.root, offsets.to_root_margin(), self.threshold);
        let watcher = self.pool.get(&key);
        watcher.watch(element, fire);

        debug!(%element, root_margin = key.root_margin(), "observer subscription armed");

        EngineSubscription::new(live, move || watcher.unwatch(element))
    }

    fn name(&self) -> &'static str {
        "observer"
    }
}
