//! The activation state machine.
//!
//! ```text
//!            enter_viewport()            on_loading ok
//!   Unload ─────────────────▶ Loading ─────────────────▶ Loaded
//!     ▲                          │                          │
//!     └──────────── reset() ─────┴──────────────────────────┘
//! ```
//!
//! Every asynchronous continuation captures the generation current when it
//! started and a weak reference to the machine. Before resuming it checks
//! that the machine is still alive, still mounted, and still on that
//! generation; otherwise the flow aborts without touching the record.

use super::hooks::{HookFuture, Hooks};
use super::lifecycle::ListenerLifecycleManager;
use super::navigation::{NavigationNotifier, NavigationSubscription};
use super::{ActivationRecord, Passthrough, RenderProps, Status};
use crate::config::LazyConfig;
use crate::engine::{EnterCallback, IntersectionEngine};
use crate::model::{ActivationError, ElementId, Generation, HookPhase, LoadHookError};
use crate::offset::EdgeOffsets;
use futures::future::LocalBoxFuture;
use futures::task::{LocalSpawn, LocalSpawnExt};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::rc::{Rc, Weak};
use thiserror::Error;
use tracing::{debug, error, warn};

type RenderCallback = Box<dyn Fn(&RenderProps)>;

/// Why a continuation did not resume.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AbortCondition {
    #[error("machine dropped")]
    Dropped,
    #[error("element unmounted")]
    Unmounted,
    #[error("superseded: started in {started}, now {current}")]
    Superseded {
        started: Generation,
        current: Generation,
    },
}

struct Inner {
    config: LazyConfig,
    lifecycle: ListenerLifecycleManager,
    spawner: Rc<dyn LocalSpawn>,
    hooks: Hooks,
    render: Option<RenderCallback>,
    passthrough: Passthrough,
    notifier: Option<NavigationNotifier>,
    navigation: RefCell<Option<NavigationSubscription>>,
    record: RefCell<ActivationRecord>,
    frozen: Cell<bool>,
}

impl Inner {
    fn check_live(&self, started: Generation) -> Result<(), AbortCondition> {
        let record = self.record.borrow();
        if self.frozen.get() || record.element.is_none() {
            return Err(AbortCondition::Unmounted);
        }
        if record.generation != started {
            return Err(AbortCondition::Superseded {
                started,
                current: record.generation,
            });
        }
        Ok(())
    }

    fn render_props(&self) -> RenderProps {
        RenderProps {
            status: self.record.borrow().status,
            mode: self.config.mode,
            passthrough: self.passthrough.clone(),
        }
    }

    fn publish(&self) {
        if let Some(render) = &self.render {
            let props = self.render_props();
            render(&props);
        }
    }

    fn set_status(&self, status: Status) {
        let (element, generation) = {
            let mut record = self.record.borrow_mut();
            record.status = status;
            (record.element, record.generation)
        };
        debug!(element = ?element, %generation, %status, "status changed");
        self.publish();
    }

    /// Route a failure from a live generation.
    ///
    /// Returns the `on_error` future, or records the failure when there is
    /// no handler.
    fn hook_failed(&self, failure: LoadHookError) -> Option<LocalBoxFuture<'static, ()>> {
        if let Some(handled) = self.hooks.handle_error(failure.clone()) {
            return Some(handled);
        }
        let element = self.record.borrow().element;
        error!(element = ?element, phase = %failure.phase, error = failure.source.message(), "unhandled hook failure");
        self.record.borrow_mut().last_failure = Some(failure);
        None
    }

    fn spawn(&self, task: impl Future<Output = ()> + 'static) {
        if let Err(err) = self.spawner.spawn_local(task) {
            warn!(error = %err, "failed to spawn activation task");
        }
    }
}

fn upgrade_live(weak: &Weak<Inner>, started: Generation) -> Result<Rc<Inner>, AbortCondition> {
    let inner = weak.upgrade().ok_or(AbortCondition::Dropped)?;
    inner.check_live(started)?;
    Ok(inner)
}

/// Route a hook result, awaiting `on_error` when one handles it.
async fn route_result(
    weak: &Weak<Inner>,
    started: Generation,
    phase: HookPhase,
    result: Result<(), crate::model::HookError>,
) -> Result<(), AbortCondition> {
    let Err(source) = result else {
        return Ok(());
    };
    let handler = {
        let inner = match upgrade_live(weak, started) {
            Ok(inner) => inner,
            Err(abort) => {
                debug!(%phase, error = %source, reason = %abort, "dropping stale hook failure");
                return Err(abort);
            }
        };
        inner.hook_failed(LoadHookError::new(phase, source))
    };
    if let Some(handler) = handler {
        handler.await;
    }
    Ok(())
}

async fn load_sequence(
    weak: Weak<Inner>,
    started: Generation,
    loading: Option<HookFuture>,
) -> Result<(), AbortCondition> {
    if let Some(loading) = loading {
        let result = loading.await;
        upgrade_live(&weak, started)?;
        if result.is_err() {
            // The record stays at Loading until a reset.
            return route_result(&weak, started, HookPhase::Loading, result).await;
        }
    }

    let loaded = {
        let inner = upgrade_live(&weak, started)?;
        inner.set_status(Status::Loaded);
        // The render callback may have unmounted or reset the machine.
        inner.check_live(started)?;
        inner.hooks.invoke(HookPhase::Loaded)
    };

    if let Some(loaded) = loaded {
        let result = loaded.await;
        route_result(&weak, started, HookPhase::Loaded, result).await?;
    }
    Ok(())
}

async fn unload_sequence(
    weak: Weak<Inner>,
    started: Generation,
    unload: HookFuture,
) -> Result<(), AbortCondition> {
    let result = unload.await;
    route_result(&weak, started, HookPhase::Unload, result).await
}

/// Drives one lazy element through `Unload → Loading → Loaded`.
///
/// Cheap to clone; clones share the same machine.
#[derive(Clone)]
pub struct ActivationStateMachine {
    inner: Rc<Inner>,
}

impl ActivationStateMachine {
    /// Start building a machine around `engine`, spawning hook futures on
    /// `spawner`.
    pub fn builder(
        engine: Rc<dyn IntersectionEngine>,
        spawner: Rc<dyn LocalSpawn>,
    ) -> ActivationBuilder {
        ActivationBuilder {
            engine,
            spawner,
            config: LazyConfig::default(),
            hooks: Hooks::default(),
            render: None,
            passthrough: Passthrough::new(),
            notifier: None,
        }
    }

    /// Current status.
    pub fn status(&self) -> Status {
        self.inner.record.borrow().status
    }

    /// Current generation.
    pub fn generation(&self) -> Generation {
        self.inner.record.borrow().generation
    }

    /// The mounted element, if any.
    pub fn element(&self) -> Option<ElementId> {
        self.inner.record.borrow().element
    }

    /// Snapshot of the whole record.
    pub fn record(&self) -> ActivationRecord {
        self.inner.record.borrow().clone()
    }

    /// Props the render callback would receive now.
    pub fn render_props(&self) -> RenderProps {
        self.inner.render_props()
    }

    /// Configuration the machine was built with.
    pub fn config(&self) -> &LazyConfig {
        &self.inner.config
    }

    /// Resolved offsets used for every subscription.
    pub fn offsets(&self) -> &EdgeOffsets {
        self.inner.lifecycle.offsets()
    }

    /// Whether `unmount()` has run.
    pub fn is_frozen(&self) -> bool {
        self.inner.frozen.get()
    }

    /// Engine subscriptions that can still fire: zero or one.
    pub fn active_subscriptions(&self) -> usize {
        self.inner.lifecycle.active_subscriptions()
    }

    /// Attach to `element`, publish `Unload` and start watching.
    ///
    /// Ignored when already mounted or after `unmount()`.
    pub fn mount(&self, element: ElementId) {
        if self.inner.frozen.get() {
            warn!(%element, "mount after unmount ignored");
            return;
        }
        {
            let mut record = self.inner.record.borrow_mut();
            if let Some(current) = record.element {
                warn!(%current, %element, "already mounted");
                return;
            }
            record.element = Some(element);
            record.status = Status::Unload;
        }
        debug!(%element, "mounted");

        if self.inner.config.auto_reset {
            if let Some(notifier) = &self.inner.notifier {
                let weak = Rc::downgrade(&self.inner);
                let subscription = notifier.subscribe(move |location| {
                    if let Some(inner) = weak.upgrade() {
                        debug!(location, "navigation, resetting");
                        ActivationStateMachine { inner }.reset();
                    }
                });
                *self.inner.navigation.borrow_mut() = Some(subscription);
            }
        }

        self.inner.publish();
        self.inner.lifecycle.mount(element, self.enter_callback());
    }

    /// Signal that the element entered the viewport.
    ///
    /// Only acts from `Unload` while mounted. Returns whether it did.
    pub fn enter_viewport(&self) -> bool {
        let started = {
            let mut record = self.inner.record.borrow_mut();
            if self.inner.frozen.get() || record.element.is_none() || record.status != Status::Unload
            {
                return false;
            }
            record.status = Status::Loading;
            record.generation
        };
        // A direct call must not leave the engine armed.
        self.inner.lifecycle.cancel();
        debug!(%started, status = %Status::Loading, "status changed");
        self.inner.publish();

        if self.inner.check_live(started).is_err() {
            // The render callback tore the machine down.
            return true;
        }
        let loading = self.inner.hooks.invoke(HookPhase::Loading);
        let weak = Rc::downgrade(&self.inner);
        self.inner.spawn(async move {
            if let Err(abort) = load_sequence(weak, started, loading).await {
                debug!(%started, reason = %abort, "load aborted");
            }
        });
        true
    }

    /// Return to `Unload` and watch for the next entry.
    ///
    /// Only acts when mounted and not already `Unload`. Returns whether it did.
    pub fn reset(&self) -> bool {
        let generation = {
            let mut record = self.inner.record.borrow_mut();
            if self.inner.frozen.get() || record.element.is_none() || record.status == Status::Unload
            {
                return false;
            }
            record.generation = record.generation.next();
            record.generation
        };
        self.inner.lifecycle.cancel();
        debug!(%generation, "reset");

        if let Some(unload) = self.inner.hooks.invoke(HookPhase::Unload) {
            let weak = Rc::downgrade(&self.inner);
            self.inner.spawn(async move {
                if let Err(abort) = unload_sequence(weak, generation, unload).await {
                    debug!(%generation, reason = %abort, "unload routing aborted");
                }
            });
        }

        self.inner.record.borrow_mut().last_failure = None;
        self.inner.set_status(Status::Unload);
        // The render callback may have torn the machine down or entered already.
        if self.inner.check_live(generation).is_ok() && self.status() == Status::Unload {
            self.inner.lifecycle.rearm(self.enter_callback());
        }
        true
    }

    /// Detach permanently. Pending continuations abort.
    pub fn unmount(&self) {
        if self.inner.frozen.replace(true) {
            return;
        }
        {
            let mut record = self.inner.record.borrow_mut();
            record.element = None;
            record.generation = record.generation.next();
        }
        self.inner.lifecycle.unmount();
        let navigation = self.inner.navigation.borrow_mut().take();
        drop(navigation);
        debug!("unmounted");
    }

    fn enter_callback(&self) -> EnterCallback {
        let weak = Rc::downgrade(&self.inner);
        Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                ActivationStateMachine { inner }.enter_viewport();
            }
        })
    }
}

impl fmt::Debug for ActivationStateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivationStateMachine")
            .field("record", &*self.inner.record.borrow())
            .field("frozen", &self.inner.frozen.get())
            .finish()
    }
}

/// Builder for [`ActivationStateMachine`].
pub struct ActivationBuilder {
    engine: Rc<dyn IntersectionEngine>,
    spawner: Rc<dyn LocalSpawn>,
    config: LazyConfig,
    hooks: Hooks,
    render: Option<RenderCallback>,
    passthrough: Passthrough,
    notifier: Option<NavigationNotifier>,
}

impl ActivationBuilder {
    /// Replace the default configuration.
    pub fn config(mut self, config: LazyConfig) -> Self {
        self.config = config;
        self
    }

    /// Lifecycle hooks. None by default.
    pub fn hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Called with the current props on mount and on every status change.
    pub fn render(mut self, render: impl Fn(&RenderProps) + 'static) -> Self {
        self.render = Some(Box::new(render));
        self
    }

    /// Props forwarded to every render call.
    pub fn passthrough(mut self, passthrough: Passthrough) -> Self {
        self.passthrough = passthrough;
        self
    }

    /// Source of navigation notifications for `auto_reset`.
    pub fn navigation(mut self, notifier: NavigationNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Resolve the offsets and assemble the machine. Nothing is watched
    /// until [`ActivationStateMachine::mount`].
    ///
    /// # Errors
    ///
    /// Returns [`ActivationError::InvalidOffset`] when the configured offset
    /// or root margin does not resolve.
    pub fn build(self) -> Result<ActivationStateMachine, ActivationError> {
        let offsets = self.config.effective_offsets()?;
        if self.config.auto_reset && self.notifier.is_none() {
            warn!("auto_reset enabled without a navigation notifier");
        }
        debug!(
            offsets = %offsets,
            on_loading = self.hooks.has(HookPhase::Loading),
            on_loaded = self.hooks.has(HookPhase::Loaded),
            on_unload = self.hooks.has(HookPhase::Unload),
            on_error = self.hooks.has_error_handler(),
            "activation built"
        );
        Ok(ActivationStateMachine {
            inner: Rc::new(Inner {
                lifecycle: ListenerLifecycleManager::new(self.engine, offsets),
                config: self.config,
                spawner: self.spawner,
                hooks: self.hooks,
                render: self.render,
                passthrough: self.passthrough,
                notifier: self.notifier,
                navigation: RefCell::new(None),
                record: RefCell::new(ActivationRecord::default()),
                frozen: Cell::new(false),
            }),
        })
    }
}
