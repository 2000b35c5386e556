//! Scenario test harness.
//!
//! Bundles a [`SimHost`] page, an [`ObserverPool`], a single-threaded
//! executor and recording hooks, so scenario tests read as a script:
//! build a page, mount a lazy element, scroll, settle, assert.

use crate::activation::{
    ActivationBuilder, ActivationStateMachine, Hooks, NavigationNotifier, Passthrough, RenderProps, Status,
};
use crate::config::LazyConfig;
use crate::engine::{build_engine, ObserverPool};
use crate::host::{Host, SimElement, SimHost};
use crate::model::{ElementId, HookError};
use futures::executor::LocalPool;
use futures::future::{FutureExt, LocalBoxFuture};
use std::cell::RefCell;
use std::rc::Rc;

/// Shared, append-only log of hook calls and render statuses.
#[derive(Clone, Default)]
pub struct EventLog(Rc<RefCell<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.borrow_mut().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.0.borrow().iter().filter(|e| *e == event).count()
    }

    #[allow(dead_code)]
    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

/// Behavior of a recording hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookBehavior {
    /// Resolve immediately.
    Ok,
    /// Resolve after this many virtual milliseconds.
    Delay(u64),
    /// Fail immediately.
    Fail,
}

pub struct Harness {
    pub host: Rc<SimHost>,
    pub pool: Rc<ObserverPool>,
    pub notifier: NavigationNotifier,
    pub log: EventLog,
    executor: LocalPool,
}

impl Harness {
    /// Page with an 800x600 viewport.
    pub fn new() -> Self {
        Self::with_viewport(800.0, 600.0)
    }

    pub fn with_viewport(width: f64, height: f64) -> Self {
        let host = Rc::new(SimHost::new(width, height));
        let dyn_host: Rc<dyn Host> = host.clone();
        Self {
            pool: Rc::new(ObserverPool::new(dyn_host)),
            host,
            notifier: NavigationNotifier::new(),
            log: EventLog::default(),
            executor: LocalPool::new(),
        }
    }

    pub fn add(&self, element: SimElement) -> ElementId {
        self.host.add_element(element)
    }

    /// Hook that records `name` when called and behaves as told.
    pub fn hook(
        &self,
        name: &'static str,
        behavior: HookBehavior,
    ) -> impl Fn() -> LocalBoxFuture<'static, Result<(), HookError>> + 'static {
        let log = self.log.clone();
        let host = Rc::clone(&self.host);
        move || {
            log.push(name);
            match behavior {
                HookBehavior::Ok => async { Ok::<(), HookError>(()) }.boxed_local(),
                HookBehavior::Fail => {
                    async move { Err::<(), _>(HookError::new(format!("{name} failed"))) }.boxed_local()
                }
                HookBehavior::Delay(ms) => {
                    let sleep = host.sleep(ms);
                    async move {
                        sleep.await;
                        Ok::<(), HookError>(())
                    }
                    .boxed_local()
                }
            }
        }
    }

    /// `on_loading`, `on_loaded` and `on_unload` all recording and resolving.
    pub fn recording_hooks(&self) -> Hooks {
        Hooks::new()
            .on_loading(self.hook("on_loading", HookBehavior::Ok))
            .on_loaded(self.hook("on_loaded", HookBehavior::Ok))
            .on_unload(self.hook("on_unload", HookBehavior::Ok))
    }

    /// Builder wired to this page, executor and notifier.
    pub fn builder(&self, config: LazyConfig) -> ActivationBuilder {
        let host: Rc<dyn Host> = self.host.clone();
        let engine = build_engine(host, &self.pool, &config).expect("engine builds");
        ActivationStateMachine::builder(engine, Rc::new(self.executor.spawner()))
            .config(config)
            .navigation(self.notifier.clone())
    }

    /// Build (not mount) a machine whose render callback logs statuses.
    pub fn machine(&self, config: LazyConfig, hooks: Hooks) -> ActivationStateMachine {
        let log = self.log.clone();
        self.builder(config)
            .hooks(hooks)
            .passthrough(Passthrough::new())
            .render(move |props: &RenderProps| log.push(format!("status:{}", props.status)))
            .build()
            .expect("machine builds")
    }

    /// Run frames and tasks until nothing is left to do.
    pub fn settle(&mut self) {
        self.host.settle(&mut self.executor);
    }

    /// Advance virtual time, settling after every timer.
    pub fn advance(&mut self, ms: u64) {
        self.host.advance_settled(ms, &mut self.executor);
    }

    pub fn scroll_to(&mut self, y: f64) {
        self.host.scroll_window_to(0.0, y);
        self.settle();
    }

    /// Statuses published to the render callback, in order.
    pub fn statuses(&self) -> Vec<String> {
        self.log
            .events()
            .into_iter()
            .filter_map(|e| e.strip_prefix("status:").map(str::to_string))
            .collect()
    }
}

/// Config selecting the polling strategy with no coalescing.
pub fn polling_config() -> LazyConfig {
    LazyConfig {
        strategy: crate::config::Strategy::Polling,
        throttle_interval_ms: 0,
        ..LazyConfig::default()
    }
}

/// Config selecting the observer strategy.
pub fn observer_config() -> LazyConfig {
    LazyConfig {
        strategy: crate::config::Strategy::Observer,
        ..LazyConfig::default()
    }
}

/// Status names for comparison with [`Harness::statuses`].
pub fn names(statuses: &[Status]) -> Vec<String> {
    statuses.iter().map(ToString::to_string).collect()
}
