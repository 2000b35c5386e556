//! Coalescing of bursty scroll/resize notifications.

use crate::host::Host;
use crate::model::TimerId;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

/// How repeated calls are coalesced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatePolicy {
    /// Every call runs the action.
    Immediate,
    /// Run once the calls have been quiet for the interval (trailing edge).
    Debounce(Duration),
    /// Run at most once per interval: leading edge plus one trailing call.
    Throttle(Duration),
}

impl RatePolicy {
    /// Policy for a configured interval. An interval of zero disables coalescing.
    pub fn from_interval(interval_ms: u64, debounce: bool) -> Self {
        let interval = Duration::from_millis(interval_ms);
        match (interval_ms, debounce) {
            (0, _) => RatePolicy::Immediate,
            (_, true) => RatePolicy::Debounce(interval),
            (_, false) => RatePolicy::Throttle(interval),
        }
    }
}

struct LimiterInner {
    host: Rc<dyn Host>,
    policy: RatePolicy,
    action: Rc<dyn Fn()>,
    timer: Cell<Option<TimerId>>,
    last_run: Cell<Option<u64>>,
}

impl LimiterInner {
    fn run(&self) {
        self.last_run.set(Some(self.host.now_ms()));
        (self.action)();
    }
}

/// Rate-limited wrapper around an action, backed by host timers.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Rc<LimiterInner>,
}

impl RateLimiter {
    /// Wrap `action`; nothing runs until [`RateLimiter::call`].
    pub fn new(host: Rc<dyn Host>, policy: RatePolicy, action: Rc<dyn Fn()>) -> Self {
        Self {
            inner: Rc::new(LimiterInner {
                host,
                policy,
                action,
                timer: Cell::new(None),
                last_run: Cell::new(None),
            }),
        }
    }

    /// Request a run of the action under the configured policy.
    pub fn call(&self) {
        match self.inner.policy {
            RatePolicy::Immediate => self.inner.run(),
            RatePolicy::Debounce(wait) => {
                self.cancel();
                self.schedule(wait);
            }
            RatePolicy::Throttle(wait) => {
                let now = self.inner.host.now_ms();
                let wait_ms = wait.as_millis() as u64;
                let elapsed = self.inner.last_run.get().map(|last| now.saturating_sub(last));
                match elapsed {
                    Some(elapsed) if elapsed < wait_ms => {
                        if self.inner.timer.get().is_none() {
                            self.schedule(Duration::from_millis(wait_ms - elapsed));
                        }
                    }
                    _ => {
                        self.cancel();
                        self.inner.run();
                    }
                }
            }
        }
    }

    /// Drop any pending trailing run.
    pub fn cancel(&self) {
        if let Some(timer) = self.inner.timer.take() {
            self.inner.host.clear_timeout(timer);
        }
    }

    fn schedule(&self, delay: Duration) {
        let weak = Rc::downgrade(&self.inner);
        let timer = self.inner.host.set_timeout(
            delay,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.timer.set(None);
                    inner.run();
                }
            }),
        );
        self.inner.timer.set(Some(timer));
    }
}
