//! User load hooks.

use crate::model::{HookError, HookPhase, LoadHookError};
use futures::future::{FutureExt, LocalBoxFuture};
use std::fmt;
use std::future::Future;

/// Future returned by a load hook.
pub type HookFuture = LocalBoxFuture<'static, Result<(), HookError>>;

type Hook = Box<dyn Fn() -> HookFuture>;
type ErrorHook = Box<dyn Fn(LoadHookError) -> LocalBoxFuture<'static, ()>>;

/// Optional callbacks around a load cycle.
///
/// ```
/// use lazy_viewport::activation::Hooks;
/// use lazy_viewport::model::HookError;
///
/// let hooks = Hooks::new()
///     .on_loading(|| async { Ok::<(), HookError>(()) })
///     .on_error(|err| async move { eprintln!("{err}") });
/// assert!(hooks.has(lazy_viewport::model::HookPhase::Loading));
/// ```
#[derive(Default)]
pub struct Hooks {
    on_loading: Option<Hook>,
    on_loaded: Option<Hook>,
    on_unload: Option<Hook>,
    on_error: Option<ErrorHook>,
}

fn boxed<F, Fut>(hook: F) -> Hook
where
    F: Fn() -> Fut + 'static,
    Fut: Future<Output = Result<(), HookError>> + 'static,
{
    Box::new(move || hook().boxed_local())
}

impl Hooks {
    /// No hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs when the element enters the viewport.
    pub fn on_loading<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = Result<(), HookError>> + 'static,
    {
        self.on_loading = Some(boxed(hook));
        self
    }

    /// Runs after `on_loading` resolved and the status became `Loaded`.
    pub fn on_loaded<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = Result<(), HookError>> + 'static,
    {
        self.on_loaded = Some(boxed(hook));
        self
    }

    /// Runs on reset.
    pub fn on_unload<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = Result<(), HookError>> + 'static,
    {
        self.on_unload = Some(boxed(hook));
        self
    }

    /// Receives failures of the other hooks.
    pub fn on_error<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(LoadHookError) -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        self.on_error = Some(Box::new(move |err| hook(err).boxed_local()));
        self
    }

    /// Whether a hook is set for `phase`.
    pub fn has(&self, phase: HookPhase) -> bool {
        self.slot(phase).is_some()
    }

    /// Whether `on_error` is set.
    pub fn has_error_handler(&self) -> bool {
        self.on_error.is_some()
    }

    /// Call the hook for `phase`, returning its future.
    pub(crate) fn invoke(&self, phase: HookPhase) -> Option<HookFuture> {
        self.slot(phase).map(|hook| hook())
    }

    /// Hand `err` to `on_error`. `None` when there is no handler.
    pub(crate) fn handle_error(&self, err: LoadHookError) -> Option<LocalBoxFuture<'static, ()>> {
        self.on_error.as_ref().map(|hook| hook(err))
    }

    fn slot(&self, phase: HookPhase) -> Option<&Hook> {
        match phase {
            HookPhase::Loading => self.on_loading.as_ref(),
            HookPhase::Loaded => self.on_loaded.as_ref(),
            HookPhase::Unload => self.on_unload.as_ref(),
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("on_loading", &self.on_loading.is_some())
            .field("on_loaded", &self.on_loaded.is_some())
            .field("on_unload", &self.on_unload.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}
