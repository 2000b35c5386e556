//! Activation of lazy elements.
//!
//! An [`ActivationStateMachine`] owns one lazy element's lifecycle:
//! `Unload → Loading → Loaded`, driven by the first viewport signal of its
//! engine subscription and reversible through `reset()`.

use crate::config::Mode;
use crate::model::{ElementId, Generation, LoadHookError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

pub mod hooks;
pub mod lifecycle;
pub mod machine;
pub mod navigation;

pub use hooks::{HookFuture, Hooks};
pub use lifecycle::ListenerLifecycleManager;
pub use machine::{ActivationBuilder, ActivationStateMachine};
pub use navigation::{NavigationNotifier, NavigationSubscription};

/// Arbitrary properties forwarded untouched to the rendered content.
pub type Passthrough = BTreeMap<String, serde_json::Value>;

/// Load status of a lazy element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Not yet activated, or reset.
    #[default]
    Unload,
    /// `on_loading` is running.
    Loading,
    /// Content is ready.
    Loaded,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Unload => "unload",
            Status::Loading => "loading",
            Status::Loaded => "loaded",
        })
    }
}

/// Snapshot of a machine's state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActivationRecord {
    /// Current status.
    pub status: Status,
    /// `Some` only while mounted.
    pub element: Option<ElementId>,
    /// Bumped on every reset and on unmount.
    pub generation: Generation,
    /// Most recent hook failure that no `on_error` hook handled.
    pub last_failure: Option<LoadHookError>,
}

/// What the render callback receives on every status change.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderProps {
    /// Status being published.
    pub status: Status,
    /// Configured render mode.
    pub mode: Mode,
    /// Props forwarded untouched to the content.
    pub passthrough: Passthrough,
}

/// What the wrapper shows for a given mode and status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// Stand-in shown before the content is loaded.
    Placeholder,
    /// The content itself.
    Content,
    /// Container mode: the content is always shown and sees the status.
    Container(Status),
}

impl RenderProps {
    /// What to show for this mode and status.
    pub fn frame(&self) -> Frame {
        match (self.mode, self.status) {
            (Mode::Container, status) => Frame::Container(status),
            (Mode::Placeholder, Status::Loaded) => Frame::Content,
            (Mode::Placeholder, _) => Frame::Placeholder,
        }
    }
}
