//! Error types for lazy-viewport.
//!
//! # Error Hierarchy
//!
//! - [`ActivationError`] - returned when building an activation from configuration
//!   - [`InvalidOffsetError`] - malformed offset or root margin
//!   - `UnknownRoot` - a root selector the host cannot resolve
//! - [`LoadHookError`] - a load hook failed; routed to `on_error`, never returned
//!   - [`HookError`] - the payload a hook fails with
//! - `AbortCondition` - crate-private, see `activation::machine`
//!
//! # Recovery Strategy
//!
//! Configuration errors are programmer errors: they fail fast at build time
//! and are not retried. Hook failures are recoverable: the record stays at its
//! last successful status until an explicit `reset()` rearms it.

use std::fmt;
use thiserror::Error;

/// Top-level error raised while building an activation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ActivationError {
    /// The offset or root margin could not be parsed.
    #[error("Invalid offset: {0}")]
    InvalidOffset(#[from] InvalidOffsetError),

    /// The configured root selector matched no element.
    #[error("Root selector matched no element: {0}")]
    UnknownRoot(String),
}

/// Malformed offset / margin specification.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InvalidOffsetError {
    /// The specification contained no tokens.
    #[error("offset specification is empty")]
    Empty,

    /// More than four tokens were supplied.
    #[error("offset specification has {count} tokens, at most 4 are allowed")]
    TooManyTokens {
        /// Number of tokens found.
        count: usize,
    },

    /// A token is not a length (`10`, `10px`, `25%`).
    #[error("not a length: {token:?}")]
    InvalidToken {
        /// The offending token.
        token: String,
    },
}

/// Failure payload returned by a user hook.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct HookError {
    message: String,
}

impl HookError {
    /// Failure with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The message the hook failed with.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for HookError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for HookError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// The lifecycle hook that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPhase {
    /// `on_loading`.
    Loading,
    /// `on_loaded`.
    Loaded,
    /// `on_unload`.
    Unload,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HookPhase::Loading => "on_loading",
            HookPhase::Loaded => "on_loaded",
            HookPhase::Unload => "on_unload",
        };
        f.write_str(name)
    }
}

/// A hook failure, tagged with the phase that raised it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{phase} hook failed: {source}")]
pub struct LoadHookError {
    /// Which hook failed.
    pub phase: HookPhase,
    /// What the hook reported.
    #[source]
    pub source: HookError,
}

impl LoadHookError {
    /// Tag `source` with the phase that raised it.
    pub fn new(phase: HookPhase, source: HookError) -> Self {
        Self { phase, source }
    }
}
