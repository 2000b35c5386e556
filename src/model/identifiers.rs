//! Core handle newtypes.
//!
//! Handles are plain `Copy` integers. Holding one never keeps the
//! referenced host object alive, which is what lets registries key on
//! elements without owning them.

use std::fmt;

/// Handle to an element in the host's element tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u64);

impl ElementId {
    /// Wrap a raw value.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle to an event listener registered with the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Wrap a raw value.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw value.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Handle to a pending host timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

impl TimerId {
    /// Wrap a raw value.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw value.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Activation cycle counter.
///
/// Monotonically increasing; every reset and unmount advances it so that
/// continuations captured under an older value can detect they are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Generation(u64);

impl Generation {
    /// Wrap a raw value.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw value.
    pub fn get(self) -> u64 {
        self.0
    }

    /// The generation following this one.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen{}", self.0)
    }
}
