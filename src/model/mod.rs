//! Domain model types (pure).
//!
//! All types in this module are plain data: handles, geometry and errors.

pub mod error;
pub mod geometry;
pub mod identifiers;

// Re-export for convenience
pub use error::{
    ActivationError, HookError, HookPhase, InvalidOffsetError, LoadHookError,
};
pub use geometry::Rect;
pub use identifiers::{ElementId, Generation, ListenerId, TimerId};
