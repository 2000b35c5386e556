//! lazy-viewport
//!
//! Viewport-triggered lazy activation: watch an element, and the first time
//! it comes within an offset of its viewport, drive it through
//! `Unload → Loading → Loaded` with user hooks, cancellation and reset.
//!
//! The pieces, bottom-up:
//! - [`offset`] resolves offset shorthands into per-edge margins;
//! - [`host`] is the seam to the UI runtime, with [`host::SimHost`] in memory;
//! - [`engine`] detects viewport entry, by geometric polling or by pooled
//!   intersection observers;
//! - [`activation`] holds the state machine, its hooks, listener lifecycle
//!   and navigation-driven reset;
//! - [`config`], [`logging`] and [`scene`] serve the demo binary.

pub mod activation;
pub mod config;
pub mod engine;
pub mod host;
pub mod logging;
pub mod model;
pub mod offset;
pub mod scene;

#[cfg(test)]
mod test_harness;

#[cfg(test)]
mod tests;
