//! Internal test modules - whitebox scenario tests with crate access.
//!
//! Each scenario drives a real engine against a `SimHost` page through the
//! crate-private test harness.

mod activation_scenarios;
mod engine_strategies;
