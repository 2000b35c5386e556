//! Configuration module.
//!
//! [`LazyConfig`] holds every option of a lazy element. The [`loader`]
//! submodule reads defaults for it from a TOML file, the environment and
//! the command line.

pub mod loader;

pub use loader::{
    apply_cli_overrides, apply_env_overrides, default_config_path, default_log_path,
    load_config_file, load_config_with_precedence, merge_config, ConfigError, ConfigFile,
    ResolvedConfig,
};

use crate::model::{ElementId, InvalidOffsetError};
use crate::offset::{self, EdgeOffsets, OffsetSpec};
use serde::Deserialize;
use std::str::FromStr;
use thiserror::Error;

/// A string that names no variant of a configuration enum.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    /// Which enum was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// What the intersection is computed against.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum RootSpec {
    /// The global viewport.
    #[default]
    Viewport,
    /// A known element.
    Element(ElementId),
    /// Resolved through `Host::query_selector` when the engine is built.
    Selector(String),
}

impl From<String> for RootSpec {
    fn from(value: String) -> Self {
        if value.is_empty() || value.eq_ignore_ascii_case("viewport") {
            RootSpec::Viewport
        } else {
            RootSpec::Selector(value)
        }
    }
}

/// How the wrapper renders before the content is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// The container is always shown and the content sees the status.
    Container,
    /// A placeholder stands in until the content is loaded.
    #[default]
    Placeholder,
}

impl FromStr for Mode {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "container" => Ok(Mode::Container),
            "placeholder" => Ok(Mode::Placeholder),
            _ => Err(ParseEnumError {
                kind: "mode",
                value: s.to_string(),
            }),
        }
    }
}

/// Intersection detection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Observer when the host supports it, polling otherwise.
    #[default]
    Auto,
    /// Rect math on scroll and resize.
    Polling,
    /// Pooled platform intersection primitives.
    Observer,
}

impl FromStr for Strategy {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Strategy::Auto),
            "polling" => Ok(Strategy::Polling),
            "observer" => Ok(Strategy::Observer),
            _ => Err(ParseEnumError {
                kind: "strategy",
                value: s.to_string(),
            }),
        }
    }
}

/// Options of one lazy element.
#[derive(Debug, Clone, PartialEq)]
pub struct LazyConfig {
    /// Margin added around the root before testing intersection.
    pub offset: OffsetSpec,
    /// What intersection is computed against.
    pub root: RootSpec,
    /// Raw margin string; supersedes `offset` when set.
    pub root_margin: Option<String>,
    /// Reset to `Unload` on every navigation notification.
    pub auto_reset: bool,
    /// How the wrapper renders before loading.
    pub mode: Mode,
    /// Coalescing interval for polling checks. Zero disables coalescing.
    pub throttle_interval_ms: u64,
    /// Debounce (trailing) rather than throttle.
    pub debounce: bool,
    /// Minimum intersection ratio for the observer strategy.
    pub threshold: f64,
    /// Detection strategy.
    pub strategy: Strategy,
}

impl Default for LazyConfig {
    fn default() -> Self {
        Self {
            offset: OffsetSpec::default(),
            root: RootSpec::Viewport,
            root_margin: None,
            auto_reset: false,
            mode: Mode::Placeholder,
            throttle_interval_ms: 250,
            debounce: true,
            threshold: 0.0,
            strategy: Strategy::Auto,
        }
    }
}

impl LazyConfig {
    /// The per-edge offsets both strategies use.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidOffsetError`] when the offset (or root margin) does
    /// not resolve.
    pub fn effective_offsets(&self) -> Result<EdgeOffsets, InvalidOffsetError> {
        match &self.root_margin {
            Some(margin) => offset::resolve(&OffsetSpec::Shorthand(margin.clone())),
            None => offset::resolve(&self.offset),
        }
    }
}
