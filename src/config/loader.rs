//! Configuration file loading with precedence handling.

use super::{LazyConfig, Mode, RootSpec, Strategy};
use crate::model::InvalidOffsetError;
use crate::offset::{self, OffsetSpec};
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "LAZY_VIEWPORT_CONFIG";
/// Environment override for [`LazyConfig::strategy`].
pub const STRATEGY_ENV: &str = "LAZY_VIEWPORT_STRATEGY";
/// Environment override for [`LazyConfig::throttle_interval_ms`].
pub const THROTTLE_ENV: &str = "LAZY_VIEWPORT_THROTTLE_MS";

/// Errors that can occur during config loading.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Config file path contains invalid UTF-8 or cannot be resolved.
    #[error("Invalid config path: {0}")]
    InvalidPath(String),

    /// Failed to read config file (file may not exist or have permission issues).
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError {
        /// Path that failed to read.
        path: PathBuf,
        /// Reason for failure.
        reason: String,
    },

    /// Config file contains invalid TOML syntax or an invalid value.
    #[error("Invalid TOML in {path}: {reason}")]
    ParseError {
        /// Path with invalid TOML.
        path: PathBuf,
        /// Parse error details.
        reason: String,
    },

    /// An environment variable holds a value that cannot be parsed.
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Parse error details.
        reason: String,
    },
}

/// TOML configuration file structure.
///
/// All fields are optional - if not specified, hardcoded defaults are used.
/// Corresponds to `~/.config/lazy-viewport/config.toml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Offset as a number, a shorthand string or an array.
    #[serde(default)]
    pub offset: Option<OffsetSpec>,

    /// `"viewport"` or a selector.
    #[serde(default)]
    pub root: Option<String>,

    /// Shorthand margin; supersedes `offset`.
    #[serde(default)]
    pub root_margin: Option<String>,

    /// Reset on navigation.
    #[serde(default)]
    pub auto_reset: Option<bool>,

    /// `"placeholder"` or `"container"`.
    #[serde(default)]
    pub mode: Option<Mode>,

    /// Polling coalescing interval in milliseconds.
    #[serde(default)]
    pub throttle_interval_ms: Option<u64>,

    /// Debounce rather than throttle.
    #[serde(default)]
    pub debounce: Option<bool>,

    /// Observer intersection threshold.
    #[serde(default)]
    pub threshold: Option<f64>,

    /// `"auto"`, `"polling"` or `"observer"`.
    #[serde(default)]
    pub strategy: Option<Strategy>,

    /// Path to log file for tracing output.
    #[serde(default)]
    pub log_file_path: Option<PathBuf>,
}

impl ConfigFile {
    /// Resolve `offset` and `root_margin` when present.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvalidOffsetError`] found.
    pub fn validate_offsets(&self) -> Result<(), InvalidOffsetError> {
        if let Some(offset) = &self.offset {
            offset::resolve(offset)?;
        }
        if let Some(margin) = &self.root_margin {
            offset::resolve(&OffsetSpec::Shorthand(margin.clone()))?;
        }
        Ok(())
    }
}

/// Resolved configuration after applying precedence rules.
///
/// Created by merging defaults, config file, env vars, and CLI args.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    /// Defaults for every lazy element.
    pub lazy: LazyConfig,
    /// Path to log file for tracing output.
    pub log_file_path: PathBuf,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            lazy: LazyConfig::default(),
            log_file_path: default_log_path(),
        }
    }
}

/// Resolve default log file path.
///
/// Returns `~/.local/state/lazy-viewport/lazy-viewport.log` on Unix-like
/// systems, or the platform equivalent. Falls back to the current directory
/// when no state directory is known.
pub fn default_log_path() -> PathBuf {
    if let Some(state_dir) = dirs::state_dir() {
        state_dir.join("lazy-viewport").join("lazy-viewport.log")
    } else {
        PathBuf::from("lazy-viewport.log")
    }
}

/// Load configuration file from a specific path.
///
/// Returns `Ok(None)` if file doesn't exist (not an error - use defaults).
///
/// # Errors
///
/// Returns error if file exists but has read or parse errors.
pub fn load_config_file(path: impl Into<PathBuf>) -> Result<Option<ConfigFile>, ConfigError> {
    let path = path.into();

    // Missing file is not an error - use defaults
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    let config: ConfigFile = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    // Offsets fail here, not when the first element is built.
    config.validate_offsets().map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    Ok(Some(config))
}

/// Resolve default config file path.
///
/// Returns `~/.config/lazy-viewport/config.toml` on Unix, appropriate path
/// on other platforms. Returns `None` if home directory cannot be determined.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("lazy-viewport").join("config.toml"))
}

/// Load configuration with precedence handling.
///
/// Precedence (highest to lowest):
/// 1. Explicit `config_path` argument (CLI `--config`)
/// 2. `LAZY_VIEWPORT_CONFIG` environment variable
/// 3. Default path `~/.config/lazy-viewport/config.toml`
///
/// Missing config files are NOT errors - defaults are used.
///
/// # Errors
///
/// Returns error only if a config file exists but cannot be read or parsed.
pub fn load_config_with_precedence(
    config_path: Option<PathBuf>,
) -> Result<Option<ConfigFile>, ConfigError> {
    if let Some(path) = config_path {
        return load_config_file(path);
    }

    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        return load_config_file(PathBuf::from(env_path));
    }

    if let Some(default_path) = default_config_path() {
        return load_config_file(default_path);
    }

    Ok(None)
}

/// Merge config file into defaults to create resolved config.
///
/// For each field in `ConfigFile`, if `Some(value)`, use it; otherwise use default.
pub fn merge_config(config_file: Option<ConfigFile>) -> ResolvedConfig {
    let defaults = ResolvedConfig::default();

    let Some(config) = config_file else {
        return defaults;
    };

    let lazy = defaults.lazy;
    ResolvedConfig {
        lazy: LazyConfig {
            offset: config.offset.unwrap_or(lazy.offset),
            root: config.root.map(RootSpec::from).unwrap_or(lazy.root),
            root_margin: config.root_margin.or(lazy.root_margin),
            auto_reset: config.auto_reset.unwrap_or(lazy.auto_reset),
            mode: config.mode.unwrap_or(lazy.mode),
            throttle_interval_ms: config
                .throttle_interval_ms
                .unwrap_or(lazy.throttle_interval_ms),
            debounce: config.debounce.unwrap_or(lazy.debounce),
            threshold: config.threshold.unwrap_or(lazy.threshold),
            strategy: config.strategy.unwrap_or(lazy.strategy),
        },
        log_file_path: config.log_file_path.unwrap_or(defaults.log_file_path),
    }
}

/// Apply environment variable overrides to resolved config.
///
/// Checks for:
/// - `LAZY_VIEWPORT_STRATEGY`: override strategy
/// - `LAZY_VIEWPORT_THROTTLE_MS`: override the polling interval
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] when a set variable does not parse.
pub fn apply_env_overrides(mut config: ResolvedConfig) -> Result<ResolvedConfig, ConfigError> {
    if let Ok(strategy) = std::env::var(STRATEGY_ENV) {
        config.lazy.strategy = strategy.parse().map_err(|e: super::ParseEnumError| {
            ConfigError::InvalidValue {
                key: STRATEGY_ENV.to_string(),
                reason: e.to_string(),
            }
        })?;
    }

    if let Ok(interval) = std::env::var(THROTTLE_ENV) {
        config.lazy.throttle_interval_ms =
            interval
                .trim()
                .parse()
                .map_err(|e: std::num::ParseIntError| ConfigError::InvalidValue {
                    key: THROTTLE_ENV.to_string(),
                    reason: e.to_string(),
                })?;
    }

    Ok(config)
}

/// Apply CLI argument overrides to resolved config.
///
/// CLI args have the highest precedence and override all other sources.
/// Only applies overrides for flags that were explicitly set by the user.
///
/// Precedence chain: Defaults → Config File → Env Vars → CLI Args (highest)
pub fn apply_cli_overrides(
    mut config: ResolvedConfig,
    strategy_override: Option<Strategy>,
    log_file_override: Option<PathBuf>,
) -> ResolvedConfig {
    if let Some(strategy) = strategy_override {
        config.lazy.strategy = strategy;
    }

    if let Some(path) = log_file_override {
        config.log_file_path = path;
    }

    config
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
