//! Scripted pages for the demo binary.
//!
//! A scene is a TOML document describing a viewport, an element tree with
//! document-space layout, which elements are lazy, and a script of page
//! events to replay. [`runner::run`] drives it against a [`SimHost`].
//!
//! ```toml
//! [viewport]
//! width = 1024
//! height = 768
//!
//! [[elements]]
//! id = "hero"
//! rect = [0, 1000, 1024, 762]
//! lazy = { offset = "300px 0px", load_ms = 120 }
//!
//! [[steps]]
//! action = "scroll"
//! y = 600
//! ```
//!
//! [`SimHost`]: crate::host::SimHost

use crate::host::{Display, Overflow};
use crate::model::ActivationError;
use crate::offset::OffsetSpec;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod runner;

pub use runner::{run, SceneReport, Transition};

/// The scene bundled with the binary for `--demo`.
pub const DEMO_SCENE: &str = include_str!("../../demos/basic.toml");

/// Errors loading or running a scene.
#[derive(Debug, Error)]
pub enum SceneError {
    /// The scene file could not be read.
    #[error("Failed to read scene file at {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The document is not a valid scene.
    #[error("Invalid scene: {0}")]
    Parse(#[from] toml::de::Error),

    /// Two elements share an id.
    #[error("Duplicate element id '{0}'")]
    DuplicateId(String),

    /// A parent must be declared before its children.
    #[error("Element '{element}' names unknown parent '{parent}' (parents must come first)")]
    UnknownParent {
        /// The child element.
        element: String,
        /// The parent it names.
        parent: String,
    },

    /// A scroll step names an element that does not exist.
    #[error("Scroll step targets unknown element '{0}'")]
    UnknownTarget(String),

    /// A lazy element's configuration did not build.
    #[error("Cannot activate '{element}': {source}")]
    Activation {
        /// The lazy element.
        element: String,
        /// Why it did not build.
        #[source]
        source: ActivationError,
    },
}

/// Size of the simulated viewport. Defaults to 1024x768.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewportSpec {
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

impl Default for ViewportSpec {
    fn default() -> Self {
        Self {
            width: 1024.0,
            height: 768.0,
        }
    }
}

/// Per-element lazy options.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LazySpec {
    /// Overrides the configured offset.
    #[serde(default)]
    pub offset: OffsetSpec,
    /// Virtual duration of the element's `on_loading` hook.
    #[serde(default)]
    pub load_ms: u64,
    /// Reset on every `navigate` step.
    #[serde(default)]
    pub auto_reset: bool,
}

/// One element of the page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElementSpec {
    /// Unique name; `#id` selects it.
    pub id: String,
    /// Id of an element declared earlier.
    pub parent: Option<String>,
    /// `[x, y, width, height]` in document coordinates.
    pub rect: [f64; 4],
    /// `visible` unless set.
    #[serde(default)]
    pub overflow: Overflow,
    /// `block` unless set.
    #[serde(default)]
    pub display: Display,
    /// Present on elements that load lazily.
    pub lazy: Option<LazySpec>,
}

/// One scripted page event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Scroll the window, or the element named by `target`.
    Scroll {
        /// Scroll container id; the window when absent.
        target: Option<String>,
        /// Horizontal scroll offset.
        #[serde(default)]
        x: f64,
        /// Vertical scroll offset.
        y: f64,
    },
    /// Resize the viewport.
    Resize {
        /// New width.
        width: f64,
        /// New height.
        height: f64,
    },
    /// Let virtual time pass.
    AdvanceMs {
        /// Milliseconds to advance.
        ms: u64,
    },
    /// Notify navigation listeners.
    Navigate {
        /// The new location.
        location: String,
    },
}

/// A page and the script to replay on it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scene {
    /// Viewport size.
    #[serde(default)]
    pub viewport: ViewportSpec,
    /// Element tree, parents first.
    #[serde(default)]
    pub elements: Vec<ElementSpec>,
    /// Events replayed in order after mounting.
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scene {
    /// Parse and validate a scene document.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError`] for invalid TOML, duplicate ids, parents that
    /// are not declared earlier, or scroll targets that do not exist.
    pub fn parse(source: &str) -> Result<Self, SceneError> {
        let scene: Scene = toml::from_str(source)?;
        scene.validate()?;
        Ok(scene)
    }

    /// Read and parse the scene at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Read`] when the file cannot be read, otherwise
    /// as [`Scene::parse`].
    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let source = std::fs::read_to_string(path).map_err(|source| SceneError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&source)
    }

    /// The bundled demo page.
    ///
    /// # Errors
    ///
    /// Only if the bundled document is broken.
    pub fn demo() -> Result<Self, SceneError> {
        Self::parse(DEMO_SCENE)
    }

    /// Number of elements with a `lazy` table.
    pub fn lazy_count(&self) -> usize {
        self.elements.iter().filter(|e| e.lazy.is_some()).count()
    }

    fn validate(&self) -> Result<(), SceneError> {
        let mut seen = HashSet::new();
        for element in &self.elements {
            if let Some(parent) = &element.parent {
                if !seen.contains(parent.as_str()) {
                    return Err(SceneError::UnknownParent {
                        element: element.id.clone(),
                        parent: parent.clone(),
                    });
                }
            }
            if !seen.insert(element.id.as_str()) {
                return Err(SceneError::DuplicateId(element.id.clone()));
            }
        }
        for step in &self.steps {
            if let Step::Scroll {
                target: Some(target),
                ..
            } = step
            {
                if !seen.contains(target.as_str()) {
                    return Err(SceneError::UnknownTarget(target.clone()));
                }
            }
        }
        Ok(())
    }
}
