//! Offset / margin resolution.
//!
//! Turns a user-facing offset specification into per-edge [`EdgeOffsets`]
//! using CSS shorthand ordering:
//!
//! | tokens | top | right | bottom | left |
//! |--------|-----|-------|--------|------|
//! | 1      | a   | a     | a      | a    |
//! | 2      | a   | b     | a      | b    |
//! | 3      | a   | b     | c      | b    |
//! | 4      | a   | b     | c      | d    |

use crate::model::{InvalidOffsetError, Rect};
use serde::Deserialize;
use std::fmt;

/// A single length token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Length {
    /// Absolute pixels. Unitless numbers are pixels.
    Px(f64),
    /// Percentage of the root's height (top/bottom) or width (left/right).
    Percent(f64),
}

impl Length {
    /// Zero pixels.
    pub const ZERO: Length = Length::Px(0.0);

    /// Parse a token such as `10`, `-4px` or `25%`.
    pub fn parse(token: &str) -> Result<Self, InvalidOffsetError> {
        let invalid = || InvalidOffsetError::InvalidToken {
            token: token.to_string(),
        };

        let (number, make): (&str, fn(f64) -> Length) = if let Some(n) = token.strip_suffix('%') {
            (n, Length::Percent)
        } else if let Some(n) = token.strip_suffix("px") {
            (n, Length::Px)
        } else {
            (token, Length::Px)
        };

        let value: f64 = number.parse().map_err(|_| invalid())?;
        if !value.is_finite() {
            return Err(invalid());
        }
        Ok(make(value))
    }

    /// Resolve to pixels. `basis` is the dimension percentages refer to.
    pub fn to_px(self, basis: f64) -> f64 {
        match self {
            Length::Px(px) => px,
            Length::Percent(pct) => basis * pct / 100.0,
        }
    }
}

impl Default for Length {
    fn default() -> Self {
        Length::ZERO
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Length::Px(px) => write!(f, "{px}px"),
            Length::Percent(pct) => write!(f, "{pct}%"),
        }
    }
}

/// Per-edge offsets, always fully populated.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EdgeOffsets {
    /// Top edge.
    pub top: Length,
    /// Right edge.
    pub right: Length,
    /// Bottom edge.
    pub bottom: Length,
    /// Left edge.
    pub left: Length,
}

impl EdgeOffsets {
    /// Same length on every edge.
    pub fn uniform(length: Length) -> Self {
        Self {
            top: length,
            right: length,
            bottom: length,
            left: length,
        }
    }

    /// Canonical four-token margin string, e.g. `"1px 2px 3px 4px"`.
    ///
    /// Two offsets that resolve to the same edges format identically, so
    /// the result is usable as a pool key.
    pub fn to_root_margin(&self) -> String {
        format!("{} {} {} {}", self.top, self.right, self.bottom, self.left)
    }

    /// Expand `root` outward by these offsets.
    pub fn expand(&self, root: &Rect) -> Rect {
        let height = root.height();
        let width = root.width();
        root.expand(
            self.top.to_px(height),
            self.right.to_px(width),
            self.bottom.to_px(height),
            self.left.to_px(width),
        )
    }
}

impl fmt::Display for EdgeOffsets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_root_margin())
    }
}

/// User-facing offset specification.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawOffset")]
pub enum OffsetSpec {
    /// One length for every edge.
    Length(Length),
    /// Whitespace-separated tokens, e.g. `"10px 20px"`.
    Shorthand(String),
    /// Ordered sequence of 1 to 4 lengths.
    Sequence(Vec<Length>),
}

impl Default for OffsetSpec {
    fn default() -> Self {
        OffsetSpec::Length(Length::ZERO)
    }
}

impl From<Length> for OffsetSpec {
    fn from(length: Length) -> Self {
        OffsetSpec::Length(length)
    }
}

impl From<f64> for OffsetSpec {
    fn from(px: f64) -> Self {
        OffsetSpec::Length(Length::Px(px))
    }
}

impl From<&str> for OffsetSpec {
    fn from(shorthand: &str) -> Self {
        OffsetSpec::Shorthand(shorthand.to_string())
    }
}

impl From<Vec<f64>> for OffsetSpec {
    fn from(values: Vec<f64>) -> Self {
        OffsetSpec::Sequence(values.into_iter().map(Length::Px).collect())
    }
}

/// Serialized forms accepted in configuration files.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawOffset {
    Number(f64),
    Text(String),
    List(Vec<RawToken>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawToken {
    Number(f64),
    Text(String),
}

impl TryFrom<RawOffset> for OffsetSpec {
    type Error = InvalidOffsetError;

    fn try_from(raw: RawOffset) -> Result<Self, Self::Error> {
        match raw {
            RawOffset::Number(px) => Ok(OffsetSpec::Length(Length::Px(px))),
            RawOffset::Text(text) => Ok(OffsetSpec::Shorthand(text)),
            RawOffset::List(tokens) => tokens
                .into_iter()
                .map(|token| match token {
                    RawToken::Number(px) => Ok(Length::Px(px)),
                    RawToken::Text(text) => Length::parse(text.trim()),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(OffsetSpec::Sequence),
        }
    }
}

/// Resolve an offset specification into per-edge offsets.
///
/// # Errors
///
/// Returns [`InvalidOffsetError`] for zero tokens, more than four tokens,
/// or a token that is not a length.
pub fn resolve(spec: &OffsetSpec) -> Result<EdgeOffsets, InvalidOffsetError> {
    let tokens = match spec {
        OffsetSpec::Length(length) => vec![*length],
        OffsetSpec::Shorthand(text) => text
            .split_whitespace()
            .map(Length::parse)
            .collect::<Result<Vec<_>, _>>()?,
        OffsetSpec::Sequence(lengths) => lengths.clone(),
    };

    match tokens.as_slice() {
        [] => Err(InvalidOffsetError::Empty),
        [all] => Ok(EdgeOffsets::uniform(*all)),
        [vertical, horizontal] => Ok(EdgeOffsets {
            top: *vertical,
            right: *horizontal,
            bottom: *vertical,
            left: *horizontal,
        }),
        [top, horizontal, bottom] => Ok(EdgeOffsets {
            top: *top,
            right: *horizontal,
            bottom: *bottom,
            left: *horizontal,
        }),
        [top, right, bottom, left] => Ok(EdgeOffsets {
            top: *top,
            right: *right,
            bottom: *bottom,
            left: *left,
        }),
        more => Err(InvalidOffsetError::TooManyTokens { count: more.len() }),
    }
}

#[cfg(test)]
#[path = "offset_tests.rs"]
mod tests;
