//! Rectangle geometry in client (viewport) coordinates.

/// Axis-aligned rectangle described by its four edges.
///
/// # Invariants
/// A well-formed rect has `left <= right` and `top <= bottom`. Intersection
/// results always satisfy this; rects received from a host are trusted.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// Top edge.
    pub top: f64,
    /// Right edge.
    pub right: f64,
    /// Bottom edge.
    pub bottom: f64,
    /// Left edge.
    pub left: f64,
}

impl Rect {
    /// Build a rect from an origin and a size.
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            top: y,
            right: x + width,
            bottom: y + height,
            left: x,
        }
    }

    /// `right - left`; negative for a malformed rect.
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    /// `bottom - top`; negative for a malformed rect.
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Area, clamping negative extents to zero.
    pub fn area(&self) -> f64 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Overlap of two rects.
    ///
    /// Touching edges produce a zero-width or zero-height rect rather than
    /// `None`: an element whose top edge sits exactly on the viewport's
    /// bottom edge counts as intersecting.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let top = self.top.max(other.top);
        let bottom = self.bottom.min(other.bottom);
        let left = self.left.max(other.left);
        let right = self.right.min(other.right);

        if right - left >= 0.0 && bottom - top >= 0.0 {
            Some(Rect {
                top,
                right,
                bottom,
                left,
            })
        } else {
            None
        }
    }

    /// Grow the rect outward by the given per-edge amounts.
    ///
    /// Negative amounts shrink it.
    #[must_use]
    pub fn expand(&self, top: f64, right: f64, bottom: f64, left: f64) -> Rect {
        Rect {
            top: self.top - top,
            right: self.right + right,
            bottom: self.bottom + bottom,
            left: self.left - left,
        }
    }

    /// Shift the rect by `(dx, dy)`.
    #[must_use]
    pub fn translate(&self, dx: f64, dy: f64) -> Rect {
        Rect {
            top: self.top + dy,
            right: self.right + dx,
            bottom: self.bottom + dy,
            left: self.left + dx,
        }
    }
}
