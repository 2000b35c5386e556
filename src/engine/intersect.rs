//! Clipped intersection of an element against a root rectangle.

use crate::host::{Display, Host};
use crate::model::{ElementId, Rect};

/// Whether the element and all of its ancestors are rendered.
pub fn is_rendered(host: &dyn Host, element: ElementId) -> bool {
    let mut current = Some(element);
    while let Some(id) = current {
        if host.style(id).display == Display::None {
            return false;
        }
        current = host.parent(id);
    }
    true
}

/// Visible part of `target` inside `root_rect`.
///
/// Starting from the target's bounding rect, intersects with every
/// overflow-clipping ancestor below `root` (exclusive), then with
/// `root_rect`. `root = None` means the walk runs to the top of the tree.
///
/// Returns `None` when:
/// - the target or an ancestor has `display: none`,
/// - a clipping ancestor has zero area,
/// - any step leaves no overlap.
///
/// Touching edges are an overlap of zero width or height, not `None`.
pub fn intersection_rect(
    host: &dyn Host,
    target: ElementId,
    root: Option<ElementId>,
    root_rect: &Rect,
) -> Option<Rect> {
    if !is_rendered(host, target) {
        return None;
    }

    let mut visible = host.bounding_rect(target)?;
    let mut parent = host.parent(target);

    while let Some(ancestor) = parent {
        if Some(ancestor) == root {
            break;
        }
        if host.style(ancestor).overflow.clips() {
            let clip = host.bounding_rect(ancestor)?;
            if clip.area() == 0.0 {
                return None;
            }
            visible = clip.intersect(&visible)?;
        }
        parent = host.parent(ancestor);
    }

    root_rect.intersect(&visible)
}
