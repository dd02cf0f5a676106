//! Temporal overlap predicate deciding which annotations belong to a chart
//! viewport.

use crate::annotation::Annotation;
use crate::identity::EpochMs;

/// Closed x-axis range `[x_start, x_end]` in epoch milliseconds.
///
/// `(0, 0)` means the chart has not computed a real range yet.
pub type Viewport = (EpochMs, EpochMs);

pub fn is_uninitialized(viewport: Viewport) -> bool {
    viewport == (0, 0)
}

/// Whether a single annotation is visible in an initialized viewport.
///
/// Annotations without both bounds are never visible. Points are visible
/// when inside the closed range, windows when they overlap it (boundaries
/// inclusive).
pub fn is_visible(viewport: Viewport, annotation: &Annotation) -> bool {
    let (x_start, x_end) = viewport;
    let Some((start, end)) = annotation.bounds() else {
        return false;
    };
    if start == end {
        return x_start <= start && start <= x_end;
    }
    !(end < x_start || x_end < start)
}

/// Annotations relevant to `viewport`, in input order.
pub fn visible_annotations(viewport: Viewport, annotations: &[Annotation]) -> Vec<&Annotation> {
    if is_uninitialized(viewport) {
        return Vec::new();
    }
    annotations
        .iter()
        .filter(|a| is_visible(viewport, a))
        .collect()
}
