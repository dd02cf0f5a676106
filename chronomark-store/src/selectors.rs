//! Derived views over [`AnnotationState`].
//!
//! The free functions are pure. [`SelectorCache`] memoizes the hot ones on
//! the identity of the `Arc` they read, so repeated calls between
//! transitions return the same shared result.

use crate::state::{AnnotationSlots, AnnotationState};
use chronomark_core::{Annotation, DashboardId, TagFilter, TagFilterType};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// Tag key to value, used as the exact-match `tag` query of a range fetch.
pub type TagMap = BTreeMap<String, String>;

// ============================================================================
// PURE SELECTORS
// ============================================================================

/// Every live annotation, ordered by start time then id.
pub fn selected_annotations(state: &AnnotationState) -> Vec<Annotation> {
    collect_live(state.annotations())
}

fn collect_live(slots: &AnnotationSlots) -> Vec<Annotation> {
    let mut live: Vec<Annotation> = slots.values().flatten().cloned().collect();
    live.sort_by(|a, b| {
        a.start_time
            .cmp(&b.start_time)
            .then_with(|| a.id.cmp(&b.id))
    });
    live
}

pub fn tag_filters(state: &AnnotationState, dashboard: DashboardId) -> Vec<TagFilter> {
    state.tag_filters_for(dashboard).to_vec()
}

/// Only complete `==` filters contribute; the server cannot express the
/// other operators.
pub fn tags_from_tag_filters(filters: &[TagFilter]) -> TagMap {
    filters
        .iter()
        .filter(|f| f.filter_type == TagFilterType::Equals && !f.tag_key.is_empty())
        .map(|f| (f.tag_key.clone(), f.tag_value.clone()))
        .collect()
}

/// Annotations carrying every selected label. An empty selection keeps all.
pub fn annotations_with_labels<'a>(
    annotations: &'a [Annotation],
    selected_labels: &[String],
) -> Vec<&'a Annotation> {
    if selected_labels.is_empty() {
        return annotations.iter().collect();
    }
    annotations
        .iter()
        .filter(|a| selected_labels.iter().all(|label| a.has_label(label)))
        .collect()
}

/// Annotations whose tags satisfy every filter. Regexes compile once per call.
pub fn annotations_matching_tag_filters<'a>(
    annotations: &'a [Annotation],
    filters: &[TagFilter],
) -> Vec<&'a Annotation> {
    let matchers: Vec<_> = filters.iter().map(TagFilter::matcher).collect();
    annotations
        .iter()
        .filter(|a| matchers.iter().all(|m| m.matches(a.tags.as_ref())))
        .collect()
}

/// Sorted, deduplicated labels across `annotations`.
pub fn distinct_labels(annotations: &[Annotation]) -> Vec<String> {
    annotations
        .iter()
        .filter_map(|a| a.labels.as_ref())
        .flatten()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn editing_annotation(state: &AnnotationState) -> Option<&Annotation> {
    state
        .editing_annotation_id()
        .and_then(|id| state.annotation(id))
}

pub fn temp_annotation(state: &AnnotationState) -> Option<&Annotation> {
    state
        .annotations()
        .values()
        .flatten()
        .find(|a| a.is_temp())
}

// ============================================================================
// MEMOIZATION
// ============================================================================

struct Memo<K, V> {
    input: Arc<K>,
    output: Arc<V>,
}

struct FilterMemo {
    input: Arc<Vec<TagFilter>>,
    tags: Arc<TagMap>,
}

/// Caches selector results keyed by the identity of the input collection.
///
/// The cache keeps its inputs alive, so an `Arc` that compares equal by
/// pointer is guaranteed to hold the same content it was computed from.
#[derive(Default)]
pub struct SelectorCache {
    selected: Option<Memo<AnnotationSlots, Vec<Annotation>>>,
    filters: HashMap<DashboardId, FilterMemo>,
}

impl SelectorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_annotations(&mut self, state: &AnnotationState) -> Arc<Vec<Annotation>> {
        let input = state.annotations_handle();
        if let Some(memo) = &self.selected {
            if Arc::ptr_eq(&memo.input, input) {
                return Arc::clone(&memo.output);
            }
        }
        let output = Arc::new(collect_live(input));
        self.selected = Some(Memo {
            input: Arc::clone(input),
            output: Arc::clone(&output),
        });
        output
    }

    /// The dashboard's filters as a shared handle.
    pub fn tag_filters(&self, state: &AnnotationState, dashboard: DashboardId) -> Arc<Vec<TagFilter>> {
        match state.tag_filters_handle(dashboard) {
            Some(filters) => Arc::clone(filters),
            None => Arc::default(),
        }
    }

    pub fn tags_from_tag_filters(&mut self, state: &AnnotationState, dashboard: DashboardId) -> Arc<TagMap> {
        let Some(input) = state.tag_filters_handle(dashboard) else {
            self.filters.remove(&dashboard);
            return Arc::default();
        };
        if let Some(memo) = self.filters.get(&dashboard) {
            if Arc::ptr_eq(&memo.input, input) {
                return Arc::clone(&memo.tags);
            }
        }
        let tags = Arc::new(tags_from_tag_filters(input));
        self.filters.insert(
            dashboard,
            FilterMemo {
                input: Arc::clone(input),
                tags: Arc::clone(&tags),
            },
        );
        tags
    }
}
