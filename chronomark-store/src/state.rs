//! Annotation store state.
//!
//! The state is an owned, serializable value. Its fields are private: the
//! reducer in [`crate::reducer`] is the only code that mutates them. The
//! annotation map and each dashboard's filter list sit behind `Arc` so the
//! selector cache can detect replacement by pointer identity.

use crate::action::RemoteDataState;
use chronomark_core::{Annotation, AnnotationId, DashboardId, TagFilter};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Map slot: `None` is a tombstone left by a delete.
pub type AnnotationSlots = HashMap<AnnotationId, Option<Annotation>>;

/// What the annotation overlay is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EditorMode {
    #[default]
    None,
    Adding,
    Editing,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnnotationState {
    pub(crate) mode: EditorMode,
    pub(crate) is_temp_hovering: bool,
    pub(crate) annotations: Arc<AnnotationSlots>,
    pub(crate) editing_annotation_id: Option<AnnotationId>,
    pub(crate) pending: BTreeSet<AnnotationId>,

    pub(crate) tag_filters: HashMap<DashboardId, Arc<Vec<TagFilter>>>,
    pub(crate) adding_tag_filter: Option<TagFilter>,
    pub(crate) tag_keys: Option<Vec<String>>,
    pub(crate) tag_values: HashMap<String, Vec<String>>,

    pub(crate) all_labels: Vec<String>,
    pub(crate) all_labels_status: RemoteDataState,
    pub(crate) selected_labels: HashMap<DashboardId, Vec<String>>,
}

impl AnnotationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn is_temp_hovering(&self) -> bool {
        self.is_temp_hovering
    }

    /// Every slot, tombstones included.
    pub fn annotations(&self) -> &AnnotationSlots {
        &self.annotations
    }

    /// The live record for `id`, if any.
    pub fn annotation(&self, id: &AnnotationId) -> Option<&Annotation> {
        self.annotations.get(id).and_then(Option::as_ref)
    }

    /// Whether `id` was known and has since been deleted.
    pub fn is_tombstoned(&self, id: &AnnotationId) -> bool {
        matches!(self.annotations.get(id), Some(None))
    }

    pub fn live_count(&self) -> usize {
        self.annotations.values().filter(|slot| slot.is_some()).count()
    }

    pub fn editing_annotation_id(&self) -> Option<&AnnotationId> {
        self.editing_annotation_id.as_ref()
    }

    pub fn is_pending(&self, id: &AnnotationId) -> bool {
        self.pending.contains(id)
    }

    pub fn pending(&self) -> impl Iterator<Item = &AnnotationId> {
        self.pending.iter()
    }

    /// The dashboard's filters in insertion order.
    pub fn tag_filters_for(&self, dashboard: DashboardId) -> &[TagFilter] {
        self.tag_filters
            .get(&dashboard)
            .map(|filters| filters.as_slice())
            .unwrap_or(&[])
    }

    pub fn adding_tag_filter(&self) -> Option<&TagFilter> {
        self.adding_tag_filter.as_ref()
    }

    /// `None` until keys have been fetched once this session.
    pub fn tag_keys(&self) -> Option<&[String]> {
        self.tag_keys.as_deref()
    }

    /// `None` until values for `tag_key` have been fetched once.
    pub fn tag_values(&self, tag_key: &str) -> Option<&[String]> {
        self.tag_values.get(tag_key).map(Vec::as_slice)
    }

    pub fn all_labels(&self) -> &[String] {
        &self.all_labels
    }

    pub fn all_labels_status(&self) -> RemoteDataState {
        self.all_labels_status
    }

    pub fn selected_labels(&self, dashboard: DashboardId) -> &[String] {
        self.selected_labels
            .get(&dashboard)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub(crate) fn annotations_handle(&self) -> &Arc<AnnotationSlots> {
        &self.annotations
    }

    pub(crate) fn tag_filters_handle(&self, dashboard: DashboardId) -> Option<&Arc<Vec<TagFilter>>> {
        self.tag_filters.get(&dashboard)
    }
}
