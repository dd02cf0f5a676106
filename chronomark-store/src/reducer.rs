//! The annotation state machine.
//!
//! `apply` is the only mutator of [`AnnotationState`]. Collections shared
//! with the selector cache are changed through `Arc::make_mut`, and only when
//! the action actually changes them, so an unchanged `Arc` means unchanged
//! content.

use crate::action::{AnnotationAction, RemoteDataState};
use crate::state::{AnnotationState, EditorMode};
use chronomark_core::{Annotation, AnnotationId, DashboardId, TagFilter, TEMP_ANNOTATION_ID};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Functional form of [`AnnotationState::apply`].
pub fn reduce(mut state: AnnotationState, action: AnnotationAction) -> AnnotationState {
    state.apply(action);
    state
}

impl AnnotationState {
    pub fn apply(&mut self, action: AnnotationAction) {
        match action {
            AnnotationAction::BeginAdding => {
                self.mode = EditorMode::Adding;
                self.is_temp_hovering = true;
                self.editing_annotation_id = None;
                self.upsert(Annotation::temp());
            }
            AnnotationAction::CommitAddingSuccess => {
                self.mode = EditorMode::None;
                self.is_temp_hovering = false;
                self.tombstone_temp();
            }
            AnnotationAction::CancelAdding => {
                self.mode = EditorMode::None;
                self.is_temp_hovering = false;
                self.tombstone_temp();
            }
            AnnotationAction::EnterTempHover => self.is_temp_hovering = true,
            AnnotationAction::LeaveTempHover => self.is_temp_hovering = false,

            AnnotationAction::SetAnnotations(list) => self.replace_annotations(list),
            AnnotationAction::LoadAnnotations(list) => {
                if !list.is_empty() {
                    let slots = Arc::make_mut(&mut self.annotations);
                    for annotation in list {
                        slots.insert(annotation.id.clone(), Some(annotation));
                    }
                }
            }
            AnnotationAction::AddAnnotation(annotation) => self.upsert(annotation),
            AnnotationAction::UpdateAnnotation(annotation) => self.update(annotation),
            AnnotationAction::DeleteAnnotation(annotation) => self.delete(&annotation.id),
            AnnotationAction::ConfirmAnnotation { temp_id, confirmed } => {
                self.confirm(temp_id, confirmed)
            }
            AnnotationAction::SetAnnotationPending { id, pending } => {
                if pending {
                    self.pending.insert(id);
                } else {
                    self.pending.remove(&id);
                }
            }

            AnnotationAction::SetEditingAnnotation(Some(id)) => {
                if self.mode == EditorMode::Adding {
                    self.is_temp_hovering = false;
                    self.tombstone_temp();
                }
                self.mode = EditorMode::Editing;
                self.editing_annotation_id = Some(id);
            }
            AnnotationAction::SetEditingAnnotation(None) => {
                self.editing_annotation_id = None;
                if self.mode == EditorMode::Editing {
                    self.mode = EditorMode::None;
                }
            }

            AnnotationAction::CreateTagFilter(dashboard, filter)
            | AnnotationAction::UpdateTagFilter(dashboard, filter) => {
                if filter.tag_key.is_empty() {
                    debug!(filter_id = %filter.id, "Ignoring tag filter without a key");
                    return;
                }
                let filters = self.filters_mut(dashboard);
                match filters.iter().position(|f| f.id == filter.id) {
                    Some(index) => filters[index] = filter,
                    None => filters.push(filter),
                }
            }
            AnnotationAction::DeleteTagFilter(dashboard, filter) => {
                self.retain_filters(dashboard, |f| f.id != filter.id);
            }
            AnnotationAction::SetTagFilter(dashboard, filter) => {
                if filter.tag_key.is_empty() {
                    debug!(filter_id = %filter.id, "Ignoring tag filter without a key");
                    return;
                }
                set_tag_filter(self.filters_mut(dashboard), filter);
            }
            AnnotationAction::RemoveTagFilter(dashboard, tag_key) => {
                self.retain_filters(dashboard, |f| f.tag_key != tag_key);
            }
            AnnotationAction::SetAddingTagFilter(filter) => self.adding_tag_filter = filter,

            AnnotationAction::SetTagKeys(keys) => self.tag_keys = Some(keys),
            AnnotationAction::SetTagValues { tag_key, values } => {
                self.tag_values.insert(tag_key, values);
            }

            AnnotationAction::ToggleLabel(dashboard, label) => {
                let selected = self.selected_labels.entry(dashboard).or_default();
                match selected.iter().position(|l| *l == label) {
                    Some(index) => {
                        selected.remove(index);
                    }
                    None => selected.push(label),
                }
            }
            AnnotationAction::LoadAnnotationLabels(mut labels) => {
                labels.sort();
                labels.dedup();
                self.all_labels = labels;
                self.all_labels_status = RemoteDataState::Done;
            }
            AnnotationAction::SetAnnotationLabelsStatus(status) => {
                self.all_labels_status = status;
            }
        }
    }

    fn upsert(&mut self, annotation: Annotation) {
        Arc::make_mut(&mut self.annotations).insert(annotation.id.clone(), Some(annotation));
    }

    /// A tombstoned slot stays tombstoned: an update that lands after the
    /// delete must not bring the record back.
    fn update(&mut self, annotation: Annotation) {
        if matches!(self.annotations.get(&annotation.id), Some(None)) {
            debug!(id = %annotation.id, "Ignoring update for deleted annotation");
            return;
        }
        self.upsert(annotation);
    }

    fn delete(&mut self, id: &AnnotationId) {
        if matches!(self.annotations.get(id), Some(Some(_))) {
            Arc::make_mut(&mut self.annotations).insert(id.clone(), None);
        }
        self.pending.remove(id);
        if self.editing_annotation_id.as_ref() == Some(id) {
            self.editing_annotation_id = None;
            if self.mode == EditorMode::Editing {
                self.mode = EditorMode::None;
            }
        }
    }

    fn tombstone_temp(&mut self) {
        let temp = AnnotationId::new(TEMP_ANNOTATION_ID);
        if matches!(self.annotations.get(&temp), Some(Some(_))) {
            Arc::make_mut(&mut self.annotations).insert(temp, None);
        }
    }

    fn replace_annotations(&mut self, list: Vec<Annotation>) {
        let temp = AnnotationId::new(TEMP_ANNOTATION_ID);
        let kept_temp = match (self.mode, self.annotations.get(&temp)) {
            (EditorMode::Adding, Some(Some(a))) => Some(a.clone()),
            _ => None,
        };

        let mut slots: HashMap<AnnotationId, Option<Annotation>> = list
            .into_iter()
            .map(|a| (a.id.clone(), Some(a)))
            .collect();
        if let Some(temp_annotation) = kept_temp {
            slots.insert(temp, Some(temp_annotation));
        }
        self.annotations = Arc::new(slots);
    }

    fn confirm(&mut self, temp_id: AnnotationId, confirmed: Annotation) {
        let confirmed_id = confirmed.id.clone();
        let slots = Arc::make_mut(&mut self.annotations);
        if temp_id != confirmed_id && slots.contains_key(&temp_id) {
            slots.insert(temp_id.clone(), None);
        }
        slots.insert(confirmed_id.clone(), Some(confirmed));

        if temp_id == confirmed_id {
            return;
        }
        if self.pending.remove(&temp_id) {
            self.pending.insert(confirmed_id.clone());
        }
        if self.editing_annotation_id.as_ref() == Some(&temp_id) {
            self.editing_annotation_id = Some(confirmed_id);
        }
    }

    fn filters_mut(&mut self, dashboard: DashboardId) -> &mut Vec<TagFilter> {
        Arc::make_mut(self.tag_filters.entry(dashboard).or_default())
    }

    fn retain_filters(&mut self, dashboard: DashboardId, keep: impl Fn(&TagFilter) -> bool) {
        if let Some(filters) = self.tag_filters.get_mut(&dashboard) {
            if filters.iter().any(|f| !keep(f)) {
                Arc::make_mut(filters).retain(|f| keep(f));
            }
        }
    }
}

/// Upsert keyed by tag key. The filter replaces the one holding its key, or
/// else the one holding its id, so a dashboard never carries two filters for
/// the same key nor two filters with the same id.
fn set_tag_filter(filters: &mut Vec<TagFilter>, filter: TagFilter) {
    let by_key = filters.iter().position(|f| f.tag_key == filter.tag_key);
    let by_id = filters.iter().position(|f| f.id == filter.id);

    match (by_key, by_id) {
        (Some(key_index), Some(id_index)) if key_index != id_index => {
            filters[key_index] = filter;
            filters.remove(id_index);
        }
        (Some(index), _) | (None, Some(index)) => filters[index] = filter,
        (None, None) => filters.push(filter),
    }
}
