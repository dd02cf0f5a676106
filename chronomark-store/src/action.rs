//! Transitions accepted by the annotation reducer.

use chronomark_core::{Annotation, AnnotationId, DashboardId, TagFilter};
use serde::{Deserialize, Serialize};

/// Loading status of remotely sourced data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RemoteDataState {
    #[default]
    NotStarted,
    Loading,
    Done,
    Error,
}

/// Every state transition of the annotation store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnnotationAction {
    // Adding flow
    BeginAdding,
    CommitAddingSuccess,
    CancelAdding,
    EnterTempHover,
    LeaveTempHover,

    // Annotation records
    /// Full replace after a range refetch.
    SetAnnotations(Vec<Annotation>),
    /// Merge an incremental load into the existing records.
    LoadAnnotations(Vec<Annotation>),
    AddAnnotation(Annotation),
    /// Upserts, except over a tombstone.
    UpdateAnnotation(Annotation),
    /// Tombstones the record's slot.
    DeleteAnnotation(Annotation),
    /// Replace an optimistic record with the server's copy in one step.
    ConfirmAnnotation {
        temp_id: AnnotationId,
        confirmed: Annotation,
    },
    SetAnnotationPending {
        id: AnnotationId,
        pending: bool,
    },

    // Editing
    SetEditingAnnotation(Option<AnnotationId>),

    // Tag filters
    CreateTagFilter(DashboardId, TagFilter),
    UpdateTagFilter(DashboardId, TagFilter),
    DeleteTagFilter(DashboardId, TagFilter),
    /// Upsert keyed by tag key: at most one filter per key per dashboard.
    SetTagFilter(DashboardId, TagFilter),
    RemoveTagFilter(DashboardId, String),
    SetAddingTagFilter(Option<TagFilter>),

    // Suggestion cache
    SetTagKeys(Vec<String>),
    SetTagValues {
        tag_key: String,
        values: Vec<String>,
    },

    // Labels
    ToggleLabel(DashboardId, String),
    LoadAnnotationLabels(Vec<String>),
    SetAnnotationLabelsStatus(RemoteDataState),
}

impl AnnotationAction {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            AnnotationAction::BeginAdding => "BeginAdding",
            AnnotationAction::CommitAddingSuccess => "CommitAddingSuccess",
            AnnotationAction::CancelAdding => "CancelAdding",
            AnnotationAction::EnterTempHover => "EnterTempHover",
            AnnotationAction::LeaveTempHover => "LeaveTempHover",
            AnnotationAction::SetAnnotations(_) => "SetAnnotations",
            AnnotationAction::LoadAnnotations(_) => "LoadAnnotations",
            AnnotationAction::AddAnnotation(_) => "AddAnnotation",
            AnnotationAction::UpdateAnnotation(_) => "UpdateAnnotation",
            AnnotationAction::DeleteAnnotation(_) => "DeleteAnnotation",
            AnnotationAction::ConfirmAnnotation { .. } => "ConfirmAnnotation",
            AnnotationAction::SetAnnotationPending { .. } => "SetAnnotationPending",
            AnnotationAction::SetEditingAnnotation(_) => "SetEditingAnnotation",
            AnnotationAction::CreateTagFilter(..) => "CreateTagFilter",
            AnnotationAction::UpdateTagFilter(..) => "UpdateTagFilter",
            AnnotationAction::DeleteTagFilter(..) => "DeleteTagFilter",
            AnnotationAction::SetTagFilter(..) => "SetTagFilter",
            AnnotationAction::RemoveTagFilter(..) => "RemoveTagFilter",
            AnnotationAction::SetAddingTagFilter(_) => "SetAddingTagFilter",
            AnnotationAction::SetTagKeys(_) => "SetTagKeys",
            AnnotationAction::SetTagValues { .. } => "SetTagValues",
            AnnotationAction::ToggleLabel(..) => "ToggleLabel",
            AnnotationAction::LoadAnnotationLabels(_) => "LoadAnnotationLabels",
            AnnotationAction::SetAnnotationLabelsStatus(_) => "SetAnnotationLabelsStatus",
        }
    }
}
