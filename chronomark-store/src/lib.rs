//! Chronomark Store - Annotation State Machine
//!
//! The annotation store: actions, the reducer that is its only mutator,
//! memoized selectors, the dispatch seam used by async effects, plus the
//! debounced control logic that sits between widgets and the store.

pub mod action;
pub mod debounce;
pub mod events;
pub mod notifications;
pub mod reducer;
pub mod selectors;
pub mod state;
pub mod store;
pub mod tag_filter_control;

pub use action::{AnnotationAction, RemoteDataState};
pub use debounce::{DebounceKey, Debouncer, INPUT_DEBOUNCE, TOGGLE_FILTER_DEBOUNCE};
pub use events::StoreEvent;
pub use notifications::{Notification, NotificationAction, NotificationLevel};
pub use reducer::reduce;
pub use selectors::{
    annotations_matching_tag_filters, annotations_with_labels, distinct_labels,
    editing_annotation, selected_annotations, tag_filters, tags_from_tag_filters,
    temp_annotation, SelectorCache, TagMap,
};
pub use state::{AnnotationSlots, AnnotationState, EditorMode};
pub use store::{Dispatch, Store};
pub use tag_filter_control::{DraftState, TagFilterCommand, TagFilterCommit, TagFilterControl};
