//! Chronomark Core - Annotation Types
//!
//! Data model shared by every other crate: annotations, tag filters and their
//! identifiers, RFC3339 conversion, the viewport visibility filter and the
//! editor form. No I/O happens here.

pub mod annotation;
pub mod editor;
pub mod error;
pub mod identity;
pub mod tag_filter;
pub mod time;
pub mod visibility;

pub use annotation::{
    Annotation, AnnotationLinks, AnnotationRange, TEMP_ANNOTATION_ID, TEMP_ANNOTATION_TEXT,
};
pub use editor::{
    format_datetime, parse_datetime_input, AnnotationEditorForm, AnnotationKind, DATETIME_FORMAT,
};
pub use error::{CoreError, CoreResult, TagFilterTypeParseError, TimeError, ValidationError};
pub use identity::{AnnotationId, DashboardId, EpochMs, TagFilterId};
pub use tag_filter::{TagFilter, TagFilterType, TagMatcher, FILTER_TYPES};
pub use time::{
    fractional_ms_to_rfc3339, ms_to_rfc3339, opt_ms_to_rfc3339, opt_rfc3339_to_ms,
    rfc3339_to_ms, round_ms, MAX_RFC3339_MS, MIN_RFC3339_MS,
};
pub use visibility::{is_visible, visible_annotations, Viewport};
