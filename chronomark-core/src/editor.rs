//! Annotation editor form state.
//!
//! The form keeps the last *valid* value of every field next to the raw
//! text the user typed. Validation failures stay local: whenever any field
//! carries an error, [`AnnotationEditorForm::draft`] yields `None` and the
//! save action is blocked. Nothing here touches the store.

use crate::annotation::{Annotation, AnnotationLinks};
use crate::error::ValidationError;
use crate::identity::{AnnotationId, EpochMs};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Display format of the start/end inputs (UTC).
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

const INPUT_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Whether the annotation marks an instant or a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Point,
    Window,
}

/// Format epoch milliseconds for an input field.
pub fn format_datetime(ms: EpochMs) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|dt| dt.format(DATETIME_FORMAT).to_string())
        .unwrap_or_default()
}

/// Parse a user-typed date. Accepts the display format (with or without
/// fractional seconds), RFC3339, and a bare `YYYY-MM-DD`.
pub fn parse_datetime_input(input: &str) -> Option<EpochMs> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.timestamp_millis());
    }
    for format in INPUT_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp_millis())
}

#[derive(Debug, Clone)]
pub struct AnnotationEditorForm {
    id: AnnotationId,
    links: AnnotationLinks,
    tags: Option<BTreeMap<String, String>>,
    original_end: EpochMs,
    kind: AnnotationKind,

    // Last valid state
    text: String,
    start_time: EpochMs,
    end_time: EpochMs,
    labels: Vec<String>,

    // Current input
    start_input: String,
    end_input: String,

    text_error: Option<ValidationError>,
    start_error: Option<ValidationError>,
    end_error: Option<ValidationError>,
}

impl AnnotationEditorForm {
    pub fn new(annotation: &Annotation) -> Self {
        let start = annotation.start_time.unwrap_or_default();
        let end = annotation.end_time.unwrap_or(start);
        let kind = if start == end {
            AnnotationKind::Point
        } else {
            AnnotationKind::Window
        };
        let text_error = annotation
            .text
            .is_empty()
            .then_some(ValidationError::EmptyText);
        Self {
            id: annotation.id.clone(),
            links: annotation.links.clone(),
            tags: annotation.tags.clone(),
            original_end: end,
            kind,
            text: annotation.text.clone(),
            start_time: start,
            end_time: end,
            labels: annotation.labels.clone().unwrap_or_default(),
            start_input: format_datetime(start),
            end_input: format_datetime(end),
            text_error,
            start_error: None,
            end_error: None,
        }
    }

    pub fn kind(&self) -> AnnotationKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn start_input(&self) -> &str {
        &self.start_input
    }

    pub fn end_input(&self) -> &str {
        &self.end_input
    }

    pub fn text_error(&self) -> Option<ValidationError> {
        self.text_error
    }

    pub fn start_error(&self) -> Option<ValidationError> {
        self.start_error
    }

    pub fn end_error(&self) -> Option<ValidationError> {
        self.end_error
    }

    pub fn has_errors(&self) -> bool {
        self.text_error.is_some() || self.start_error.is_some() || self.end_error.is_some()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.text_error = self.text.is_empty().then_some(ValidationError::EmptyText);
    }

    /// Switching to a window restores the annotation's original end time and
    /// re-validates it against the current start.
    pub fn set_kind(&mut self, kind: AnnotationKind) {
        self.kind = kind;
        if kind == AnnotationKind::Window {
            self.end_input = format_datetime(self.original_end);
            self.end_error = None;
            self.commit_end_time();
        }
    }

    /// Record raw input; the commit is expected to be debounced by the caller.
    pub fn set_start_input(&mut self, input: impl Into<String>) {
        self.start_input = input.into();
        self.start_error = None;
    }

    pub fn commit_start_time(&mut self) {
        match parse_datetime_input(&self.start_input) {
            Some(start) => {
                self.start_time = start;
                self.start_error = None;
                self.revalidate_end();
            }
            None => self.start_error = Some(ValidationError::BadDateTime),
        }
    }

    /// Normalize the input text when it holds a valid date.
    pub fn blur_start_input(&mut self) {
        if let Some(ms) = parse_datetime_input(&self.start_input) {
            self.start_input = format_datetime(ms);
        }
    }

    pub fn set_end_input(&mut self, input: impl Into<String>) {
        self.end_input = input.into();
        self.end_error = None;
    }

    pub fn commit_end_time(&mut self) {
        match parse_datetime_input(&self.end_input) {
            None => self.end_error = Some(ValidationError::BadDateTime),
            Some(end) if end < self.start_time => {
                self.end_error = Some(ValidationError::EndBeforeStart)
            }
            Some(end) => {
                self.end_time = end;
                self.end_error = None;
            }
        }
    }

    pub fn blur_end_input(&mut self) {
        if let Some(ms) = parse_datetime_input(&self.end_input) {
            self.end_input = format_datetime(ms);
        }
    }

    /// Replace all labels. Rejected, leaving the form untouched, when the new
    /// set contains duplicates.
    pub fn set_labels(&mut self, labels: Vec<String>) -> Result<(), ValidationError> {
        let unique: HashSet<&String> = labels.iter().collect();
        if unique.len() != labels.len() {
            return Err(ValidationError::DuplicateLabel);
        }
        self.labels = labels;
        Ok(())
    }

    /// Append a label typed into the label input. Empty input is ignored.
    pub fn add_label(&mut self, input: &str) -> Result<(), ValidationError> {
        if input.is_empty() {
            return Ok(());
        }
        let mut labels = self.labels.clone();
        labels.push(input.to_string());
        self.set_labels(labels)
    }

    pub fn remove_label(&mut self, label: &str) {
        self.labels.retain(|l| l != label);
    }

    /// Backspace on an empty label input.
    pub fn delete_last_label(&mut self) {
        self.labels.pop();
    }

    /// The annotation to save, or `None` while any field is invalid.
    pub fn draft(&self) -> Option<Annotation> {
        if self.has_errors() {
            return None;
        }
        let end_time = match self.kind {
            AnnotationKind::Window => self.end_time,
            AnnotationKind::Point => self.start_time,
        };
        Some(Annotation {
            id: self.id.clone(),
            start_time: Some(self.start_time),
            end_time: Some(end_time),
            text: self.text.clone(),
            labels: Some(self.labels.clone()),
            tags: self.tags.clone(),
            links: self.links.clone(),
        })
    }

    fn revalidate_end(&mut self) {
        if self.kind != AnnotationKind::Window {
            return;
        }
        match self.end_error {
            None if self.end_time < self.start_time => {
                self.end_error = Some(ValidationError::EndBeforeStart)
            }
            Some(ValidationError::EndBeforeStart) => self.commit_end_time(),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: EpochMs = 1_514_764_800_000; // 2018-01-01T00:00:00Z

    fn window() -> Annotation {
        Annotation::window("a", "outage", T0, T0 + 60_000).with_self_link("/annotations/a")
    }

    #[test]
    fn test_format_and_parse_inputs() {
        assert_eq!(format_datetime(T0 + 5), "2018-01-01 00:00:00.005");
        assert_eq!(parse_datetime_input("2018-01-01 00:00:00.005"), Some(T0 + 5));
        assert_eq!(parse_datetime_input("2018-01-01 00:00:00"), Some(T0));
        assert_eq!(parse_datetime_input("2018-01-01T00:00:00Z"), Some(T0));
        assert_eq!(parse_datetime_input("2018-01-01"), Some(T0));
        assert_eq!(parse_datetime_input("not a date"), None);
        assert_eq!(parse_datetime_input("   "), None);
    }

    #[test]
    fn test_unchanged_form_drafts_original() {
        let form = AnnotationEditorForm::new(&window());
        let draft = form.draft().unwrap();
        assert_eq!(draft.start_time, Some(T0));
        assert_eq!(draft.end_time, Some(T0 + 60_000));
        assert_eq!(draft.links.self_link, "/annotations/a");
        assert_eq!(form.kind(), AnnotationKind::Window);
    }

    #[test]
    fn test_draft_keeps_tags() {
        let original = window().with_tag("host", "web1");
        let mut form = AnnotationEditorForm::new(&original);
        form.set_text("renamed");
        let draft = form.draft().unwrap();
        assert_eq!(draft.tags, original.tags);
        assert_eq!(draft.text, "renamed");

        let untagged = AnnotationEditorForm::new(&window()).draft().unwrap();
        assert_eq!(untagged.tags, None);
    }

    #[test]
    fn test_empty_text_blocks_draft() {
        let mut form = AnnotationEditorForm::new(&window());
        form.set_text("");
        assert_eq!(form.text_error(), Some(ValidationError::EmptyText));
        assert!(form.draft().is_none());
        form.set_text("fixed");
        assert!(form.draft().is_some());
    }

    #[test]
    fn test_bad_start_date_blocks_draft() {
        let mut form = AnnotationEditorForm::new(&window());
        form.set_start_input("garbage");
        assert!(form.start_error().is_none());
        form.commit_start_time();
        assert_eq!(form.start_error(), Some(ValidationError::BadDateTime));
        assert!(form.draft().is_none());
    }

    #[test]
    fn test_end_before_start_rejected() {
        let mut form = AnnotationEditorForm::new(&window());
        form.set_end_input(format_datetime(T0 - 1));
        form.commit_end_time();
        assert_eq!(form.end_error(), Some(ValidationError::EndBeforeStart));
        assert!(form.draft().is_none());
    }

    #[test]
    fn test_moving_start_past_end_flags_end() {
        let mut form = AnnotationEditorForm::new(&window());
        form.set_start_input(format_datetime(T0 + 120_000));
        form.commit_start_time();
        assert_eq!(form.end_error(), Some(ValidationError::EndBeforeStart));

        form.set_start_input(format_datetime(T0));
        form.commit_start_time();
        assert_eq!(form.end_error(), None);
        assert!(form.draft().is_some());
    }

    #[test]
    fn test_point_kind_collapses_end() {
        let mut form = AnnotationEditorForm::new(&window());
        form.set_kind(AnnotationKind::Point);
        let draft = form.draft().unwrap();
        assert_eq!(draft.start_time, draft.end_time);
    }

    #[test]
    fn test_switching_back_to_window_restores_end() {
        let point = Annotation::point("p", "deploy", T0);
        let mut form = AnnotationEditorForm::new(&point);
        assert_eq!(form.kind(), AnnotationKind::Point);
        form.set_kind(AnnotationKind::Window);
        assert_eq!(form.end_input(), format_datetime(T0));
        assert!(form.draft().is_some());
    }

    #[test]
    fn test_blur_normalizes_valid_input() {
        let mut form = AnnotationEditorForm::new(&window());
        form.set_start_input("2018-01-01T00:00:00Z");
        form.blur_start_input();
        assert_eq!(form.start_input(), "2018-01-01 00:00:00.000");

        form.set_start_input("nope");
        form.blur_start_input();
        assert_eq!(form.start_input(), "nope");
    }

    #[test]
    fn test_duplicate_labels_rejected() {
        let mut form = AnnotationEditorForm::new(&window());
        form.add_label("prod").unwrap();
        assert_eq!(form.add_label("prod"), Err(ValidationError::DuplicateLabel));
        form.add_label("").unwrap();
        assert_eq!(form.labels(), ["prod".to_string()]);
    }

    #[test]
    fn test_label_removal() {
        let mut form = AnnotationEditorForm::new(&window().with_labels(["a", "b", "c"]));
        form.remove_label("b");
        form.delete_last_label();
        assert_eq!(form.labels(), ["a".to_string()]);
        form.delete_last_label();
        form.delete_last_label();
        assert!(form.labels().is_empty());
    }
}
