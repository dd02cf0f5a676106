//! Annotation entity

use crate::identity::{AnnotationId, EpochMs};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Id of the placeholder record inserted while the user places a new
/// annotation on a chart.
pub const TEMP_ANNOTATION_ID: &str = "tempAnnotation";

/// Default display text of the placeholder record.
pub const TEMP_ANNOTATION_TEXT: &str = "Name Me";

/// Links to the remote resource backing an annotation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnnotationLinks {
    /// Empty for records that have not been persisted yet.
    #[serde(rename = "self")]
    pub self_link: String,
}

impl AnnotationLinks {
    pub fn new(self_link: impl Into<String>) -> Self {
        Self {
            self_link: self_link.into(),
        }
    }

    pub fn is_persisted(&self) -> bool {
        !self.self_link.is_empty()
    }
}

/// A point or time-window marker attached to a time-series chart.
///
/// `start_time <= end_time` is not enforced here; the editor validates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: AnnotationId,
    pub start_time: Option<EpochMs>,
    pub end_time: Option<EpochMs>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
    pub links: AnnotationLinks,
}

impl Annotation {
    /// Create an unpersisted point annotation.
    pub fn point(id: impl Into<AnnotationId>, text: impl Into<String>, time: EpochMs) -> Self {
        Self::window(id, text, time, time)
    }

    /// Create an unpersisted window annotation.
    pub fn window(
        id: impl Into<AnnotationId>,
        text: impl Into<String>,
        start_time: EpochMs,
        end_time: EpochMs,
    ) -> Self {
        Self {
            id: id.into(),
            start_time: Some(start_time),
            end_time: Some(end_time),
            text: text.into(),
            labels: None,
            tags: None,
            links: AnnotationLinks::default(),
        }
    }

    /// The placeholder inserted when adding begins.
    pub fn temp() -> Self {
        Self {
            id: AnnotationId::new(TEMP_ANNOTATION_ID),
            start_time: None,
            end_time: None,
            text: TEMP_ANNOTATION_TEXT.to_string(),
            labels: None,
            tags: None,
            links: AnnotationLinks::default(),
        }
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_self_link(mut self, link: impl Into<String>) -> Self {
        self.links = AnnotationLinks::new(link);
        self
    }

    pub fn is_temp(&self) -> bool {
        self.id.as_str() == TEMP_ANNOTATION_ID
    }

    /// Both bounds known.
    pub fn bounds(&self) -> Option<(EpochMs, EpochMs)> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }

    pub fn is_point(&self) -> bool {
        matches!(self.bounds(), Some((start, end)) if start == end)
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels
            .as_deref()
            .is_some_and(|labels| labels.iter().any(|l| l == label))
    }
}

/// Time range of an annotation fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationRange {
    pub since: EpochMs,
    pub until: EpochMs,
}

impl AnnotationRange {
    pub fn new(since: EpochMs, until: EpochMs) -> Self {
        Self { since, until }
    }
}
