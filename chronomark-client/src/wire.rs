//! Wire format of the annotation service and the tag query proxy.
//!
//! The service exchanges RFC3339 timestamps; the store works in epoch
//! milliseconds. Conversion happens only here.

use chronomark_core::{
    opt_ms_to_rfc3339, opt_rfc3339_to_ms, Annotation, AnnotationId, AnnotationLinks, TimeError,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerAnnotation {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub links: AnnotationLinks,
}

impl ServerAnnotation {
    pub fn from_annotation(annotation: &Annotation) -> Result<Self, TimeError> {
        Ok(Self {
            id: annotation.id.as_str().to_string(),
            start_time: opt_ms_to_rfc3339(annotation.start_time)?,
            end_time: opt_ms_to_rfc3339(annotation.end_time)?,
            text: annotation.text.clone(),
            labels: annotation.labels.clone(),
            tags: annotation.tags.clone(),
            links: annotation.links.clone(),
        })
    }

    pub fn into_annotation(self) -> Result<Annotation, TimeError> {
        Ok(Annotation {
            id: AnnotationId::new(self.id),
            start_time: opt_rfc3339_to_ms(self.start_time.as_deref())?,
            end_time: opt_rfc3339_to_ms(self.end_time.as_deref())?,
            text: self.text,
            labels: self.labels,
            tags: self.tags,
            links: self.links,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListAnnotationsResponse {
    #[serde(default)]
    pub annotations: Vec<ServerAnnotation>,
}

/// Error body returned by the service on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerError {
    pub code: i64,
    pub message: String,
}

// ============================================================================
// TAG QUERY PROXY
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ProxyQuery {
    pub query: String,
    pub db: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub results: Vec<QueryResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub series: Vec<QuerySeries>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuerySeries {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub values: Vec<Vec<serde_json::Value>>,
}

impl QueryResponse {
    /// First error reported by any statement.
    pub fn error(&self) -> Option<&str> {
        self.results.iter().find_map(|r| r.error.as_deref())
    }

    /// String cells of `column` across every series, deduplicated and in
    /// first-seen order.
    pub fn column_strings(&self, column: usize) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let cells = self
            .results
            .iter()
            .flat_map(|r| r.series.iter())
            .flat_map(|s| s.values.iter())
            .filter_map(|row| row.get(column))
            .filter_map(|cell| cell.as_str());
        for cell in cells {
            if !out.iter().any(|seen| seen == cell) {
                out.push(cell.to_string());
            }
        }
        out
    }
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('\\', "\\\\").replace('"', "\\\""))
}

pub fn show_tag_keys_query(database: &str, measurement: &str) -> String {
    format!(
        "SHOW TAG KEYS ON {} FROM {}",
        quote_ident(database),
        quote_ident(measurement)
    )
}

pub fn show_tag_values_query(database: &str, measurement: &str, tag_key: &str) -> String {
    format!(
        "SHOW TAG VALUES ON {} FROM {} WITH KEY = {}",
        quote_ident(database),
        quote_ident(measurement),
        quote_ident(tag_key)
    )
}
