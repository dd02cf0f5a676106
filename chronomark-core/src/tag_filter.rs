//! Tag filters: per-dashboard predicates over annotation tag sets.

use crate::error::TagFilterTypeParseError;
use crate::identity::TagFilterId;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Comparison operator of a tag filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TagFilterType {
    #[default]
    #[serde(rename = "==")]
    Equals,
    #[serde(rename = "!=")]
    NotEquals,
    #[serde(rename = "=~")]
    RegEquals,
    #[serde(rename = "!~")]
    RegNotEquals,
}

/// Fixed cycling order used by the filter type toggle.
pub const FILTER_TYPES: [TagFilterType; 4] = [
    TagFilterType::Equals,
    TagFilterType::NotEquals,
    TagFilterType::RegEquals,
    TagFilterType::RegNotEquals,
];

impl TagFilterType {
    pub fn as_operator(&self) -> &'static str {
        match self {
            TagFilterType::Equals => "==",
            TagFilterType::NotEquals => "!=",
            TagFilterType::RegEquals => "=~",
            TagFilterType::RegNotEquals => "!~",
        }
    }

    pub fn from_operator(s: &str) -> Result<Self, TagFilterTypeParseError> {
        match s.trim() {
            "==" => Ok(TagFilterType::Equals),
            "!=" => Ok(TagFilterType::NotEquals),
            "=~" => Ok(TagFilterType::RegEquals),
            "!~" => Ok(TagFilterType::RegNotEquals),
            _ => Err(TagFilterTypeParseError(s.to_string())),
        }
    }

    /// Next operator in [`FILTER_TYPES`], wrapping around.
    pub fn next(self) -> Self {
        let index = FILTER_TYPES
            .iter()
            .position(|t| *t == self)
            .unwrap_or(FILTER_TYPES.len() - 1);
        FILTER_TYPES[(index + 1) % FILTER_TYPES.len()]
    }

    pub fn is_regex(&self) -> bool {
        matches!(self, TagFilterType::RegEquals | TagFilterType::RegNotEquals)
    }
}

impl fmt::Display for TagFilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_operator())
    }
}

impl FromStr for TagFilterType {
    type Err = TagFilterTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_operator(s)
    }
}

/// A `(tag_key, filter_type, tag_value)` predicate scoped to one dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagFilter {
    pub id: TagFilterId,
    pub tag_key: String,
    pub tag_value: String,
    pub filter_type: TagFilterType,
}

impl TagFilter {
    pub fn new(
        id: impl Into<TagFilterId>,
        tag_key: impl Into<String>,
        filter_type: TagFilterType,
        tag_value: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            tag_key: tag_key.into(),
            tag_value: tag_value.into(),
            filter_type,
        }
    }

    /// Empty `==` filter with a fresh id, used by the "new filter" control.
    pub fn new_draft() -> Self {
        Self {
            id: TagFilterId::generate(),
            tag_key: String::new(),
            tag_value: String::new(),
            filter_type: TagFilterType::Equals,
        }
    }

    /// A filter with an empty key is incomplete and filters nothing.
    pub fn is_complete(&self) -> bool {
        !self.tag_key.is_empty()
    }

    pub fn matcher(&self) -> TagMatcher<'_> {
        TagMatcher::new(self)
    }

    /// Evaluate against a tag set. Prefer [`TagFilter::matcher`] when the same
    /// filter is applied to many annotations.
    pub fn matches(&self, tags: Option<&BTreeMap<String, String>>) -> bool {
        self.matcher().matches(tags)
    }
}

/// A tag filter with its regex compiled once.
#[derive(Debug)]
pub struct TagMatcher<'a> {
    filter: &'a TagFilter,
    regex: Option<Regex>,
    invalid_regex: bool,
}

impl<'a> TagMatcher<'a> {
    fn new(filter: &'a TagFilter) -> Self {
        let mut invalid_regex = false;
        let regex = if filter.filter_type.is_regex() && filter.is_complete() {
            match Regex::new(&filter.tag_value) {
                Ok(re) => Some(re),
                Err(err) => {
                    tracing::warn!(
                        tag_key = %filter.tag_key,
                        pattern = %filter.tag_value,
                        error = %err,
                        "Ignoring tag filter with invalid regex"
                    );
                    invalid_regex = true;
                    None
                }
            }
        } else {
            None
        };
        Self {
            filter,
            regex,
            invalid_regex,
        }
    }

    pub fn matches(&self, tags: Option<&BTreeMap<String, String>>) -> bool {
        if !self.filter.is_complete() || self.invalid_regex {
            return true;
        }
        let value = tags.and_then(|t| t.get(&self.filter.tag_key));
        match self.filter.filter_type {
            TagFilterType::Equals => value.is_some_and(|v| *v == self.filter.tag_value),
            TagFilterType::NotEquals => value.map_or(true, |v| *v != self.filter.tag_value),
            TagFilterType::RegEquals => self.regex_matches(value),
            TagFilterType::RegNotEquals => !self.regex_matches(value),
        }
    }

    fn regex_matches(&self, value: Option<&String>) -> bool {
        let value = value.map(String::as_str).unwrap_or("");
        self.regex.as_ref().is_some_and(|re| re.is_match(value))
    }
}
