//! Core data models for framemark.
//!
//! These types are shared across all framemark crates and represent the
//! articles being coded, the evidence cited for them, and the labels an
//! annotator records.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};

// =============================================================================
// ARTICLE TYPES
// =============================================================================

/// One model-suggested frame for an article (`frame_{n}_*` columns).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameSuggestion {
    /// 1-based frame slot (`frame_1` .. `frame_7`)
    pub number: usize,
    /// Frame name as written by the model (may be "NOT ..." or "None")
    pub name: String,
    /// Semicolon-separated evidence phrases
    pub evidence: String,
    pub rationale: String,
    /// Raw confidence cell; parsed lazily because upstream exports are dirty
    pub confidence: String,
}

impl FrameSuggestion {
    /// Tag used for this frame's evidence spans.
    pub fn evidence_tag(&self) -> String {
        evidence_tag(self.number)
    }
}

/// Evidence tag for a 1-based frame slot.
pub fn evidence_tag(number: usize) -> String {
    format!("frame_{}_evidence", number)
}

/// A news article row. Immutable once loaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Zero-based row position in the source table
    pub index: usize,
    pub uri: String,
    pub original_text: String,
    pub translated_text: String,
    /// Original text with title prepended, when the source provides it
    pub combined_text: String,
    pub llm_rationale: String,
    /// Semicolon-separated evidence phrases for the whole article
    pub llm_evidence: String,
    pub frames: Vec<FrameSuggestion>,
}

impl Article {
    /// Text shown in the "original" column.
    pub fn display_original(&self) -> &str {
        if self.combined_text.is_empty() {
            &self.original_text
        } else {
            &self.combined_text
        }
    }
}

/// A (tag, phrase) pair cited as support for a frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidencePhrase {
    pub tag: String,
    pub text: String,
}

impl EvidencePhrase {
    pub fn new(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            text: text.into(),
        }
    }
}

/// Half-open byte range `[start, end)` over a text body, labelled with a tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub tag: String,
}

impl Span {
    pub fn new(start: usize, end: usize, tag: impl Into<String>) -> Self {
        Self {
            start,
            end,
            tag: tag.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// True when the two ranges share at least one byte.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

// =============================================================================
// ANNOTATION TYPES
// =============================================================================

/// The labels one annotator assigned to one article.
///
/// Keyed by `(user_id, article_index)`; a later record with the same key
/// replaces the earlier one everywhere it is stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    #[serde(default)]
    pub user_id: String,
    pub article_index: usize,
    /// Value of the task's primary classification ("Yes", "Unsure", ...)
    #[serde(default)]
    pub primary_label: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default, deserialize_with = "bool_or_python_string")]
    pub flagged: bool,
    /// Frame label -> present
    #[serde(default)]
    pub frames: BTreeMap<String, bool>,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub original_text: String,
    #[serde(default)]
    pub translated_text: String,
}

impl AnnotationRecord {
    pub fn key(&self) -> (&str, usize) {
        (&self.user_id, self.article_index)
    }

    pub fn is_frame_present(&self, label: &str) -> bool {
        self.frames.get(label).copied().unwrap_or(false)
    }
}

/// Older session files store booleans as `"True"` / `"False"`.
fn bool_or_python_string<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolLike {
        Bool(bool),
        Text(String),
    }

    Ok(match BoolLike::deserialize(deserializer)? {
        BoolLike::Bool(b) => b,
        BoolLike::Text(s) => parse_flag(&s),
    })
}

/// Parse a boolean cell written by any of the tool's generations.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}

/// Render a boolean the way the ledger has always stored it.
pub fn format_flag(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// One user's position and accumulated labels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub current_index: usize,
    #[serde(default)]
    pub annotations: Vec<AnnotationRecord>,
}

impl SessionState {
    /// Fresh state for a user seen for the first time.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            current_index: 0,
            annotations: Vec::new(),
        }
    }

    /// Stored record for an article, if the user already coded it.
    pub fn annotation_for(&self, article_index: usize) -> Option<&AnnotationRecord> {
        self.annotations
            .iter()
            .find(|a| a.article_index == article_index)
    }

    /// Replace any record for the same article, then append.
    pub fn upsert_annotation(&mut self, record: AnnotationRecord) {
        self.annotations
            .retain(|a| a.article_index != record.article_index);
        self.annotations.push(record);
    }
}

/// True for cells that carry no value: blank, or the `nan` placeholder
/// dataframe exports write for missing values.
pub fn is_missing_cell(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan")
}

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Check that a user id can safely name a file.
///
/// Rejects empty ids, path separators, `..`, and control characters.
pub fn validate_user_id(user_id: &str) -> Result<()> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("user id cannot be empty".to_string()));
    }
    if trimmed != user_id {
        return Err(Error::InvalidInput(format!(
            "user id has surrounding whitespace: {:?}",
            user_id
        )));
    }
    if user_id.contains(['/', '\\'])
        || user_id.contains("..")
        || user_id.chars().any(char::is_control)
    {
        return Err(Error::InvalidInput(format!(
            "user id cannot be used as a file name: {:?}",
            user_id
        )));
    }
    Ok(())
}
