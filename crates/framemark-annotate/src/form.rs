//! Form inputs of one annotation.

use std::collections::BTreeMap;

use framemark_core::{AnnotationRecord, Article, Error, Result, TaskConfig};
use serde::{Deserialize, Serialize};

/// Values of the annotation form, before they become a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormState {
    pub primary_label: String,
    /// Frame label -> present, one entry per configured label
    pub frames: BTreeMap<String, bool>,
    pub notes: String,
    pub flagged: bool,
}

impl FormState {
    /// Fresh form: configured primary default, every frame absent.
    pub fn defaults(config: &TaskConfig) -> Self {
        Self {
            primary_label: config.primary_label.default.clone(),
            frames: config
                .frame_labels
                .iter()
                .map(|l| (l.clone(), false))
                .collect(),
            notes: String::new(),
            flagged: config.flagged_default,
        }
    }

    /// Form restored from a stored record. Labels the record lacks fall
    /// back to their defaults.
    pub fn from_record(record: &AnnotationRecord, config: &TaskConfig) -> Self {
        let mut form = Self::defaults(config);
        if !record.primary_label.is_empty() {
            form.primary_label = record.primary_label.clone();
        }
        for (label, present) in form.frames.iter_mut() {
            *present = record.is_frame_present(label);
        }
        form.notes = record.notes.clone();
        form.flagged = record.flagged;
        form
    }

    /// Mark the given labels present and every other label absent.
    pub fn with_present_frames<S: AsRef<str>>(mut self, labels: &[S]) -> Self {
        for present in self.frames.values_mut() {
            *present = false;
        }
        for label in labels {
            self.frames.insert(label.as_ref().to_string(), true);
        }
        self
    }

    /// Reject values the configuration does not declare.
    pub fn validate(&self, config: &TaskConfig) -> Result<()> {
        if !config.primary_label.options.contains(&self.primary_label) {
            return Err(Error::InvalidInput(format!(
                "{} must be one of {:?}, got {:?}",
                config.primary_label.column, config.primary_label.options, self.primary_label
            )));
        }
        if let Some(unknown) = self
            .frames
            .keys()
            .find(|label| !config.frame_labels.contains(label))
        {
            return Err(Error::InvalidInput(format!("unknown frame label {:?}", unknown)));
        }
        Ok(())
    }

    /// Record for an article, denormalising its identifying text.
    pub fn into_record(self, user_id: &str, article: &Article) -> AnnotationRecord {
        AnnotationRecord {
            user_id: user_id.to_string(),
            article_index: article.index,
            primary_label: self.primary_label,
            notes: self.notes,
            flagged: self.flagged,
            frames: self.frames,
            uri: article.uri.clone(),
            original_text: article.original_text.clone(),
            translated_text: article.translated_text.clone(),
        }
    }
}
