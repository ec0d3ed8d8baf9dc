//! Per-user JSON session files.
//!
//! Sessions written by earlier versions of the tool store each annotation
//! flat, the way the ledger stores a row: the primary label under its column
//! name and frames as `{label}_present: "Present" | "Not Present"`. They may
//! also contain bare `NaN` for empty cells. Both are upgraded on load.

use std::fs;
use std::path::{Path, PathBuf};

use framemark_core::{
    defaults, parse_flag, validate_user_id, Result, SessionRepository, SessionState, TaskConfig,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::fs::atomic_write;

/// A JSON string literal, or a non-finite number token outside one.
static NON_FINITE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""(?:[^"\\]|\\.)*"|-?Infinity|NaN"#).expect("valid non-finite pattern")
});

/// Sessions stored as `{dir}/{user_id}_session.json`.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
    /// Key legacy annotations store the primary label under
    primary_column: String,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            primary_column: defaults::PRIMARY_COLUMN.to_string(),
        }
    }

    pub fn from_config(config: &TaskConfig) -> Self {
        Self::new(&config.session_dir).with_primary_column(&config.primary_label.column)
    }

    pub fn with_primary_column(mut self, column: impl Into<String>) -> Self {
        self.primary_column = column.into();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Session file for a user. Fails for ids that cannot be file names.
    pub fn path_for(&self, user_id: &str) -> Result<PathBuf> {
        validate_user_id(user_id)?;
        Ok(self
            .dir
            .join(format!("{}{}", user_id, defaults::SESSION_FILE_SUFFIX)))
    }
}

impl SessionRepository for FileSessionStore {
    fn load(&self, user_id: &str) -> Result<SessionState> {
        let path = self.path_for(user_id)?;

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(user_id, path = %path.display(), "No session yet, starting fresh");
                return Ok(SessionState::new(user_id));
            }
            Err(e) => {
                warn!(user_id, path = %path.display(), error = %e, "Session unreadable, starting fresh");
                return Ok(SessionState::new(user_id));
            }
        };

        let parsed = serde_json::from_str::<Value>(&replace_non_finite(&content)).and_then(|mut raw| {
            upgrade_legacy_session(&mut raw, &self.primary_column);
            serde_json::from_value::<SessionState>(raw)
        });

        match parsed {
            Ok(mut state) => {
                if state.user_id.is_empty() {
                    state.user_id = user_id.to_string();
                }
                debug!(
                    user_id,
                    current_index = state.current_index,
                    annotation_count = state.annotations.len(),
                    "Session loaded"
                );
                Ok(state)
            }
            Err(e) => {
                warn!(user_id, path = %path.display(), error = %e, "Session malformed, starting fresh");
                Ok(SessionState::new(user_id))
            }
        }
    }

    fn save(&self, user_id: &str, state: &SessionState) -> Result<()> {
        let path = self.path_for(user_id)?;
        let json = serde_json::to_vec_pretty(state)?;
        atomic_write(&path, &json)?;
        info!(
            user_id,
            current_index = state.current_index,
            annotation_count = state.annotations.len(),
            "Session saved"
        );
        Ok(())
    }
}

/// Replace `NaN` / `Infinity` tokens written by Python's `json.dump` with
/// `null`, leaving string contents alone.
fn replace_non_finite(content: &str) -> std::borrow::Cow<'_, str> {
    NON_FINITE.replace_all(content, |caps: &regex::Captures| {
        let token = &caps[0];
        if token.starts_with('"') {
            token.to_string()
        } else {
            "null".to_string()
        }
    })
}

/// Bring a session document into the current shape in place.
///
/// Null fields are dropped so they take their defaults. Annotations without
/// `primary_label` take it from `primary_column`; annotations without
/// `frames` collect them from `{label}_present` keys.
fn upgrade_legacy_session(raw: &mut Value, primary_column: &str) {
    let Some(session) = raw.as_object_mut() else {
        return;
    };
    session.retain(|_, v| !v.is_null());

    let Some(annotations) = session.get_mut("annotations").and_then(Value::as_array_mut) else {
        return;
    };
    for annotation in annotations.iter_mut().filter_map(Value::as_object_mut) {
        upgrade_legacy_annotation(annotation, primary_column);
    }
}

fn upgrade_legacy_annotation(annotation: &mut Map<String, Value>, primary_column: &str) {
    annotation.retain(|_, v| !v.is_null());

    if !annotation.contains_key("primary_label") {
        if let Some(Value::String(label)) = annotation.get(primary_column) {
            let label = label.clone();
            annotation.insert("primary_label".to_string(), Value::String(label));
        }
    }

    if !annotation.contains_key("frames") {
        let frames: Map<String, Value> = annotation
            .iter()
            .filter_map(|(key, value)| {
                let label = key.strip_suffix(defaults::PRESENT_SUFFIX)?;
                Some((label.to_string(), Value::Bool(is_present(value))))
            })
            .collect();
        if !frames.is_empty() {
            annotation.insert("frames".to_string(), Value::Object(frames));
        }
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.trim() == defaults::PRESENT || parse_flag(s),
        _ => false,
    }
}
