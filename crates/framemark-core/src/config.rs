//! Task configuration.
//!
//! A deployment declares its label scheme and file locations once, in a
//! `TaskConfig`. Configuration can be loaded from:
//! - a TOML file (`--config`, `FRAMEMARK_CONFIG`, or `./framemark.toml`)
//! - environment variables (`FRAMEMARK_*` prefixed) layered over defaults
//!
//! # Example
//!
//! ```rust,no_run
//! use framemark_core::config::TaskConfig;
//!
//! // Load from the default locations or fall back to env vars
//! let config = TaskConfig::load(None).expect("Failed to load config");
//!
//! // Or explicitly from a file
//! let config = TaskConfig::from_file(std::path::Path::new("framemark.toml")).expect("Failed to load");
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::defaults;
use crate::error::{Error, Result};

static ENV_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("valid env reference pattern"));

/// The single-choice classification every record carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrimaryLabelConfig {
    /// Ledger column holding the value
    pub column: String,
    pub options: Vec<String>,
    /// Preselected value on a fresh record
    pub default: String,
}

impl Default for PrimaryLabelConfig {
    fn default() -> Self {
        Self {
            column: defaults::PRIMARY_COLUMN.to_string(),
            options: defaults::PRIMARY_OPTIONS.iter().map(|s| s.to_string()).collect(),
            default: defaults::PRIMARY_DEFAULT.to_string(),
        }
    }
}

/// Approximate evidence matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzyConfig {
    pub enabled: bool,
    /// Minimum similarity ratio in `(0, 1]`
    pub threshold: f32,
    /// Extra words tried on either side of the phrase length
    pub slack: usize,
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::FUZZY_ENABLED,
            threshold: defaults::FUZZY_THRESHOLD,
            slack: defaults::FUZZY_SLACK_WORDS,
        }
    }
}

/// Everything a deployment of the annotation tool needs to know.
/// Built-in deployment presets a config file starts from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    /// Seven frame labels plus the `political_corruption` Yes/No label
    #[default]
    FinalSample,
    /// No frames, four-way `tentative_label`
    Screening,
}

impl Profile {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "final_sample" | "final" | "default" => Ok(Profile::FinalSample),
            "screening" => Ok(Profile::Screening),
            other => Err(Error::Config(format!(
                "unknown profile {:?} (expected final_sample or screening)",
                other
            ))),
        }
    }

    /// Configuration the profile starts from before file and env values.
    pub fn base(self) -> TaskConfig {
        match self {
            Profile::FinalSample => TaskConfig::default(),
            Profile::Screening => TaskConfig::screening(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    /// Preset the remaining fields default to
    pub profile: Profile,
    pub session_dir: PathBuf,
    pub ledger_path: PathBuf,
    /// Directories that receive a copy of the ledger after every save
    pub mirror_dirs: Vec<PathBuf>,
    /// Target directory of `sync`
    pub sync_dir: Option<PathBuf>,
    /// Article source used for users without an entry in `datasets`
    pub default_dataset: Option<PathBuf>,
    /// User id -> article source
    pub datasets: BTreeMap<String, PathBuf>,
    /// Declared frame labels, in display and column order
    pub frame_labels: Vec<String>,
    pub primary_label: PrimaryLabelConfig,
    pub flagged_default: bool,
    pub fuzzy: FuzzyConfig,
    pub key_terms: Vec<String>,
    /// Colour for `frame_{n}_evidence`, indexed by `n - 1`
    pub frame_colors: Vec<String>,
    pub llm_evidence_color: String,
    pub keyword_color: String,
    pub low_confidence_threshold: f64,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            profile: Profile::FinalSample,
            session_dir: PathBuf::from(defaults::SESSION_DIR),
            ledger_path: PathBuf::from(defaults::LEDGER_PATH),
            mirror_dirs: Vec::new(),
            sync_dir: None,
            default_dataset: None,
            datasets: BTreeMap::new(),
            frame_labels: defaults::FRAME_LABELS.iter().map(|s| s.to_string()).collect(),
            primary_label: PrimaryLabelConfig::default(),
            flagged_default: defaults::FLAGGED_DEFAULT,
            fuzzy: FuzzyConfig::default(),
            key_terms: defaults::KEY_TERMS.iter().map(|s| s.to_string()).collect(),
            frame_colors: defaults::FRAME_COLORS.iter().map(|s| s.to_string()).collect(),
            llm_evidence_color: defaults::LLM_EVIDENCE_COLOR.to_string(),
            keyword_color: defaults::KEYWORD_COLOR.to_string(),
            low_confidence_threshold: defaults::LOW_CONFIDENCE_THRESHOLD,
        }
    }
}

impl TaskConfig {
    /// Screening profile: no frames, four-way relevance label.
    pub fn screening() -> Self {
        Self {
            profile: Profile::Screening,
            session_dir: PathBuf::from("sessions"),
            ledger_path: PathBuf::from("annotations.csv"),
            frame_labels: Vec::new(),
            primary_label: PrimaryLabelConfig {
                column: defaults::SCREENING_COLUMN.to_string(),
                options: defaults::SCREENING_OPTIONS
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                default: defaults::SCREENING_OPTIONS[0].to_string(),
            },
            ..Self::default()
        }
    }

    /// Load from an explicit path, else `FRAMEMARK_CONFIG`, else
    /// `./framemark.toml`, else environment variables over defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            info!(path = %path.display(), "Loading task config");
            return Self::from_file(path);
        }

        let path = env::var(defaults::ENV_CONFIG)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(defaults::CONFIG_FILE));

        if path.exists() {
            info!(path = %path.display(), "Loading task config");
            Self::from_file(&path)
        } else {
            debug!(
                path = %path.display(),
                "Config file not found, using environment variables"
            );
            let config = Self::from_env();
            config.validate()?;
            Ok(config)
        }
    }

    /// Load configuration from a TOML file, then apply environment overrides.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content, |key| env::var(key).ok())
    }

    /// Parse TOML content, resolving `${VAR}` references and `FRAMEMARK_*`
    /// overrides through `lookup`.
    ///
    /// Keys absent from the file keep the values of the selected profile
    /// (`profile` key, overridden by `FRAMEMARK_PROFILE`); tables such as
    /// `[primary_label]` are merged key by key.
    pub fn from_toml_str<F>(content: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let content = substitute_env_vars(content, &lookup);
        let file: toml::Table = toml::from_str(&content)?;

        let profile = match lookup(&format!("{}PROFILE", defaults::ENV_PREFIX)) {
            Some(v) => Profile::parse(&v)?,
            None => match file.get("profile") {
                Some(toml::Value::String(v)) => Profile::parse(v)?,
                Some(other) => {
                    return Err(Error::Config(format!("profile must be a string, got {}", other)))
                }
                None => Profile::default(),
            },
        };

        let mut merged = serde_json::to_value(profile.base())?;
        merge_values(&mut merged, serde_json::to_value(&file)?);
        if let Some(fields) = merged.as_object_mut() {
            fields.insert("profile".to_string(), serde_json::to_value(profile)?);
        }
        let mut config: TaskConfig = serde_json::from_value(merged)
            .map_err(|e| Error::Config(format!("invalid config: {}", e)))?;
        config.apply_overrides(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with `FRAMEMARK_*` environment overrides applied.
    ///
    /// Malformed numeric overrides are ignored, matching the lenient
    /// behavior of the rest of the env handling.
    pub fn from_env() -> Self {
        let profile = env::var(format!("{}PROFILE", defaults::ENV_PREFIX))
            .ok()
            .and_then(|v| match Profile::parse(&v) {
                Ok(p) => Some(p),
                Err(e) => {
                    debug!(error = %e, "Ignoring malformed profile override");
                    None
                }
            })
            .unwrap_or_default();
        let mut config = profile.base();
        if let Err(e) = config.apply_overrides(&|key: &str| env::var(key).ok()) {
            debug!(error = %e, "Ignoring malformed environment override");
        }
        config
    }

    fn apply_overrides<F>(&mut self, lookup: &F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", defaults::ENV_PREFIX, name));

        if let Some(v) = var("SESSION_DIR") {
            self.session_dir = PathBuf::from(v);
        }
        if let Some(v) = var("LEDGER_PATH") {
            self.ledger_path = PathBuf::from(v);
        }
        if let Some(v) = var("DEFAULT_DATASET") {
            self.default_dataset = Some(PathBuf::from(v));
        }
        if let Some(v) = var("SYNC_DIR") {
            self.sync_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = var("MIRROR_DIRS") {
            self.mirror_dirs = env::split_paths(&v).collect();
        }
        if let Some(v) = var("FUZZY") {
            self.fuzzy.enabled = crate::models::parse_flag(&v);
        }
        if let Some(v) = var("FUZZY_THRESHOLD") {
            self.fuzzy.threshold = v.trim().parse().map_err(|_| {
                Error::Config(format!("FRAMEMARK_FUZZY_THRESHOLD is not a number: {}", v))
            })?;
        }
        if let Some(v) = var("FLAGGED_DEFAULT") {
            self.flagged_default = crate::models::parse_flag(&v);
        }
        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for label in &self.frame_labels {
            if label.trim().is_empty() {
                return Err(Error::Config("frame label cannot be empty".to_string()));
            }
            if !seen.insert(label.as_str()) {
                return Err(Error::Config(format!("duplicate frame label: {}", label)));
            }
        }

        if self.primary_label.column.trim().is_empty() {
            return Err(Error::Config(
                "primary_label.column cannot be empty".to_string(),
            ));
        }
        if !self.primary_label.options.is_empty()
            && !self
                .primary_label
                .options
                .contains(&self.primary_label.default)
        {
            return Err(Error::Config(format!(
                "primary_label.default {:?} is not one of {:?}",
                self.primary_label.default, self.primary_label.options
            )));
        }

        if !(self.fuzzy.threshold > 0.0 && self.fuzzy.threshold <= 1.0) {
            return Err(Error::Config(format!(
                "fuzzy.threshold must be in (0, 1], got {}",
                self.fuzzy.threshold
            )));
        }

        Ok(())
    }

    /// Fixed ledger header for this deployment.
    pub fn ledger_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = ["user_id", "article_index", "notes", "flagged"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        columns.extend(
            ["uri", "original_text", "translated_text"]
                .iter()
                .map(|s| s.to_string()),
        );
        columns.push(self.primary_label.column.clone());
        columns.extend(self.frame_labels.iter().map(|l| frame_column(l)));
        columns
    }

    /// Article source for a user: their own entry, else the shared default.
    pub fn dataset_for(&self, user_id: &str) -> Option<&Path> {
        self.datasets
            .get(user_id)
            .or(self.default_dataset.as_ref())
            .map(PathBuf::as_path)
    }

    /// Highlight colour for an evidence tag.
    pub fn color_for_tag(&self, tag: &str) -> &str {
        if tag == defaults::LLM_EVIDENCE_TAG {
            return &self.llm_evidence_color;
        }
        tag.strip_prefix("frame_")
            .and_then(|rest| rest.strip_suffix("_evidence"))
            .and_then(|n| n.parse::<usize>().ok())
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| self.frame_colors.get(i))
            .map(String::as_str)
            .unwrap_or(defaults::FALLBACK_COLOR)
    }
}

/// Ledger column for a frame label.
pub fn frame_column(label: &str) -> String {
    format!("{}{}", label, defaults::PRESENT_SUFFIX)
}

/// Overlay `patch` onto `base`: objects merge recursively, anything else
/// replaces.
fn merge_values(base: &mut serde_json::Value, patch: serde_json::Value) {
    match (base, patch) {
        (serde_json::Value::Object(base), serde_json::Value::Object(patch)) => {
            for (key, value) in patch {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, patch) => *base = patch,
    }
}

fn substitute_env_vars<F>(content: &str, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    ENV_REF
        .replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            lookup(var_name).unwrap_or_else(|| format!("${{{}}}", var_name))
        })
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = TaskConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.frame_labels.len(), 7);
        assert_eq!(config.primary_label.default, "Yes");
        assert!(!config.flagged_default);
    }

    #[test]
    fn test_screening_profile() {
        let config = TaskConfig::screening();
        assert!(config.validate().is_ok());
        assert!(config.frame_labels.is_empty());
        assert_eq!(config.primary_label.column, "tentative_label");
        assert_eq!(config.primary_label.options.len(), 4);
    }

    #[test]
    fn test_profile_key_selects_screening_base() {
        let toml_str = r#"
            profile = "screening"
            ledger_path = "screening/annotations.csv"

            [primary_label]
            default = "Unsure"
        "#;
        let config = TaskConfig::from_toml_str(toml_str, no_env).unwrap();
        assert_eq!(config.profile, Profile::Screening);
        assert!(config.frame_labels.is_empty());
        assert_eq!(config.primary_label.column, "tentative_label");
        assert_eq!(config.primary_label.options.len(), 4);
        assert_eq!(config.primary_label.default, "Unsure");
        assert_eq!(config.session_dir, PathBuf::from("sessions"));
        assert_eq!(config.ledger_path, PathBuf::from("screening/annotations.csv"));
        assert_eq!(
            config.ledger_columns().last().map(String::as_str),
            Some("tentative_label")
        );
    }

    #[test]
    fn test_profile_env_override_and_unknown_profile() {
        let lookup = |key: &str| (key == "FRAMEMARK_PROFILE").then(|| "screening".to_string());
        let config = TaskConfig::from_toml_str(r#"profile = "final_sample""#, lookup).unwrap();
        assert_eq!(config.profile, Profile::Screening);

        let err = TaskConfig::from_toml_str(r#"profile = "pilot""#, no_env).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        let err = TaskConfig::from_toml_str("profile = 3", no_env).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_type_mismatch_is_config_error() {
        let err = TaskConfig::from_toml_str("frame_labels = \"Bribery\"", no_env).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_merge_values_is_recursive() {
        let mut base = serde_json::json!({"a": {"x": 1, "y": 2}, "b": [1, 2]});
        merge_values(&mut base, serde_json::json!({"a": {"y": 3}, "b": [9]}));
        assert_eq!(base, serde_json::json!({"a": {"x": 1, "y": 3}, "b": [9]}));
    }

    #[test]
    fn test_ledger_columns_order() {
        let config = TaskConfig::default();
        let columns = config.ledger_columns();
        assert_eq!(
            &columns[..8],
            &[
                "user_id",
                "article_index",
                "notes",
                "flagged",
                "uri",
                "original_text",
                "translated_text",
                "political_corruption"
            ]
        );
        assert_eq!(columns[8], "Foreign influence threat_present");
        assert_eq!(columns.len(), 15);
    }

    #[test]
    fn test_from_toml_partial_file_keeps_defaults() {
        let toml_str = r#"
            ledger_path = "out/annotations.csv"
            frame_labels = ["Bribery", "Nepotism"]

            [primary_label]
            column = "corruption_label"
        "#;
        let config = TaskConfig::from_toml_str(toml_str, no_env).unwrap();
        assert_eq!(config.ledger_path, PathBuf::from("out/annotations.csv"));
        assert_eq!(config.frame_labels, vec!["Bribery", "Nepotism"]);
        assert_eq!(config.primary_label.column, "corruption_label");
        assert_eq!(config.primary_label.options, vec!["Yes", "No"]);
        assert_eq!(config.session_dir, PathBuf::from(defaults::SESSION_DIR));
    }

    #[test]
    fn test_env_var_substitution() {
        let toml_str = r#"sync_dir = "${SHARE_ROOT}/sessions""#;
        let lookup = |key: &str| (key == "SHARE_ROOT").then(|| "/mnt/share".to_string());
        let config = TaskConfig::from_toml_str(toml_str, lookup).unwrap();
        assert_eq!(config.sync_dir, Some(PathBuf::from("/mnt/share/sessions")));
    }

    #[test]
    fn test_env_var_substitution_missing_left_verbatim() {
        let result = substitute_env_vars("path = \"${NOT_SET_ANYWHERE}\"", &no_env);
        assert_eq!(result, "path = \"${NOT_SET_ANYWHERE}\"");
    }

    #[test]
    fn test_prefixed_overrides_win_over_file() {
        let toml_str = r#"ledger_path = "file.csv""#;
        let lookup = |key: &str| match key {
            "FRAMEMARK_LEDGER_PATH" => Some("env.csv".to_string()),
            "FRAMEMARK_FUZZY" => Some("false".to_string()),
            "FRAMEMARK_FUZZY_THRESHOLD" => Some("0.9".to_string()),
            _ => None,
        };
        let config = TaskConfig::from_toml_str(toml_str, lookup).unwrap();
        assert_eq!(config.ledger_path, PathBuf::from("env.csv"));
        assert!(!config.fuzzy.enabled);
        assert!((config.fuzzy.threshold - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn test_malformed_threshold_override_rejected() {
        let lookup = |key: &str| (key == "FRAMEMARK_FUZZY_THRESHOLD").then(|| "high".to_string());
        let err = TaskConfig::from_toml_str("", lookup).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_validate_rejects_duplicate_labels() {
        let config = TaskConfig {
            frame_labels: vec!["Morality".to_string(), "Morality".to_string()],
            ..TaskConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_unknown_primary_default() {
        let mut config = TaskConfig::default();
        config.primary_label.default = "Maybe".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_threshold_out_of_range() {
        let mut config = TaskConfig::default();
        config.fuzzy.threshold = 0.0;
        assert!(config.validate().is_err());
        config.fuzzy.threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_dataset_lookup_falls_back_to_default() {
        let mut config = TaskConfig::default();
        config
            .datasets
            .insert("Elisa".to_string(), PathBuf::from("data/uk.csv"));
        assert_eq!(config.dataset_for("Elisa"), Some(Path::new("data/uk.csv")));
        assert_eq!(config.dataset_for("Anne"), None);

        config.default_dataset = Some(PathBuf::from("data/all.csv"));
        assert_eq!(config.dataset_for("Anne"), Some(Path::new("data/all.csv")));
    }

    #[test]
    fn test_color_for_tag() {
        let config = TaskConfig::default();
        assert_eq!(config.color_for_tag("frame_1_evidence"), "#cce5ff");
        assert_eq!(config.color_for_tag("frame_7_evidence"), "#ffffcc");
        assert_eq!(config.color_for_tag("frame_9_evidence"), "#eeeeee");
        assert_eq!(config.color_for_tag("frame_0_evidence"), "#eeeeee");
        assert_eq!(config.color_for_tag("llm_evidence"), "#ffe8cc");
        assert_eq!(config.color_for_tag("other"), "#eeeeee");
    }
}
