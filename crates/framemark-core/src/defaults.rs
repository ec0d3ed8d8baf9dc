//! Centralized default constants for framemark.
//!
//! **This module is the single source of truth** for shared default values.
//! `TaskConfig::default()` and the stores read from here instead of defining
//! their own literals.

// =============================================================================
// STORAGE
// =============================================================================

/// Directory holding one JSON session file per user.
pub const SESSION_DIR: &str = "sessions_final";

/// Suffix appended to the user id to form the session file name.
pub const SESSION_FILE_SUFFIX: &str = "_session.json";

/// Shared annotation ledger (CSV).
pub const LEDGER_PATH: &str = "annotations_final.csv";

/// Config file looked up in the working directory when none is given.
pub const CONFIG_FILE: &str = "framemark.toml";

/// Environment variable naming an explicit config file.
pub const ENV_CONFIG: &str = "FRAMEMARK_CONFIG";

/// Prefix for all environment overrides.
pub const ENV_PREFIX: &str = "FRAMEMARK_";

// =============================================================================
// LABELS
// =============================================================================

/// Frame labels of the final-sample coding scheme, in display order.
pub const FRAME_LABELS: [&str; 7] = [
    "Foreign influence threat",
    "Systemic institutional corruption",
    "Elite collusion",
    "Politicized investigations",
    "Authoritarian reformism",
    "Judicial and institutional accountability failures",
    "Mobilizing anti-corruption",
];

/// Ledger column suffix for per-frame presence.
pub const PRESENT_SUFFIX: &str = "_present";

/// Cell value for a frame marked present.
pub const PRESENT: &str = "Present";

/// Cell value for a frame marked absent.
pub const NOT_PRESENT: &str = "Not Present";

/// Primary classification column of the frame-coding task.
pub const PRIMARY_COLUMN: &str = "political_corruption";

/// Options offered for the primary classification.
pub const PRIMARY_OPTIONS: [&str; 2] = ["Yes", "No"];

/// Preselected primary classification on a fresh record.
pub const PRIMARY_DEFAULT: &str = "Yes";

/// Primary classification column of the screening task.
pub const SCREENING_COLUMN: &str = "tentative_label";

/// Options offered by the screening task.
pub const SCREENING_OPTIONS: [&str; 4] = ["Yes", "Mentioned but not central", "No", "Unsure"];

/// Whether a fresh record starts flagged for review.
pub const FLAGGED_DEFAULT: bool = false;

// =============================================================================
// MATCHING
// =============================================================================

/// Minimum similarity ratio for a fuzzy evidence match to be accepted.
pub const FUZZY_THRESHOLD: f32 = 0.75;

/// Extra words allowed on either side of the phrase length when sliding the
/// fuzzy window.
pub const FUZZY_SLACK_WORDS: usize = 1;

/// Whether fuzzy matching is enabled when nothing says otherwise.
pub const FUZZY_ENABLED: bool = true;

/// Separator between evidence phrases inside one cell.
pub const EVIDENCE_SEPARATOR: char = ';';

/// Number of per-frame column groups in the article source.
pub const MAX_FRAMES: usize = 7;

/// Tag used for the single-column LLM evidence field.
pub const LLM_EVIDENCE_TAG: &str = "llm_evidence";

/// Keyword vocabulary for the secondary highlight pass.
pub const KEY_TERMS: [&str; 10] = [
    "bribery",
    "embezzlement",
    "nepotism",
    "corruption",
    "fraud",
    "abuse of power",
    "favoritism",
    "money laundering",
    "kickback",
    "cronyism",
];

// =============================================================================
// DISPLAY
// =============================================================================

/// Highlight colours for `frame_1_evidence` .. `frame_7_evidence`.
pub const FRAME_COLORS: [&str; 7] = [
    "#cce5ff", "#d5f5e3", "#e6ccff", "#ffe8cc", "#ffcccc", "#f8d7da", "#ffffcc",
];

/// Colour used when a tag has no configured colour.
pub const FALLBACK_COLOR: &str = "#eeeeee";

/// Highlight colour for `llm_evidence` phrases.
pub const LLM_EVIDENCE_COLOR: &str = "#ffe8cc";

/// Highlight colour for keyword hits.
pub const KEYWORD_COLOR: &str = "#cce5ff";

/// Confidence below this value is shown with a warning marker.
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 90.0;
