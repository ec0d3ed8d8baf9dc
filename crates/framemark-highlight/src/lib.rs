//! # framemark-highlight
//!
//! Evidence highlighting for framemark.
//!
//! Locates evidence phrases inside article text (literal, flexible, or fuzzy),
//! wraps them in per-tag markup without double-marking overlapping regions,
//! and runs a separate keyword pass that never touches existing markup.

pub mod evidence;
pub mod highlighter;
pub mod keywords;
pub mod matcher;
pub mod rationale;
pub mod render;

pub use evidence::{evidence_phrases, split_evidence};
pub use highlighter::{HighlightedText, Highlighter};
pub use keywords::{highlight_keywords, KeywordHighlighter};
pub use matcher::{find_spans, resolve_overlaps, similarity, MatchKind, MatchOptions, PhraseMatch, SpanMatcher};
pub use rationale::{rationale_cards, render_card, RationaleCard};
pub use render::{escape_html, render_highlights, render_legend, Palette};
