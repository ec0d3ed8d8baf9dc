//! Frame rationale cards.
//!
//! Summarises each model-suggested frame with its rationale and confidence.
//! Suggestions the model itself rejected ("NOT ...", "None") or that lack a
//! usable rationale or confidence are not shown.

use framemark_core::{is_missing_cell, Article, FrameSuggestion, TaskConfig};
use serde::Serialize;

use crate::render::escape_html;

/// Display data for one suggested frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RationaleCard {
    pub number: usize,
    pub frame_name: String,
    pub rationale: String,
    pub confidence: f64,
    pub color: String,
    pub low_confidence: bool,
}

impl RationaleCard {
    /// Confidence rounded to a whole number.
    pub fn confidence_text(&self) -> String {
        format!("{:.0}", self.confidence)
    }
}

/// Build a card for a suggestion, or `None` when it should be hidden.
pub fn rationale_card(frame: &FrameSuggestion, config: &TaskConfig) -> Option<RationaleCard> {
    let confidence: f64 = frame.confidence.trim().parse().ok()?;
    if !confidence.is_finite() {
        return None;
    }

    let name = frame.name.trim();
    let rationale = frame.rationale.trim();
    if is_missing_cell(rationale)
        || is_missing_cell(name)
        || name.eq_ignore_ascii_case("none")
        || name.to_uppercase().starts_with("NOT ")
    {
        return None;
    }

    Some(RationaleCard {
        number: frame.number,
        frame_name: name.to_string(),
        rationale: rationale.to_string(),
        confidence,
        color: config.color_for_tag(&frame.evidence_tag()).to_string(),
        low_confidence: confidence < config.low_confidence_threshold,
    })
}

/// Cards for every displayable suggestion of an article, in slot order.
pub fn rationale_cards(article: &Article, config: &TaskConfig) -> Vec<RationaleCard> {
    let mut cards: Vec<RationaleCard> = article
        .frames
        .iter()
        .filter_map(|f| rationale_card(f, config))
        .collect();
    cards.sort_by_key(|c| c.number);
    cards
}

/// HTML block for one card.
pub fn render_card(card: &RationaleCard) -> String {
    let color = escape_html(&card.color);
    let warning = if card.low_confidence { " ⚠️" } else { "" };
    format!(
        "<div class=\"fm-rationale\" style=\"margin-top:10px; padding:10px; border-left: 6px solid {color}; background-color:{color}33;\">\
         <b style=\"color:{color};\">{name}</b><br><br>\
         <i><u>Rationale:</u></i><br> {rationale}<br><br>\
         <i><u>Confidence:</u></i> {confidence}{warning}\
         </div>",
        color = color,
        name = escape_html(&card.frame_name),
        rationale = escape_html(&card.rationale),
        confidence = card.confidence_text(),
        warning = warning,
    )
}
