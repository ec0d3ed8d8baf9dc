//! Evidence phrase extraction from article rows.

use framemark_core::{defaults, is_missing_cell, Article, EvidencePhrase};

/// Split a semicolon-delimited evidence cell into trimmed phrases.
///
/// Blank pieces and `nan` placeholders are dropped.
pub fn split_evidence(cell: &str) -> Vec<String> {
    if is_missing_cell(cell) {
        return Vec::new();
    }
    cell.split(defaults::EVIDENCE_SEPARATOR)
        .map(str::trim)
        .filter(|p| !is_missing_cell(p))
        .map(str::to_string)
        .collect()
}

/// Every evidence phrase cited for an article, tagged by source column.
///
/// Frames come first in slot order, then the article-level `llm_evidence`.
pub fn evidence_phrases(article: &Article) -> Vec<EvidencePhrase> {
    let mut frames: Vec<_> = article.frames.iter().collect();
    frames.sort_by_key(|f| f.number);

    let mut phrases: Vec<EvidencePhrase> = frames
        .into_iter()
        .flat_map(|frame| {
            let tag = frame.evidence_tag();
            split_evidence(&frame.evidence)
                .into_iter()
                .map(move |text| EvidencePhrase::new(tag.clone(), text))
        })
        .collect();

    phrases.extend(
        split_evidence(&article.llm_evidence)
            .into_iter()
            .map(|text| EvidencePhrase::new(defaults::LLM_EVIDENCE_TAG, text)),
    );

    phrases
}

/// Distinct tags in first-seen order.
pub fn tags_in_order(phrases: &[EvidencePhrase]) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for phrase in phrases {
        if !tags.contains(&phrase.tag) {
            tags.push(phrase.tag.clone());
        }
    }
    tags
}
