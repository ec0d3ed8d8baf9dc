//! Article highlighting pipeline.
//!
//! Ties the pieces together: evidence extraction, span matching, back-to-front
//! rendering, and finally the keyword pass over the rendered markup.

use framemark_core::{defaults, Article, EvidencePhrase, TaskConfig};
use serde::Serialize;
use tracing::debug;

use crate::evidence::{evidence_phrases, tags_in_order};
use crate::keywords::KeywordHighlighter;
use crate::matcher::{MatchOptions, SpanMatcher};
use crate::render::{render_highlights, render_legend, Palette, KEYWORD_CLASS};

/// Rendered highlight output for one text.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HighlightedText {
    /// Escaped text with evidence and keyword markup.
    pub html: String,
    /// Legend entries `(label, colour)` for the tags that produced a span.
    pub legend: Vec<(String, String)>,
    /// Number of evidence spans rendered.
    pub span_count: usize,
}

impl HighlightedText {
    pub fn legend_html(&self) -> String {
        render_legend(&self.legend)
    }
}

pub struct Highlighter {
    matcher: SpanMatcher,
    palette: Palette,
    keywords: KeywordHighlighter,
}

impl Highlighter {
    pub fn new(options: MatchOptions, palette: Palette, keywords: KeywordHighlighter) -> Self {
        Self {
            matcher: SpanMatcher::new(options),
            palette,
            keywords,
        }
    }

    pub fn from_config(config: &TaskConfig) -> Self {
        Self::new(
            MatchOptions::from(&config.fuzzy),
            Palette::from_config(config),
            KeywordHighlighter::new(&config.key_terms, config.keyword_color.clone()),
        )
    }

    /// Highlight an article's translated text with all of its evidence.
    ///
    /// Legend labels use the frame names of the article's suggestions.
    pub fn highlight_article(&self, article: &Article) -> HighlightedText {
        let phrases = evidence_phrases(article);
        let mut out = self.highlight_text(&article.translated_text, &phrases);

        for (label, _) in out.legend.iter_mut() {
            if let Some(frame) = article
                .frames
                .iter()
                .find(|f| f.evidence_tag() == *label && !f.name.trim().is_empty())
            {
                *label = frame.name.trim().to_string();
            } else if label == defaults::LLM_EVIDENCE_TAG {
                *label = "LLM evidence".to_string();
            }
        }

        debug!(
            article_index = article.index,
            phrase_count = phrases.len(),
            span_count = out.span_count,
            "Highlighted article"
        );
        out
    }

    /// Highlight arbitrary text with the given phrases.
    pub fn highlight_text(&self, text: &str, phrases: &[EvidencePhrase]) -> HighlightedText {
        let spans = self.matcher.find_spans(text, phrases);
        let html = self.keywords.apply(&render_highlights(text, &spans, &self.palette));

        let mut legend: Vec<(String, String)> = tags_in_order(phrases)
            .into_iter()
            .filter(|tag| spans.iter().any(|s| s.tag == *tag))
            .map(|tag| {
                let color = self.palette.color(&tag).to_string();
                (tag, color)
            })
            .collect();
        if !self.keywords.is_empty() && html.contains(KEYWORD_CLASS) {
            legend.push(("Key terms".to_string(), self.keywords.color().to_string()));
        }

        HighlightedText {
            html,
            legend,
            span_count: spans.len(),
        }
    }
}
