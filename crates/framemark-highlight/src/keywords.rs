//! Secondary keyword pass over already-rendered HTML.
//!
//! Highlights a fixed vocabulary (whole words, case-insensitive, every
//! occurrence) in the text content of rendered HTML. Tags are copied through
//! untouched and text inside an existing `<span>` or `<mark>` is left alone,
//! so the pass never writes into attributes and never nests highlights.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use tracing::{trace, warn};

use crate::render::{escape_html, highlight_style, KEYWORD_CLASS};

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"));

static ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(?:#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z][A-Za-z0-9]*);")
        .expect("valid entity pattern")
});

/// Compiled keyword vocabulary.
#[derive(Debug, Clone)]
pub struct KeywordHighlighter {
    pattern: Option<Regex>,
    color: String,
}

impl KeywordHighlighter {
    /// Build from a vocabulary. Blank terms are ignored; an empty vocabulary
    /// produces a pass that returns its input unchanged.
    pub fn new<S: AsRef<str>>(terms: &[S], color: impl Into<String>) -> Self {
        let mut escaped: Vec<String> = terms
            .iter()
            .map(|t| t.as_ref().trim())
            .filter(|t| !t.is_empty())
            .map(|t| regex::escape(&escape_html(t)))
            .collect();
        // longest first so "abuse of power" wins over a shorter overlapping term
        escaped.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        escaped.dedup();

        let pattern = if escaped.is_empty() {
            None
        } else {
            let source = format!(r"\b(?:{})\b", escaped.join("|"));
            match RegexBuilder::new(&source).case_insensitive(true).build() {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!(error = %e, "Keyword vocabulary rejected; keyword pass disabled");
                    None
                }
            }
        };

        Self {
            pattern,
            color: color.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pattern.is_none()
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    /// Apply the pass to rendered HTML.
    pub fn apply(&self, html: &str) -> String {
        let Some(pattern) = &self.pattern else {
            return html.to_string();
        };

        let mut out = String::with_capacity(html.len());
        let mut depth = 0usize;
        let mut cursor = 0;

        for tag in TAG.find_iter(html) {
            let text = &html[cursor..tag.start()];
            self.push_text(&mut out, text, depth == 0, pattern);

            let raw = tag.as_str();
            if is_closing_highlight(raw) {
                depth = depth.saturating_sub(1);
            } else if is_opening_highlight(raw) {
                depth += 1;
            }
            out.push_str(raw);
            cursor = tag.end();
        }
        self.push_text(&mut out, &html[cursor..], depth == 0, pattern);

        out
    }

    fn push_text(&self, out: &mut String, text: &str, highlight: bool, pattern: &Regex) {
        if !highlight || text.is_empty() {
            out.push_str(text);
            return;
        }
        let style = highlight_style(&self.color);
        let entities: Vec<(usize, usize)> = ENTITY
            .find_iter(text)
            .map(|m| (m.start(), m.end()))
            .collect();
        let replaced = pattern.replace_all(text, |caps: &regex::Captures| {
            let Some(hit) = caps.get(0) else {
                return String::new();
            };
            // a hit that starts or ends inside an entity would split it
            if entities.iter().any(|&(start, end)| {
                (start < hit.start() && hit.start() < end) || (start < hit.end() && hit.end() < end)
            }) {
                return hit.as_str().to_string();
            }
            trace!(keyword = &caps[0], "Keyword highlighted");
            format!(
                "<span class=\"{}\" style=\"{}\">{}</span>",
                KEYWORD_CLASS, style, &caps[0]
            )
        });
        out.push_str(&replaced);
    }
}

fn tag_name(raw: &str) -> String {
    raw.trim_start_matches('<')
        .trim_start_matches('/')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

fn is_highlight_element(raw: &str) -> bool {
    matches!(tag_name(raw).as_str(), "span" | "mark")
}

fn is_opening_highlight(raw: &str) -> bool {
    !raw.starts_with("</") && !raw.ends_with("/>") && is_highlight_element(raw)
}

fn is_closing_highlight(raw: &str) -> bool {
    raw.starts_with("</") && is_highlight_element(raw)
}

/// Convenience wrapper: build a [`KeywordHighlighter`] and apply it once.
pub fn highlight_keywords<S: AsRef<str>>(html: &str, terms: &[S], color: &str) -> String {
    KeywordHighlighter::new(terms, color).apply(html)
}
