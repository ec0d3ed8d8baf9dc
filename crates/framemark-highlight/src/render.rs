//! HTML rendering of highlighted spans.
//!
//! Spans are inserted back to front, so wrapping one span never moves the
//! offsets of the spans still to be processed. All text, inside and outside
//! spans, is HTML-escaped.

use framemark_core::{defaults, evidence_tag, Span, TaskConfig};
use std::collections::BTreeMap;
use tracing::warn;

use crate::matcher::resolve_overlaps;

/// CSS class on evidence highlights.
pub const EVIDENCE_CLASS: &str = "fm-evidence";

/// CSS class on keyword highlights.
pub const KEYWORD_CLASS: &str = "fm-keyword";

const HIGHLIGHT_STYLE: &str = "padding: 2px; border-radius: 4px;";

/// Tag -> background colour.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    colors: BTreeMap<String, String>,
    fallback: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self::from_config(&TaskConfig::default())
    }
}

impl Palette {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            colors: BTreeMap::new(),
            fallback: fallback.into(),
        }
    }

    /// Colours for every frame slot plus `llm_evidence`.
    pub fn from_config(config: &TaskConfig) -> Self {
        let mut palette = Self::new(defaults::FALLBACK_COLOR);
        for number in 1..=defaults::MAX_FRAMES.max(config.frame_colors.len()) {
            let tag = evidence_tag(number);
            let color = config.color_for_tag(&tag).to_string();
            palette.colors.insert(tag, color);
        }
        palette.colors.insert(
            defaults::LLM_EVIDENCE_TAG.to_string(),
            config.llm_evidence_color.clone(),
        );
        palette
    }

    pub fn with_color(mut self, tag: impl Into<String>, color: impl Into<String>) -> Self {
        self.colors.insert(tag.into(), color.into());
        self
    }

    pub fn color(&self, tag: &str) -> &str {
        self.colors
            .get(tag)
            .map(String::as_str)
            .unwrap_or(&self.fallback)
    }
}

/// Escape text for HTML content and attribute values.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Inline style shared by every highlight.
pub(crate) fn highlight_style(color: &str) -> String {
    format!("background-color: {}; {}", escape_html(color), HIGHLIGHT_STYLE)
}

fn open_evidence_tag(tag: &str, color: &str) -> String {
    format!(
        "<span class=\"{}\" data-tag=\"{}\" style=\"{}\">",
        EVIDENCE_CLASS,
        escape_html(tag),
        highlight_style(color)
    )
}

/// Wrap each span of `text` in a coloured `<span>`.
///
/// Overlapping input spans are first reduced with the matcher's
/// earliest-start policy; spans that fall outside the text or off a char
/// boundary are dropped with a warning.
pub fn render_highlights(text: &str, spans: &[Span], palette: &Palette) -> String {
    let mut spans = resolve_overlaps(spans.to_vec());
    spans.retain(|s| {
        let valid = s.end <= text.len()
            && text.is_char_boundary(s.start)
            && text.is_char_boundary(s.end);
        if !valid {
            warn!(tag = %s.tag, start = s.start, end = s.end, "Dropping span outside text");
        }
        valid
    });

    let mut pieces: Vec<String> = Vec::with_capacity(spans.len() * 2 + 1);
    let mut limit = text.len();

    for span in spans.iter().rev() {
        pieces.push(escape_html(&text[span.end..limit]));
        pieces.push(format!(
            "{}{}</span>",
            open_evidence_tag(&span.tag, palette.color(&span.tag)),
            escape_html(&text[span.start..span.end])
        ));
        limit = span.start;
    }
    pieces.push(escape_html(&text[..limit]));

    pieces.reverse();
    pieces.concat()
}

/// Colour legend for the tags actually present, plus the keyword colour
/// when keywords are highlighted.
pub fn render_legend(entries: &[(String, String)]) -> String {
    if entries.is_empty() {
        return String::new();
    }
    let items: Vec<String> = entries
        .iter()
        .map(|(label, color)| {
            format!(
                "<span style=\"background-color: {}; padding: 2px 6px; border-radius: 4px;\">{}</span>",
                escape_html(color),
                escape_html(label)
            )
        })
        .collect();
    format!(
        "<div class=\"fm-legend\" style=\"margin-top: 10px;\">{}</div>",
        items.join("&nbsp;")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip_tags(html: &str) -> String {
        let mut out = String::new();
        let mut in_tag = false;
        for c in html.chars() {
            match c {
                '<' => in_tag = true,
                '>' if in_tag => in_tag = false,
                _ if !in_tag => out.push(c),
                _ => {}
            }
        }
        out.replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&amp;", "&")
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<b>\"Tom\" & 'Jerry'</b>"),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_render_wraps_exact_substring() {
        let text = "The mayor accepted a bribe from a contractor.";
        let html = render_highlights(
            text,
            &[Span::new(10, 26, "frame_1_evidence")],
            &Palette::default(),
        );
        assert!(html.starts_with("The mayor <span class=\"fm-evidence\" data-tag=\"frame_1_evidence\""));
        assert!(html.contains("background-color: #cce5ff;"));
        assert!(html.ends_with(">accepted a bribe</span> from a contractor."));
        assert_eq!(strip_tags(&html), text);
    }

    #[test]
    fn test_render_no_spans_only_escapes() {
        assert_eq!(
            render_highlights("a < b", &[], &Palette::default()),
            "a &lt; b"
        );
    }

    #[test]
    fn test_render_multiple_spans_keep_offsets() {
        let text = "one two three four";
        let html = render_highlights(
            text,
            &[Span::new(14, 18, "b"), Span::new(0, 3, "a")],
            &Palette::new("#fff"),
        );
        assert_eq!(html.matches("<span").count(), 2);
        assert!(html.contains(">one</span>"));
        assert!(html.contains(">four</span>"));
        assert_eq!(strip_tags(&html), text);
    }

    #[test]
    fn test_render_overlapping_input_never_nests() {
        let text = "abcdefghij";
        let html = render_highlights(
            text,
            &[Span::new(2, 6, "late"), Span::new(0, 4, "early"), Span::new(3, 9, "x")],
            &Palette::new("#fff"),
        );
        assert_eq!(html.matches("<span").count(), 1);
        assert!(html.contains("data-tag=\"early\""));
        assert_eq!(strip_tags(&html), text);
    }

    #[test]
    fn test_render_drops_out_of_range_and_non_boundary_spans() {
        let text = "café";
        let html = render_highlights(
            text,
            &[Span::new(0, 99, "far"), Span::new(3, 4, "mid-char")],
            &Palette::new("#fff"),
        );
        assert_eq!(html, "café");
    }

    #[test]
    fn test_render_is_deterministic() {
        let text = "x <y> z";
        let spans = [Span::new(2, 5, "t")];
        let palette = Palette::new("#fff");
        assert_eq!(
            render_highlights(text, &spans, &palette),
            render_highlights(text, &spans, &palette)
        );
    }

    #[test]
    fn test_palette_from_config() {
        let palette = Palette::default();
        assert_eq!(palette.color("frame_4_evidence"), "#ffe8cc");
        assert_eq!(palette.color("llm_evidence"), "#ffe8cc");
        assert_eq!(palette.color("unknown"), "#eeeeee");
        let palette = palette.with_color("custom", "#123456");
        assert_eq!(palette.color("custom"), "#123456");
    }

    #[test]
    fn test_legend() {
        assert_eq!(render_legend(&[]), "");
        let legend = render_legend(&[
            ("LLM Highlight".to_string(), "#ffe8cc".to_string()),
            ("Keyword".to_string(), "#cce5ff".to_string()),
        ]);
        assert!(legend.contains(">LLM Highlight</span>&nbsp;<span"));
        assert!(legend.contains("#cce5ff"));
    }
}
