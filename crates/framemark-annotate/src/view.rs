//! Per-request view model and its HTML rendering.
//!
//! A [`View`] carries everything one page needs; [`render_view`] is a pure
//! function of it.

use framemark_core::{defaults, frame_column, Article};
use framemark_highlight::{escape_html, render_card, render_legend, RationaleCard};
use serde::Serialize;

use crate::form::FormState;

/// An article waiting to be (re)coded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleView {
    pub user_id: String,
    /// Zero-based position
    pub index: usize,
    pub total: usize,
    pub article: Article,
    /// Translated text with evidence and keyword markup
    pub highlighted_html: String,
    pub legend: Vec<(String, String)>,
    pub cards: Vec<RationaleCard>,
    pub form: FormState,
    /// True when the form was restored from an earlier submission
    pub previously_annotated: bool,
    pub primary_column: String,
    pub primary_options: Vec<String>,
    pub frame_labels: Vec<String>,
}

impl ArticleView {
    /// "Article n of N", one-based.
    pub fn position_text(&self) -> String {
        format!("Article {} of {}", self.index + 1, self.total)
    }
}

/// Every article of the user's dataset has been submitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletedView {
    pub user_id: String,
    pub total: usize,
    pub annotated: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum View {
    Article(Box<ArticleView>),
    Completed(CompletedView),
}

impl View {
    pub fn user_id(&self) -> &str {
        match self {
            View::Article(v) => &v.user_id,
            View::Completed(v) => &v.user_id,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, View::Completed(_))
    }
}

/// Ledger wording of a frame radio.
fn presence_text(present: bool) -> &'static str {
    if present {
        defaults::PRESENT
    } else {
        defaults::NOT_PRESENT
    }
}

fn checked(on: bool) -> &'static str {
    if on {
        " checked"
    } else {
        ""
    }
}

fn radio_group(name: &str, options: &[String], selected: &str) -> String {
    options
        .iter()
        .map(|option| {
            format!(
                "<label><input type=\"radio\" name=\"{name}\" value=\"{value}\"{checked}> {value}</label>",
                name = escape_html(name),
                value = escape_html(option),
                checked = checked(option == selected),
            )
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_form(view: &ArticleView) -> String {
    let mut parts = Vec::new();
    parts.push(format!(
        "<fieldset><legend>{}</legend>{}</fieldset>",
        escape_html(&view.primary_column),
        radio_group(&view.primary_column, &view.primary_options, &view.form.primary_label)
    ));

    let presence = vec![
        presence_text(true).to_string(),
        presence_text(false).to_string(),
    ];
    for label in &view.frame_labels {
        let present = view.form.frames.get(label).copied().unwrap_or(false);
        parts.push(format!(
            "<fieldset><legend>{}</legend>{}</fieldset>",
            escape_html(label),
            radio_group(
                &frame_column(label),
                &presence,
                presence_text(present)
            )
        ));
    }

    parts.push(format!(
        "<label><input type=\"checkbox\" name=\"flagged\"{}> Flag for review</label>",
        checked(view.form.flagged)
    ));
    parts.push(format!(
        "<textarea name=\"notes\">{}</textarea>",
        escape_html(&view.form.notes)
    ));
    parts.push(
        "<button name=\"action\" value=\"previous\">Previous</button>\
         <button name=\"action\" value=\"next\">Next</button>"
            .to_string(),
    );

    format!("<form class=\"fm-form\" method=\"post\">{}</form>", parts.join(""))
}

fn render_article(view: &ArticleView) -> String {
    let article = &view.article;
    let mut html = String::new();

    html.push_str(&format!(
        "<h2>{}</h2><p class=\"fm-jump-hint\">Jump to an article number between 1 and {}.</p>",
        escape_html(&view.position_text()),
        view.total
    ));
    if !article.uri.is_empty() {
        html.push_str(&format!(
            "<p class=\"fm-uri\"><b>URI:</b> {}</p>",
            escape_html(&article.uri)
        ));
    }
    if view.previously_annotated {
        html.push_str("<p class=\"fm-notice\">You already coded this article; submitting replaces your earlier answer.</p>");
    }

    html.push_str(&format!(
        "<div class=\"fm-columns\">\
         <div class=\"fm-original\"><h3>Original</h3>{}</div>\
         <div class=\"fm-translated\"><h3>Translated</h3>{}{}</div>\
         </div>",
        escape_html(article.display_original()),
        view.highlighted_html,
        render_legend(&view.legend),
    ));

    if !article.llm_rationale.is_empty() {
        html.push_str(&format!(
            "<div class=\"fm-llm-rationale\"><i><u>Rationale:</u></i> {}</div>",
            escape_html(&article.llm_rationale)
        ));
    }
    for card in &view.cards {
        html.push_str(&render_card(card));
    }

    html.push_str(&render_form(view));
    html
}

fn render_completed(view: &CompletedView) -> String {
    format!(
        "<div class=\"fm-complete\"><h2>All articles annotated</h2>\
         <p>{} of {} articles have a saved annotation.</p>\
         <form method=\"post\"><button name=\"action\" value=\"back\">Back to last article</button></form></div>",
        view.annotated, view.total
    )
}

/// HTML fragment for a view.
pub fn render_view(view: &View) -> String {
    match view {
        View::Article(v) => render_article(v),
        View::Completed(v) => render_completed(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framemark_core::TaskConfig;

    fn article_view() -> ArticleView {
        let config = TaskConfig::default();
        let mut form = FormState::defaults(&config).with_present_frames(&["Elite collusion"]);
        form.notes = "<script>".to_string();
        ArticleView {
            user_id: "alice".to_string(),
            index: 1,
            total: 10,
            article: Article {
                index: 1,
                uri: "https://example.org/1".to_string(),
                original_text: "Tekst & meer".to_string(),
                translated_text: "Text".to_string(),
                ..Default::default()
            },
            highlighted_html: "<span class=\"fm-evidence\">Text</span>".to_string(),
            legend: Vec::new(),
            cards: Vec::new(),
            form,
            previously_annotated: true,
            primary_column: config.primary_label.column.clone(),
            primary_options: config.primary_label.options.clone(),
            frame_labels: config.frame_labels.clone(),
        }
    }

    #[test]
    fn test_render_article_view() {
        let html = render_view(&View::Article(Box::new(article_view())));
        assert!(html.contains("Article 2 of 10"));
        assert!(html.contains("Tekst &amp; meer"));
        assert!(html.contains("<span class=\"fm-evidence\">Text</span>"));
        assert!(html.contains("value=\"Yes\" checked"));
        assert!(html.contains(
            "name=\"Elite collusion_present\" value=\"Present\" checked"
        ));
        assert!(html.contains(
            "name=\"Foreign influence threat_present\" value=\"Not Present\" checked"
        ));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("name=\"flagged\" checked"));
        assert!(html.contains("already coded"));
    }

    #[test]
    fn test_render_is_pure() {
        let view = View::Article(Box::new(article_view()));
        assert_eq!(render_view(&view), render_view(&view));
    }

    #[test]
    fn test_render_completed_view() {
        let view = View::Completed(CompletedView {
            user_id: "alice".to_string(),
            total: 10,
            annotated: 9,
        });
        assert!(view.is_completed());
        let html = render_view(&view);
        assert!(html.contains("9 of 10"));
        assert!(html.contains("value=\"back\""));
    }

    #[test]
    fn test_view_serializes_with_state_tag() {
        let completed = View::Completed(CompletedView {
            user_id: "alice".to_string(),
            total: 3,
            annotated: 3,
        });
        let json = serde_json::to_value(&completed).unwrap();
        assert_eq!(json["state"], "completed");
        assert_eq!(json["total"], 3);

        let article = serde_json::to_value(View::Article(Box::new(article_view()))).unwrap();
        assert_eq!(article["state"], "article");
        assert_eq!(article["form"]["primary_label"], "Yes");
    }
}
