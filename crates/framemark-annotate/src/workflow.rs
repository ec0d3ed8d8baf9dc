//! Annotation navigation.
//!
//! Every operation loads the user's session, acts on it, persists it, and
//! returns the view to show next. The session's `current_index` only moves
//! forward after the record it just produced is safely in the ledger.

use framemark_core::{
    AnnotationLedger, Article, ArticleSource, Error, Result, SessionRepository, SessionState,
    TaskConfig,
};
use framemark_highlight::{rationale_cards, Highlighter};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::form::FormState;
use crate::view::{ArticleView, CompletedView, View};

/// Progress summary for one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Status {
    pub user_id: String,
    pub current_index: usize,
    pub total: usize,
    /// Records in the user's session
    pub annotated: usize,
    /// Rows for the user in the shared ledger
    pub ledgered: usize,
    pub completed: bool,
}

pub struct AnnotationWorkflow<A, S, L> {
    config: TaskConfig,
    articles: A,
    sessions: S,
    ledger: L,
    highlighter: Highlighter,
}

impl<A, S, L> AnnotationWorkflow<A, S, L>
where
    A: ArticleSource,
    S: SessionRepository,
    L: AnnotationLedger,
{
    pub fn new(config: TaskConfig, articles: A, sessions: S, ledger: L) -> Self {
        let highlighter = Highlighter::from_config(&config);
        Self {
            config,
            articles,
            sessions,
            ledger,
            highlighter,
        }
    }

    pub fn config(&self) -> &TaskConfig {
        &self.config
    }

    pub fn sessions(&self) -> &S {
        &self.sessions
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Current view for a user.
    pub fn view(&self, user_id: &str) -> Result<View> {
        let articles = self.articles.articles(user_id)?;
        let state = self.sessions.load(user_id)?;
        Ok(self.build_view(user_id, &articles, &state))
    }

    /// Record the form for the current article, then advance ("Next").
    ///
    /// The ledger write happens first; when it fails the error is returned
    /// and the session is left where it was.
    pub fn submit(&self, user_id: &str, form: FormState) -> Result<View> {
        form.validate(&self.config)?;
        let articles = self.articles.articles(user_id)?;
        let mut state = self.sessions.load(user_id)?;

        let article = articles.get(state.current_index).ok_or_else(|| {
            Error::InvalidInput(format!(
                "nothing to submit: all {} articles are done",
                articles.len()
            ))
        })?;
        let record = form.into_record(user_id, article);

        if let Err(e) = self.ledger.upsert(&record) {
            warn!(
                user_id,
                article_index = article.index,
                error = %e,
                "Ledger write failed, staying on article"
            );
            return Err(e);
        }

        state.upsert_annotation(record);
        state.current_index += 1;
        self.sessions.save(user_id, &state)?;

        info!(
            user_id,
            article_index = article.index,
            current_index = state.current_index,
            total = articles.len(),
            "Annotation submitted"
        );
        Ok(self.build_view(user_id, &articles, &state))
    }

    /// Step back one article. A no-op on the first article.
    pub fn previous(&self, user_id: &str) -> Result<View> {
        self.navigate(user_id, |state, total| {
            if state.current_index > 0 && total > 0 {
                // from the completed page this lands on the last article
                state.current_index = state.current_index.min(total) - 1;
            }
            Ok(())
        })
    }

    /// Go to a zero-based article index.
    pub fn jump(&self, user_id: &str, index: usize) -> Result<View> {
        self.navigate(user_id, |state, total| {
            if index >= total {
                return Err(Error::InvalidInput(format!(
                    "article index {} out of range (0..{})",
                    index, total
                )));
            }
            state.current_index = index;
            Ok(())
        })
    }

    /// Leave the completed page for the last article.
    pub fn back_from_completion(&self, user_id: &str) -> Result<View> {
        self.navigate(user_id, |state, total| {
            if state.current_index < total {
                return Err(Error::InvalidInput(
                    "not on the completed page".to_string(),
                ));
            }
            if total > 0 {
                state.current_index = total - 1;
            }
            Ok(())
        })
    }

    /// Progress from the session, cross-checked against the ledger.
    pub fn status(&self, user_id: &str) -> Result<Status> {
        let total = self.articles.articles(user_id)?.len();
        let state = self.sessions.load(user_id)?;
        let ledgered = self
            .ledger
            .records()
            .iter()
            .filter(|r| r.user_id == user_id)
            .count();

        if ledgered != state.annotations.len() {
            warn!(
                user_id,
                annotated = state.annotations.len(),
                ledgered,
                "Session and ledger disagree"
            );
        }

        Ok(Status {
            user_id: user_id.to_string(),
            current_index: state.current_index,
            total,
            annotated: state.annotations.len(),
            ledgered,
            completed: state.current_index >= total,
        })
    }

    fn navigate<F>(&self, user_id: &str, step: F) -> Result<View>
    where
        F: FnOnce(&mut SessionState, usize) -> Result<()>,
    {
        let articles = self.articles.articles(user_id)?;
        let mut state = self.sessions.load(user_id)?;
        let from = state.current_index;

        step(&mut state, articles.len())?;
        if state.current_index != from {
            self.sessions.save(user_id, &state)?;
        }

        debug!(user_id, from, to = state.current_index, "Navigated");
        Ok(self.build_view(user_id, &articles, &state))
    }

    fn build_view(&self, user_id: &str, articles: &[Article], state: &SessionState) -> View {
        let Some(article) = articles.get(state.current_index) else {
            return View::Completed(CompletedView {
                user_id: user_id.to_string(),
                total: articles.len(),
                annotated: state.annotations.len(),
            });
        };

        let stored = state.annotation_for(article.index);
        let form = match stored {
            Some(record) => FormState::from_record(record, &self.config),
            None => FormState::defaults(&self.config),
        };
        let highlighted = self.highlighter.highlight_article(article);

        View::Article(Box::new(ArticleView {
            user_id: user_id.to_string(),
            index: state.current_index,
            total: articles.len(),
            article: article.clone(),
            highlighted_html: highlighted.html,
            legend: highlighted.legend,
            cards: rationale_cards(article, &self.config),
            form,
            previously_annotated: stored.is_some(),
            primary_column: self.config.primary_label.column.clone(),
            primary_options: self.config.primary_label.options.clone(),
            frame_labels: self.config.frame_labels.clone(),
        }))
    }
}
