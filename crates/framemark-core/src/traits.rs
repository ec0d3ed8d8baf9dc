//! Core traits for framemark storage abstractions.
//!
//! The workflow talks to storage only through these traits, so the file
//! backed implementations in `framemark-store` can be swapped for in-memory
//! ones in tests.

use crate::error::Result;
use crate::models::{AnnotationRecord, Article, SessionState};

// =============================================================================
// SESSION STORE
// =============================================================================

/// Per-user progress checkpoint.
pub trait SessionRepository {
    /// Read a user's session.
    ///
    /// A missing or unreadable session yields a fresh `SessionState`; the
    /// only error is a user id that cannot name a session.
    fn load(&self, user_id: &str) -> Result<SessionState>;

    /// Persist a user's session. A reader never observes a partial write.
    fn save(&self, user_id: &str, state: &SessionState) -> Result<()>;
}

// =============================================================================
// ANNOTATION LEDGER
// =============================================================================

/// Shared table of finalized records, at most one per `(user_id, article_index)`.
pub trait AnnotationLedger {
    /// Insert or replace the record with the same key.
    fn upsert(&self, record: &AnnotationRecord) -> Result<()>;

    /// All records currently in the ledger. Unreadable ledgers read as empty.
    fn records(&self) -> Vec<AnnotationRecord>;
}

// =============================================================================
// ARTICLE SOURCE
// =============================================================================

/// Resolves the articles a user is assigned.
pub trait ArticleSource {
    /// Articles in presentation order; `Article::index` equals the position.
    ///
    /// Users without an assigned dataset get `Error::NotFound`.
    fn articles(&self, user_id: &str) -> Result<Vec<Article>>;
}
