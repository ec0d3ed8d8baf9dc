//! # framemark-annotate
//!
//! The annotation workflow: per-user navigation over a dataset, form state,
//! submission into the session and ledger, and the view model rendered for
//! each step.

pub mod form;
pub mod view;
pub mod workflow;

pub use form::FormState;
pub use view::{render_view, ArticleView, CompletedView, View};
pub use workflow::{AnnotationWorkflow, Status};
