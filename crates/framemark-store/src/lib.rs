//! # framemark-store
//!
//! File-backed persistence for framemark: per-user JSON sessions, the shared
//! CSV annotation ledger, article datasets, and the sync helper that copies
//! both stores to a shared directory.

pub mod articles;
pub mod fs;
pub mod ledger;
pub mod session;
pub mod sync;

pub use articles::{load_articles, CsvDatasets};
pub use fs::atomic_write;
pub use ledger::CsvLedger;
pub use session::FileSessionStore;
pub use sync::{sync_sessions, SyncEntry, SyncReport};
