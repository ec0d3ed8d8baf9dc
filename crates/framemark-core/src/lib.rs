//! # framemark-core
//!
//! Core types, configuration, and traits for the framemark annotation tool.
//!
//! This crate provides the foundational data structures and trait definitions
//! that the other framemark crates depend on.

pub mod config;
pub mod defaults;
pub mod error;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use config::{frame_column, FuzzyConfig, PrimaryLabelConfig, Profile, TaskConfig};
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
