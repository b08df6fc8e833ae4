//! Tagpress Common Library
//!
//! Shared code for the Tagpress services including:
//! - Database models and repository pattern
//! - The storage port consumed by the retrieval engine
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{ArticleRecord, ArticleStore, Repository, TagRecord};
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
