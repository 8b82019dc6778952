//! Newsdesk Common Library
//!
//! Shared code for the Newsdesk services including:
//! - Category registry, article model and the headline/search pipeline
//! - Upstream news provider client and the mock fallback dataset
//! - Input validation and sanitization
//! - Preference storage with atomic replace semantics
//! - Best-effort usage and search activity logging
//! - Error types, configuration, database access and metrics

pub mod activity;
pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod news;
pub mod preferences;
pub mod validation;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, Result, ValidationError};
pub use news::{Article, ArticleBatch, Category, NewsSource, SortBy};
pub use preferences::{Identity, PreferenceStore};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Page size used when the caller does not ask for one
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Upper bound for any requested page size
pub const MAX_PAGE_SIZE: u32 = 100;

/// Maximum number of categories a preference set may hold
pub const MAX_PREFERENCES: usize = 7;
