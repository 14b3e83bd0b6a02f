//! Shared types, error model, and configuration for lessonforge.
//!
//! This crate is the foundation depended on by all other lessonforge crates.
//! It provides:
//! - [`LessonForgeError`] — the unified error type
//! - Domain types ([`CatalogEntry`], [`LessonLink`], catalog loading)
//! - The filesystem-name sanitizer ([`sanitize_name`])
//! - Configuration ([`AppConfig`], [`CrawlConfig`], config loading)

pub mod config;
pub mod error;
pub mod sanitize;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CrawlConfig, DefaultsConfig, RetryConfig, SelectorsConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{LessonForgeError, Result};
pub use sanitize::sanitize_name;
pub use types::{CatalogEntry, LessonLink, load_catalog};
