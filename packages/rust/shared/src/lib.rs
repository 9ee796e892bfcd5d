//! Shared types, error model, and configuration for the llms.txt generator.
//!
//! This crate is the foundation depended on by all other workspace crates.
//! It provides:
//! - [`LlmsTxtError`]: the unified error type
//! - Domain types ([`ContentRecord`], [`ContentType`], [`CacheEntry`])
//! - Configuration ([`AppConfig`] as read from disk, [`GeneratorConfig`] once validated)

pub mod config;
pub mod error;
pub mod fs;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ExtractorKind, GeneratorConfig, OutputConfig, OutputSettings, PerformanceConfig,
    PerformanceSettings, SitemapConfig, SitemapSettings, SortKey, SortOrder, StaticConfig,
    StaticSettings, WordPressConfig, WordPressSettings, DEFAULT_CONFIG_FILE, init_config,
    load_config, load_config_from, with_trailing_slash,
};
pub use error::{LlmsTxtError, Result};
pub use fs::write_atomic;
pub use types::{
    CacheEntry, ContentRecord, ContentType, DESCRIPTION_LIMIT, GENERATOR_LICENSE, GENERATOR_NAME,
    GENERATOR_VERSION, WORDS_PER_MINUTE, single_line, truncate_with_ellipsis,
};
