//! Shared types, error model, and configuration for ContextFunnel.
//!
//! This crate is the foundation depended on by all other ContextFunnel crates.
//! It provides:
//! - [`FunnelError`] — the unified error type
//! - Domain types ([`RunId`], [`SourceKind`], [`RunRecord`])
//! - Configuration ([`AppConfig`], [`CrawlParams`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CrawlParams, DefaultsConfig, GithubConfig, ScholarlyConfig, ServerConfig,
    config_dir, config_file_path, data_dir, expand_home, init_config, load_config,
    load_config_from,
};
pub use error::{FunnelError, Result};
pub use types::{RunId, RunRecord, RunStatus, SourceKind};
