//! Shared types, error model, and configuration for regcorpus.
//!
//! This crate is the foundation depended on by all other regcorpus crates.
//! It provides:
//! - [`RegcorpusError`] — the unified error type
//! - Domain types ([`Manifest`], [`ManifestEntry`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, FetchPoliciesConfig, PathsConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from,
};
pub use error::{RegcorpusError, Result};
pub use types::{Manifest, ManifestEntry};
