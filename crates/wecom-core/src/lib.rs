//! Core library for wecom - WeCom application messaging from Rust.
//!
//! This crate provides:
//! - Configuration loading and management
//! - XDG-compliant path resolution
//! - Schema and example config generation
//! - WeCom API client with access token caching
//! - Common types and error handling

pub mod config;
pub mod error;
pub mod paths;
pub mod schema;
pub mod wecom;

pub use config::{ApiConfig, AppConfig, LogLevel, LoggingConfig, PathsConfig, RuntimeConfig};
pub use error::{CoreError, Result};
pub use paths::{AppPaths, default_state_dir};
pub use schema::{generate_example_config, generate_schema, write_generated_files};
pub use wecom::{
    MediaType, Recipient, SendResponse, TextCard, UploadResponse, WecomClient, split_text,
};

/// Application name used for config directories and environment prefix.
pub const APP_NAME: &str = "wecom";

/// Returns the environment variable prefix for this application.
#[must_use]
pub fn env_prefix() -> String {
    APP_NAME
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}
