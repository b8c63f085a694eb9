//! Core library for slackasme - Slack from the terminal, as yourself.
//!
//! This crate provides:
//! - Configuration loading and management
//! - XDG-compliant path resolution
//! - Schema and example config generation
//! - Token storage and a Slack Web API client
//! - Cursor pagination and user/channel identifier resolution
//! - Input validation shared by the CLI
//! - Common types and error handling

pub mod config;
pub mod error;
pub mod paginate;
pub mod paths;
pub mod resolve;
pub mod schema;
pub mod slack;
pub mod token;
pub mod validate;

pub use config::{AppConfig, LogLevel, LoggingConfig, OutputConfig, PathsConfig, RuntimeConfig, SlackConfig};
pub use error::{CoreError, Result};
pub use paginate::{PAGE_SIZE, paginate_until};
pub use paths::{AppPaths, default_config_dir};
pub use resolve::{resolve_channel, resolve_user, resolve_users};
pub use schema::{GeneratedFiles, generate_example_config, generate_schema, write_generated_files};
pub use slack::{Page, SlackApi, SlackClient, User, mask_token};
pub use token::TokenStore;

/// Application name used for config directories and environment prefix.
pub const APP_NAME: &str = "slackasme";

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
