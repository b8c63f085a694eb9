//! Slack Web API access.
//!
//! This module provides:
//! - [`SlackApi`], the seam the resolver and paginator talk to
//! - [`SlackClient`], the reqwest-backed implementation
//! - Typed [`User`] and [`Page`] views over raw responses

pub mod api;
pub mod client;
pub mod models;

pub use api::SlackApi;
pub use client::{SlackClient, mask_token};
pub use models::{Page, User};
