//! Argument validators.
//!
//! Each function takes the raw argument string and returns the parsed value,
//! so they plug straight into clap as `value_parser`s.

use std::path::PathBuf;

use crate::{CoreError, Result};

/// Longest accepted channel reference.
pub const MAX_CHANNEL_LEN: usize = 100;
/// Longest message Slack accepts.
pub const MAX_TEXT_LEN: usize = 40_000;
/// Longest accepted search query.
pub const MAX_QUERY_LEN: usize = 1_000;
/// Largest accepted `--limit`.
pub const MAX_LIMIT: usize = 1_000;

fn invalid(message: impl Into<String>) -> CoreError {
    CoreError::Validation(message.into())
}

/// A channel name, `#name`, channel ID or `@user`.
///
/// # Errors
///
/// Rejects empty or overlong values and characters outside
/// `[A-Za-z0-9_#@.-]`.
pub fn channel(value: &str) -> Result<String> {
    if value.is_empty() {
        return Err(invalid("Channel cannot be empty"));
    }
    if value.chars().count() > MAX_CHANNEL_LEN {
        return Err(invalid(format!(
            "Channel name too long (max {MAX_CHANNEL_LEN} characters)"
        )));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '#' | '@' | '.' | '-');
    if !value.chars().all(allowed) {
        return Err(invalid(format!("Invalid channel format: {value}")));
    }
    Ok(value.to_string())
}

/// Message text.
///
/// # Errors
///
/// Rejects empty text and text over Slack's length limit.
pub fn text(value: &str) -> Result<String> {
    if value.is_empty() {
        return Err(invalid("Message text cannot be empty"));
    }
    if value.chars().count() > MAX_TEXT_LEN {
        return Err(invalid(format!(
            "Message text too long (max {MAX_TEXT_LEN} characters)"
        )));
    }
    Ok(value.to_string())
}

/// A message timestamp: ten digits, a dot, six digits.
///
/// # Errors
///
/// Rejects anything else, including the empty string.
pub fn timestamp(value: &str) -> Result<String> {
    let well_formed = value.split_once('.').is_some_and(|(secs, micros)| {
        secs.len() == 10
            && micros.len() == 6
            && secs.bytes().all(|b| b.is_ascii_digit())
            && micros.bytes().all(|b| b.is_ascii_digit())
    });
    if !well_formed {
        return Err(invalid(format!(
            "Invalid timestamp format: {value} (expected 1234567890.123456)"
        )));
    }
    Ok(value.to_string())
}

/// An optional thread timestamp; the empty string means "no thread".
///
/// # Errors
///
/// Rejects non-empty values that are not message timestamps.
pub fn thread_timestamp(value: &str) -> Result<String> {
    if value.is_empty() {
        return Ok(String::new());
    }
    timestamp(value)
}

/// An emoji name without colons, e.g. `eyes` or `+1`.
///
/// # Errors
///
/// Rejects empty names and anything outside `[a-z0-9_+-]`.
pub fn emoji(value: &str) -> Result<String> {
    if value.is_empty() {
        return Err(invalid("Emoji name cannot be empty"));
    }
    let allowed =
        |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '+' | '-');
    if !value.chars().all(allowed) {
        return Err(invalid(format!(
            "Invalid emoji format: {value} (use the name without colons, e.g. eyes)"
        )));
    }
    Ok(value.to_string())
}

/// A readable, non-empty regular file. Returned as an absolute path.
///
/// # Errors
///
/// Rejects missing paths, directories and empty files.
pub fn file_path(value: &str) -> Result<PathBuf> {
    let path = PathBuf::from(value);
    let metadata = std::fs::metadata(&path)
        .map_err(|_| invalid(format!("File not found: {value}")))?;
    if metadata.is_dir() {
        return Err(invalid(format!("Path is a directory: {value}")));
    }
    if metadata.len() == 0 {
        return Err(invalid(format!("File is empty: {value}")));
    }
    std::path::absolute(&path).map_err(CoreError::Io)
}

/// A result count between 1 and [`MAX_LIMIT`].
///
/// # Errors
///
/// Rejects non-numbers and values out of range.
pub fn limit(value: &str) -> Result<usize> {
    let parsed: usize = value
        .trim()
        .parse()
        .map_err(|_| invalid(format!("Limit must be a number: {value}")))?;
    if parsed < 1 {
        return Err(invalid("Limit must be at least 1"));
    }
    if parsed > MAX_LIMIT {
        return Err(invalid(format!("Limit too high (max {MAX_LIMIT})")));
    }
    Ok(parsed)
}

/// A search query.
///
/// # Errors
///
/// Rejects empty or overlong queries.
pub fn search_query(value: &str) -> Result<String> {
    if value.trim().is_empty() {
        return Err(invalid("Search query cannot be empty"));
    }
    if value.chars().count() > MAX_QUERY_LEN {
        return Err(invalid(format!(
            "Search query too long (max {MAX_QUERY_LEN} characters)"
        )));
    }
    Ok(value.to_string())
}
