//! Slack Web API client.
//!
//! Every Web API method is an HTTP POST to `<api_url>/<method>` with form
//! parameters and a bearer token. Responses always carry an `ok` flag; a
//! `false` value comes with an `error` code that is surfaced as
//! [`CoreError::Slack`] so callers can branch on it (`user_not_found`,
//! `already_reacted`, ...).

use std::path::Path;
use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

use crate::slack::api::SlackApi;
use crate::slack::models::User;
use crate::{AppConfig, CoreError, Result};

/// Slack Web API client bound to one user token.
pub struct SlackClient {
    http_client: Client,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for SlackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackClient")
            .field("base_url", &self.base_url)
            .field("token", &mask_token(&self.token))
            .finish_non_exhaustive()
    }
}

impl SlackClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if HTTP client creation fails.
    pub fn new(token: impl Into<String>, base_url: &str, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("slackasme/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CoreError::Http(format!("creating HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// Create a client using the API URL and timeout from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if HTTP client creation fails.
    pub fn from_config(token: impl Into<String>, config: &AppConfig) -> Result<Self> {
        Self::new(
            token,
            &config.slack.api_url,
            Duration::from_secs(config.runtime.timeout.max(1)),
        )
    }

    /// Call a Web API method and return the response body when `ok` is true.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Http`] on transport or HTTP status failures,
    /// [`CoreError::Serialization`] if the body is not JSON, and
    /// [`CoreError::Slack`] when the API answers `ok: false`.
    pub async fn call(&self, method: &str, params: &[(&str, String)]) -> Result<Value> {
        log::debug!("calling {method}");
        let url = format!("{}/{method}", self.base_url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.token)
            .form(params)
            .send()
            .await
            .map_err(|e| CoreError::Http(mask_token(&format!("{method} request failed: {e}"))))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("?")
                .to_string();
            return Err(CoreError::Http(format!(
                "{method} rate limited, retry after {retry_after}s"
            )));
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CoreError::Http(mask_token(&format!(
                "{method} failed: {status} - {text}"
            ))));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| CoreError::Serialization(format!("parsing {method} response: {e}")))?;

        check_response(method, body)
    }

    /// `auth.test`: identify the token's user and workspace.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is invalid or the request fails.
    pub async fn auth_test(&self) -> Result<Value> {
        self.call("auth.test", &[]).await
    }

    /// `conversations.info`: details for one channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel is unknown or the request fails.
    pub async fn conversations_info(&self, channel: &str) -> Result<Value> {
        self.call("conversations.info", &[("channel", channel.to_string())])
            .await
    }

    /// `conversations.history`: most recent messages in a channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel is unknown or the request fails.
    pub async fn conversations_history(&self, channel: &str, limit: usize) -> Result<Value> {
        self.call(
            "conversations.history",
            &[("channel", channel.to_string()), ("limit", limit.to_string())],
        )
        .await
    }

    /// `chat.postMessage`: post a message, optionally as a thread reply.
    ///
    /// # Errors
    ///
    /// Returns an error if posting fails.
    pub async fn chat_post_message(
        &self,
        channel: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<Value> {
        let mut params = vec![("channel", channel.to_string()), ("text", text.to_string())];
        if let Some(ts) = thread_ts {
            params.push(("thread_ts", ts.to_string()));
        }
        self.call("chat.postMessage", &params).await
    }

    /// `chat.delete`: delete one of your messages.
    ///
    /// # Errors
    ///
    /// Returns an error if deletion fails.
    pub async fn chat_delete(&self, channel: &str, ts: &str) -> Result<Value> {
        self.call(
            "chat.delete",
            &[("channel", channel.to_string()), ("ts", ts.to_string())],
        )
        .await
    }

    /// `reactions.add`: react to a message with an emoji name (no colons).
    ///
    /// # Errors
    ///
    /// Returns an error if the reaction cannot be added, including
    /// `already_reacted`.
    pub async fn reactions_add(&self, channel: &str, ts: &str, emoji: &str) -> Result<Value> {
        self.call("reactions.add", &reaction_params(channel, ts, emoji))
            .await
    }

    /// `reactions.remove`: remove your reaction from a message.
    ///
    /// # Errors
    ///
    /// Returns an error if the reaction cannot be removed, including
    /// `no_reaction`.
    pub async fn reactions_remove(&self, channel: &str, ts: &str, emoji: &str) -> Result<Value> {
        self.call("reactions.remove", &reaction_params(channel, ts, emoji))
            .await
    }

    /// `files.list`: files visible to the user, optionally in one channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn files_list(&self, channel: Option<&str>, count: usize) -> Result<Value> {
        let mut params = vec![("count", count.to_string())];
        if let Some(channel) = channel {
            params.push(("channel", channel.to_string()));
        }
        self.call("files.list", &params).await
    }

    /// `search.messages`: full-text search across the workspace.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn search_messages(&self, query: &str, count: usize) -> Result<Value> {
        self.call(
            "search.messages",
            &[("query", query.to_string()), ("count", count.to_string())],
        )
        .await
    }

    /// Upload a file to a channel.
    ///
    /// Uses the external upload flow: reserve an upload URL with
    /// `files.getUploadURLExternal`, POST the bytes there, then share the
    /// file with `files.completeUploadExternal`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or any step fails.
    pub async fn upload_file(
        &self,
        channel_id: &str,
        file_path: &Path,
        initial_comment: Option<&str>,
    ) -> Result<Value> {
        let file_name = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| CoreError::Other("invalid file name".to_string()))?
            .to_string();

        let file_bytes = tokio::fs::read(file_path).await?;

        let ticket = self
            .call(
                "files.getUploadURLExternal",
                &[
                    ("filename", file_name.clone()),
                    ("length", file_bytes.len().to_string()),
                ],
            )
            .await?;

        let upload_url = ticket["upload_url"]
            .as_str()
            .ok_or_else(|| CoreError::Serialization("missing upload_url".to_string()))?;
        let file_id = ticket["file_id"]
            .as_str()
            .ok_or_else(|| CoreError::Serialization("missing file_id".to_string()))?;

        log::debug!("uploading {} bytes as {file_id}", file_bytes.len());
        let upload = self
            .http_client
            .post(upload_url)
            .body(file_bytes)
            .send()
            .await
            .map_err(|e| CoreError::Http(format!("uploading content: {e}")))?;

        if !upload.status().is_success() {
            let status = upload.status();
            let text = upload.text().await.unwrap_or_default();
            return Err(CoreError::Http(format!("upload failed: {status} - {text}")));
        }

        let files = json!([{ "id": file_id, "title": file_name }]).to_string();
        let mut params = vec![("files", files), ("channel_id", channel_id.to_string())];
        if let Some(comment) = initial_comment {
            params.push(("initial_comment", comment.to_string()));
        }
        self.call("files.completeUploadExternal", &params).await
    }
}

impl SlackApi for SlackClient {
    async fn users_info(&self, user_id: &str) -> Result<User> {
        let body = self.call("users.info", &[("user", user_id.to_string())]).await?;
        user_from_response(body)
    }

    async fn users_lookup_by_email(&self, email: &str) -> Result<User> {
        let body = self
            .call("users.lookupByEmail", &[("email", email.to_string())])
            .await?;
        user_from_response(body)
    }

    async fn users_list(&self, cursor: Option<String>, limit: u32) -> Result<Value> {
        self.call("users.list", &page_params(cursor, limit)).await
    }

    async fn conversations_list(
        &self,
        cursor: Option<String>,
        limit: u32,
        types: &str,
    ) -> Result<Value> {
        let mut params = page_params(cursor, limit);
        params.push(("types", types.to_string()));
        params.push(("exclude_archived", "true".to_string()));
        self.call("conversations.list", &params).await
    }

    async fn conversations_open(&self, user_ids: &[String]) -> Result<Value> {
        self.call("conversations.open", &[("users", user_ids.join(","))])
            .await
    }
}

/// Replace Slack tokens (`xoxp-...`, `xoxb-...`) in text with `xox*-****`.
#[must_use]
pub fn mask_token(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find("xox") {
        let (before, candidate) = rest.split_at(pos);
        out.push_str(before);

        let bytes = candidate.as_bytes();
        if bytes.len() > 4 && bytes[3].is_ascii_alphabetic() && bytes[4] == b'-' {
            let end = candidate[5..]
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
                .map_or(candidate.len(), |i| i + 5);
            out.push_str("xox*-****");
            rest = &candidate[end..];
        } else {
            out.push_str("xox");
            rest = &candidate[3..];
        }
    }

    out.push_str(rest);
    out
}

fn check_response(method: &str, body: Value) -> Result<Value> {
    if body.get("ok").and_then(Value::as_bool) == Some(true) {
        if let Some(warning) = body.get("warning").and_then(Value::as_str) {
            log::warn!("{method}: {warning}");
        }
        return Ok(body);
    }

    let code = body
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown_error")
        .to_string();
    log::debug!("{method} returned error {code}");
    Err(CoreError::Slack {
        method: method.to_string(),
        code,
    })
}

fn user_from_response(mut body: Value) -> Result<User> {
    match body.get_mut("user").map(Value::take) {
        Some(user @ Value::Object(_)) => User::from_value(user),
        _ => Err(CoreError::Serialization(
            "response has no user object".to_string(),
        )),
    }
}

fn page_params(cursor: Option<String>, limit: u32) -> Vec<(&'static str, String)> {
    let mut params = vec![("limit", limit.to_string())];
    if let Some(cursor) = cursor {
        params.push(("cursor", cursor));
    }
    params
}

fn reaction_params(channel: &str, ts: &str, emoji: &str) -> [(&'static str, String); 3] {
    [
        ("channel", channel.to_string()),
        ("timestamp", ts.to_string()),
        ("name", emoji.trim_matches(':').to_string()),
    ]
}
