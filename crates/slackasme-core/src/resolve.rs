//! Turning user-supplied identifiers into Slack records.
//!
//! A user token may be a raw ID (`U012AB3CD`), an email address, an
//! `@mention` or a bare username. [`classify`] picks the cheapest lookup for
//! the token's shape using an ordered rule table; usernames have no direct
//! lookup and are found by scanning `users.list`.
//!
//! Slack's "not found" answers (`user_not_found`, `users_not_found`) are
//! reported as `None`. Any other failure is returned as an error.

use serde_json::Value;

use crate::paginate;
use crate::slack::{SlackApi, User};
use crate::{CoreError, Result};

/// How a user token will be looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserLookup {
    /// `users.info` with the token verbatim.
    Id,
    /// `users.lookupByEmail` with the token verbatim.
    Email,
    /// Scan `users.list` for an exact `name` match.
    Username,
}

/// Classification rules, tried in order. The last rule always matches.
const USER_RULES: &[(fn(&str) -> bool, UserLookup)] = &[
    (is_user_id, UserLookup::Id),
    (is_email, UserLookup::Email),
    (always, UserLookup::Username),
];

/// Channel types searched when resolving a channel by name.
const CHANNEL_TYPES: &str = "public_channel,private_channel";

/// Pick the lookup strategy for a user token.
#[must_use]
pub fn classify(token: &str) -> UserLookup {
    USER_RULES
        .iter()
        .find(|(matches, _)| matches(token))
        .map_or(UserLookup::Username, |&(_, lookup)| lookup)
}

/// Whether the token has the shape of a user ID: a `U` or `W` prefix and
/// 9 to 11 characters in total. The remaining characters are not checked.
#[must_use]
pub fn is_user_id(token: &str) -> bool {
    token.starts_with(['U', 'W']) && (9..=11).contains(&token.chars().count())
}

/// Whether the token has the shape of a channel ID: a `C`, `G` or `D` prefix
/// followed by uppercase letters and digits, 9 to 11 characters in total.
///
/// The alphabet is checked here because channel arguments are also names,
/// and a name like `Dev-team01` must reach the name search.
#[must_use]
pub fn is_channel_id(token: &str) -> bool {
    let mut chars = token.chars();
    chars.next().is_some_and(|first| matches!(first, 'C' | 'G' | 'D'))
        && (9..=11).contains(&token.len())
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

/// Conservative email check: one `@` with text before it, a dot after it
/// with text on both sides, and no whitespace anywhere.
#[must_use]
pub fn is_email(token: &str) -> bool {
    if token.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = token.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match (domain.find('.'), domain.rfind('.')) {
        (Some(first), Some(last)) => first > 0 && last + 1 < domain.len(),
        _ => false,
    }
}

const fn always(_: &str) -> bool {
    true
}

/// Resolve one user token to a user record.
///
/// Returns `Ok(None)` when Slack reports the ID or email as unknown, or when
/// no member has the given username.
///
/// # Errors
///
/// Returns any transport or API error other than "not found".
pub async fn resolve_user<A: SlackApi>(api: &A, token: &str) -> Result<Option<User>> {
    let lookup = classify(token);
    log::debug!("resolving {token:?} by {lookup:?}");

    match lookup {
        UserLookup::Id => soft_not_found(api.users_info(token).await),
        UserLookup::Email => soft_not_found(api.users_lookup_by_email(token).await),
        UserLookup::Username => {
            let username = token.strip_prefix('@').unwrap_or(token);
            let found = paginate::find(
                |cursor, limit| api.users_list(cursor, limit),
                "members",
                |member| member.get("name").and_then(Value::as_str) == Some(username),
            )
            .await?;
            found.map(User::from_value).transpose()
        }
    }
}

/// Resolve several user tokens, in order.
///
/// Returns `(resolved, not_found)`: every token lands in exactly one of the
/// two lists and both keep input order. Duplicates are resolved again.
///
/// # Errors
///
/// The first hard error aborts the batch.
pub async fn resolve_users<A, S>(api: &A, tokens: &[S]) -> Result<(Vec<User>, Vec<String>)>
where
    A: SlackApi,
    S: AsRef<str>,
{
    let mut resolved = Vec::new();
    let mut not_found = Vec::new();

    for token in tokens {
        let token = token.as_ref();
        match resolve_user(api, token).await? {
            Some(user) => resolved.push(user),
            None => not_found.push(token.to_string()),
        }
    }

    Ok((resolved, not_found))
}

/// Resolve a channel reference to a channel ID.
///
/// - Channel IDs are returned as given.
/// - `@user` opens (or reuses) the direct message with that user.
/// - Anything else is a channel name, with or without a leading `#`,
///   matched against public and private channels.
///
/// Returns `Ok(None)` when the user or channel does not exist.
///
/// # Errors
///
/// Returns any transport or API error other than "not found".
pub async fn resolve_channel<A: SlackApi>(api: &A, token: &str) -> Result<Option<String>> {
    if is_channel_id(token) {
        return Ok(Some(token.to_string()));
    }

    if let Some(mention) = token.strip_prefix('@') {
        let Some(user) = resolve_user(api, mention).await? else {
            return Ok(None);
        };
        let opened = api.conversations_open(&[user.id]).await?;
        return opened
            .pointer("/channel/id")
            .and_then(Value::as_str)
            .map(|id| Some(id.to_string()))
            .ok_or_else(|| {
                CoreError::Serialization("conversations.open returned no channel id".to_string())
            });
    }

    let name = token.strip_prefix('#').unwrap_or(token);
    let found = paginate::find(
        |cursor, limit| api.conversations_list(cursor, limit, CHANNEL_TYPES),
        "channels",
        |channel| channel.get("name").and_then(Value::as_str) == Some(name),
    )
    .await?;

    Ok(found.and_then(|channel| channel.get("id")?.as_str().map(String::from)))
}

fn soft_not_found(result: Result<User>) -> Result<Option<User>> {
    match result {
        Ok(user) => Ok(Some(user)),
        Err(e) if e.is_not_found() => {
            log::debug!("lookup reported not found: {e}");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::{Cell, RefCell};

    fn slack_error(method: &str, code: &str) -> CoreError {
        CoreError::Slack {
            method: method.to_string(),
            code: code.to_string(),
        }
    }

    fn user(id: &str, name: &str) -> Value {
        json!({"id": id, "name": name, "real_name": name.to_uppercase()})
    }

    /// In-memory workspace that counts every call made against it.
    #[derive(Default)]
    struct FakeWorkspace {
        by_id: Vec<Value>,
        by_email: Vec<(String, Value)>,
        member_pages: Vec<Vec<Value>>,
        channel_pages: Vec<Vec<Value>>,
        failing_code: Option<&'static str>,
        info_calls: Cell<usize>,
        email_calls: Cell<usize>,
        list_calls: Cell<usize>,
        open_calls: RefCell<Vec<Vec<String>>>,
        channel_types: RefCell<Vec<String>>,
    }

    impl FakeWorkspace {
        fn failure(&self, method: &str) -> Option<CoreError> {
            self.failing_code.map(|code| slack_error(method, code))
        }

        fn page(pages: &[Vec<Value>], field: &str, cursor: Option<&str>) -> Value {
            let index: usize = cursor.map_or(0, |c| c.trim_start_matches("page_").parse().unwrap_or(0));
            let items = pages.get(index).cloned().unwrap_or_default();
            let next = if index + 1 < pages.len() {
                format!("page_{}", index + 1)
            } else {
                String::new()
            };
            json!({"ok": true, field: items, "response_metadata": {"next_cursor": next}})
        }
    }

    impl SlackApi for FakeWorkspace {
        async fn users_info(&self, user_id: &str) -> Result<User> {
            self.info_calls.set(self.info_calls.get() + 1);
            if let Some(err) = self.failure("users.info") {
                return Err(err);
            }
            self.by_id
                .iter()
                .find(|u| u["id"] == user_id)
                .cloned()
                .map_or_else(|| Err(slack_error("users.info", "user_not_found")), User::from_value)
        }

        async fn users_lookup_by_email(&self, email: &str) -> Result<User> {
            self.email_calls.set(self.email_calls.get() + 1);
            if let Some(err) = self.failure("users.lookupByEmail") {
                return Err(err);
            }
            self.by_email
                .iter()
                .find(|(e, _)| e == email)
                .map(|(_, u)| u.clone())
                .map_or_else(
                    || Err(slack_error("users.lookupByEmail", "users_not_found")),
                    User::from_value,
                )
        }

        async fn users_list(&self, cursor: Option<String>, _limit: u32) -> Result<Value> {
            self.list_calls.set(self.list_calls.get() + 1);
            if let Some(err) = self.failure("users.list") {
                return Err(err);
            }
            Ok(Self::page(&self.member_pages, "members", cursor.as_deref()))
        }

        async fn conversations_list(
            &self,
            cursor: Option<String>,
            _limit: u32,
            types: &str,
        ) -> Result<Value> {
            self.channel_types.borrow_mut().push(types.to_string());
            Ok(Self::page(&self.channel_pages, "channels", cursor.as_deref()))
        }

        async fn conversations_open(&self, user_ids: &[String]) -> Result<Value> {
            self.open_calls.borrow_mut().push(user_ids.to_vec());
            Ok(json!({"ok": true, "channel": {"id": "D0DMCHAN01"}}))
        }
    }

    fn workspace() -> FakeWorkspace {
        FakeWorkspace {
            by_id: vec![user("U12345678", "user1"), user("W1234567890", "enterprise")],
            by_email: vec![("user2@example.com".to_string(), user("U87654321", "user2"))],
            member_pages: vec![
                vec![user("U00000001", "alice"), user("U00000002", "bob")],
                vec![user("U00000003", "johndoe")],
            ],
            channel_pages: vec![
                vec![json!({"id": "C0GENERAL1", "name": "general"})],
                vec![json!({"id": "C0RANDOM01", "name": "random"})],
            ],
            ..FakeWorkspace::default()
        }
    }

    #[test]
    fn user_id_length_boundaries() {
        assert_eq!(classify("U1234567"), UserLookup::Username);
        assert_eq!(classify("U12345678"), UserLookup::Id);
        assert_eq!(classify("U1234567890"), UserLookup::Id);
        assert_eq!(classify("U12345678901"), UserLookup::Username);
        assert_eq!(classify("U123"), UserLookup::Username);
    }

    #[test]
    fn user_id_prefix_and_alphabet() {
        assert_eq!(classify("W12345678"), UserLookup::Id);
        assert_eq!(classify("X12345678"), UserLookup::Username);
        assert_eq!(classify(""), UserLookup::Username);
    }

    #[test]
    fn user_id_shape_ignores_characters_after_prefix() {
        assert_eq!(classify("Ulysses123"), UserLookup::Id);
        assert_eq!(classify("Uabcdefgh"), UserLookup::Id);
        assert_eq!(classify("W12345678x"), UserLookup::Id);
        assert_eq!(classify("ulysses123"), UserLookup::Username);
    }

    #[test]
    fn email_boundaries() {
        assert_eq!(classify("john@example.com"), UserLookup::Email);
        assert_eq!(classify("a@b.c"), UserLookup::Email);
        assert_eq!(classify("first.last@mail.example.org"), UserLookup::Email);

        for token in ["foo@bar.", "@.x", "noat.com", "spaces @test.com", "a@.b", "a@b", "a@b@c.d", "@johndoe"] {
            assert_eq!(classify(token), UserLookup::Username, "{token}");
        }
    }

    #[test]
    fn channel_id_shape() {
        assert!(is_channel_id("C0GENERAL1"));
        assert!(is_channel_id("D12345678"));
        assert!(is_channel_id("G1234567890"));
        assert!(!is_channel_id("general"));
        assert!(!is_channel_id("C123"));
        assert!(!is_channel_id("U12345678"));
        assert!(!is_channel_id("Dev-team01"));
        assert!(!is_channel_id("Cgeneral12"));
    }

    #[tokio::test]
    async fn id_token_uses_direct_lookup() {
        let api = workspace();
        let found = resolve_user(&api, "U12345678").await.expect("resolve");

        assert_eq!(found.expect("user").name, "user1");
        assert_eq!(api.info_calls.get(), 1);
        assert_eq!(api.list_calls.get(), 0);
    }

    #[tokio::test]
    async fn short_id_falls_through_to_username_search() {
        let api = workspace();
        let found = resolve_user(&api, "U123").await.expect("resolve");

        assert!(found.is_none());
        assert_eq!(api.info_calls.get(), 0);
        assert_eq!(api.list_calls.get(), 2);
    }

    #[tokio::test]
    async fn email_token_uses_email_lookup() {
        let api = workspace();
        let found = resolve_user(&api, "user2@example.com").await.expect("resolve");

        assert_eq!(found.expect("user").id, "U87654321");
        assert_eq!(api.email_calls.get(), 1);
        assert_eq!(api.list_calls.get(), 0);
    }

    #[tokio::test]
    async fn malformed_email_is_searched_as_username() {
        let api = workspace();
        let found = resolve_user(&api, "foo@bar.").await.expect("resolve");

        assert!(found.is_none());
        assert_eq!(api.email_calls.get(), 0);
        assert_eq!(api.list_calls.get(), 2);
    }

    #[tokio::test]
    async fn mention_and_bare_username_resolve_identically() {
        let api = workspace();
        let with_at = resolve_user(&api, "@johndoe").await.expect("resolve");
        let bare = resolve_user(&api, "johndoe").await.expect("resolve");

        assert_eq!(with_at, bare);
        assert_eq!(bare.expect("user").id, "U00000003");
    }

    #[tokio::test]
    async fn username_search_stops_at_matching_page() {
        let api = workspace();
        resolve_user(&api, "alice").await.expect("resolve");
        assert_eq!(api.list_calls.get(), 1);
    }

    #[tokio::test]
    async fn unknown_id_and_email_are_none() {
        let api = workspace();
        assert!(resolve_user(&api, "U99999999").await.expect("resolve").is_none());
        assert!(resolve_user(&api, "ghost@example.com").await.expect("resolve").is_none());
        assert!(resolve_user(&api, "nonexistent").await.expect("resolve").is_none());
    }

    #[tokio::test]
    async fn id_shaped_username_is_looked_up_by_id() {
        let mut api = workspace();
        api.member_pages = vec![vec![user("U00000009", "Ulysses123")]];

        let found = resolve_user(&api, "Ulysses123").await.expect("resolve");
        assert!(found.is_none());
        assert_eq!(api.info_calls.get(), 1);
        assert_eq!(api.list_calls.get(), 0);
    }

    #[tokio::test]
    async fn hard_errors_propagate() {
        for token in ["U12345678", "user2@example.com", "johndoe"] {
            let api = FakeWorkspace {
                failing_code: Some("invalid_auth"),
                ..workspace()
            };
            let err = resolve_user(&api, token).await.expect_err("hard error");
            assert_eq!(err.slack_code(), Some("invalid_auth"), "{token}");
        }
    }

    #[tokio::test]
    async fn resolution_is_idempotent() {
        let api = workspace();
        for token in ["U12345678", "user2@example.com", "@johndoe", "nobody"] {
            let first = resolve_user(&api, token).await.expect("resolve");
            let second = resolve_user(&api, token).await.expect("resolve");
            assert_eq!(first, second, "{token}");
        }
    }

    #[tokio::test]
    async fn batch_keeps_input_order() {
        let api = workspace();
        let (resolved, not_found) = resolve_users(&api, &["U12345678", "user2@example.com"])
            .await
            .expect("batch");

        let ids: Vec<&str> = resolved.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, ["U12345678", "U87654321"]);
        assert!(not_found.is_empty());
    }

    #[tokio::test]
    async fn batch_partitions_not_found() {
        let api = workspace();
        let tokens = vec!["U12345678".to_string(), "nonexistent".to_string(), "@bob".to_string()];
        let (resolved, not_found) = resolve_users(&api, &tokens).await.expect("batch");

        let ids: Vec<&str> = resolved.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, ["U12345678", "U00000002"]);
        assert_eq!(not_found, ["nonexistent"]);
    }

    #[tokio::test]
    async fn batch_does_not_deduplicate() {
        let api = workspace();
        let (resolved, _) = resolve_users(&api, &["U12345678", "U12345678"]).await.expect("batch");
        assert_eq!(resolved.len(), 2);
        assert_eq!(api.info_calls.get(), 2);
    }

    #[tokio::test]
    async fn batch_aborts_on_hard_error() {
        let api = FakeWorkspace {
            failing_code: Some("ratelimited"),
            ..workspace()
        };
        let err = resolve_users(&api, &["U12345678", "user2@example.com"])
            .await
            .expect_err("abort");
        assert_eq!(err.slack_code(), Some("ratelimited"));
        assert_eq!(api.email_calls.get(), 0);
    }

    #[tokio::test]
    async fn channel_id_is_used_verbatim() {
        let api = workspace();
        let id = resolve_channel(&api, "C0RANDOM01").await.expect("resolve");
        assert_eq!(id.as_deref(), Some("C0RANDOM01"));
        assert!(api.channel_types.borrow().is_empty());
    }

    #[tokio::test]
    async fn channel_name_is_searched_with_or_without_hash() {
        let api = workspace();
        let plain = resolve_channel(&api, "random").await.expect("resolve");
        let hashed = resolve_channel(&api, "#random").await.expect("resolve");

        assert_eq!(plain.as_deref(), Some("C0RANDOM01"));
        assert_eq!(plain, hashed);
        assert!(api.channel_types.borrow().iter().all(|t| t == CHANNEL_TYPES));
    }

    #[tokio::test]
    async fn unknown_channel_is_none() {
        let api = workspace();
        assert!(resolve_channel(&api, "#nope").await.expect("resolve").is_none());
    }

    #[tokio::test]
    async fn user_mention_opens_direct_message() {
        let api = workspace();
        let id = resolve_channel(&api, "@johndoe").await.expect("resolve");

        assert_eq!(id.as_deref(), Some("D0DMCHAN01"));
        assert_eq!(*api.open_calls.borrow(), vec![vec!["U00000003".to_string()]]);
    }

    #[tokio::test]
    async fn unknown_mention_opens_nothing() {
        let api = workspace();
        assert!(resolve_channel(&api, "@ghost").await.expect("resolve").is_none());
        assert!(api.open_calls.borrow().is_empty());
    }
}
