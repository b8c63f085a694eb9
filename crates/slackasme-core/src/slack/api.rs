//! The subset of the Slack Web API that identifier resolution depends on.

use std::future::Future;

use serde_json::Value;

use crate::Result;
use crate::slack::models::User;

/// Remote calls used by [`crate::resolve`] and [`crate::paginate`].
///
/// Listing methods take the continuation cursor (`None` for the first page)
/// and a page size, and return the raw response so the paginator can read
/// whichever item field the listing uses. Lookup methods return the user
/// record or a [`crate::CoreError::Slack`] with a `*_not_found` code.
pub trait SlackApi {
    /// `users.info`: look up a user by ID.
    fn users_info(&self, user_id: &str) -> impl Future<Output = Result<User>>;

    /// `users.lookupByEmail`: look up a user by email address.
    fn users_lookup_by_email(&self, email: &str) -> impl Future<Output = Result<User>>;

    /// `users.list`: one page of workspace members (items in `members`).
    fn users_list(&self, cursor: Option<String>, limit: u32)
    -> impl Future<Output = Result<Value>>;

    /// `conversations.list`: one page of channels (items in `channels`).
    ///
    /// `types` is the comma-separated channel type filter, e.g.
    /// `public_channel,private_channel`.
    fn conversations_list(
        &self,
        cursor: Option<String>,
        limit: u32,
        types: &str,
    ) -> impl Future<Output = Result<Value>>;

    /// `conversations.open`: open (or fetch) a DM or group DM with the users.
    fn conversations_open(&self, user_ids: &[String]) -> impl Future<Output = Result<Value>>;
}
