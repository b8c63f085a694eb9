//! Cursor pagination over Slack listing methods.
//!
//! Listing methods (`users.list`, `conversations.list`, ...) return one page
//! of items plus a `response_metadata.next_cursor`. [`paginate_until`] drives
//! such a method either until a limit of items is collected or until a
//! predicate matches, fetching no more pages than needed.

use std::future::Future;

use serde_json::Value;

use crate::Result;
use crate::slack::models::Page;

/// Items requested per page. Slack caps listing pages at 200.
pub const PAGE_SIZE: u32 = 200;

/// Result of a pagination run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Paginated {
    /// Items collected in collect mode, at most `limit` of them.
    Collected(Vec<Value>),
    /// First item the predicate matched.
    Found(Value),
    /// The predicate matched nothing before the last page.
    NotFound,
}

impl Paginated {
    /// Items from collect mode; a found item becomes a single-item list.
    #[must_use]
    pub fn into_items(self) -> Vec<Value> {
        match self {
            Self::Collected(items) => items,
            Self::Found(item) => vec![item],
            Self::NotFound => Vec::new(),
        }
    }

    /// The matched item from find mode.
    #[must_use]
    pub fn into_found(self) -> Option<Value> {
        match self {
            Self::Found(item) => Some(item),
            Self::Collected(_) | Self::NotFound => None,
        }
    }
}

/// Drive a cursor-paginated listing.
///
/// `fetch` is called with the continuation cursor (`None` first) and
/// [`PAGE_SIZE`]; items are read from `items_field` of each response.
///
/// - With `find`, pages are scanned in order and the first matching item is
///   returned without fetching further pages. `limit` is ignored.
/// - Without `find`, items accumulate until `limit` is reached (the result
///   is truncated to exactly `limit`) or the last page has been read.
///
/// Errors from `fetch` are returned unchanged; there is no retry.
///
/// # Errors
///
/// Returns the first error produced by `fetch`.
pub async fn paginate_until<F, Fut, P>(
    mut fetch: F,
    items_field: &str,
    limit: Option<usize>,
    mut find: Option<P>,
) -> Result<Paginated>
where
    F: FnMut(Option<String>, u32) -> Fut,
    Fut: Future<Output = Result<Value>>,
    P: FnMut(&Value) -> bool,
{
    let mut collected = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0_usize;

    if find.is_none() && limit == Some(0) {
        return Ok(Paginated::Collected(collected));
    }

    loop {
        let response = fetch(cursor.take(), PAGE_SIZE).await?;
        let page = Page::from_response(response, items_field);
        pages += 1;
        log::trace!(
            "page {pages} of {items_field}: {} items, more: {}",
            page.items.len(),
            !page.is_last()
        );

        if let Some(matches) = find.as_mut() {
            if let Some(hit) = page.items.into_iter().find(|item| matches(item)) {
                return Ok(Paginated::Found(hit));
            }
        } else {
            collected.extend(page.items);
            if let Some(limit) = limit
                && collected.len() >= limit
            {
                collected.truncate(limit);
                return Ok(Paginated::Collected(collected));
            }
        }

        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    if find.is_some() {
        Ok(Paginated::NotFound)
    } else {
        Ok(Paginated::Collected(collected))
    }
}

/// Collect up to `limit` items (all items when `None`).
///
/// # Errors
///
/// Returns the first error produced by `fetch`.
pub async fn collect<F, Fut>(fetch: F, items_field: &str, limit: Option<usize>) -> Result<Vec<Value>>
where
    F: FnMut(Option<String>, u32) -> Fut,
    Fut: Future<Output = Result<Value>>,
{
    paginate_until(fetch, items_field, limit, None::<fn(&Value) -> bool>)
        .await
        .map(Paginated::into_items)
}

/// Return the first item matching `predicate`, stopping at the page it is on.
///
/// # Errors
///
/// Returns the first error produced by `fetch`.
pub async fn find<F, Fut, P>(fetch: F, items_field: &str, predicate: P) -> Result<Option<Value>>
where
    F: FnMut(Option<String>, u32) -> Fut,
    Fut: Future<Output = Result<Value>>,
    P: FnMut(&Value) -> bool,
{
    paginate_until(fetch, items_field, None, Some(predicate))
        .await
        .map(Paginated::into_found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CoreError;
    use serde_json::json;
    use std::cell::RefCell;

    /// Serves a fixed sequence of pages and records every call.
    struct ScriptedListing {
        pages: Vec<Value>,
        calls: RefCell<Vec<(Option<String>, u32)>>,
    }

    impl ScriptedListing {
        fn new(pages: Vec<Value>) -> Self {
            Self {
                pages,
                calls: RefCell::new(Vec::new()),
            }
        }

        fn fetch(&self, cursor: Option<String>, limit: u32) -> impl Future<Output = Result<Value>> {
            let mut calls = self.calls.borrow_mut();
            let page = self.pages.get(calls.len()).cloned();
            calls.push((cursor, limit));
            async move { page.ok_or_else(|| CoreError::Other("fetched past the last page".to_string())) }
        }

        fn call_count(&self) -> usize {
            self.calls.borrow().len()
        }

        fn cursors(&self) -> Vec<Option<String>> {
            self.calls.borrow().iter().map(|(c, _)| c.clone()).collect()
        }
    }

    fn members(ids: &[&str], next_cursor: &str) -> Value {
        let members: Vec<Value> = ids
            .iter()
            .map(|id| json!({"id": id, "name": id.to_lowercase()}))
            .collect();
        json!({
            "ok": true,
            "members": members,
            "response_metadata": {"next_cursor": next_cursor},
        })
    }

    fn ids(items: &[Value]) -> Vec<&str> {
        items.iter().filter_map(|i| i["id"].as_str()).collect()
    }

    #[tokio::test]
    async fn single_page_without_cursor() {
        let listing = ScriptedListing::new(vec![members(&["U1", "U2"], "")]);
        let items = collect(|c, l| listing.fetch(c, l), "members", Some(10))
            .await
            .expect("collect");

        assert_eq!(ids(&items), ["U1", "U2"]);
        assert_eq!(listing.call_count(), 1);
    }

    #[tokio::test]
    async fn follows_cursor_across_pages() {
        let listing = ScriptedListing::new(vec![
            members(&["U1", "U2"], "cursor_page_2"),
            members(&["U3", "U4"], ""),
        ]);
        let items = collect(|c, l| listing.fetch(c, l), "members", Some(10))
            .await
            .expect("collect");

        assert_eq!(ids(&items), ["U1", "U2", "U3", "U4"]);
        assert_eq!(
            *listing.calls.borrow(),
            vec![(None, PAGE_SIZE), (Some("cursor_page_2".to_string()), PAGE_SIZE)]
        );
    }

    #[tokio::test]
    async fn limit_stops_before_next_page() {
        let listing = ScriptedListing::new(vec![
            members(&["U1", "U2", "U3"], "cursor_page_2"),
            members(&["U4"], ""),
        ]);
        let items = collect(|c, l| listing.fetch(c, l), "members", Some(2))
            .await
            .expect("collect");

        assert_eq!(ids(&items), ["U1", "U2"]);
        assert_eq!(listing.call_count(), 1);
    }

    #[tokio::test]
    async fn limit_exactly_met_at_page_boundary_fetches_no_more() {
        let listing = ScriptedListing::new(vec![
            members(&["U1", "U2"], "p2"),
            members(&["U3", "U4"], "p3"),
            members(&["U5"], ""),
        ]);
        let items = collect(|c, l| listing.fetch(c, l), "members", Some(4))
            .await
            .expect("collect");

        assert_eq!(items.len(), 4);
        assert_eq!(listing.call_count(), 2);
    }

    #[tokio::test]
    async fn limit_never_exceeded_for_any_value() {
        for limit in 1..=6 {
            let listing = ScriptedListing::new(vec![
                members(&["U1", "U2"], "p2"),
                members(&["U3", "U4"], "p3"),
                members(&["U5"], ""),
            ]);
            let items = collect(|c, l| listing.fetch(c, l), "members", Some(limit))
                .await
                .expect("collect");

            assert_eq!(items.len(), limit.min(5), "limit {limit}");
            let pages_needed = match limit {
                1 | 2 => 1,
                3 | 4 => 2,
                _ => 3,
            };
            assert_eq!(listing.call_count(), pages_needed, "limit {limit}");
        }
    }

    #[tokio::test]
    async fn no_limit_reads_every_page() {
        let listing = ScriptedListing::new(vec![
            members(&["U1"], "p2"),
            members(&["U2"], "p3"),
            members(&["U3"], ""),
        ]);
        let items = collect(|c, l| listing.fetch(c, l), "members", None)
            .await
            .expect("collect");

        assert_eq!(ids(&items), ["U1", "U2", "U3"]);
        assert_eq!(
            listing.cursors(),
            vec![None, Some("p2".to_string()), Some("p3".to_string())]
        );
    }

    #[tokio::test]
    async fn zero_limit_fetches_nothing() {
        let listing = ScriptedListing::new(vec![members(&["U1"], "")]);
        let items = collect(|c, l| listing.fetch(c, l), "members", Some(0))
            .await
            .expect("collect");

        assert!(items.is_empty());
        assert_eq!(listing.call_count(), 0);
    }

    #[tokio::test]
    async fn find_exits_on_first_page() {
        let listing = ScriptedListing::new(vec![
            members(&["ALICE", "BOB"], "cursor_page_2"),
            members(&["CAROL"], ""),
        ]);
        let found = find(
            |c, l| listing.fetch(c, l),
            "members",
            |u| u["name"] == "bob",
        )
        .await
        .expect("find");

        assert_eq!(found.expect("bob")["id"], "BOB");
        assert_eq!(listing.call_count(), 1);
    }

    #[tokio::test]
    async fn find_continues_to_matching_page() {
        let listing = ScriptedListing::new(vec![
            members(&["ALICE"], "p2"),
            members(&["BOB"], "p3"),
            members(&["CAROL"], ""),
        ]);
        let found = find(
            |c, l| listing.fetch(c, l),
            "members",
            |u| u["name"] == "bob",
        )
        .await
        .expect("find");

        assert_eq!(found.expect("bob")["id"], "BOB");
        assert_eq!(listing.call_count(), 2);
    }

    #[tokio::test]
    async fn find_returns_none_after_last_page() {
        let listing = ScriptedListing::new(vec![members(&["ALICE"], "p2"), members(&["BOB"], "")]);
        let found = find(
            |c, l| listing.fetch(c, l),
            "members",
            |u| u["name"] == "nonexistent",
        )
        .await
        .expect("find");

        assert!(found.is_none());
        assert_eq!(listing.call_count(), 2);
    }

    #[tokio::test]
    async fn find_ignores_limit() {
        let listing = ScriptedListing::new(vec![members(&["ALICE"], "p2"), members(&["BOB"], "")]);
        let result = paginate_until(
            |c, l| listing.fetch(c, l),
            "members",
            Some(1),
            Some(|u: &Value| u["name"] == "bob"),
        )
        .await
        .expect("paginate");

        assert_eq!(result, Paginated::Found(json!({"id": "BOB", "name": "bob"})));
    }

    #[tokio::test]
    async fn fetch_error_propagates_unchanged() {
        let listing = ScriptedListing::new(vec![members(&["U1"], "p2")]);
        let err = collect(|c, l| listing.fetch(c, l), "members", None)
            .await
            .expect_err("second page is missing");

        assert!(matches!(err, CoreError::Other(ref msg) if msg == "fetched past the last page"));
        assert_eq!(listing.call_count(), 2);
    }
}
