//! Data models for Slack API responses.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::CoreError;

/// A Slack user record.
///
/// Only `id` and `name` are interpreted; every other profile field is kept
/// verbatim in `extra` so it can be rendered or re-serialized unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Platform-assigned user ID (e.g. `U012AB3CD`).
    pub id: String,
    /// Username (handle), without the leading `@`.
    #[serde(default)]
    pub name: String,
    /// Remaining fields as returned by the API.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    /// Build a user from a raw member object.
    ///
    /// # Errors
    ///
    /// Returns an error if the object has no string `id`.
    pub fn from_value(value: Value) -> Result<Self, CoreError> {
        serde_json::from_value(value)
            .map_err(|e| CoreError::Serialization(format!("parsing user record: {e}")))
    }

    /// Read a field by name, including `id` and `name`.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&str> {
        match key {
            "id" => Some(&self.id),
            "name" => Some(&self.name),
            _ => self.extra.get(key).and_then(Value::as_str),
        }
    }

    /// Read a string field, falling back to `default` when absent.
    #[must_use]
    pub fn field_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.field(key).unwrap_or(default)
    }

    /// Read a string inside the nested `profile` object.
    #[must_use]
    pub fn profile_field(&self, key: &str) -> Option<&str> {
        self.extra
            .get("profile")
            .and_then(|profile| profile.get(key))
            .and_then(Value::as_str)
    }

    /// Serialize back to the raw JSON shape.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = self.extra.clone();
        map.insert("id".to_string(), Value::String(self.id.clone()));
        map.insert("name".to_string(), Value::String(self.name.clone()));
        Value::Object(map)
    }
}

/// One page from a cursor-paginated listing method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    /// Items read from the listing's item field.
    pub items: Vec<Value>,
    /// Continuation cursor; `None` on the last page.
    pub next_cursor: Option<String>,
}

impl Page {
    /// Split a listing response into its items and continuation cursor.
    ///
    /// Listings differ in where they keep their items (`members`, `channels`,
    /// ...), so the field is named by the caller. A missing or non-array
    /// field yields an empty page; an empty cursor means no further pages.
    #[must_use]
    pub fn from_response(mut response: Value, items_field: &str) -> Self {
        let items = match response.get_mut(items_field).map(Value::take) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };

        let next_cursor = response
            .pointer("/response_metadata/next_cursor")
            .and_then(Value::as_str)
            .filter(|cursor| !cursor.is_empty())
            .map(String::from);

        Self { items, next_cursor }
    }

    /// Whether the server signalled that no pages follow this one.
    #[must_use]
    pub const fn is_last(&self) -> bool {
        self.next_cursor.is_none()
    }
}
