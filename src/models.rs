//! Response wrapper returned by the client
//!
//! An [`ApiResponse`] keeps the raw JSON payload together with where it came
//! from: the request URL, whether it was served from the cache, and when it
//! was last fetched from the API.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::pipeline::FetchResult;

/// Paging cursors of a list response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Cursors {
    pub after: Option<String>,
    pub before: Option<String>,
}

/// A payload from the API with its provenance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    url: String,
    data: Value,
    cached: bool,
    last_updated: DateTime<Utc>,
}

impl ApiResponse {
    /// Wraps a pipeline result for the request `url`
    pub fn new(url: impl Into<String>, result: FetchResult) -> Self {
        Self {
            url: url.into(),
            data: result.value,
            cached: result.is_from_cache,
            last_updated: result.observed_at,
        }
    }

    /// Request URL, which is also the cache key
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn into_data(self) -> Value {
        self.data
    }

    /// True if the payload was served from the cache
    pub fn is_cached(&self) -> bool {
        self.cached
    }

    /// When the payload was fetched from the API
    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    /// Looks up a top-level field
    ///
    /// Accepts both the API's camelCase names and snake_case spellings:
    /// `get("member_list")` finds `memberList`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        lookup_field(&self.data, key)
    }

    /// Follows a dot-separated path through objects and arrays
    ///
    /// `get_path("memberList.0.name")` returns the first member's name.
    /// Object segments accept snake_case like [`get`](Self::get).
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        path.split('.').try_fold(&self.data, |value, segment| match value {
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => lookup_field(value, segment),
        })
    }

    /// List items of a list response
    ///
    /// Returns the `items` array of paginated responses, or the payload itself
    /// when it is a bare array.
    pub fn items(&self) -> Option<&[Value]> {
        match &self.data {
            Value::Array(items) => Some(items.as_slice()),
            Value::Object(map) => map.get("items")?.as_array().map(Vec::as_slice),
            _ => None,
        }
    }

    /// Paging cursors, empty for responses that are not paginated
    pub fn cursors(&self) -> Cursors {
        let cursor = |name: &str| {
            self.data
                .pointer(&format!("/paging/cursors/{}", name))
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        Cursors {
            after: cursor("after"),
            before: cursor("before"),
        }
    }

    /// True if the API reported a following page
    pub fn has_next_page(&self) -> bool {
        self.cursors().after.is_some()
    }

    /// Deserializes the payload into a caller-defined type
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.clone())
    }
}

/// Looks up `key` as given, then in camelCase
fn lookup_field<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    let map = value.as_object()?;
    map.get(key).or_else(|| map.get(&snake_to_camel(key)))
}

/// `member_list` -> `memberList`
fn snake_to_camel(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    for c in key.chars() {
        if c == '_' {
            upper_next = !out.is_empty();
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}
