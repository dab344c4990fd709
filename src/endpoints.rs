//! Request URL construction for the Clash Royale API
//!
//! The URL built here doubles as the cache key, so two logically identical
//! requests must produce byte-identical strings: query parameters are always
//! emitted in the same order and unset parameters are left out.

use url::form_urlencoded;

use crate::error::ApiError;
use crate::tag::normalize_tag;

/// Base URL of the official API
pub const DEFAULT_BASE_URL: &str = "https://api.clashroyale.com/v1";

/// Cursor-based paging parameters shared by list endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paging {
    pub limit: Option<u32>,
    pub after: Option<String>,
    pub before: Option<String>,
}

impl Paging {
    /// First page with at most `limit` items
    pub fn limit(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            ..Default::default()
        }
    }

    fn append_to(&self, query: &mut QueryBuilder) {
        query.push("limit", self.limit);
        query.push("after", self.after.as_deref());
        query.push("before", self.before.as_deref());
    }
}

/// Search parameters for `GET /clans`
///
/// At least one filter must be set or the API answers with 400.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClanSearch {
    pub name: Option<String>,
    pub location_id: Option<u32>,
    pub min_members: Option<u32>,
    pub max_members: Option<u32>,
    pub min_score: Option<u32>,
    pub paging: Paging,
}

impl ClanSearch {
    /// Search by clan name
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_location(mut self, location_id: u32) -> Self {
        self.location_id = Some(location_id);
        self
    }

    pub fn with_members(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.min_members = min;
        self.max_members = max;
        self
    }

    pub fn with_min_score(mut self, min_score: u32) -> Self {
        self.min_score = Some(min_score);
        self
    }

    pub fn with_paging(mut self, paging: Paging) -> Self {
        self.paging = paging;
        self
    }
}

/// Accumulates `key=value` pairs, skipping unset values
struct QueryBuilder {
    serializer: form_urlencoded::Serializer<'static, String>,
}

impl QueryBuilder {
    fn new() -> Self {
        Self {
            serializer: form_urlencoded::Serializer::new(String::new()),
        }
    }

    fn push<V: ToString>(&mut self, key: &str, value: Option<V>) {
        if let Some(value) = value {
            self.serializer.append_pair(key, &value.to_string());
        }
    }

    fn finish(mut self) -> String {
        self.serializer.finish()
    }
}

/// Builds request URLs against a base URL
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl Endpoints {
    /// Uses `base` as the API root; a trailing `/` is ignored
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into().trim_end_matches('/').to_string();
        Self { base }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// `GET /clans?name=..&locationId=..&minMembers=..&maxMembers=..&minScore=..&limit=..&after=..&before=..`
    pub fn clans(&self, search: &ClanSearch) -> String {
        let mut query = QueryBuilder::new();
        query.push("name", search.name.as_deref());
        query.push("locationId", search.location_id);
        query.push("minMembers", search.min_members);
        query.push("maxMembers", search.max_members);
        query.push("minScore", search.min_score);
        search.paging.append_to(&mut query);
        format!("{}/clans?{}", self.base, query.finish())
    }

    /// `GET /clans/{tag}`
    pub fn clan(&self, tag: &str) -> Result<String, ApiError> {
        Ok(format!("{}/clans/{}", self.base, normalize_tag(tag)?))
    }

    /// `GET /clans/{tag}/members?limit=..&after=..&before=..`
    pub fn clan_members(&self, tag: &str, paging: &Paging) -> Result<String, ApiError> {
        self.paged_clan_resource(tag, "members", paging)
    }

    /// `GET /clans/{tag}/riverracelog?limit=..&after=..&before=..`
    pub fn clan_river_race_log(&self, tag: &str, paging: &Paging) -> Result<String, ApiError> {
        self.paged_clan_resource(tag, "riverracelog", paging)
    }

    /// `GET /clans/{tag}/currentriverrace`
    pub fn clan_current_river_race(&self, tag: &str) -> Result<String, ApiError> {
        Ok(format!(
            "{}/clans/{}/currentriverrace",
            self.base,
            normalize_tag(tag)?
        ))
    }

    /// `GET /players/{tag}`
    pub fn player(&self, tag: &str) -> Result<String, ApiError> {
        Ok(format!("{}/players/{}", self.base, normalize_tag(tag)?))
    }

    fn paged_clan_resource(
        &self,
        tag: &str,
        resource: &str,
        paging: &Paging,
    ) -> Result<String, ApiError> {
        let mut query = QueryBuilder::new();
        paging.append_to(&mut query);
        Ok(format!(
            "{}/clans/{}/{}?{}",
            self.base,
            normalize_tag(tag)?,
            resource,
            query.finish()
        ))
    }
}

/// Rewrites a list URL to request the page after `cursor`
///
/// Existing `after`/`before` parameters are dropped and `after` is appended
/// last, which is the same position the endpoint builders put it in, so the
/// result matches a freshly built URL for that page.
pub fn with_after_cursor(url: &str, cursor: &str) -> String {
    let (path, query) = url.split_once('?').unwrap_or((url, ""));

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if key != "after" && key != "before" {
            serializer.append_pair(&key, &value);
        }
    }
    serializer.append_pair("after", cursor);

    format!("{}?{}", path, serializer.finish())
}
