//! Clash Royale API client
//!
//! One async method per endpoint. Every call goes through the cache pipeline:
//! the request URL is the cache key, fresh cache entries are returned without
//! a network call, and misses are fetched and written back.

use chrono::Duration as TtlDuration;
use serde_json::Value;
use std::time::Duration;

use crate::cache::{CacheError, CacheStore};
use crate::config::ClientConfig;
use crate::endpoints::{with_after_cursor, ClanSearch, Endpoints, Paging};
use crate::error::ApiError;
use crate::models::ApiResponse;
use crate::pipeline::Pipeline;
use crate::transport::HttpTransport;

/// Per-call options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Overrides the client's default timeout
    pub timeout: Option<Duration>,
    /// Skip the cache entirely: always fetch, never write back
    pub force_request: bool,
}

impl RequestOptions {
    /// Options that always go to the network
    pub fn forced() -> Self {
        Self {
            force_request: true,
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Client for the Clash Royale API with an optional response cache
#[derive(Debug)]
pub struct Client {
    transport: HttpTransport,
    endpoints: Endpoints,
    pipeline: Pipeline,
}

impl Client {
    /// Creates a client without a cache
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        Ok(Self::from_parts(
            HttpTransport::new(&config)?,
            Endpoints::new(config.base_url),
            None,
        ))
    }

    /// Creates a client that caches responses in `store`
    pub fn with_cache(
        config: ClientConfig,
        store: impl CacheStore + 'static,
    ) -> Result<Self, ApiError> {
        Ok(Self::from_parts(
            HttpTransport::new(&config)?,
            Endpoints::new(config.base_url),
            Some(Box::new(store)),
        ))
    }

    /// Assembles a client from preconfigured parts
    pub fn from_parts(
        transport: HttpTransport,
        endpoints: Endpoints,
        store: Option<Box<dyn CacheStore>>,
    ) -> Self {
        Self {
            transport,
            endpoints,
            pipeline: Pipeline::new(store),
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn cache_enabled(&self) -> bool {
        self.pipeline.cache_enabled()
    }

    /// Drops every cached response; does nothing without a cache
    pub fn clear_cache(&self) -> Result<(), CacheError> {
        self.pipeline.with_store(|store| store.clear()).unwrap_or(Ok(()))
    }

    /// Removes the cached response for one request URL
    pub fn invalidate(&self, url: &str) -> Result<(), CacheError> {
        self.pipeline
            .with_store(|store| store.delete(url))
            .unwrap_or(Ok(()))
    }

    /// Current cache expiration window, `None` without a cache
    pub fn cache_expiration(&self) -> Option<TtlDuration> {
        self.pipeline.with_store(|store| store.expiration_time())
    }

    /// Changes the cache expiration window; returns false without a cache
    pub fn set_cache_expiration(&self, ttl: TtlDuration) -> bool {
        self.pipeline
            .with_store(|store| store.set_expiration_time(ttl))
            .is_some()
    }

    /// Fetches an arbitrary API URL through the cache
    ///
    /// # Arguments
    /// * `url` - Full request URL; it is also the cache key
    /// * `options` - Per-call timeout override and `force_request`
    ///
    /// # Returns
    /// * `Ok(ApiResponse)` carrying the payload and whether it came from the cache
    /// * `Err(ApiError)` for transport, status or decode failures; only
    ///   successful payloads are ever cached
    pub async fn get(&self, url: &str, options: RequestOptions) -> Result<ApiResponse, ApiError> {
        let transport = &self.transport;
        let timeout = options.timeout;

        let result = self
            .pipeline
            .resolve(
                url,
                |key| {
                    let key = key.to_string();
                    async move { transport.get_json(&key, timeout).await }
                },
                options.force_request,
            )
            .await?;

        Ok(ApiResponse::new(url, result))
    }

    /// Searches clans; `GET /clans`
    pub async fn search_clans(
        &self,
        search: &ClanSearch,
        options: RequestOptions,
    ) -> Result<ApiResponse, ApiError> {
        self.get(&self.endpoints.clans(search), options).await
    }

    /// Fetches a clan; `GET /clans/{tag}`
    pub async fn fetch_clan(&self, tag: &str, options: RequestOptions) -> Result<ApiResponse, ApiError> {
        let url = self.endpoints.clan(tag)?;
        self.get(&url, options).await
    }

    /// Fetches a page of clan members; `GET /clans/{tag}/members`
    pub async fn fetch_clan_members(
        &self,
        tag: &str,
        paging: &Paging,
        options: RequestOptions,
    ) -> Result<ApiResponse, ApiError> {
        let url = self.endpoints.clan_members(tag, paging)?;
        self.get(&url, options).await
    }

    /// Fetches a page of the clan's river race log; `GET /clans/{tag}/riverracelog`
    pub async fn fetch_river_race_log(
        &self,
        tag: &str,
        paging: &Paging,
        options: RequestOptions,
    ) -> Result<ApiResponse, ApiError> {
        let url = self.endpoints.clan_river_race_log(tag, paging)?;
        self.get(&url, options).await
    }

    /// Fetches the clan's current river race; `GET /clans/{tag}/currentriverrace`
    pub async fn fetch_current_river_race(
        &self,
        tag: &str,
        options: RequestOptions,
    ) -> Result<ApiResponse, ApiError> {
        let url = self.endpoints.clan_current_river_race(tag)?;
        self.get(&url, options).await
    }

    /// Fetches a player; `GET /players/{tag}`
    pub async fn fetch_player(
        &self,
        tag: &str,
        options: RequestOptions,
    ) -> Result<ApiResponse, ApiError> {
        let url = self.endpoints.player(tag)?;
        self.get(&url, options).await
    }

    /// Fetches the full clan behind an item
    ///
    /// A nested `clan.tag` wins, so a player or member item leads to the
    /// player's clan; otherwise the item's own `tag` is used, as for a clan
    /// search result.
    pub async fn fetch_clan_of(
        &self,
        item: &Value,
        options: RequestOptions,
    ) -> Result<ApiResponse, ApiError> {
        let tag = item.get("clan").map_or_else(|| item_tag(item), item_tag)?;
        self.fetch_clan(tag, options).await
    }

    /// Fetches the full player behind a list item, e.g. a clan member
    pub async fn fetch_player_of(
        &self,
        item: &Value,
        options: RequestOptions,
    ) -> Result<ApiResponse, ApiError> {
        self.fetch_player(item_tag(item)?, options).await
    }

    /// Re-fetches a response from the API, bypassing the cache
    pub async fn refresh(&self, response: &ApiResponse) -> Result<ApiResponse, ApiError> {
        self.get(response.url(), RequestOptions::forced()).await
    }

    /// Fetches the page following `response`, or `None` on the last page
    pub async fn next_page(
        &self,
        response: &ApiResponse,
        options: RequestOptions,
    ) -> Result<Option<ApiResponse>, ApiError> {
        match response.cursors().after {
            Some(cursor) => {
                let url = with_after_cursor(response.url(), &cursor);
                self.get(&url, options).await.map(Some)
            }
            None => Ok(None),
        }
    }

    /// Collects the items of `first` and every following page
    ///
    /// Each page is a separate request and may hit the rate limit.
    pub async fn collect_all(
        &self,
        first: ApiResponse,
        options: RequestOptions,
    ) -> Result<Vec<Value>, ApiError> {
        let mut items = Vec::new();
        let mut page = Some(first);
        while let Some(current) = page {
            items.extend(current.items().unwrap_or_default().iter().cloned());
            page = self.next_page(&current, options).await?;
        }
        Ok(items)
    }
}

/// `tag` field of a list item
fn item_tag(item: &Value) -> Result<&str, ApiError> {
    item.get("tag")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::InvalidTag {
            tag: String::new(),
            reason: "list item has no tag".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use serde_json::json;

    fn test_config() -> ClientConfig {
        ClientConfig::new("token").with_base_url("http://127.0.0.1:9/v1")
    }

    #[test]
    fn test_request_options_defaults() {
        let options = RequestOptions::default();
        assert!(!options.force_request);
        assert!(options.timeout.is_none());

        let forced = RequestOptions::forced().with_timeout(Duration::from_secs(2));
        assert!(forced.force_request);
        assert_eq!(forced.timeout, Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_cache_controls_without_cache() {
        let client = Client::new(test_config()).unwrap();
        assert!(!client.cache_enabled());
        assert!(client.cache_expiration().is_none());
        assert!(!client.set_cache_expiration(TtlDuration::minutes(5)));
        assert!(client.clear_cache().is_ok());
        assert!(client.invalidate("anything").is_ok());
    }

    #[test]
    fn test_cache_controls_with_cache() {
        let client =
            Client::with_cache(test_config(), MemoryStore::new(TtlDuration::minutes(1))).unwrap();
        assert!(client.cache_enabled());
        assert_eq!(client.cache_expiration(), Some(TtlDuration::minutes(1)));
        assert!(client.set_cache_expiration(TtlDuration::minutes(5)));
        assert_eq!(client.cache_expiration(), Some(TtlDuration::minutes(5)));
    }

    #[tokio::test]
    async fn test_invalid_tag_fails_without_network() {
        // Port 9 is never contacted: the tag is rejected first
        let client = Client::new(test_config()).unwrap();
        let err = client
            .fetch_player("#not a tag", RequestOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidTag { .. }));
    }

    #[test]
    fn test_item_tag_reads_the_tag_field() {
        assert_eq!(item_tag(&json!({"tag": "#2PP", "name": "x"})).unwrap(), "#2PP");
        assert!(matches!(
            item_tag(&json!({"name": "x"})),
            Err(ApiError::InvalidTag { .. })
        ));
        assert!(matches!(
            item_tag(&json!({"tag": 5})),
            Err(ApiError::InvalidTag { .. })
        ));
    }

    #[tokio::test]
    async fn test_player_without_clan_fails_without_network() {
        let client = Client::new(test_config()).unwrap();
        let err = client
            .fetch_clan_of(&json!({"tag": "#2PP", "clan": {}}), RequestOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidTag { .. }));
    }

    #[tokio::test]
    async fn test_item_without_tag_fails_without_network() {
        let client = Client::new(test_config()).unwrap();
        let err = client
            .fetch_player_of(&json!({"name": "no tag"}), RequestOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidTag { .. }));
    }
}
