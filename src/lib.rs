//! Clash Royale API client with a persistent response cache
//!
//! Requests go through a cache pipeline keyed by request URL: fresh cached
//! responses are returned without touching the network, misses are fetched
//! and stored for the configured expiration window.
//!
//! ```no_run
//! use chrono::Duration;
//! use royale::{Client, ClientConfig, RequestOptions, SqliteStore};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteStore::open("cache.db", Duration::minutes(1))?;
//! let client = Client::with_cache(ClientConfig::new("TOKEN"), store)?;
//!
//! let clan = client.fetch_clan("#2QPGV2VY", RequestOptions::default()).await?;
//! println!("{:?} (cached: {})", clan.get("name"), clan.is_cached());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod cli;
pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod tag;
pub mod transport;

pub use cache::{CacheError, CacheStore, CachedValue, JsonFileStore, MemoryStore, SqliteStore};
pub use client::{Client, RequestOptions};
pub use config::{ClientConfig, ConfigError};
pub use endpoints::{ClanSearch, Endpoints, Paging};
pub use error::ApiError;
pub use models::{ApiResponse, Cursors};
pub use pipeline::{CacheLookup, FetchResult, Pipeline};
pub use tag::normalize_tag;
pub use transport::HttpTransport;
