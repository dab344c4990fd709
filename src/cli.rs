//! Command-line interface parsing for the royale binary
//!
//! This module handles parsing of CLI arguments using clap and turns them into
//! the client configuration, cache settings and per-request options.

use chrono::Duration as TtlDuration;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::cache::{default_cache_dir, DEFAULT_TTL_MINUTES};
use crate::client::RequestOptions;
use crate::config::ClientConfig;
use crate::endpoints::{ClanSearch, Paging};

/// File name of the SQLite cache inside the cache directory
pub const CACHE_DB_NAME: &str = "cache.db";

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// No token on the command line or in the environment
    #[error("Missing API token: pass --token or set ROYALE_API_TOKEN")]
    MissingToken,

    /// No cache path given and no home directory to derive one from
    #[error("Cannot determine a cache directory; pass --cache-path or --no-cache")]
    NoCacheDirectory,

    /// Negative or unrepresentable expiration window
    #[error("Invalid --ttl-minutes: {0} (must be zero or a positive number of minutes in range)")]
    InvalidTtl(i64),

    /// `search-clans` without any filter
    #[error("Invalid search: at least one of --name, --location-id, --min-members, --max-members, --min-score is required")]
    EmptySearch,
}

/// Query the Clash Royale API with a local response cache
#[derive(Parser, Debug)]
#[command(name = "royale")]
#[command(about = "Query the Clash Royale API with a local response cache")]
#[command(version)]
pub struct Cli {
    /// API token from the developer portal
    #[arg(long, env = "ROYALE_API_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// API root URL
    #[arg(long, env = "ROYALE_API_BASE_URL", value_name = "URL")]
    pub base_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Do not read or write the response cache
    #[arg(long)]
    pub no_cache: bool,

    /// Always fetch from the API, leaving the cache untouched
    #[arg(long)]
    pub force: bool,

    /// How long cached responses stay fresh
    #[arg(long, value_name = "MINUTES", default_value_t = DEFAULT_TTL_MINUTES, allow_negative_numbers = true)]
    pub ttl_minutes: i64,

    /// SQLite cache file (default: cache.db in the user cache directory)
    #[arg(long, value_name = "PATH")]
    pub cache_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands, one per API endpoint plus cache maintenance
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show a player
    Player { tag: String },
    /// Show a clan
    Clan { tag: String },
    /// List clan members
    Members {
        tag: String,
        #[command(flatten)]
        paging: PagingArgs,
    },
    /// Show the clan's current river race
    RiverRace { tag: String },
    /// List the clan's past river races
    RiverRaceLog {
        tag: String,
        #[command(flatten)]
        paging: PagingArgs,
    },
    /// Search clans
    SearchClans(SearchArgs),
    /// Remove every cached response
    ClearCache,
}

/// Paging flags for list commands
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct PagingArgs {
    /// Maximum number of items per page
    #[arg(long)]
    pub limit: Option<u32>,
    /// Return items after this cursor
    #[arg(long, conflicts_with = "before")]
    pub after: Option<String>,
    /// Return items before this cursor
    #[arg(long)]
    pub before: Option<String>,
    /// Follow cursors and print the items of every page
    #[arg(long)]
    pub all: bool,
}

impl PagingArgs {
    pub fn to_paging(&self) -> Paging {
        Paging {
            limit: self.limit,
            after: self.after.clone(),
            before: self.before.clone(),
        }
    }
}

/// Filters for `search-clans`
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub location_id: Option<u32>,
    #[arg(long)]
    pub min_members: Option<u32>,
    #[arg(long)]
    pub max_members: Option<u32>,
    #[arg(long)]
    pub min_score: Option<u32>,
    #[command(flatten)]
    pub paging: PagingArgs,
}

impl SearchArgs {
    /// Builds the search, rejecting one without filters
    pub fn to_search(&self) -> Result<ClanSearch, CliError> {
        if self.name.is_none()
            && self.location_id.is_none()
            && self.min_members.is_none()
            && self.max_members.is_none()
            && self.min_score.is_none()
        {
            return Err(CliError::EmptySearch);
        }
        Ok(ClanSearch {
            name: self.name.clone(),
            location_id: self.location_id,
            min_members: self.min_members,
            max_members: self.max_members,
            min_score: self.min_score,
            paging: self.paging.to_paging(),
        })
    }
}

/// Where and for how long responses are cached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub path: PathBuf,
    pub ttl: TtlDuration,
}

impl Cli {
    /// Client configuration from the token, base URL and timeout flags
    pub fn client_config(&self) -> Result<ClientConfig, CliError> {
        let token = self
            .token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or(CliError::MissingToken)?;

        let mut config = ClientConfig::new(token);
        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url.clone());
        }
        if let Some(secs) = self.timeout {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }

    /// Cache location and TTL, or `None` with `--no-cache`
    pub fn cache_settings(&self) -> Result<Option<CacheSettings>, CliError> {
        if self.no_cache {
            return Ok(None);
        }
        let ttl = TtlDuration::try_minutes(self.ttl_minutes)
            .filter(|ttl| *ttl >= TtlDuration::zero())
            .ok_or(CliError::InvalidTtl(self.ttl_minutes))?;

        let path = match &self.cache_path {
            Some(path) => path.clone(),
            None => default_cache_dir()
                .ok_or(CliError::NoCacheDirectory)?
                .join(CACHE_DB_NAME),
        };

        Ok(Some(CacheSettings { path, ttl }))
    }

    pub fn request_options(&self) -> RequestOptions {
        RequestOptions {
            timeout: None,
            force_request: self.force,
        }
    }
}
