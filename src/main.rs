//! royale - query the Clash Royale API from the terminal
//!
//! Responses are printed as JSON together with their cache provenance.
//! Cached responses live in a SQLite file in the user cache directory.

use clap::Parser;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use royale::cli::{CacheSettings, Cli, Command, PagingArgs};
use royale::{ApiResponse, CacheStore, Client, RequestOptions, SqliteStore};

/// Logs go to stderr so stdout stays valid JSON
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "royale=warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Opens the cache store, continuing without a cache if that fails
fn open_store(settings: &CacheSettings) -> Option<SqliteStore> {
    match SqliteStore::open(&settings.path, settings.ttl) {
        Ok(store) => {
            info!(path = %settings.path.display(), ttl_minutes = settings.ttl.num_minutes(), "cache opened");
            Some(store)
        }
        Err(e) => {
            warn!(path = %settings.path.display(), error = %e, "cache unavailable, continuing without it");
            None
        }
    }
}

fn print_response(response: &ApiResponse) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(())
}

/// Prints one page, or the items of every page with `--all`
async fn print_paged(
    client: &Client,
    first: ApiResponse,
    paging: &PagingArgs,
    options: RequestOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    if paging.all {
        let items = client.collect_all(first, options).await?;
        println!("{}", serde_json::to_string_pretty(&json!({ "items": items }))?);
    } else {
        print_response(&first)?;
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let cache_settings = cli.cache_settings()?;

    if cli.command == Command::ClearCache {
        if let Some(settings) = cache_settings {
            let mut store = SqliteStore::open(&settings.path, settings.ttl)?;
            store.clear()?;
            info!(path = %settings.path.display(), "cache cleared");
        }
        return Ok(());
    }

    let config = cli.client_config()?;
    let client = match cache_settings.as_ref().and_then(open_store) {
        Some(store) => Client::with_cache(config, store)?,
        None => Client::new(config)?,
    };
    let options = cli.request_options();

    match &cli.command {
        Command::Player { tag } => print_response(&client.fetch_player(tag, options).await?)?,
        Command::Clan { tag } => print_response(&client.fetch_clan(tag, options).await?)?,
        Command::RiverRace { tag } => {
            print_response(&client.fetch_current_river_race(tag, options).await?)?
        }
        Command::Members { tag, paging } => {
            let first = client
                .fetch_clan_members(tag, &paging.to_paging(), options)
                .await?;
            print_paged(&client, first, paging, options).await?;
        }
        Command::RiverRaceLog { tag, paging } => {
            let first = client
                .fetch_river_race_log(tag, &paging.to_paging(), options)
                .await?;
            print_paged(&client, first, paging, options).await?;
        }
        Command::SearchClans(args) => {
            let first = client.search_clans(&args.to_search()?, options).await?;
            print_paged(&client, first, &args.paging, options).await?;
        }
        Command::ClearCache => {}
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
