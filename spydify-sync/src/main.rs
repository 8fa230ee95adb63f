//! spydify-sync - metadata ingestion
//!
//! Cycles through the track, album, artist (and optionally artist-album and
//! enrichment) stages until the store holds no incomplete rows.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spydify_common::config::{load_toml_config, resolve_root_folder, CONFIG_FILE_NAME, ROOT_FOLDER_ENV};
use spydify_sync::clock::{Clock, SystemClock};
use spydify_sync::config::{CliOverrides, SyncSettings};
use spydify_sync::credentials::TokenFile;
use spydify_sync::fetch::{ReqwestTransport, RetryingFetcher};
use spydify_sync::providers::musicbrainz::MUSICBRAINZ_RETRY_BUDGET;
use spydify_sync::providers::{MusicBrainzClient, SpotifyClient};
use spydify_sync::ratelimit::{RateLimitLog, SlidingWindowLimiter};
use spydify_sync::scheduler::{Enricher, StageScheduler, SyncOutcome};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Command-line arguments for spydify-sync
#[derive(Parser, Debug)]
#[command(name = "spydify-sync")]
#[command(about = "Populate a SQLite store with Spotify and MusicBrainz metadata")]
#[command(version)]
struct Args {
    /// Root folder holding the database, request log and token file
    #[arg(short, long, env = "SPYDIFY_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// TOML config file (default: <root>/spydify.toml)
    #[arg(short, long, env = "SPYDIFY_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database path
    #[arg(long, env = "SPYDIFY_DATABASE")]
    database: Option<PathBuf>,

    /// File holding the Spotify bearer token
    #[arg(long, env = "SPYDIFY_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    /// Persisted request log
    #[arg(long, env = "SPYDIFY_REQUEST_LOG")]
    request_log: Option<PathBuf>,

    /// Stage to start at: tracks, albums, artists, artist-albums, enrichment
    #[arg(short, long, env = "SPYDIFY_START_STAGE")]
    start_stage: Option<String>,

    /// Also walk every artist's album list
    #[arg(long, env = "SPYDIFY_ARTIST_ALBUMS")]
    artist_albums: Option<bool>,

    /// Also enrich artists with area and genres from MusicBrainz
    #[arg(long, env = "SPYDIFY_ENRICHMENT")]
    enrichment: Option<bool>,

    /// Skip the saved-tracks seed of an empty store
    #[arg(long)]
    no_seed: bool,

    /// Attempts per request
    #[arg(long, env = "SPYDIFY_RETRY_BUDGET")]
    retry_budget: Option<u32>,

    /// Fixed delay before every Spotify request, in milliseconds
    #[arg(long, env = "SPYDIFY_BASE_DELAY_MS")]
    base_delay_ms: Option<u64>,

    /// Failures before an item is skipped for the rest of the run (0 = never)
    #[arg(long, env = "SPYDIFY_MAX_ITEM_FAILURES")]
    max_item_failures: Option<u32>,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            database: self.database.clone(),
            token_file: self.token_file.clone(),
            request_log: self.request_log.clone(),
            start_stage: self.start_stage.clone(),
            artist_albums: self.artist_albums,
            enrichment: self.enrichment,
            seed_saved_tracks: self.no_seed.then_some(false),
            retry_budget: self.retry_budget,
            base_delay_ms: self.base_delay_ms,
            max_item_failures: self.max_item_failures,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // TOML is located before logging starts so its level can apply
    let early_root = resolve_root_folder(args.root_folder.as_deref(), ROOT_FOLDER_ENV, None);
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| early_root.join(CONFIG_FILE_NAME));
    let toml_config = load_toml_config(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    let level = &toml_config.logging.level;
    let default_filter = format!("spydify_sync={level},spydify_common={level}");
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting spydify-sync {} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), ROOT_FOLDER_ENV, Some(&toml_config));
    let settings = SyncSettings::resolve(&root_folder, &toml_config, &args.overrides())
        .context("Invalid configuration")?;
    info!("Root folder: {}", settings.root_folder.display());
    info!("Database: {}", settings.database_path.display());

    let pool = spydify_sync::db::open_pool(&settings.database_path)
        .await
        .context("Failed to open database")?;

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let mut limiter = SlidingWindowLimiter::spotify(settings.base_delay, Arc::clone(&clock));
    RateLimitLog::load(&settings.request_log_path)
        .await
        .apply_to(&mut limiter);

    let spotify_transport = Arc::new(
        ReqwestTransport::new(&spydify_common::config::get_user_agent(), HTTP_TIMEOUT)
            .context("Failed to build HTTP client")?,
    );
    let spotify_fetcher = RetryingFetcher::new(spotify_transport, cancel.clone())
        .with_credentials(Arc::new(TokenFile::new(&settings.token_path)))
        .with_retry_budget(settings.retry_budget);
    let spotify = SpotifyClient::new(spotify_fetcher, settings.spotify_api_base.clone());

    let mut scheduler = StageScheduler::new(
        pool.clone(),
        spotify,
        limiter,
        settings.scheduler.clone(),
        cancel.clone(),
    );

    if settings.scheduler.enrichment {
        let mb_transport = Arc::new(
            ReqwestTransport::new(&settings.musicbrainz_user_agent, HTTP_TIMEOUT)
                .context("Failed to build MusicBrainz HTTP client")?,
        );
        let mb_fetcher = RetryingFetcher::new(mb_transport, cancel.clone())
            .with_retry_budget(MUSICBRAINZ_RETRY_BUDGET);
        scheduler = scheduler.with_enricher(Enricher {
            client: MusicBrainzClient::new(mb_fetcher, settings.musicbrainz_api_base.clone()),
            limiter: SlidingWindowLimiter::musicbrainz(Arc::clone(&clock)),
        });
    }

    let report = scheduler.run().await.context("Sync failed")?;
    pool.close().await;

    match report.outcome {
        SyncOutcome::Completed => info!("All stages complete: {}", report),
        SyncOutcome::Interrupted => warn!("Stopped early: {}", report),
    }
    if report.stalled() {
        anyhow::bail!(
            "No records persisted and {} items quarantined (token file: {})",
            report.quarantined,
            settings.token_path.display()
        );
    }
    Ok(())
}

/// Cancel `token` on Ctrl+C or SIGTERM
async fn cancel_on_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, finishing current page");
        },
        _ = terminate => {
            info!("Received terminate signal, finishing current page");
        },
    }
    token.cancel();
}
