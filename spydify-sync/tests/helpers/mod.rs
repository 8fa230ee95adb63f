//! Test Helper Utilities
//!
//! Shared utilities for testing spydify-sync
#![allow(dead_code)]

pub mod db_utils;
pub mod transport;

// Re-export commonly used items
pub use db_utils::{
    artist_area, artist_genres, count_rows, create_test_db, has_edge, name_of, seed_artists,
    seed_track_placeholders, track_record,
};
pub use transport::{
    too_many_requests, FakeMusicBrainz, FakeSpotify, ScriptedTransport, FAKE_MUSICBRAINZ_BASE,
    FAKE_SPOTIFY_BASE,
};

use spydify_sync::clock::{Clock, ManualClock};
use spydify_sync::credentials::StaticToken;
use spydify_sync::fetch::RetryingFetcher;
use spydify_sync::providers::{MusicBrainzClient, SpotifyClient};
use spydify_sync::ratelimit::SlidingWindowLimiter;
use spydify_sync::scheduler::{Enricher, SchedulerConfig, StageScheduler};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Scheduler config for tests: no seed, no optional stages
pub fn test_config() -> SchedulerConfig {
    SchedulerConfig {
        seed_saved_tracks: false,
        ..Default::default()
    }
}

/// Scheduler against `fake`, with a manual clock so limiter waits are instant
pub fn build_scheduler(
    pool: &SqlitePool,
    fake: &Arc<FakeSpotify>,
    config: SchedulerConfig,
    cancel: &CancellationToken,
) -> StageScheduler {
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::starting_at(1_700_000_000.0));
    let fetcher = RetryingFetcher::new(fake.clone(), cancel.clone())
        .with_credentials(Arc::new(StaticToken::new("test-token")));
    let spotify = SpotifyClient::new(fetcher, FAKE_SPOTIFY_BASE);
    let limiter = SlidingWindowLimiter::spotify(Duration::ZERO, clock);

    StageScheduler::new(pool.clone(), spotify, limiter, config, cancel.clone())
}

/// Provider B client and limiter against `fake`
pub fn build_enricher(fake: &Arc<FakeMusicBrainz>, cancel: &CancellationToken) -> Enricher {
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::starting_at(1_700_000_000.0));
    let fetcher = RetryingFetcher::new(fake.clone(), cancel.clone()).with_retry_budget(2);
    Enricher {
        client: MusicBrainzClient::new(fetcher, FAKE_MUSICBRAINZ_BASE),
        limiter: SlidingWindowLimiter::musicbrainz(clock),
    }
}
