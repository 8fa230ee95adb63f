//! Runtime settings for spydify-sync
//!
//! **Priority:** command line (or its `SPYDIFY_*` environment variable) →
//! TOML → compiled default. Relative paths from TOML are resolved against
//! the root folder.

use crate::error::{SyncError, SyncResult};
use crate::fetch::DEFAULT_RETRY_BUDGET;
use crate::providers::{MUSICBRAINZ_API_BASE, SPOTIFY_API_BASE};
use crate::scheduler::{SchedulerConfig, Stage, StageProfile};
use spydify_common::config::{get_user_agent, TomlConfig};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_DATABASE_FILE: &str = "spotify.sqlite";
pub const DEFAULT_REQUEST_LOG_FILE: &str = "request_log.json";
pub const DEFAULT_TOKEN_FILE: &str = "access_token";
pub const DEFAULT_BASE_DELAY_MS: u64 = 100;

/// Values supplied on the command line; `None` defers to TOML
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub database: Option<PathBuf>,
    pub token_file: Option<PathBuf>,
    pub request_log: Option<PathBuf>,
    pub start_stage: Option<String>,
    pub artist_albums: Option<bool>,
    pub enrichment: Option<bool>,
    pub seed_saved_tracks: Option<bool>,
    pub retry_budget: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub max_item_failures: Option<u32>,
}

/// Fully resolved settings
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub root_folder: PathBuf,
    pub database_path: PathBuf,
    pub request_log_path: PathBuf,
    pub token_path: PathBuf,
    pub spotify_api_base: String,
    pub musicbrainz_api_base: String,
    pub musicbrainz_user_agent: String,
    pub retry_budget: u32,
    pub base_delay: Duration,
    pub scheduler: SchedulerConfig,
}

impl SyncSettings {
    pub fn resolve(root_folder: &Path, toml: &TomlConfig, cli: &CliOverrides) -> SyncResult<Self> {
        let sync = &toml.sync;
        let in_root = |p: &Path| -> PathBuf {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                root_folder.join(p)
            }
        };

        let database_path = cli
            .database
            .clone()
            .or_else(|| sync.database_path.as_deref().map(in_root))
            .unwrap_or_else(|| root_folder.join(DEFAULT_DATABASE_FILE));
        let request_log_path = cli
            .request_log
            .clone()
            .or_else(|| toml.spotify.request_log_path.as_deref().map(in_root))
            .unwrap_or_else(|| root_folder.join(DEFAULT_REQUEST_LOG_FILE));
        let token_path = cli
            .token_file
            .clone()
            .or_else(|| toml.spotify.token_path.as_deref().map(in_root))
            .unwrap_or_else(|| root_folder.join(DEFAULT_TOKEN_FILE));

        let start_stage = match cli.start_stage.as_deref().or(sync.start_stage.as_deref()) {
            Some(name) => name.parse::<Stage>()?,
            None => Stage::Tracks,
        };

        let mut scheduler = SchedulerConfig {
            start_stage,
            artist_albums: cli.artist_albums.or(sync.artist_albums).unwrap_or(false),
            enrichment: cli.enrichment.or(sync.enrichment).unwrap_or(false),
            seed_saved_tracks: cli
                .seed_saved_tracks
                .or(sync.seed_saved_tracks)
                .unwrap_or(true),
            max_item_failures: cli
                .max_item_failures
                .or(sync.max_item_failures)
                .unwrap_or(crate::scheduler::DEFAULT_MAX_ITEM_FAILURES),
            request_log_path: Some(request_log_path.clone()),
            ..Default::default()
        };

        for (name, tuning) in &sync.stages {
            let stage: Stage = name.parse()?;
            let default = stage.default_profile();
            scheduler.set_profile(
                stage,
                StageProfile {
                    page_size: tuning.page_size.unwrap_or(default.page_size),
                    commit_every: tuning.commit_every.unwrap_or(default.commit_every),
                },
            );
        }
        scheduler.validate()?;

        let retry_budget = cli
            .retry_budget
            .or(sync.retry_budget)
            .unwrap_or(DEFAULT_RETRY_BUDGET);
        if retry_budget == 0 {
            return Err(SyncError::Config("retry budget must be at least 1".to_string()));
        }

        Ok(Self {
            root_folder: root_folder.to_path_buf(),
            database_path,
            request_log_path,
            token_path,
            spotify_api_base: toml
                .spotify
                .api_base
                .clone()
                .unwrap_or_else(|| SPOTIFY_API_BASE.to_string()),
            musicbrainz_api_base: toml
                .musicbrainz
                .api_base
                .clone()
                .unwrap_or_else(|| MUSICBRAINZ_API_BASE.to_string()),
            musicbrainz_user_agent: toml
                .musicbrainz
                .user_agent
                .clone()
                .unwrap_or_else(get_user_agent),
            retry_budget,
            base_delay: Duration::from_millis(
                cli.base_delay_ms
                    .or(sync.base_delay_ms)
                    .unwrap_or(DEFAULT_BASE_DELAY_MS),
            ),
            scheduler,
        })
    }
}
