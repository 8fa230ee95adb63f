//! Resumable multi-stage sync loop
//!
//! The scheduler repeatedly selects a page of incomplete rows for the
//! current stage, fetches it, persists it inside a savepoint of the open
//! transaction, and commits every few pages. An empty page moves to the
//! next enabled stage; after the last one the termination predicate is
//! checked: every enabled stage must report zero eligible rows in the same
//! pass, otherwise the cycle starts again.
//!
//! A crash loses at most the uncommitted pages. Their rows are still
//! incomplete in the store, so the next run picks them up.

pub mod ledger;
pub mod page;
pub mod report;
pub mod stage;

pub use ledger::FailureLedger;
pub use report::{SyncOutcome, SyncReport};
pub use stage::{SchedulerState, Stage, StagePlan, StageProfile, Transition};

use crate::db::scan::{self, ScanRow};
use crate::error::{SyncError, SyncResult};
use crate::fetch::FetchFailure;
use crate::models::{ArtistProfile, WorkItem};
use crate::planner::plan_requests;
use crate::providers::{FetchedBatch, MusicBrainzClient, SpotifyClient};
use crate::ratelimit::{RateLimitLog, SlidingWindowLimiter};
use page::PageWrites;
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::collections::HashSet;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Default failures before an item is quarantined for the run
pub const DEFAULT_MAX_ITEM_FAILURES: u32 = 3;

/// Scheduler tunables
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub start_stage: Stage,
    pub artist_albums: bool,
    pub enrichment: bool,
    /// Download the user's saved tracks when the Track table is empty
    pub seed_saved_tracks: bool,
    pub max_item_failures: u32,
    /// Where the Provider A request log is flushed after each commit
    pub request_log_path: Option<PathBuf>,
    /// Page profile per stage, indexed by [`Stage::index`]
    pub profiles: [StageProfile; 5],
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            start_stage: Stage::Tracks,
            artist_albums: false,
            enrichment: false,
            seed_saved_tracks: true,
            max_item_failures: DEFAULT_MAX_ITEM_FAILURES,
            request_log_path: None,
            profiles: Stage::ALL.map(|s| s.default_profile()),
        }
    }
}

impl SchedulerConfig {
    pub fn profile(&self, stage: Stage) -> StageProfile {
        self.profiles[stage.index()]
    }

    pub fn set_profile(&mut self, stage: Stage, profile: StageProfile) {
        self.profiles[stage.index()] = profile;
    }

    pub fn plan(&self) -> StagePlan {
        StagePlan::new(self.artist_albums, self.enrichment)
    }

    /// Reject settings the loop cannot run with
    pub fn validate(&self) -> SyncResult<()> {
        let plan = self.plan();
        if !plan.contains(self.start_stage) {
            return Err(SyncError::Config(format!(
                "start stage {} is not enabled",
                self.start_stage
            )));
        }
        for stage in plan.stages() {
            let profile = self.profile(*stage);
            if profile.page_size == 0 || profile.commit_every == 0 {
                return Err(SyncError::Config(format!(
                    "stage {} needs a positive page size and commit cadence",
                    stage
                )));
            }
        }
        Ok(())
    }
}

/// Provider B client and its own limiter
pub struct Enricher {
    pub client: MusicBrainzClient,
    pub limiter: SlidingWindowLimiter,
}

enum PageOutcome {
    Processed,
    Interrupted,
}

pub struct StageScheduler {
    pool: SqlitePool,
    spotify: SpotifyClient,
    limiter: SlidingWindowLimiter,
    enricher: Option<Enricher>,
    config: SchedulerConfig,
    ledger: FailureLedger,
    cancel: CancellationToken,
    report: SyncReport,
}

impl StageScheduler {
    pub fn new(
        pool: SqlitePool,
        spotify: SpotifyClient,
        limiter: SlidingWindowLimiter,
        config: SchedulerConfig,
        cancel: CancellationToken,
    ) -> Self {
        let ledger = FailureLedger::new(config.max_item_failures);
        Self {
            pool,
            spotify,
            limiter,
            enricher: None,
            config,
            ledger,
            cancel,
            report: SyncReport::default(),
        }
    }

    pub fn with_enricher(mut self, enricher: Enricher) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub fn limiter(&self) -> &SlidingWindowLimiter {
        &self.limiter
    }

    pub fn ledger(&self) -> &FailureLedger {
        &self.ledger
    }

    /// Run until every stage is exhausted or the run is cancelled
    ///
    /// The request log is flushed on every exit path, including errors.
    pub async fn run(&mut self) -> SyncResult<SyncReport> {
        self.config.validate()?;
        if self.config.enrichment && self.enricher.is_none() {
            return Err(SyncError::Config(
                "enrichment enabled without a MusicBrainz client".to_string(),
            ));
        }

        let result = self.drive().await;
        self.flush_request_log();

        let outcome = result?;
        self.report.outcome = outcome;
        self.report.quarantined = self.ledger.quarantined_count();
        self.report.total_requests = self.limiter.total_requests()
            + self.enricher.as_ref().map_or(0, |e| e.limiter.total_requests());

        if self.report.stalled() {
            error!(
                quarantined = self.report.quarantined,
                "Every attempted item was quarantined and nothing was persisted"
            );
        }
        info!(report = %self.report, "Sync finished");
        Ok(self.report.clone())
    }

    async fn drive(&mut self) -> SyncResult<SyncOutcome> {
        let plan = self.config.plan();
        let mut tx = self.pool.begin().await?;

        if self.config.seed_saved_tracks {
            if let PageOutcome::Interrupted = self.seed(&mut tx).await? {
                tx.commit().await?;
                return Ok(SyncOutcome::Interrupted);
            }
            tx = self.checkpoint(tx, Stage::Tracks).await?;
        }

        let mut state = SchedulerState::Running(self.config.start_stage);
        let mut uncommitted = 0usize;
        info!(start = %self.config.start_stage, stages = ?plan.stages(), "Starting sync cycle");

        let outcome = loop {
            let stage = match state {
                SchedulerState::Done => break SyncOutcome::Completed,
                SchedulerState::Running(stage) => stage,
            };
            if self.cancel.is_cancelled() {
                break SyncOutcome::Interrupted;
            }

            let profile = self.config.profile(stage);
            let rows = scan::select_incomplete(
                &mut tx,
                stage,
                profile.page_size,
                self.ledger.excluded(stage),
            )
            .await?;

            match plan.transition(stage, rows.len()) {
                Transition::Stay => {
                    if let PageOutcome::Interrupted = self.process_page(&mut tx, stage, &rows).await? {
                        break SyncOutcome::Interrupted;
                    }
                    uncommitted += 1;
                    if uncommitted >= profile.commit_every {
                        tx = self.checkpoint(tx, stage).await?;
                        uncommitted = 0;
                    }
                }
                Transition::Advance(next) => {
                    if uncommitted > 0 {
                        tx = self.checkpoint(tx, stage).await?;
                        uncommitted = 0;
                    }
                    info!(stage = %stage, next = %next, "Stage exhausted, moving on");
                    state = SchedulerState::Running(next);
                }
                Transition::CycleEnd => {
                    if uncommitted > 0 {
                        tx = self.checkpoint(tx, stage).await?;
                        uncommitted = 0;
                    }
                    state = if self.all_clear(&mut tx, &plan).await? {
                        SchedulerState::Done
                    } else {
                        info!("Incomplete rows remain, starting another cycle");
                        SchedulerState::Running(plan.first())
                    };
                }
            }
        };

        // Pages already persisted in this transaction are kept on interrupt
        tx.commit().await?;
        if outcome == SyncOutcome::Interrupted {
            warn!("Sync interrupted, committed progress saved");
        }
        Ok(outcome)
    }

    /// Commit, flush the request log, reopen, and report what is left
    async fn checkpoint(
        &mut self,
        tx: Transaction<'static, Sqlite>,
        stage: Stage,
    ) -> SyncResult<Transaction<'static, Sqlite>> {
        tx.commit().await?;
        self.flush_request_log();

        let mut tx = self.pool.begin().await?;
        let remaining = scan::count_eligible(&mut tx, stage, self.ledger.excluded(stage)).await?;
        info!(stage = %stage, remaining, "Committed");
        Ok(tx)
    }

    /// Termination predicate: no enabled stage has eligible rows
    async fn all_clear(
        &mut self,
        tx: &mut Transaction<'static, Sqlite>,
        plan: &StagePlan,
    ) -> SyncResult<bool> {
        let mut clear = true;
        for stage in plan.stages() {
            let remaining =
                scan::count_eligible(&mut **tx, *stage, self.ledger.excluded(*stage)).await?;
            debug!(stage = %stage, remaining, "Termination check");
            clear &= remaining == 0;
        }

        let quarantined = self.ledger.quarantined_count();
        if clear && quarantined > 0 {
            warn!(quarantined, "Finishing with quarantined items left incomplete");
        }
        Ok(clear)
    }

    async fn process_page(
        &mut self,
        tx: &mut Transaction<'static, Sqlite>,
        stage: Stage,
        rows: &[ScanRow],
    ) -> SyncResult<PageOutcome> {
        let writes = match stage {
            Stage::Tracks | Stage::Albums | Stage::Artists => self.gather_batches(stage, rows).await?,
            Stage::ArtistAlbums => self.gather_artist_albums(rows).await,
            Stage::Enrichment => self.gather_profiles(rows).await?,
        };
        let Some(writes) = writes else {
            return Ok(PageOutcome::Interrupted);
        };

        self.report.pages_processed += 1;
        if !writes.is_empty() {
            let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
            self.apply_page(tx, stage, &ids, &writes).await?;
        }
        Ok(PageOutcome::Processed)
    }

    /// Persist a page inside a savepoint; a storage error rolls back only
    /// this page and charges its items
    async fn apply_page(
        &mut self,
        tx: &mut Transaction<'static, Sqlite>,
        stage: Stage,
        ids: &[&str],
        writes: &PageWrites,
    ) -> SyncResult<()> {
        let mut savepoint = sqlx::Connection::begin(&mut **tx).await?;
        match writes.apply(&mut savepoint).await {
            Ok(persisted) => {
                savepoint.commit().await?;
                self.report.records_persisted += persisted as u64;
            }
            Err(e) => {
                savepoint.rollback().await?;
                warn!(stage = %stage, error = %e, "Page write failed, rolled back");
                for id in ids {
                    self.ledger.charge(stage, id);
                }
            }
        }
        Ok(())
    }

    /// Batch-fetch a page of tracks, albums or artists
    ///
    /// Returns `None` when cancelled mid-page.
    async fn gather_batches(
        &mut self,
        stage: Stage,
        rows: &[ScanRow],
    ) -> SyncResult<Option<PageWrites>> {
        let Some(kind) = stage.entity_kind() else {
            return Ok(Some(PageWrites::default()));
        };
        let items: Vec<WorkItem> = rows.iter().map(|r| WorkItem::new(kind, r.id.clone())).collect();
        let requests = plan_requests(kind, &items, kind.max_batch())?;

        let mut writes = PageWrites::default();
        for request in &requests {
            match self.spotify.fetch_batch(&mut self.limiter, request).await {
                Ok(batch) => {
                    let returned: HashSet<&str> = batch.ids().into_iter().collect();
                    for id in request.ids() {
                        if !returned.contains(id.as_str()) {
                            debug!(stage = %stage, id = %id, "Provider returned nothing for id");
                            self.ledger.charge(stage, id);
                        }
                    }
                    writes.batches.push(batch);
                }
                Err(FetchFailure::Cancelled) => return Ok(None),
                Err(failure) => {
                    warn!(stage = %stage, count = request.len(), error = %failure, "Batch fetch failed");
                    self.report.fetch_failures += 1;
                    for id in request.ids() {
                        self.ledger.charge(stage, id);
                    }
                }
            }
        }
        Ok(Some(writes))
    }

    /// Walk the album list of every artist in the page
    ///
    /// An artist whose walk failed is not marked retrieved.
    async fn gather_artist_albums(&mut self, rows: &[ScanRow]) -> Option<PageWrites> {
        let mut writes = PageWrites::default();
        for row in rows {
            let collected = self.spotify.artist_album_ids(&mut self.limiter, &row.id).await;
            match collected.failure {
                None => {
                    debug!(artist_id = %row.id, albums = collected.items.len(), "Collected artist albums");
                    writes.artist_albums.push((row.id.clone(), collected.items));
                }
                Some(FetchFailure::Cancelled) => return None,
                Some(failure) => {
                    warn!(artist_id = %row.id, error = %failure, "Artist album listing failed");
                    self.report.fetch_failures += 1;
                    self.ledger.charge(Stage::ArtistAlbums, &row.id);
                }
            }
        }
        Some(writes)
    }

    /// Look up area and genres for a page of named artists
    ///
    /// Names the provider does not return get the unknown profile, so
    /// every artist of a successful query is completed.
    async fn gather_profiles(&mut self, rows: &[ScanRow]) -> SyncResult<Option<PageWrites>> {
        let Some(enricher) = self.enricher.as_mut() else {
            return Err(SyncError::Config("enrichment stage without a client".to_string()));
        };

        let names: Vec<String> = rows.iter().filter_map(|r| r.name.clone()).collect();
        let matches = match enricher.client.search_artists(&mut enricher.limiter, &names).await {
            Ok(matches) => matches,
            Err(FetchFailure::Cancelled) => return Ok(None),
            Err(failure) => {
                warn!(count = names.len(), error = %failure, "Artist search failed");
                self.report.fetch_failures += 1;
                for row in rows {
                    self.ledger.charge(Stage::Enrichment, &row.id);
                }
                return Ok(Some(PageWrites::default()));
            }
        };

        let mut writes = PageWrites::default();
        for row in rows {
            let profile = row
                .name
                .as_ref()
                .and_then(|name| matches.found.get(name))
                .cloned()
                .unwrap_or_else(ArtistProfile::unknown);
            writes.profiles.push((row.id.clone(), profile));
        }
        Ok(Some(writes))
    }

    /// Populate an empty Track table from the user's saved tracks
    async fn seed(&mut self, tx: &mut Transaction<'static, Sqlite>) -> SyncResult<PageOutcome> {
        let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM Track")
            .fetch_one(&mut **tx)
            .await?;
        if existing > 0 {
            debug!(existing, "Track table populated, skipping seed");
            return Ok(PageOutcome::Processed);
        }

        info!("Track table empty, seeding from saved tracks");
        let collected = self.spotify.saved_tracks(&mut self.limiter).await;
        match &collected.failure {
            Some(FetchFailure::Cancelled) => return Ok(PageOutcome::Interrupted),
            Some(failure) => {
                warn!(
                    fetched = collected.items.len(),
                    error = %failure,
                    "Saved tracks listing cut short, seeding what was fetched"
                );
                self.report.fetch_failures += 1;
            }
            None => {}
        }

        let seeded = collected.items.len();
        let ids: Vec<String> = collected.items.iter().map(|t| t.id.clone()).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let writes = PageWrites {
            batches: vec![FetchedBatch::Tracks(collected.items)],
            ..Default::default()
        };
        self.apply_page(tx, Stage::Tracks, &id_refs, &writes).await?;

        self.report.seeded_tracks = seeded;
        info!(seeded, "Seed complete");
        Ok(PageOutcome::Processed)
    }

    fn flush_request_log(&self) {
        let Some(path) = &self.config.request_log_path else {
            return;
        };
        if let Err(e) = RateLimitLog::capture(&self.limiter).save(path) {
            warn!(path = %path.display(), error = %e, "Failed to save request log");
        }
    }
}
