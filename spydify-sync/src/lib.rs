//! spydify-sync library interface
//!
//! Rate-limited, resumable ingestion of Spotify (Provider A) and
//! MusicBrainz (Provider B) metadata into SQLite.
//!
//! Control flow: [`scheduler::StageScheduler`] selects incomplete rows,
//! [`planner`] splits them into batch requests, [`fetch::RetryingFetcher`]
//! performs each call behind a [`ratelimit::SlidingWindowLimiter`], and
//! [`persist`] writes the results idempotently.

pub mod clock;
pub mod config;
pub mod credentials;
pub mod db;
pub mod error;
pub mod fetch;
pub mod models;
pub mod persist;
pub mod planner;
pub mod providers;
pub mod ratelimit;
pub mod scheduler;

pub use crate::error::{SyncError, SyncResult};
pub use crate::scheduler::{StageScheduler, SyncOutcome, SyncReport};
