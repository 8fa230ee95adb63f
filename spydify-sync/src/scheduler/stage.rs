//! Stages of the sync cycle and the transition function between them

use crate::error::SyncError;
use crate::models::EntityKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One phase of the resumable cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Tracks,
    Albums,
    Artists,
    ArtistAlbums,
    Enrichment,
}

impl Stage {
    /// Cycle order
    pub const ALL: [Stage; 5] = [
        Stage::Tracks,
        Stage::Albums,
        Stage::Artists,
        Stage::ArtistAlbums,
        Stage::Enrichment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Tracks => "tracks",
            Stage::Albums => "albums",
            Stage::Artists => "artists",
            Stage::ArtistAlbums => "artist-albums",
            Stage::Enrichment => "enrichment",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Entity kind fetched through the batch endpoint, if this stage batches
    pub fn entity_kind(&self) -> Option<EntityKind> {
        match self {
            Stage::Tracks => Some(EntityKind::Track),
            Stage::Albums => Some(EntityKind::Album),
            Stage::Artists => Some(EntityKind::Artist),
            Stage::ArtistAlbums | Stage::Enrichment => None,
        }
    }

    /// Built-in page size and commit cadence
    pub fn default_profile(&self) -> StageProfile {
        let (page_size, commit_every) = match self {
            Stage::Tracks => (50, 20),
            Stage::Albums => (20, 20),
            Stage::Artists => (50, 1),
            Stage::ArtistAlbums => (50, 1),
            Stage::Enrichment => (100, 1),
        };
        StageProfile {
            page_size,
            commit_every,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "tracks" | "track" => Ok(Stage::Tracks),
            "albums" | "album" => Ok(Stage::Albums),
            "artists" | "artist" => Ok(Stage::Artists),
            "artist-albums" => Ok(Stage::ArtistAlbums),
            "enrichment" => Ok(Stage::Enrichment),
            other => Err(SyncError::UnknownEntityKind(format!("stage {other}"))),
        }
    }
}

/// Rows per page and pages per commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageProfile {
    pub page_size: usize,
    pub commit_every: usize,
}

/// What the scheduler does after looking at a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Page had work: process it and select again in the same stage
    Stay,
    /// Stage exhausted: move to the next enabled stage
    Advance(Stage),
    /// Last enabled stage exhausted: evaluate the termination predicate
    CycleEnd,
}

/// Scheduler state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Running(Stage),
    Done,
}

/// Enabled stages, in cycle order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePlan {
    stages: Vec<Stage>,
}

impl StagePlan {
    /// Tracks, albums and artists always run; the other two are optional
    pub fn new(artist_albums: bool, enrichment: bool) -> Self {
        let stages = Stage::ALL
            .into_iter()
            .filter(|stage| match stage {
                Stage::ArtistAlbums => artist_albums,
                Stage::Enrichment => enrichment,
                _ => true,
            })
            .collect();
        Self { stages }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn contains(&self, stage: Stage) -> bool {
        self.stages.contains(&stage)
    }

    pub fn first(&self) -> Stage {
        self.stages.first().copied().unwrap_or(Stage::Tracks)
    }

    /// Decide the next step given the size of the page just selected
    pub fn transition(&self, current: Stage, page_len: usize) -> Transition {
        if page_len > 0 {
            return Transition::Stay;
        }
        match self.stages.iter().position(|s| *s == current) {
            Some(pos) if pos + 1 < self.stages.len() => Transition::Advance(self.stages[pos + 1]),
            _ => Transition::CycleEnd,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stage_names() {
        assert_eq!("tracks".parse::<Stage>().unwrap(), Stage::Tracks);
        assert_eq!("artist_albums".parse::<Stage>().unwrap(), Stage::ArtistAlbums);
        assert_eq!("Artist-Albums".parse::<Stage>().unwrap(), Stage::ArtistAlbums);
        assert!(matches!(
            "playlists".parse::<Stage>(),
            Err(SyncError::UnknownEntityKind(_))
        ));
    }

    #[test]
    fn test_plan_skips_disabled_stages() {
        let core = StagePlan::new(false, false);
        assert_eq!(core.stages(), &[Stage::Tracks, Stage::Albums, Stage::Artists]);
        assert_eq!(core.transition(Stage::Albums, 0), Transition::Advance(Stage::Artists));
        assert_eq!(core.transition(Stage::Artists, 0), Transition::CycleEnd);

        let full = StagePlan::new(true, true);
        assert_eq!(
            full.transition(Stage::Artists, 0),
            Transition::Advance(Stage::ArtistAlbums)
        );
        assert_eq!(
            full.transition(Stage::ArtistAlbums, 0),
            Transition::Advance(Stage::Enrichment)
        );
        assert_eq!(full.transition(Stage::Enrichment, 0), Transition::CycleEnd);
    }

    #[test]
    fn test_non_empty_page_stays() {
        let plan = StagePlan::new(true, false);
        for stage in plan.stages() {
            assert_eq!(plan.transition(*stage, 3), Transition::Stay);
        }
    }

    #[test]
    fn test_profiles() {
        assert_eq!(Stage::Tracks.default_profile().commit_every, 20);
        assert_eq!(Stage::Albums.default_profile().page_size, 20);
        assert_eq!(Stage::ArtistAlbums.default_profile().commit_every, 1);
        assert_eq!(Stage::Enrichment.default_profile().page_size, 100);
        assert_eq!(Stage::ArtistAlbums.entity_kind(), None);
    }
}
