//! Entity kinds and their per-provider limits

use crate::error::SyncError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of a work item fetched from Provider A
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Track,
    Album,
    Artist,
}

/// Static description of how a kind is retrieved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindProfile {
    pub kind: EntityKind,
    /// Path segment of the batch endpoint, also the JSON key of the reply
    pub endpoint: &'static str,
    /// Largest number of ids the batch endpoint accepts
    pub max_batch: usize,
}

const KIND_PROFILES: [KindProfile; 3] = [
    KindProfile {
        kind: EntityKind::Track,
        endpoint: "tracks",
        max_batch: 50,
    },
    KindProfile {
        kind: EntityKind::Album,
        endpoint: "albums",
        max_batch: 20,
    },
    KindProfile {
        kind: EntityKind::Artist,
        endpoint: "artists",
        max_batch: 50,
    },
];

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::Track, EntityKind::Album, EntityKind::Artist];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Track => "track",
            EntityKind::Album => "album",
            EntityKind::Artist => "artist",
        }
    }

    pub fn profile(&self) -> &'static KindProfile {
        // Table order matches declaration order
        &KIND_PROFILES[*self as usize]
    }

    pub fn max_batch(&self) -> usize {
        self.profile().max_batch
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "track" | "tracks" => Ok(EntityKind::Track),
            "album" | "albums" => Ok(EntityKind::Album),
            "artist" | "artists" => Ok(EntityKind::Artist),
            other => Err(SyncError::UnknownEntityKind(other.to_string())),
        }
    }
}

/// Identifier of a not-yet-fully-fetched entity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkItem {
    pub id: String,
    pub kind: EntityKind,
}

impl WorkItem {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}
