//! Normalized entity records
//!
//! Provider payloads are mapped into these types before they reach the
//! persister. Names are always present (a missing one becomes [`UNKNOWN`]);
//! a populated name is what marks a row complete. Numeric attributes stay
//! optional and are stored as NULL when the provider omits them.

use crate::error::{SyncError, SyncResult};

/// Sentinel stored for text attributes the provider did not supply
pub const UNKNOWN: &str = "Unknown";

/// Full track metadata
#[derive(Debug, Clone, PartialEq)]
pub struct TrackRecord {
    pub id: String,
    pub name: String,
    pub album_id: Option<String>,
    pub artist_ids: Vec<String>,
    pub duration_ms: Option<i64>,
    pub popularity: Option<i64>,
    pub explicit: Option<bool>,
    pub track_number: Option<i64>,
}

/// Full album metadata
#[derive(Debug, Clone, PartialEq)]
pub struct AlbumRecord {
    pub id: String,
    pub name: String,
    /// Raw provider date; normalized at persist time
    pub release_date: Option<String>,
    pub total_tracks: Option<i64>,
    pub label: Option<String>,
    pub album_type: Option<String>,
    pub popularity: Option<i64>,
    pub artist_ids: Vec<String>,
    pub track_ids: Vec<String>,
}

/// Full artist metadata from Provider A
#[derive(Debug, Clone, PartialEq)]
pub struct ArtistRecord {
    pub id: String,
    pub name: String,
    pub popularity: Option<i64>,
    pub followers: Option<i64>,
    pub genres: Vec<String>,
}

/// Natural key of an area
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AreaKey {
    pub name: String,
    pub area_type: String,
}

impl AreaKey {
    pub fn new(name: impl Into<String>, area_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            area_type: area_type.into(),
        }
    }

    pub fn unknown() -> Self {
        Self::new(UNKNOWN, UNKNOWN)
    }
}

/// Artist enrichment from Provider B
#[derive(Debug, Clone, PartialEq)]
pub struct ArtistProfile {
    pub area: AreaKey,
    pub genres: Vec<String>,
}

impl ArtistProfile {
    /// Profile stored for artists the provider could not match
    pub fn unknown() -> Self {
        Self {
            area: AreaKey::unknown(),
            genres: vec![UNKNOWN.to_string()],
        }
    }
}

/// Normalize a provider release date to ISO-8601 `YYYY-MM-DD`
///
/// `"2001"` becomes `"2001-01-01"`, `"2001-05"` becomes `"2001-05-01"`,
/// a full date is kept as is. Any other shape is rejected, including
/// right-length values with non-digit parts such as `"05/2001"`.
pub fn normalize_release_date(raw: &str) -> SyncResult<String> {
    let parts: Vec<&str> = raw.split('-').collect();
    let widths: &[usize] = match raw.len() {
        4 => &[4],
        7 => &[4, 2],
        10 => &[4, 2, 2],
        _ => return Err(SyncError::InvalidReleaseDate(raw.to_string())),
    };
    let well_formed = parts.len() == widths.len()
        && parts
            .iter()
            .zip(widths)
            .all(|(part, width)| part.len() == *width && part.bytes().all(|b| b.is_ascii_digit()));
    if !well_formed {
        return Err(SyncError::InvalidReleaseDate(raw.to_string()));
    }

    Ok(match parts.len() {
        1 => format!("{}-01-01", raw),
        2 => format!("{}-01", raw),
        _ => raw.to_string(),
    })
}

/// Replace a missing or blank name with [`UNKNOWN`]
pub fn name_or_unknown(name: Option<String>) -> String {
    match name {
        Some(n) if !n.trim().is_empty() => n,
        _ => UNKNOWN.to_string(),
    }
}
