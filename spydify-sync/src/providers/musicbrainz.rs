//! Provider B client: artist area and genre enrichment
//!
//! One free-text search per page of artist names. Matching is by exact
//! name; requested names the search does not return are reported back to
//! the caller, which stores them with the unknown profile.

use crate::fetch::{ApiRequest, FetchFailure, RetryingFetcher};
use crate::models::{AreaKey, ArtistProfile, UNKNOWN};
use crate::ratelimit::SlidingWindowLimiter;
use serde::Deserialize;
use std::collections::HashMap;

pub const MUSICBRAINZ_API_BASE: &str = "https://musicbrainz.org/ws/2";

/// Names per search query, also the `limit` of the search
pub const SEARCH_PAGE_SIZE: usize = 100;

/// Attempts per search request
pub const MUSICBRAINZ_RETRY_BUDGET: u32 = 5;

#[derive(Debug, Deserialize)]
struct SearchReply {
    #[serde(default)]
    artists: Vec<MBArtist>,
}

#[derive(Debug, Deserialize)]
struct MBArtist {
    name: Option<String>,
    area: Option<MBArea>,
    #[serde(rename = "begin-area")]
    begin_area: Option<MBArea>,
    #[serde(default)]
    tags: Vec<MBTag>,
}

#[derive(Debug, Deserialize)]
struct MBArea {
    name: Option<String>,
    #[serde(rename = "type")]
    area_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MBTag {
    name: Option<String>,
}

impl MBArtist {
    fn profile(&self) -> ArtistProfile {
        let area = self
            .area
            .as_ref()
            .or(self.begin_area.as_ref())
            .map(|a| {
                AreaKey::new(
                    a.name.clone().unwrap_or_else(|| UNKNOWN.to_string()),
                    a.area_type.clone().unwrap_or_else(|| UNKNOWN.to_string()),
                )
            })
            .unwrap_or_else(AreaKey::unknown);

        let mut genres: Vec<String> = self.tags.iter().filter_map(|t| t.name.clone()).collect();
        if genres.is_empty() {
            genres.push(UNKNOWN.to_string());
        }

        ArtistProfile { area, genres }
    }
}

/// Result of one search: profiles by artist name, plus unmatched names
#[derive(Debug, Default)]
pub struct ProfileMatches {
    pub found: HashMap<String, ArtistProfile>,
    pub missing: Vec<String>,
}

/// Build `artist:"a" OR artist:"b" ...`, escaping embedded quotes
pub fn build_artist_query(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("artist:\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect::<Vec<_>>()
        .join(" OR ")
}

pub struct MusicBrainzClient {
    fetcher: RetryingFetcher,
    api_base: String,
}

impl MusicBrainzClient {
    pub fn new(fetcher: RetryingFetcher, api_base: impl Into<String>) -> Self {
        Self {
            fetcher,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Look up area and genres for a page of artist names
    pub async fn search_artists(
        &self,
        limiter: &mut SlidingWindowLimiter,
        names: &[String],
    ) -> Result<ProfileMatches, FetchFailure> {
        if names.is_empty() {
            return Ok(ProfileMatches::default());
        }

        let request = ApiRequest::new(format!("{}/artist/", self.api_base))
            .param("query", build_artist_query(names))
            .param("fmt", "json")
            .param("limit", SEARCH_PAGE_SIZE);

        tracing::debug!(count = names.len(), "Querying MusicBrainz artist search");

        let reply: SearchReply = self.fetcher.fetch_json(limiter, &request).await?;
        let matches = match_profiles(names, &reply.artists);

        if !matches.missing.is_empty() {
            tracing::info!(
                missing = matches.missing.len(),
                names = ?matches.missing,
                "Artists missing from MusicBrainz response"
            );
        }
        Ok(matches)
    }
}

/// Pair requested names with returned artists
///
/// Search results are ranked by score, so the first artist carrying a
/// requested name wins.
fn match_profiles(names: &[String], artists: &[MBArtist]) -> ProfileMatches {
    let mut found = HashMap::new();
    for artist in artists {
        if let Some(name) = &artist.name {
            found.entry(name.clone()).or_insert_with(|| artist.profile());
        }
    }

    let missing = names
        .iter()
        .filter(|name| !found.contains_key(name.as_str()))
        .cloned()
        .collect();

    found.retain(|name, _| names.contains(name));
    ProfileMatches { found, missing }
}
