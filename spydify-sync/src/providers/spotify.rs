//! Provider A client: track, album and artist metadata
//!
//! Payloads are decoded into lenient wire structs (every field optional) and
//! normalized into [`crate::models`] records, so a missing field degrades to
//! NULL or [`crate::models::UNKNOWN`] instead of failing the batch.

use crate::fetch::{ApiRequest, FetchFailure, RetryingFetcher};
use crate::models::records::name_or_unknown;
use crate::models::{AlbumRecord, ArtistRecord, EntityKind, TrackRecord};
use crate::planner::BatchRequest;
use crate::ratelimit::SlidingWindowLimiter;
use serde::de::DeserializeOwned;
use serde::Deserialize;

pub const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";

/// Page size of the list endpoints (`/me/tracks`, `/artists/{id}/albums`)
pub const LIST_PAGE_SIZE: u64 = 50;

// Wire types

#[derive(Debug, Deserialize)]
struct IdRef {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Paging<T> {
    #[serde(default)]
    items: Vec<Option<T>>,
    total: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct WireTrack {
    id: Option<String>,
    name: Option<String>,
    album: Option<IdRef>,
    #[serde(default)]
    artists: Vec<IdRef>,
    duration_ms: Option<i64>,
    popularity: Option<i64>,
    explicit: Option<bool>,
    track_number: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WireAlbum {
    id: Option<String>,
    name: Option<String>,
    release_date: Option<String>,
    total_tracks: Option<i64>,
    label: Option<String>,
    album_type: Option<String>,
    popularity: Option<i64>,
    #[serde(default)]
    artists: Vec<IdRef>,
    tracks: Option<Paging<IdRef>>,
}

#[derive(Debug, Deserialize)]
struct Followers {
    total: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WireArtist {
    id: Option<String>,
    name: Option<String>,
    popularity: Option<i64>,
    followers: Option<Followers>,
    #[serde(default)]
    genres: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SavedTrack {
    track: Option<WireTrack>,
}

#[derive(Debug, Deserialize)]
struct TracksReply {
    #[serde(default)]
    tracks: Vec<Option<WireTrack>>,
}

#[derive(Debug, Deserialize)]
struct AlbumsReply {
    #[serde(default)]
    albums: Vec<Option<WireAlbum>>,
}

#[derive(Debug, Deserialize)]
struct ArtistsReply {
    #[serde(default)]
    artists: Vec<Option<WireArtist>>,
}

fn ids_of(refs: Vec<IdRef>) -> Vec<String> {
    refs.into_iter().filter_map(|r| r.id).collect()
}

impl WireTrack {
    fn normalize(self) -> Option<TrackRecord> {
        Some(TrackRecord {
            id: self.id?,
            name: name_or_unknown(self.name),
            album_id: self.album.and_then(|a| a.id),
            artist_ids: ids_of(self.artists),
            duration_ms: self.duration_ms,
            popularity: self.popularity,
            explicit: self.explicit,
            track_number: self.track_number,
        })
    }
}

impl WireAlbum {
    fn normalize(self) -> Option<AlbumRecord> {
        let track_ids = self
            .tracks
            .map(|page| ids_of(page.items.into_iter().flatten().collect()))
            .unwrap_or_default();

        Some(AlbumRecord {
            id: self.id?,
            name: name_or_unknown(self.name),
            release_date: self.release_date,
            total_tracks: self.total_tracks,
            label: self.label,
            album_type: self.album_type,
            popularity: self.popularity,
            artist_ids: ids_of(self.artists),
            track_ids,
        })
    }
}

impl WireArtist {
    fn normalize(self) -> Option<ArtistRecord> {
        Some(ArtistRecord {
            id: self.id?,
            name: name_or_unknown(self.name),
            popularity: self.popularity,
            followers: self.followers.and_then(|f| f.total),
            genres: self.genres,
        })
    }
}

/// Normalized reply to one batch request
///
/// Null entries in the provider reply (unknown ids) are dropped; callers
/// compare [`FetchedBatch::ids`] against the request to find them.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchedBatch {
    Tracks(Vec<TrackRecord>),
    Albums(Vec<AlbumRecord>),
    Artists(Vec<ArtistRecord>),
}

impl FetchedBatch {
    pub fn ids(&self) -> Vec<&str> {
        match self {
            FetchedBatch::Tracks(r) => r.iter().map(|t| t.id.as_str()).collect(),
            FetchedBatch::Albums(r) => r.iter().map(|a| a.id.as_str()).collect(),
            FetchedBatch::Artists(r) => r.iter().map(|a| a.id.as_str()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FetchedBatch::Tracks(r) => r.len(),
            FetchedBatch::Albums(r) => r.len(),
            FetchedBatch::Artists(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Items gathered from a paginated list, plus the failure that cut it short
#[derive(Debug)]
pub struct Collected<T> {
    pub items: Vec<T>,
    pub failure: Option<FetchFailure>,
}

pub struct SpotifyClient {
    fetcher: RetryingFetcher,
    api_base: String,
}

impl SpotifyClient {
    pub fn new(fetcher: RetryingFetcher, api_base: impl Into<String>) -> Self {
        Self {
            fetcher,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Batch GET of full metadata for every id in `request`
    pub async fn fetch_batch(
        &self,
        limiter: &mut SlidingWindowLimiter,
        request: &BatchRequest,
    ) -> Result<FetchedBatch, FetchFailure> {
        let endpoint = request.kind().profile().endpoint;
        let api_request = ApiRequest::new(format!("{}/{}", self.api_base, endpoint))
            .param("ids", request.joined_ids());

        tracing::debug!(kind = %request.kind(), count = request.len(), "Fetching batch");

        let batch = match request.kind() {
            EntityKind::Track => {
                let reply: TracksReply = self.fetcher.fetch_json(limiter, &api_request).await?;
                FetchedBatch::Tracks(normalize_all(reply.tracks, WireTrack::normalize))
            }
            EntityKind::Album => {
                let reply: AlbumsReply = self.fetcher.fetch_json(limiter, &api_request).await?;
                FetchedBatch::Albums(normalize_all(reply.albums, WireAlbum::normalize))
            }
            EntityKind::Artist => {
                let reply: ArtistsReply = self.fetcher.fetch_json(limiter, &api_request).await?;
                FetchedBatch::Artists(normalize_all(reply.artists, WireArtist::normalize))
            }
        };

        if batch.len() < request.len() {
            tracing::debug!(
                kind = %request.kind(),
                requested = request.len(),
                returned = batch.len(),
                "Provider omitted some ids"
            );
        }
        Ok(batch)
    }

    /// Every album id released by `artist_id` (albums and singles)
    ///
    /// The album-listing endpoint is not batchable: one paginated walk per
    /// artist.
    pub async fn artist_album_ids(
        &self,
        limiter: &mut SlidingWindowLimiter,
        artist_id: &str,
    ) -> Collected<String> {
        let url = format!("{}/artists/{}/albums", self.api_base, artist_id);
        let collected: Collected<IdRef> = self
            .collect_pages(limiter, |offset| {
                ApiRequest::new(url.clone())
                    .param("limit", LIST_PAGE_SIZE)
                    .param("offset", offset)
                    .param("include_groups", "album,single")
            })
            .await;

        Collected {
            items: ids_of(collected.items),
            failure: collected.failure,
        }
    }

    /// The user's saved tracks, as full track records
    pub async fn saved_tracks(&self, limiter: &mut SlidingWindowLimiter) -> Collected<TrackRecord> {
        let url = format!("{}/me/tracks", self.api_base);
        let collected: Collected<SavedTrack> = self
            .collect_pages(limiter, |offset| {
                ApiRequest::new(url.clone())
                    .param("limit", LIST_PAGE_SIZE)
                    .param("offset", offset)
            })
            .await;

        Collected {
            items: collected
                .items
                .into_iter()
                .filter_map(|saved| saved.track.and_then(WireTrack::normalize))
                .collect(),
            failure: collected.failure,
        }
    }

    /// Walk a `limit`/`offset` list until the provider-reported total
    async fn collect_pages<T, F>(
        &self,
        limiter: &mut SlidingWindowLimiter,
        page_request: F,
    ) -> Collected<T>
    where
        T: DeserializeOwned,
        F: Fn(u64) -> ApiRequest,
    {
        let mut items = Vec::new();
        let mut offset = 0u64;

        loop {
            let request = page_request(offset);
            let page: Paging<T> = match self.fetcher.fetch_json(limiter, &request).await {
                Ok(page) => page,
                Err(failure) => {
                    return Collected {
                        items,
                        failure: Some(failure),
                    }
                }
            };

            let returned = page.items.len() as u64;
            items.extend(page.items.into_iter().flatten());
            offset += LIST_PAGE_SIZE;

            let total = page.total.unwrap_or(0);
            if offset >= total || returned == 0 {
                break;
            }
        }

        Collected {
            items,
            failure: None,
        }
    }
}

fn normalize_all<W, R>(entries: Vec<Option<W>>, normalize: fn(W) -> Option<R>) -> Vec<R> {
    entries.into_iter().flatten().filter_map(normalize).collect()
}
