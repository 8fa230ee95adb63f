//! In-process transports
//!
//! [`ScriptedTransport`] replays a fixed list of outcomes for fetcher
//! tests. [`FakeSpotify`] and [`FakeMusicBrainz`] answer the provider
//! endpoints from an in-memory catalog for scheduler tests.

use async_trait::async_trait;
use serde_json::{json, Value};
use spydify_sync::fetch::{ApiRequest, HttpTransport, RawResponse, TransportError};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

pub const FAKE_SPOTIFY_BASE: &str = "http://spotify.test/v1";
pub const FAKE_MUSICBRAINZ_BASE: &str = "http://musicbrainz.test/ws/2";

/// A request as seen by a fake transport
#[derive(Debug, Clone)]
pub struct Seen {
    pub request: ApiRequest,
    pub bearer: Option<String>,
}

/// Replays queued outcomes in order; fails loudly when the script runs out
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<RawResponse, TransportError>>>,
    seen: Mutex<Vec<Seen>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Result<RawResponse, TransportError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<RawResponse, TransportError> {
        self.seen.lock().unwrap().push(Seen {
            request: request.clone(),
            bearer: bearer.map(str::to_string),
        });
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unscripted request: {}", request))
    }
}

/// 429 carrying a `Retry-After` hint
pub fn too_many_requests(retry_after: Option<u64>) -> RawResponse {
    RawResponse {
        status: 429,
        retry_after,
        body: String::new(),
    }
}

/// Provider A catalog served over its batch and list endpoints
///
/// Ids absent from the catalog come back as `null`, as the real batch
/// endpoints do. Any request naming a `broken` id fails at the transport
/// level.
#[derive(Default)]
pub struct FakeSpotify {
    pub tracks: HashMap<String, Value>,
    pub albums: HashMap<String, Value>,
    pub artists: HashMap<String, Value>,
    pub artist_albums: HashMap<String, Vec<String>>,
    pub saved: Vec<String>,
    pub broken: HashSet<String>,
    /// Cancel this token when a request hits the given path
    pub cancel_on: Option<(String, CancellationToken)>,
    seen: Mutex<Vec<Seen>>,
}

impl FakeSpotify {
    /// Catalog with one track on one album by one artist
    pub fn single_track() -> Self {
        let mut fake = Self::default();
        fake.add_track("t1", "al1", &["a1"]);
        fake.add_album("al1", "2020", &["a1"], &["t1"]);
        fake.add_artist("a1", "Artist One", &["rock"]);
        fake.saved.push("t1".to_string());
        fake
    }

    pub fn add_track(&mut self, id: &str, album_id: &str, artist_ids: &[&str]) {
        self.tracks.insert(
            id.to_string(),
            json!({
                "id": id,
                "name": format!("Track {}", id),
                "album": { "id": album_id },
                "artists": artist_ids.iter().map(|a| json!({ "id": a })).collect::<Vec<_>>(),
                "duration_ms": 201_000,
                "popularity": 55,
                "explicit": false,
                "track_number": 1
            }),
        );
    }

    pub fn add_album(&mut self, id: &str, release_date: &str, artist_ids: &[&str], track_ids: &[&str]) {
        self.albums.insert(
            id.to_string(),
            json!({
                "id": id,
                "name": format!("Album {}", id),
                "release_date": release_date,
                "total_tracks": track_ids.len(),
                "label": "Test Label",
                "album_type": "album",
                "popularity": 30,
                "artists": artist_ids.iter().map(|a| json!({ "id": a })).collect::<Vec<_>>(),
                "tracks": {
                    "items": track_ids.iter().map(|t| json!({ "id": t })).collect::<Vec<_>>(),
                    "total": track_ids.len()
                }
            }),
        );
    }

    pub fn add_artist(&mut self, id: &str, name: &str, genres: &[&str]) {
        self.artists.insert(
            id.to_string(),
            json!({
                "id": id,
                "name": name,
                "popularity": 70,
                "followers": { "total": 12345 },
                "genres": genres
            }),
        );
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    /// Requests whose path ends with `suffix`
    pub fn calls_to(&self, suffix: &str) -> usize {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.request.url.ends_with(suffix))
            .count()
    }

    /// Requests that mention `id`, either in the path or the `ids` list
    pub fn calls_for_id(&self, id: &str) -> usize {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|s| request_ids(&s.request).iter().any(|i| i == id))
            .count()
    }

    fn batch(&self, key: &str, catalog: &HashMap<String, Value>, ids: &[String]) -> RawResponse {
        let items: Vec<Value> = ids
            .iter()
            .map(|id| catalog.get(id).cloned().unwrap_or(Value::Null))
            .collect();
        RawResponse::ok(json!({ key: items }).to_string())
    }

    fn list(&self, request: &ApiRequest, items: Vec<Value>) -> RawResponse {
        let offset: usize = request
            .query_value("offset")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let limit: usize = request
            .query_value("limit")
            .and_then(|v| v.parse().ok())
            .unwrap_or(50);
        let total = items.len();
        let page: Vec<Value> = items.into_iter().skip(offset).take(limit).collect();
        RawResponse::ok(json!({ "items": page, "total": total }).to_string())
    }
}

/// Ids a request refers to
fn request_ids(request: &ApiRequest) -> Vec<String> {
    let mut ids: Vec<String> = request
        .query_value("ids")
        .map(|v| v.split(',').map(str::to_string).collect())
        .unwrap_or_default();
    if let Some(rest) = request.url.strip_prefix(&format!("{}/artists/", FAKE_SPOTIFY_BASE)) {
        if let Some(artist) = rest.strip_suffix("/albums") {
            ids.push(artist.to_string());
        }
    }
    ids
}

#[async_trait]
impl HttpTransport for FakeSpotify {
    async fn get(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<RawResponse, TransportError> {
        self.seen.lock().unwrap().push(Seen {
            request: request.clone(),
            bearer: bearer.map(str::to_string),
        });

        let ids = request_ids(request);
        if ids.iter().any(|id| self.broken.contains(id)) {
            return Err(TransportError::Connection("connection reset".to_string()));
        }

        let path = request
            .url
            .strip_prefix(FAKE_SPOTIFY_BASE)
            .unwrap_or(&request.url)
            .to_string();

        if let Some((trigger, token)) = &self.cancel_on {
            if &path == trigger {
                token.cancel();
            }
        }

        let response = match path.as_str() {
            "/tracks" => self.batch("tracks", &self.tracks, &ids),
            "/albums" => self.batch("albums", &self.albums, &ids),
            "/artists" => self.batch("artists", &self.artists, &ids),
            "/me/tracks" => {
                let items = self
                    .saved
                    .iter()
                    .map(|id| json!({ "track": self.tracks.get(id).cloned().unwrap_or(Value::Null) }))
                    .collect();
                self.list(request, items)
            }
            other if other.starts_with("/artists/") && other.ends_with("/albums") => {
                let artist = ids.last().cloned().unwrap_or_default();
                let items = self
                    .artist_albums
                    .get(&artist)
                    .map(|albums| albums.iter().map(|id| json!({ "id": id })).collect())
                    .unwrap_or_default();
                self.list(request, items)
            }
            _ => RawResponse::status(404),
        };
        Ok(response)
    }
}

/// Provider B artist search over a name-keyed catalog
#[derive(Default)]
pub struct FakeMusicBrainz {
    pub artists: HashMap<String, Value>,
    pub unavailable: bool,
    seen: Mutex<Vec<Seen>>,
}

impl FakeMusicBrainz {
    /// Every search answers 503
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Default::default()
        }
    }

    pub fn add_artist(&mut self, name: &str, area: Option<(&str, &str)>, tags: &[&str]) {
        let mut artist = json!({
            "name": name,
            "tags": tags.iter().map(|t| json!({ "name": t })).collect::<Vec<_>>()
        });
        if let Some((area_name, area_type)) = area {
            artist["area"] = json!({ "name": area_name, "type": area_type });
        }
        self.artists.insert(name.to_string(), artist);
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

/// Names in an `artist:"a" OR artist:"b"` query
fn query_names(query: &str) -> Vec<String> {
    query
        .split(" OR ")
        .filter_map(|term| term.strip_prefix("artist:\"")?.strip_suffix('"'))
        .map(|name| name.replace("\\\"", "\"").replace("\\\\", "\\"))
        .collect()
}

#[async_trait]
impl HttpTransport for FakeMusicBrainz {
    async fn get(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<RawResponse, TransportError> {
        self.seen.lock().unwrap().push(Seen {
            request: request.clone(),
            bearer: bearer.map(str::to_string),
        });
        if self.unavailable {
            return Ok(RawResponse::status(503));
        }

        let names = query_names(request.query_value("query").unwrap_or_default());
        let artists: Vec<Value> = names
            .iter()
            .filter_map(|name| self.artists.get(name).cloned())
            .collect();
        Ok(RawResponse::ok(json!({ "artists": artists }).to_string()))
    }
}
