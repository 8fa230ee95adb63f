//! Database Test Utilities
//!
//! Temporary stores and small query helpers for asserting on sync results

use anyhow::Result;
use spydify_sync::models::{ArtistRecord, TrackRecord};
use spydify_sync::persist::{lookups, persist_artist};
use sqlx::SqlitePool;
use tempfile::TempDir;

/// Create a temporary store with the schema applied
///
/// Returns (TempDir, SqlitePool) - TempDir must be kept alive for duration of test
pub async fn create_test_db() -> Result<(TempDir, SqlitePool)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("spotify.sqlite");
    let pool = spydify_sync::db::open_pool(&db_path).await?;
    Ok((temp_dir, pool))
}

/// Row count of `table`
pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    let query = format!("SELECT COUNT(*) FROM {}", table);
    sqlx::query_scalar::<_, i64>(&query)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Name column of the row `id` in `table`; `None` for a placeholder
pub async fn name_of(pool: &SqlitePool, table: &str, id: &str) -> Option<String> {
    let query = format!("SELECT name FROM {} WHERE id = ?", table);
    sqlx::query_scalar::<_, Option<String>>(&query)
        .bind(id)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Whether the junction row (`left`, `right`) exists
pub async fn has_edge(pool: &SqlitePool, table: &str, left: &str, right: &str) -> bool {
    let (left_col, right_col) = match table {
        "TrackArtist" => ("track_id", "artist_id"),
        "AlbumArtist" => ("album_id", "artist_id"),
        other => panic!("no junction table {}", other),
    };
    let query = format!(
        "SELECT COUNT(*) FROM {} WHERE {} = ? AND {} = ?",
        table, left_col, right_col
    );
    sqlx::query_scalar::<_, i64>(&query)
        .bind(left)
        .bind(right)
        .fetch_one(pool)
        .await
        .unwrap()
        > 0
}

/// Genre names linked to `artist_id`, sorted
pub async fn artist_genres(pool: &SqlitePool, artist_id: &str) -> Vec<String> {
    sqlx::query_scalar::<_, String>(
        "SELECT g.name FROM ArtistGenre ag JOIN Genre g ON g.id = ag.genre_id
         WHERE ag.artist_id = ? ORDER BY g.name",
    )
    .bind(artist_id)
    .fetch_all(pool)
    .await
    .unwrap()
}

/// (area name, area type) of `artist_id`, if enriched
pub async fn artist_area(pool: &SqlitePool, artist_id: &str) -> Option<(String, String)> {
    sqlx::query_as::<_, (String, String)>(
        "SELECT a.name, a.type FROM Artist ar JOIN Area a ON a.id = ar.area_id WHERE ar.id = ?",
    )
    .bind(artist_id)
    .fetch_optional(pool)
    .await
    .unwrap()
}

/// Insert bare track placeholders, as left behind by an earlier discovery
pub async fn seed_track_placeholders(pool: &SqlitePool, ids: &[&str]) -> Result<()> {
    let mut conn = pool.acquire().await?;
    for id in ids {
        lookups::ensure_track(&mut conn, id).await?;
    }
    Ok(())
}

/// Insert fully fetched artists
pub async fn seed_artists(pool: &SqlitePool, artists: &[(&str, &str)]) -> Result<()> {
    let mut conn = pool.acquire().await?;
    for (id, name) in artists {
        let record = ArtistRecord {
            id: id.to_string(),
            name: name.to_string(),
            popularity: Some(50),
            followers: Some(1000),
            genres: Vec::new(),
        };
        persist_artist(&mut conn, &record).await?;
    }
    Ok(())
}

/// Minimal complete track record
pub fn track_record(id: &str, album_id: &str, artist_ids: &[&str]) -> TrackRecord {
    TrackRecord {
        id: id.to_string(),
        name: format!("Track {}", id),
        album_id: Some(album_id.to_string()),
        artist_ids: artist_ids.iter().map(|a| a.to_string()).collect(),
        duration_ms: Some(180_000),
        popularity: Some(40),
        explicit: Some(false),
        track_number: Some(1),
    }
}
