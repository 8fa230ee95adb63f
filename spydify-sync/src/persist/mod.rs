//! Idempotent persistence of fetched records
//!
//! Every write is an upsert keyed by natural identity, and every junction
//! insert ignores an existing edge, so persisting the same record twice
//! leaves the store as persisting it once. Within a record, placeholder
//! parents are written before the edges that reference them.

pub mod albums;
pub mod artists;
pub mod lookups;
pub mod tracks;

pub use albums::persist_album;
pub use artists::{persist_artist, persist_artist_albums, persist_artist_profile};
pub use tracks::persist_track;

use crate::providers::FetchedBatch;
use sqlx::SqliteConnection;

/// Persist every record of a fetched batch; returns the record count
pub async fn persist_batch(
    conn: &mut SqliteConnection,
    batch: &FetchedBatch,
) -> Result<usize, sqlx::Error> {
    match batch {
        FetchedBatch::Tracks(records) => {
            for record in records {
                persist_track(conn, record).await?;
            }
        }
        FetchedBatch::Albums(records) => {
            for record in records {
                persist_album(conn, record).await?;
            }
        }
        FetchedBatch::Artists(records) => {
            for record in records {
                persist_artist(conn, record).await?;
            }
        }
    }
    Ok(batch.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::ensure_schema;
    use crate::models::{AlbumRecord, AreaKey, ArtistProfile, ArtistRecord, TrackRecord};
    use sqlx::Connection;

    async fn store() -> SqliteConnection {
        let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&mut conn)
            .await
            .unwrap();
        ensure_schema(&mut conn).await.unwrap();
        conn
    }

    async fn count(conn: &mut SqliteConnection, sql: &str) -> i64 {
        let (n,): (i64,) = sqlx::query_as(sql).fetch_one(&mut *conn).await.unwrap();
        n
    }

    fn album(release_date: Option<&str>) -> AlbumRecord {
        AlbumRecord {
            id: "al1".into(),
            name: "Record".into(),
            release_date: release_date.map(str::to_string),
            total_tracks: Some(2),
            label: None,
            album_type: Some("album".into()),
            popularity: Some(10),
            artist_ids: vec!["a1".into()],
            track_ids: vec!["t1".into(), "t2".into()],
        }
    }

    #[tokio::test]
    async fn test_track_creates_parents_before_edges() {
        let mut conn = store().await;
        let track = TrackRecord {
            id: "t1".into(),
            name: "Song".into(),
            album_id: Some("al1".into()),
            artist_ids: vec!["a1".into(), "a2".into()],
            duration_ms: Some(1000),
            popularity: None,
            explicit: Some(true),
            track_number: Some(1),
        };

        persist_track(&mut conn, &track).await.unwrap();

        assert_eq!(count(&mut conn, "SELECT COUNT(*) FROM Album WHERE id = 'al1' AND name IS NULL").await, 1);
        assert_eq!(count(&mut conn, "SELECT COUNT(*) FROM Artist WHERE name IS NULL").await, 2);
        assert_eq!(count(&mut conn, "SELECT COUNT(*) FROM TrackArtist WHERE track_id = 't1'").await, 2);
        assert_eq!(count(&mut conn, "SELECT COUNT(*) FROM Track WHERE explicit = 1").await, 1);
    }

    #[tokio::test]
    async fn test_album_normalizes_date_and_seeds_tracks() {
        let mut conn = store().await;
        persist_album(&mut conn, &album(Some("2001-05"))).await.unwrap();

        let (date,): (Option<String>,) = sqlx::query_as("SELECT release_date FROM Album WHERE id = 'al1'")
            .fetch_one(&mut conn)
            .await
            .unwrap();
        assert_eq!(date.as_deref(), Some("2001-05-01"));
        assert_eq!(
            count(&mut conn, "SELECT COUNT(*) FROM Track WHERE album_id = 'al1' AND name IS NULL").await,
            2
        );
        assert_eq!(count(&mut conn, "SELECT COUNT(*) FROM AlbumArtist").await, 1);
    }

    #[tokio::test]
    async fn test_album_with_bad_date_still_stored() {
        for raw in ["2001-5", "05/2001"] {
            let mut conn = store().await;
            persist_album(&mut conn, &album(Some(raw))).await.unwrap();

            assert_eq!(
                count(&mut conn, "SELECT COUNT(*) FROM Album WHERE name = 'Record' AND release_date IS NULL").await,
                1,
                "{raw:?} stored as a date"
            );
        }
    }

    async fn snapshot(conn: &mut SqliteConnection) -> Vec<i64> {
        let mut counts = Vec::new();
        for table in [
            "Track",
            "Album",
            "Artist",
            "Genre",
            "Area",
            "TrackArtist",
            "AlbumArtist",
            "ArtistGenre",
        ] {
            counts.push(count(conn, &format!("SELECT COUNT(*) FROM {table}")).await);
        }
        counts
    }

    #[tokio::test]
    async fn test_persisting_twice_matches_persisting_once() {
        let mut conn = store().await;
        let track = TrackRecord {
            id: "t1".into(),
            name: "Song".into(),
            album_id: Some("al1".into()),
            artist_ids: vec!["a1".into()],
            duration_ms: Some(1000),
            popularity: Some(4),
            explicit: Some(false),
            track_number: Some(1),
        };
        let artist = ArtistRecord {
            id: "a1".into(),
            name: "Band".into(),
            popularity: Some(3),
            followers: Some(100),
            genres: vec!["rock".into(), "post-rock".into()],
        };
        let profile = ArtistProfile {
            area: AreaKey::new("Leeds", "City"),
            genres: vec!["rock".into()],
        };

        let mut states = Vec::new();
        for _ in 0..2 {
            persist_track(&mut conn, &track).await.unwrap();
            persist_album(&mut conn, &album(Some("1999"))).await.unwrap();
            persist_artist(&mut conn, &artist).await.unwrap();
            persist_artist_albums(&mut conn, "a1", &["al1".to_string()]).await.unwrap();
            persist_artist_profile(&mut conn, "a1", &profile).await.unwrap();

            let (name, album_id, date, area): (Option<String>, Option<String>, Option<String>, Option<i64>) =
                sqlx::query_as(
                    "SELECT t.name, t.album_id, al.release_date, ar.area_id \
                     FROM Track t, Album al, Artist ar \
                     WHERE t.id = 't1' AND al.id = 'al1' AND ar.id = 'a1'",
                )
                .fetch_one(&mut conn)
                .await
                .unwrap();
            states.push((snapshot(&mut conn).await, name, album_id, date, area));
        }

        assert_eq!(states[0], states[1]);
        assert_eq!(states[0].0, vec![2, 1, 1, 2, 1, 1, 1, 2]);
    }

    #[tokio::test]
    async fn test_artist_upsert_keeps_other_stage_columns() {
        let mut conn = store().await;
        persist_artist_albums(&mut conn, "a1", &["al9".to_string()]).await.unwrap();
        persist_artist_profile(
            &mut conn,
            "a1",
            &ArtistProfile {
                area: AreaKey::new("Leeds", "City"),
                genres: vec!["post-rock".into()],
            },
        )
        .await
        .unwrap();

        let artist = ArtistRecord {
            id: "a1".into(),
            name: "Band".into(),
            popularity: Some(3),
            followers: Some(100),
            genres: vec!["rock".into(), "post-rock".into()],
        };
        persist_artist(&mut conn, &artist).await.unwrap();

        assert_eq!(
            count(
                &mut conn,
                "SELECT COUNT(*) FROM Artist WHERE id = 'a1' AND name = 'Band' AND area_id IS NOT NULL AND retrieved_albums = 1"
            )
            .await,
            1
        );
        assert_eq!(count(&mut conn, "SELECT COUNT(*) FROM ArtistGenre WHERE artist_id = 'a1'").await, 2);
        assert_eq!(count(&mut conn, "SELECT COUNT(*) FROM Genre").await, 2);
    }

    #[tokio::test]
    async fn test_persist_batch_returns_record_count() {
        let mut conn = store().await;
        let batch = FetchedBatch::Albums(vec![album(Some("1999"))]);
        assert_eq!(persist_batch(&mut conn, &batch).await.unwrap(), 1);
    }
}
