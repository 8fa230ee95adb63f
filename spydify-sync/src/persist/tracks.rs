//! Track persistence

use super::lookups;
use crate::models::TrackRecord;
use sqlx::SqliteConnection;

/// Upsert a full track record
///
/// Album and artist placeholders are written first, then the track row,
/// then the `TrackArtist` edges.
pub async fn persist_track(
    conn: &mut SqliteConnection,
    track: &TrackRecord,
) -> Result<(), sqlx::Error> {
    if let Some(album_id) = &track.album_id {
        lookups::ensure_album(conn, album_id).await?;
    }
    for artist_id in &track.artist_ids {
        lookups::ensure_artist(conn, artist_id).await?;
    }

    sqlx::query(
        r#"
        INSERT INTO Track (id, name, album_id, duration, popularity, explicit, track_number)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            album_id = COALESCE(excluded.album_id, Track.album_id),
            duration = excluded.duration,
            popularity = excluded.popularity,
            explicit = excluded.explicit,
            track_number = excluded.track_number
        "#,
    )
    .bind(&track.id)
    .bind(&track.name)
    .bind(&track.album_id)
    .bind(track.duration_ms)
    .bind(track.popularity)
    .bind(track.explicit)
    .bind(track.track_number)
    .execute(&mut *conn)
    .await?;

    for artist_id in &track.artist_ids {
        sqlx::query(
            "INSERT INTO TrackArtist (track_id, artist_id) VALUES (?, ?) ON CONFLICT DO NOTHING",
        )
        .bind(&track.id)
        .bind(artist_id)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}
