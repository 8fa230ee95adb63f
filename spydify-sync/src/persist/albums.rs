//! Album persistence

use super::lookups;
use crate::models::{normalize_release_date, AlbumRecord};
use sqlx::SqliteConnection;

/// Upsert a full album record
///
/// Writes artist placeholders, the album row, `AlbumArtist` edges, then a
/// placeholder for every listed track (pointing back at this album). A
/// release date that does not normalize is stored as NULL.
pub async fn persist_album(
    conn: &mut SqliteConnection,
    album: &AlbumRecord,
) -> Result<(), sqlx::Error> {
    let release_date = match album.release_date.as_deref() {
        Some(raw) => match normalize_release_date(raw) {
            Ok(date) => Some(date),
            Err(e) => {
                tracing::warn!(album_id = %album.id, error = %e, "Storing album without release date");
                None
            }
        },
        None => None,
    };

    for artist_id in &album.artist_ids {
        lookups::ensure_artist(conn, artist_id).await?;
    }

    sqlx::query(
        r#"
        INSERT INTO Album (id, name, release_date, total_tracks, label, album_type, popularity)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            release_date = excluded.release_date,
            total_tracks = excluded.total_tracks,
            label = excluded.label,
            album_type = excluded.album_type,
            popularity = excluded.popularity
        "#,
    )
    .bind(&album.id)
    .bind(&album.name)
    .bind(&release_date)
    .bind(album.total_tracks)
    .bind(&album.label)
    .bind(&album.album_type)
    .bind(album.popularity)
    .execute(&mut *conn)
    .await?;

    for artist_id in &album.artist_ids {
        lookups::link_album_artist(conn, &album.id, artist_id).await?;
    }

    for track_id in &album.track_ids {
        sqlx::query(
            r#"
            INSERT INTO Track (id, album_id) VALUES (?, ?)
            ON CONFLICT(id) DO UPDATE SET album_id = COALESCE(Track.album_id, excluded.album_id)
            "#,
        )
        .bind(track_id)
        .bind(&album.id)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}
