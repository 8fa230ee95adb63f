//! Placeholder rows and natural-key lookups
//!
//! Placeholders carry only an id; the incomplete-row scan later picks them
//! up. Genres and areas are deduplicated by natural key.

use crate::models::AreaKey;
use sqlx::SqliteConnection;

pub async fn ensure_track(conn: &mut SqliteConnection, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO Track (id) VALUES (?) ON CONFLICT(id) DO NOTHING")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn ensure_album(conn: &mut SqliteConnection, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO Album (id) VALUES (?) ON CONFLICT(id) DO NOTHING")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn ensure_artist(conn: &mut SqliteConnection, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO Artist (id) VALUES (?) ON CONFLICT(id) DO NOTHING")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Id of the genre named `name`, inserting it if absent
pub async fn genre_id(conn: &mut SqliteConnection, name: &str) -> Result<i64, sqlx::Error> {
    sqlx::query("INSERT INTO Genre (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
        .bind(name)
        .execute(&mut *conn)
        .await?;

    let (id,): (i64,) = sqlx::query_as("SELECT id FROM Genre WHERE name = ?")
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;
    Ok(id)
}

/// Id of the area `(name, type)`, inserting it if absent
pub async fn area_id(conn: &mut SqliteConnection, area: &AreaKey) -> Result<i64, sqlx::Error> {
    sqlx::query("INSERT INTO Area (name, type) VALUES (?, ?) ON CONFLICT(name, type) DO NOTHING")
        .bind(&area.name)
        .bind(&area.area_type)
        .execute(&mut *conn)
        .await?;

    let (id,): (i64,) = sqlx::query_as("SELECT id FROM Area WHERE name = ? AND type = ?")
        .bind(&area.name)
        .bind(&area.area_type)
        .fetch_one(&mut *conn)
        .await?;
    Ok(id)
}

/// Link an artist to a genre, ignoring an existing edge
pub async fn link_artist_genre(
    conn: &mut SqliteConnection,
    artist_id: &str,
    genre_id: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO ArtistGenre (artist_id, genre_id) VALUES (?, ?) ON CONFLICT DO NOTHING",
    )
    .bind(artist_id)
    .bind(genre_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Link an album to an artist, ignoring an existing edge
pub async fn link_album_artist(
    conn: &mut SqliteConnection,
    album_id: &str,
    artist_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO AlbumArtist (album_id, artist_id) VALUES (?, ?) ON CONFLICT DO NOTHING",
    )
    .bind(album_id)
    .bind(artist_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
