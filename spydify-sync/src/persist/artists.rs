//! Artist persistence: Provider A metadata, album lists, Provider B profiles

use super::lookups;
use crate::models::{ArtistProfile, ArtistRecord};
use sqlx::SqliteConnection;

/// Upsert a full artist record and its genres
///
/// Only the Provider A attributes are updated; `area_id` and
/// `retrieved_albums` belong to other stages and are left alone.
pub async fn persist_artist(
    conn: &mut SqliteConnection,
    artist: &ArtistRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO Artist (id, name, popularity, followers)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            popularity = excluded.popularity,
            followers = excluded.followers
        "#,
    )
    .bind(&artist.id)
    .bind(&artist.name)
    .bind(artist.popularity)
    .bind(artist.followers)
    .execute(&mut *conn)
    .await?;

    for genre in &artist.genres {
        let genre_id = lookups::genre_id(conn, genre).await?;
        lookups::link_artist_genre(conn, &artist.id, genre_id).await?;
    }

    Ok(())
}

/// Record the albums released by `artist_id` and mark its list retrieved
pub async fn persist_artist_albums(
    conn: &mut SqliteConnection,
    artist_id: &str,
    album_ids: &[String],
) -> Result<(), sqlx::Error> {
    lookups::ensure_artist(conn, artist_id).await?;
    for album_id in album_ids {
        lookups::ensure_album(conn, album_id).await?;
        lookups::link_album_artist(conn, album_id, artist_id).await?;
    }

    sqlx::query("UPDATE Artist SET retrieved_albums = 1 WHERE id = ?")
        .bind(artist_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Attach an area and genres from Provider B
pub async fn persist_artist_profile(
    conn: &mut SqliteConnection,
    artist_id: &str,
    profile: &ArtistProfile,
) -> Result<(), sqlx::Error> {
    let area_id = lookups::area_id(conn, &profile.area).await?;

    sqlx::query("UPDATE Artist SET area_id = ? WHERE id = ?")
        .bind(area_id)
        .bind(artist_id)
        .execute(&mut *conn)
        .await?;

    for genre in &profile.genres {
        let genre_id = lookups::genre_id(conn, genre).await?;
        lookups::link_artist_genre(conn, artist_id, genre_id).await?;
    }

    Ok(())
}
