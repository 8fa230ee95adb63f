//! Store bootstrap
//!
//! Idempotent `CREATE TABLE IF NOT EXISTS` for every table the sync core
//! reads or writes. Never drops or alters existing data.

use sqlx::SqliteConnection;

/// Create any missing tables
///
/// Parents are created before the tables that reference them.
pub async fn ensure_schema(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    create_area_table(conn).await?;
    create_genre_table(conn).await?;
    create_album_table(conn).await?;
    create_artist_table(conn).await?;
    create_track_table(conn).await?;

    create_track_artist_table(conn).await?;
    create_album_artist_table(conn).await?;
    create_artist_genre_table(conn).await?;

    Ok(())
}

async fn create_area_table(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS Area (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            type TEXT NOT NULL,
            UNIQUE(name, type)
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn create_genre_table(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS Genre (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn create_album_table(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS Album (
            id TEXT PRIMARY KEY,
            name TEXT,
            release_date TEXT,
            total_tracks INTEGER,
            label TEXT,
            album_type TEXT,
            popularity INTEGER
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn create_artist_table(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS Artist (
            id TEXT PRIMARY KEY,
            name TEXT,
            popularity INTEGER,
            followers INTEGER,
            area_id INTEGER REFERENCES Area(id),
            retrieved_albums INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn create_track_table(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS Track (
            id TEXT PRIMARY KEY,
            name TEXT,
            album_id TEXT REFERENCES Album(id),
            duration INTEGER,
            popularity INTEGER,
            explicit INTEGER,
            track_number INTEGER
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn create_track_artist_table(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS TrackArtist (
            track_id TEXT NOT NULL REFERENCES Track(id),
            artist_id TEXT NOT NULL REFERENCES Artist(id),
            PRIMARY KEY (track_id, artist_id)
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn create_album_artist_table(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS AlbumArtist (
            album_id TEXT NOT NULL REFERENCES Album(id),
            artist_id TEXT NOT NULL REFERENCES Artist(id),
            PRIMARY KEY (album_id, artist_id)
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn create_artist_genre_table(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ArtistGenre (
            artist_id TEXT NOT NULL REFERENCES Artist(id),
            genre_id INTEGER NOT NULL REFERENCES Genre(id),
            PRIMARY KEY (artist_id, genre_id)
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;
    Ok(())
}
