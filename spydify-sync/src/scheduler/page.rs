//! Write set of one page
//!
//! A page is fetched in full before anything is written, then applied
//! inside a savepoint. Cancelling during the fetch therefore writes
//! nothing, and a storage error rolls the whole page back.

use crate::models::ArtistProfile;
use crate::persist::{self, persist_artist_albums, persist_artist_profile};
use crate::providers::FetchedBatch;
use sqlx::SqliteConnection;

#[derive(Debug, Default)]
pub struct PageWrites {
    pub batches: Vec<FetchedBatch>,
    /// (artist id, album ids) for artists whose list was fully walked
    pub artist_albums: Vec<(String, Vec<String>)>,
    /// (artist id, profile) from Provider B
    pub profiles: Vec<(String, ArtistProfile)>,
}

impl PageWrites {
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty() && self.artist_albums.is_empty() && self.profiles.is_empty()
    }

    /// Apply every write; returns the number of records persisted
    pub async fn apply(&self, conn: &mut SqliteConnection) -> Result<usize, sqlx::Error> {
        let mut persisted = 0;

        for batch in &self.batches {
            persisted += persist::persist_batch(conn, batch).await?;
        }
        for (artist_id, album_ids) in &self.artist_albums {
            persist_artist_albums(conn, artist_id, album_ids).await?;
            persisted += 1;
        }
        for (artist_id, profile) in &self.profiles {
            persist_artist_profile(conn, artist_id, profile).await?;
            persisted += 1;
        }

        Ok(persisted)
    }
}
