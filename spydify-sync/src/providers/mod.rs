//! External metadata providers

pub mod musicbrainz;
pub mod spotify;

pub use musicbrainz::{MusicBrainzClient, ProfileMatches, MUSICBRAINZ_API_BASE};
pub use spotify::{Collected, FetchedBatch, SpotifyClient, SPOTIFY_API_BASE};
