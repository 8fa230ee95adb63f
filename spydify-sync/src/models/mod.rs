//! Data models for spydify-sync

pub mod entity;
pub mod records;

pub use entity::{EntityKind, KindProfile, WorkItem};
pub use records::{
    normalize_release_date, AlbumRecord, AreaKey, ArtistProfile, ArtistRecord, TrackRecord,
    UNKNOWN,
};
