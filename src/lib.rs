pub mod artists;
pub mod audiotags;
pub mod commands;
pub mod comment;
pub mod common;
pub mod config;
pub mod error;
pub mod genre;
pub mod graph;
pub mod graph_cache;
pub mod logging;
pub mod playlists;
pub mod service;
pub mod sync;

pub use common::{MetadataRecord, PlaylistRef, RemoteTrack, SongKey};
pub use config::Config;
pub use error::{Result, ServiceError, SyncError, SyncExpectedError};
pub use graph::{fetch_track_graph, TrackGraph};
pub use service::MusicService;

#[cfg(test)]
pub mod testing;
