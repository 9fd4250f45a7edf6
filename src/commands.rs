/// The commands module wires configuration, the graph cache, the remote service, local files and
/// the metadata export together into the user-facing operations.
use crate::artists::follow_artists;
use crate::audiotags::load_music_files;
use crate::common::MetadataRecord;
use crate::config::Config;
use crate::error::{Result, SyncError};
use crate::graph::{fetch_track_graph, TrackGraph};
use crate::graph_cache::{FileStore, GraphCache};
use crate::playlists::{remove_unwanted, sync_missing_playlist, MissingPlaylistReport};
use crate::service::MusicService;
use crate::sync::{build_contexts, left_outer_join, sync_tags, SyncSummary};
use std::fs;
use tracing::info;

pub fn graph_cache(c: &Config) -> GraphCache<FileStore> {
    GraphCache::new(FileStore::new(&c.cache_file))
}

/// Fetches every matching playlist and replaces the cached graph.
pub fn refresh_graph(c: &Config, service: &dyn MusicService) -> Result<TrackGraph> {
    graph_cache(c).refresh(|| fetch_track_graph(service, &c.remote.playlist_regex))
}

pub fn load_graph(c: &Config, service: &dyn MusicService) -> Result<TrackGraph> {
    graph_cache(c).get_or_fetch(|| fetch_track_graph(service, &c.remote.playlist_regex))
}

/// Reads the metadata export. No configured file means no metadata.
pub fn load_metadata(c: &Config) -> Result<Vec<MetadataRecord>> {
    let Some(path) = &c.metadata_file else {
        return Ok(Vec::new());
    };
    let data = fs::read(path)?;
    let records: Vec<MetadataRecord> = serde_json::from_slice(&data).map_err(|e| SyncError::Generic(format!("Failed to decode metadata file {}: {}", path.display(), e)))?;
    info!("Loaded {} metadata records from {}", records.len(), path.display());
    Ok(records)
}

pub fn tag_files(c: &Config, service: &dyn MusicService) -> Result<SyncSummary> {
    let graph = load_graph(c, service)?;
    let files = load_music_files(&c.music_dirs)?;
    let metadata = load_metadata(c)?;
    sync_tags(service, &c.tags, files, &graph, metadata)
}

pub fn create_missing_playlist(c: &Config, service: &dyn MusicService) -> Result<MissingPlaylistReport> {
    let graph = load_graph(c, service)?;
    let files = load_music_files(&c.music_dirs)?;
    let missing = left_outer_join(&files, graph.clone());
    let report = sync_missing_playlist(service, &graph, &missing, &c.remote.output_playlist)?;
    if report.created {
        if let Some(id) = &report.playlist_id {
            info!("Set remote.output_playlist.id = {:?} in the configuration to reuse the new playlist", id);
        }
    }
    Ok(report)
}

/// Pulls tracks tagged with the delete tag out of their playlists, then refreshes the cache when
/// anything was removed.
pub fn remove_unwanted_tracks(c: &Config, service: &dyn MusicService) -> Result<bool> {
    let graph = load_graph(c, service)?;
    let files = load_music_files(&c.music_dirs)?;
    let metadata = load_metadata(c)?;
    let contexts = build_contexts(files, &graph, metadata);
    let removed = remove_unwanted(service, &contexts, &c.tags.delete_tag)?;
    if removed {
        info!("Refreshing the track graph after removing tracks");
        refresh_graph(c, service)?;
    }
    Ok(removed)
}

pub fn follow_rated_artists(c: &Config, service: &dyn MusicService) -> Result<usize> {
    let metadata = load_metadata(c)?;
    follow_artists(service, &metadata, &c.artists)
}
