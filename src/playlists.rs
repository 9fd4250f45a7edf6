/// The playlists module writes back to remote playlists: it fills the output playlist with the
/// tracks that have no local file, and pulls tracks marked for deletion out of every playlist they
/// belong to.
use crate::config::OutputPlaylist;
use crate::error::{Result, SyncError};
use crate::genre::tokenize;
use crate::graph::{TrackGraph, TrackLookup};
use crate::service::{MusicService, MAX_TRACKS_PER_ADD};
use crate::sync::FileContext;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissingPlaylistReport {
    pub playlist_id: Option<String>,
    /// Set when the playlist did not exist yet. Callers should persist the id in their config.
    pub created: bool,
    pub added: usize,
    pub skipped: usize,
}

/// Replaces the contents of the output playlist with `missing`, creating the playlist first when
/// no id is configured.
pub fn sync_missing_playlist(service: &dyn MusicService, graph: &TrackGraph, missing: &TrackLookup, output: &OutputPlaylist) -> Result<MissingPlaylistReport> {
    if missing.is_empty() {
        info!("No missing tracks, leaving the output playlist alone");
        return Ok(MissingPlaylistReport {
            playlist_id: output.id.clone(),
            ..Default::default()
        });
    }

    let mut report = MissingPlaylistReport::default();
    let playlist_id = match &output.id {
        Some(id) if !id.is_empty() => {
            info!("Clearing existing missing playlist {}", id);
            service.replace_playlist_tracks(&graph.user_id, id, &[]).map_err(|source| SyncError::Fetch {
                context: format!("clearing playlist {}", id),
                source,
            })?;
            id.clone()
        }
        _ => {
            let playlist = service.create_playlist(&graph.user_id, &output.name).map_err(|source| SyncError::Fetch {
                context: format!("creating playlist {}", output.name),
                source,
            })?;
            info!("Created missing playlist {} ({}) for user {}", playlist.name, playlist.id, graph.user_id);
            report.created = true;
            playlist.id
        }
    };

    let mut ids: Vec<String> = Vec::with_capacity(missing.len());
    for (key, track) in missing {
        if track.id.is_empty() {
            warn!("Skipping track with no id: {}", key);
            report.skipped += 1;
            continue;
        }
        let playlists: Vec<&str> = graph.playlists_for(key).iter().map(|p| p.name.as_str()).collect();
        info!("Adding {} ({}) from {:?}", key, track.id, playlists);
        ids.push(track.id.clone());
    }

    for batch in ids.chunks(MAX_TRACKS_PER_ADD) {
        debug!("Adding batch of {} tracks to {}", batch.len(), playlist_id);
        service.add_tracks_to_playlist(&graph.user_id, &playlist_id, batch).map_err(|source| SyncError::Fetch {
            context: format!("adding tracks to playlist {}", playlist_id),
            source,
        })?;
        report.added += batch.len();
    }

    info!("Added {} tracks to the missing playlist, skipped {}", report.added, report.skipped);
    report.playlist_id = Some(playlist_id);
    Ok(report)
}

/// Removes every matched remote track whose local genre carries `delete_tag` from each playlist
/// it is in. Returns whether anything was removed, in which case the cached graph is stale.
pub fn remove_unwanted(service: &dyn MusicService, contexts: &[FileContext<'_>], delete_tag: &str) -> Result<bool> {
    let delete_tag = delete_tag.to_lowercase();
    info!("Removing tracks tagged {}", delete_tag);

    let mut removed = false;
    for ctx in contexts {
        if !tokenize(&ctx.file.genre()).contains(&delete_tag) {
            continue;
        }
        let Some(remote) = ctx.remote else {
            debug!("{} is tagged {} but has no remote track", ctx.key, delete_tag);
            continue;
        };
        warn!("Will remove {}", ctx.key);
        for playlist in ctx.playlists {
            warn!("Removing {} ({}) from playlist {} ({})", ctx.key, remote.id, playlist.name, playlist.id);
            service.remove_track_from_playlist(&playlist.owner_id, &playlist.id, &remote.id).map_err(|source| SyncError::Fetch {
                context: format!("removing {} from playlist {}", ctx.key, playlist.name),
                source,
            })?;
            removed = true;
        }
    }
    Ok(removed)
}
