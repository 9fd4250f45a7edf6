/// The graph module builds the track graph: every track of every remote playlist whose name
/// matches the configured pattern, indexed by song key, together with the playlists each track
/// belongs to.
///
/// Playlists are paginated concurrently, one worker thread per playlist. Workers only ever send
/// pages over a bounded channel; a single aggregator thread owns the graph and is the only writer
/// to it. Shutdown happens in two steps: every worker is joined first, which drops the last
/// sender, and only then is the aggregator joined, after it has drained the channel.
use crate::common::{PlaylistRef, RemoteTrack, SongKey};
use crate::error::{Result, SyncError};
use crate::service::{MusicService, PAGE_SIZE};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread;
use tracing::{debug, info, warn};

/// How many pages may be queued for the aggregator before workers block.
const PAGE_QUEUE_DEPTH: usize = 16;

pub type TrackLookup = BTreeMap<SongKey, RemoteTrack>;
pub type PlaylistLookup = BTreeMap<SongKey, Vec<PlaylistRef>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackGraph {
    #[serde(rename = "UserID", default)]
    pub user_id: String,
    #[serde(rename = "Tracks", default)]
    pub tracks: TrackLookup,
    #[serde(rename = "Playlists", default)]
    pub playlists: PlaylistLookup,
}

impl TrackGraph {
    pub fn playlists_for(&self, key: &SongKey) -> &[PlaylistRef] {
        self.playlists.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Adds one page of tracks that came from `playlist`.
    pub fn add_page(&mut self, batch: PageBatch) {
        for track in batch.tracks {
            let key = track.song_key();
            debug!("Remote track {}", key);
            let memberships = self.playlists.entry(key.clone()).or_default();
            if !memberships.iter().any(|p| p.id == batch.playlist.id) {
                memberships.push(batch.playlist.clone());
            }
            self.tracks.insert(key, track);
        }
        self.user_id = batch.user_id;
    }
}

/// One page of a playlist, as sent from a pagination worker to the aggregator.
#[derive(Debug, Clone)]
pub struct PageBatch {
    pub user_id: String,
    pub playlist: PlaylistRef,
    pub tracks: Vec<RemoteTrack>,
}

/// Retrieves every playlist whose name matches `pattern` and aggregates their tracks.
///
/// Any failure aborts the whole build. Sibling workers stop at their next page and the first error
/// is returned.
pub fn fetch_track_graph(service: &dyn MusicService, pattern: &Regex) -> Result<TrackGraph> {
    let playlists = service.list_playlists(None).map_err(|source| SyncError::Fetch {
        context: "the playlists of the current user".to_string(),
        source,
    })?;
    debug!("Matching {} playlists against {}", playlists.len(), pattern.as_str());
    let matching: Vec<PlaylistRef> = playlists.into_iter().filter(|p| pattern.is_match(&p.name)).collect();
    info!("Found {} matching playlists", matching.len());

    let abort_flag = AtomicBool::new(false);
    let abort = &abort_flag;
    let (graph, outcome) = thread::scope(|scope| {
        let (tx, rx) = mpsc::sync_channel::<PageBatch>(PAGE_QUEUE_DEPTH);
        let aggregator = scope.spawn(move || aggregate(rx));

        let mut workers = Vec::with_capacity(matching.len());
        for playlist in &matching {
            let tx = tx.clone();
            workers.push(scope.spawn(move || {
                let result = paginate_playlist(service, playlist, &tx, abort);
                if result.is_err() {
                    abort.store(true, Ordering::SeqCst);
                }
                result
            }));
        }
        drop(tx);

        let mut outcome = Ok(());
        for worker in workers {
            let result = worker.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic));
            if let Err(e) = result {
                if outcome.is_ok() {
                    outcome = Err(e);
                } else {
                    warn!("Additional playlist failure: {}", e);
                }
            }
        }
        // Every sender is gone now, so the aggregator finishes once the queue is empty.
        let graph = aggregator.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic));
        (graph, outcome)
    });
    outcome?;

    info!("Loaded {} remote playlist tracks", graph.tracks.len());
    Ok(graph)
}

fn aggregate(rx: Receiver<PageBatch>) -> TrackGraph {
    let mut graph = TrackGraph::default();
    for batch in rx {
        graph.add_page(batch);
    }
    graph
}

fn paginate_playlist(service: &dyn MusicService, playlist: &PlaylistRef, tx: &SyncSender<PageBatch>, abort: &AtomicBool) -> Result<()> {
    info!("Processing playlist {}", playlist.name);
    let mut offset = 0;
    loop {
        if abort.load(Ordering::SeqCst) {
            debug!("Stopping playlist {} at offset {}: another playlist failed", playlist.name, offset);
            return Ok(());
        }
        let page = service
            .list_playlist_tracks(&playlist.owner_id, &playlist.id, offset, PAGE_SIZE)
            .map_err(|source| SyncError::Fetch {
                context: format!("tracks of playlist {} at offset {}", playlist.name, offset),
                source,
            })?;
        let received = page.tracks.len();
        info!("Received {} tracks of playlist {} at offset {}", received, playlist.name, offset);

        if received > 0 {
            let batch = PageBatch {
                user_id: playlist.owner_id.clone(),
                playlist: playlist.clone(),
                tracks: page.tracks,
            };
            tx.send(batch).map_err(|_| SyncError::Generic(format!("Track aggregator stopped before playlist {} was read", playlist.name)))?;
        }
        if received < PAGE_SIZE {
            return Ok(());
        }
        offset = page.next_offset.unwrap_or(offset + received);
    }
}
