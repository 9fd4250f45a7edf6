/// The sync module reconciles the tags of local files with what the remote service and the local
/// metadata source know about each song.
///
/// Every local file is paired with its remote track, the playlists that track belongs to, and its
/// metadata record, all looked up by song key. An ordered list of processors then mutates the
/// in-memory tags, and a file that any processor touched is saved exactly once.
use crate::audiotags::LocalFile;
use crate::comment::Comment;
use crate::common::{MetadataRecord, PlaylistRef, RemoteTrack, SongKey};
use crate::config::TagsConfig;
use crate::error::{Result, SyncError};
use crate::genre::GenreDiff;
use crate::graph::{TrackGraph, TrackLookup};
use crate::service::MusicService;
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Ratings in metadata records are stored as 0-100, one star per step.
pub const RATING_STEP: u32 = 20;

/// Everything known about one local file.
pub struct FileContext<'a> {
    pub key: SongKey,
    pub file: LocalFile,
    pub remote: Option<&'a RemoteTrack>,
    pub playlists: &'a [PlaylistRef],
    pub metadata: Option<MetadataRecord>,
}

impl FileContext<'_> {
    pub fn playlist_names(&self) -> Vec<&str> {
        self.playlists.iter().map(|p| p.name.as_str()).collect()
    }
}

/// Pairs every file with its remote track, playlists and metadata record. Files sharing a song
/// key collide and the last one wins. Contexts come back ordered by key.
pub fn build_contexts<I>(files: Vec<LocalFile>, graph: &TrackGraph, metadata: I) -> Vec<FileContext<'_>>
where
    I: IntoIterator<Item = MetadataRecord>,
{
    let mut records: BTreeMap<SongKey, MetadataRecord> = BTreeMap::new();
    for record in metadata {
        records.insert(record.song_key(), record);
    }

    let mut by_key: BTreeMap<SongKey, LocalFile> = BTreeMap::new();
    for file in files {
        let key = file.key();
        if let Some(previous) = by_key.insert(key.clone(), file) {
            debug!("Local file {} shares the key {} with another file", previous.path.display(), key);
        }
    }

    by_key
        .into_iter()
        .map(|(key, file)| FileContext {
            remote: graph.tracks.get(&key),
            playlists: graph.playlists_for(&key),
            metadata: records.remove(&key),
            key,
            file,
        })
        .collect()
}

/// A processor mutates the in-memory tags of one file and reports whether it changed anything.
pub type TagProcessor = fn(&mut FileContext<'_>, &dyn MusicService, &TagsConfig) -> Result<bool>;

/// Processors run in this order for every file.
pub const TAG_PROCESSORS: &[(&str, TagProcessor)] = &[("year", process_year), ("comment", process_comment), ("genre", process_genre)];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub files: usize,
    pub remote_matches: usize,
    pub metadata_matches: usize,
    pub updated: usize,
}

pub fn sync_tags<I>(service: &dyn MusicService, rules: &TagsConfig, files: Vec<LocalFile>, graph: &TrackGraph, metadata: I) -> Result<SyncSummary>
where
    I: IntoIterator<Item = MetadataRecord>,
{
    let mut contexts = build_contexts(files, graph, metadata);
    let mut summary = SyncSummary {
        files: contexts.len(),
        remote_matches: contexts.iter().filter(|c| c.remote.is_some()).count(),
        metadata_matches: contexts.iter().filter(|c| c.metadata.is_some()).count(),
        updated: 0,
    };
    info!(
        "Syncing tags of {} files ({} matched remotely, {} with metadata)",
        summary.files, summary.remote_matches, summary.metadata_matches
    );

    let mut failed = 0;
    let mut first_failure: Option<SyncError> = None;
    for ctx in contexts.iter_mut() {
        if !apply_processors(ctx, service, rules)? {
            continue;
        }
        match ctx.file.song.save() {
            Ok(()) => {
                info!("Updated {}", ctx.key);
                summary.updated += 1;
            }
            Err(e) => {
                warn!("Failed to save {}: {}", ctx.file.path.display(), e);
                failed += 1;
                first_failure.get_or_insert(e);
            }
        }
    }

    if let Some(first) = first_failure {
        return Err(SyncError::IncompleteSync {
            failed,
            first: Box::new(first),
        });
    }
    info!("Updated {} of {} files", summary.updated, summary.files);
    Ok(summary)
}

/// Runs every processor over one context. Returns whether the file needs saving.
pub fn apply_processors(ctx: &mut FileContext<'_>, service: &dyn MusicService, rules: &TagsConfig) -> Result<bool> {
    let mut changed = false;
    for (name, processor) in TAG_PROCESSORS {
        let touched = processor(ctx, service, rules).map_err(|e| SyncError::Processor {
            processor: *name,
            key: ctx.key.clone(),
            source: Box::new(e),
        })?;
        if touched {
            debug!("The {} processor changed {}", name, ctx.key);
        }
        changed |= touched;
    }
    Ok(changed)
}

fn process_year(ctx: &mut FileContext<'_>, service: &dyn MusicService, _rules: &TagsConfig) -> Result<bool> {
    let Some(remote) = ctx.remote else {
        return Ok(false);
    };
    if ctx.file.year().unwrap_or(0) != 0 {
        return Ok(false);
    }
    let album = service.get_album(&remote.album.id).map_err(|source| SyncError::Fetch {
        context: format!("album {} of {}", remote.album.id, ctx.key),
        source,
    })?;
    match release_year(&album.release_date) {
        Some(year) => {
            info!("Setting year of {} to {}", ctx.key, year);
            ctx.file.song.set_year(year);
            Ok(true)
        }
        None => {
            warn!("Skipping year of {}: cannot parse release date {:?}", ctx.key, album.release_date);
            Ok(false)
        }
    }
}

fn process_comment(ctx: &mut FileContext<'_>, _service: &dyn MusicService, rules: &TagsConfig) -> Result<bool> {
    let Some(record) = &ctx.metadata else {
        return Ok(false);
    };
    let raw = ctx.file.comment();
    let mut comment = Comment::parse(&raw);
    comment.rating = record.rating / RATING_STEP;
    comment.filter(&rules.comment_removals);
    comment.remove_garbage();
    let formatted = comment.format();
    if formatted == raw {
        return Ok(false);
    }
    info!("Setting comment of {} to {:?} (was {:?})", ctx.key, formatted, raw);
    ctx.file.song.set_comment(&formatted);
    Ok(true)
}

fn process_genre(ctx: &mut FileContext<'_>, _service: &dyn MusicService, rules: &TagsConfig) -> Result<bool> {
    let current = ctx.file.genre();
    let diff = GenreDiff::compute(&current, &ctx.playlist_names(), &rules.genre);
    if !diff.suppressed.is_empty() {
        debug!("Not writing {:?} to {}", diff.suppressed, ctx.key);
    }
    if !diff.changed {
        return Ok(false);
    }
    info!("Setting genre of {} to {:?} (added {:?}, removed {:?})", ctx.key, diff.genre, diff.added(), diff.removed);
    ctx.file.song.set_genre(&diff.genre);
    Ok(true)
}

/// Extracts the year of a `YYYY`, `YYYY-MM` or `YYYY-MM-DD` release date. Year 0 is rejected.
pub fn release_year(date: &str) -> Option<i32> {
    let parsed = match date.len() {
        4 => NaiveDate::parse_from_str(&format!("{}-01-01", date), "%Y-%m-%d"),
        7 => NaiveDate::parse_from_str(&format!("{}-01", date), "%Y-%m-%d"),
        10 => NaiveDate::parse_from_str(date, "%Y-%m-%d"),
        _ => return None,
    };
    parsed.ok().map(|d| d.year()).filter(|year| *year > 0)
}

/// Returns the remote tracks that have no local file. Files with an empty artist or title never
/// match anything.
pub fn left_outer_join(files: &[LocalFile], graph: TrackGraph) -> TrackLookup {
    let mut tracks = graph.tracks;
    for file in files {
        let key = file.key();
        if key.is_incomplete() {
            continue;
        }
        tracks.remove(&key);
    }
    info!("{} remote tracks have no local file", tracks.len());
    tracks
}
