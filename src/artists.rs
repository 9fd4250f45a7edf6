/// The artists module follows, on the remote service, every artist the user has rated highly in
/// their local library.
use crate::common::{uniq, MetadataRecord};
use crate::config::ArtistsConfig;
use crate::error::{Result, SyncError};
use crate::service::{MusicService, MAX_ARTISTS_PER_FOLLOW, PAGE_SIZE};
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

/// Follows the artists of every record rated at least `settings.min_rating`. Returns how many
/// artists were followed.
pub fn follow_artists<'a, I>(service: &dyn MusicService, records: I, settings: &ArtistsConfig) -> Result<usize>
where
    I: IntoIterator<Item = &'a MetadataRecord>,
{
    let rated: Vec<&MetadataRecord> = records.into_iter().filter(|r| r.rating >= settings.min_rating).collect();
    let names = split_names(rated.iter().map(|r| r.artist.as_str()));
    info!("Found {} tracks rated {}+ by {} artists", rated.len(), settings.min_rating, names.len());

    let following = followed_names(service)?;
    let mut to_follow = Vec::new();
    for name in &names {
        match resolve_artist(service, name, settings, &following) {
            Ok(Some(id)) => to_follow.push(id),
            Ok(None) => {}
            Err(e) => error!("Failed to determine follow state of {}: {}", name, e),
        }
    }
    let to_follow = uniq(to_follow);
    if to_follow.is_empty() {
        info!("No artists to follow");
        return Ok(0);
    }

    info!("Following {} artists", to_follow.len());
    for batch in to_follow.chunks(MAX_ARTISTS_PER_FOLLOW) {
        debug!("Following batch of {} artists", batch.len());
        service.follow_artists(batch).map_err(|source| SyncError::Fetch {
            context: format!("following {} artists", batch.len()),
            source,
        })?;
    }
    Ok(to_follow.len())
}

/// Splits multi-artist credits on ", " and drops empties and duplicates, keeping first-seen order.
pub fn split_names<'a>(artists: impl Iterator<Item = &'a str>) -> Vec<String> {
    uniq(artists.flat_map(|a| a.split(", ")).map(str::trim).filter(|n| !n.is_empty()).map(String::from).collect())
}

/// Lower-cased names of every artist the user already follows.
pub fn followed_names(service: &dyn MusicService) -> Result<HashSet<String>> {
    let mut names = HashSet::new();
    let mut after: Option<String> = None;
    loop {
        let page = service.followed_artists(after.as_deref(), PAGE_SIZE).map_err(|source| SyncError::Fetch {
            context: "followed artists".to_string(),
            source,
        })?;
        let received = page.artists.len();
        names.extend(page.artists.into_iter().map(|a| a.name.to_lowercase()));
        match page.next_cursor {
            Some(cursor) if received >= PAGE_SIZE => after = Some(cursor),
            _ => break,
        }
    }
    debug!("Already following {} artists", names.len());
    Ok(names)
}

fn resolve_artist(service: &dyn MusicService, local_name: &str, settings: &ArtistsConfig, following: &HashSet<String>) -> Result<Option<String>> {
    if settings.skip.iter().any(|s| s == local_name) {
        debug!("Skipping {} as configured", local_name);
        return Ok(None);
    }
    let name = match settings.overrides.get(local_name) {
        Some(o) => {
            debug!("Searching for {} as {}", local_name, o);
            o.as_str()
        }
        None => local_name,
    };
    let name = name.to_lowercase();
    if following.contains(&name) {
        debug!("Already following {}", local_name);
        return Ok(None);
    }

    let results = service.search_artist(&name).map_err(|source| SyncError::Fetch {
        context: format!("artist search for {}", name),
        source,
    })?;
    let Some(found) = results.into_iter().next() else {
        warn!("Could not find remote artist {}", local_name);
        return Ok(None);
    };
    if found.name.to_lowercase() != name {
        warn!("Name mismatch for {}: first result is {} ({}), add an override to force a match", local_name, found.name, found.id);
        return Ok(None);
    }
    info!("Will follow {} ({})", found.name, found.id);
    Ok(Some(found.id))
}
