use regex::Regex;
use std::fs;
use tagsync_rs::common::{ArtistRef, PlaylistRef, RemoteTrack};
use tagsync_rs::graph_cache::{FileStore, GraphCache};
use tagsync_rs::service::{Album, ArtistPage, ServiceResult, TrackPage};
use tagsync_rs::{fetch_track_graph, MusicService, ServiceError, SongKey, SyncError};
use tempfile::TempDir;

/// Two playlists sharing one track, served one track per page.
struct TinyService;

fn remote(id: &str, artist: &str, name: &str) -> RemoteTrack {
    RemoteTrack {
        id: id.to_string(),
        name: name.to_string(),
        artists: vec![ArtistRef {
            id: format!("a-{}", id),
            name: artist.to_string(),
        }],
        album: Default::default(),
    }
}

impl MusicService for TinyService {
    fn list_playlists(&self, _owner: Option<&str>) -> ServiceResult<Vec<PlaylistRef>> {
        Ok(["Deep", "House", "Podcasts"]
            .iter()
            .map(|name| PlaylistRef {
                id: name.to_lowercase(),
                name: name.to_string(),
                owner_id: "me".to_string(),
            })
            .collect())
    }

    fn list_playlist_tracks(&self, _owner_id: &str, playlist_id: &str, offset: usize, _limit: usize) -> ServiceResult<TrackPage> {
        let tracks = match playlist_id {
            "deep" => vec![remote("t1", "Bicep", "Glue"), remote("t2", "Ross From Friends", "Talk To Me")],
            "house" => vec![remote("t1", "Bicep", "Glue")],
            _ => return Err(ServiceError::new("not a music playlist")),
        };
        Ok(TrackPage {
            tracks: tracks.into_iter().skip(offset).take(1).collect(),
            next_offset: None,
        })
    }

    fn get_album(&self, album_id: &str) -> ServiceResult<Album> {
        Err(ServiceError::new(format!("no album {}", album_id)))
    }

    fn create_playlist(&self, _user_id: &str, _name: &str) -> ServiceResult<PlaylistRef> {
        unimplemented!()
    }

    fn replace_playlist_tracks(&self, _owner_id: &str, _playlist_id: &str, _track_ids: &[String]) -> ServiceResult<()> {
        unimplemented!()
    }

    fn add_tracks_to_playlist(&self, _owner_id: &str, _playlist_id: &str, _track_ids: &[String]) -> ServiceResult<()> {
        unimplemented!()
    }

    fn remove_track_from_playlist(&self, _owner_id: &str, _playlist_id: &str, _track_id: &str) -> ServiceResult<()> {
        unimplemented!()
    }

    fn follow_artists(&self, _artist_ids: &[String]) -> ServiceResult<()> {
        unimplemented!()
    }

    fn search_artist(&self, _name: &str) -> ServiceResult<Vec<ArtistRef>> {
        Ok(vec![])
    }

    fn followed_artists(&self, _after: Option<&str>, _limit: usize) -> ServiceResult<ArtistPage> {
        Ok(ArtistPage::default())
    }
}

#[test]
fn test_fetch_and_cache_graph() {
    let temp_dir = TempDir::new().unwrap();
    let cache = GraphCache::new(FileStore::new(temp_dir.path().join("playlists.json")));
    let pattern = Regex::new("^(Deep|House)$").unwrap();

    // A page shorter than the page size ends each playlist after its first page.
    let graph = cache.refresh(|| fetch_track_graph(&TinyService, &pattern)).unwrap();
    assert_eq!(graph.user_id, "me");
    assert_eq!(graph.tracks.len(), 1);
    let glue = SongKey::new("Bicep", "Glue");
    let mut playlists: Vec<&str> = graph.playlists_for(&glue).iter().map(|p| p.name.as_str()).collect();
    playlists.sort();
    assert_eq!(playlists, vec!["Deep", "House"]);

    assert_eq!(cache.load().unwrap(), Some(graph));
}

#[test]
fn test_failed_fetch_leaves_cache_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("playlists.json");
    fs::write(&path, r#"{"UserID": "me", "Tracks": {}, "Playlists": {}}"#).unwrap();
    let cache = GraphCache::new(FileStore::new(&path));

    let everything = Regex::new(".*").unwrap();
    let err = cache.refresh(|| fetch_track_graph(&TinyService, &everything)).unwrap_err();
    assert!(matches!(err, SyncError::Fetch { .. }));
    assert_eq!(cache.load().unwrap().unwrap().user_id, "me");
}
