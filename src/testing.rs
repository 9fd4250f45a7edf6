use crate::audiotags::{LocalFile, SongFile};
use crate::common::{AlbumRef, ArtistRef, PlaylistRef, RemoteTrack};
use crate::error::{Result, ServiceError, SyncError};
use crate::service::{Album, ArtistPage, MusicService, ServiceResult, TrackPage};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, Once};
use tempfile::TempDir;

static INIT: Once = Once::new();

pub fn init() -> TempDir {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")))
            .with_test_writer()
            .try_init();
    });
    TempDir::new().expect("failed to create temp dir")
}

pub const USER_ID: &str = "u1";

pub fn playlist(id: &str, name: &str) -> PlaylistRef {
    PlaylistRef {
        id: id.to_string(),
        name: name.to_string(),
        owner_id: USER_ID.to_string(),
    }
}

pub fn track(id: &str, artist: &str, title: &str) -> RemoteTrack {
    RemoteTrack {
        id: id.to_string(),
        name: title.to_string(),
        artists: artist
            .split(", ")
            .map(|name| ArtistRef {
                id: format!("a-{}", name.to_lowercase()),
                name: name.to_string(),
            })
            .collect(),
        album: AlbumRef {
            id: format!("al-{}", id),
            name: format!("Album of {}", title),
        },
    }
}

pub fn artist(id: &str, name: &str) -> ArtistRef {
    ArtistRef {
        id: id.to_string(),
        name: name.to_string(),
    }
}

/// Every remote call the fake received, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListPlaylists,
    ListPlaylistTracks { playlist_id: String, offset: usize },
    GetAlbum(String),
    CreatePlaylist { user_id: String, name: String },
    ReplacePlaylistTracks { playlist_id: String, track_ids: Vec<String> },
    AddTracks { playlist_id: String, track_ids: Vec<String> },
    RemoveTrack { playlist_id: String, track_id: String },
    Follow(Vec<String>),
    Search(String),
    FollowedArtists { after: Option<String> },
}

/// An in-memory music service. Playlist pages are sliced from the configured track lists, and any
/// playlist listed in `failing_playlists` errors on its first page.
#[derive(Default)]
pub struct FakeService {
    pub playlists: Vec<PlaylistRef>,
    pub playlist_tracks: HashMap<String, Vec<RemoteTrack>>,
    pub failing_playlists: HashSet<String>,
    pub fail_list_playlists: bool,
    pub albums: HashMap<String, Album>,
    pub followed: Vec<ArtistRef>,
    pub search_results: HashMap<String, Vec<ArtistRef>>,
    pub failing_searches: HashSet<String>,
    pub calls: Mutex<Vec<Call>>,
}

impl FakeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_playlist(mut self, playlist: PlaylistRef, tracks: Vec<RemoteTrack>) -> Self {
        self.playlist_tracks.insert(playlist.id.clone(), tracks);
        self.playlists.push(playlist);
        self
    }

    pub fn with_album(mut self, id: &str, release_date: &str) -> Self {
        self.albums.insert(
            id.to_string(),
            Album {
                id: id.to_string(),
                name: format!("Album {}", id),
                release_date: release_date.to_string(),
            },
        );
        self
    }

    pub fn calls(&self) -> MutexGuard<'_, Vec<Call>> {
        self.calls.lock().expect("calls lock poisoned")
    }

    fn record(&self, call: Call) {
        self.calls().push(call);
    }
}

impl MusicService for FakeService {
    fn list_playlists(&self, _owner: Option<&str>) -> ServiceResult<Vec<PlaylistRef>> {
        self.record(Call::ListPlaylists);
        if self.fail_list_playlists {
            return Err(ServiceError::new("listing playlists failed"));
        }
        Ok(self.playlists.clone())
    }

    fn list_playlist_tracks(&self, _owner_id: &str, playlist_id: &str, offset: usize, limit: usize) -> ServiceResult<TrackPage> {
        self.record(Call::ListPlaylistTracks {
            playlist_id: playlist_id.to_string(),
            offset,
        });
        if self.failing_playlists.contains(playlist_id) {
            return Err(ServiceError::new(format!("playlist {} is unavailable", playlist_id)));
        }
        let all = self.playlist_tracks.get(playlist_id).cloned().unwrap_or_default();
        let tracks: Vec<RemoteTrack> = all.iter().skip(offset).take(limit).cloned().collect();
        let next = offset + tracks.len();
        Ok(TrackPage {
            next_offset: if next < all.len() { Some(next) } else { None },
            tracks,
        })
    }

    fn get_album(&self, album_id: &str) -> ServiceResult<Album> {
        self.record(Call::GetAlbum(album_id.to_string()));
        self.albums.get(album_id).cloned().ok_or_else(|| ServiceError::new(format!("no album {}", album_id)))
    }

    fn create_playlist(&self, user_id: &str, name: &str) -> ServiceResult<PlaylistRef> {
        self.record(Call::CreatePlaylist {
            user_id: user_id.to_string(),
            name: name.to_string(),
        });
        Ok(PlaylistRef {
            id: "created".to_string(),
            name: name.to_string(),
            owner_id: user_id.to_string(),
        })
    }

    fn replace_playlist_tracks(&self, _owner_id: &str, playlist_id: &str, track_ids: &[String]) -> ServiceResult<()> {
        self.record(Call::ReplacePlaylistTracks {
            playlist_id: playlist_id.to_string(),
            track_ids: track_ids.to_vec(),
        });
        Ok(())
    }

    fn add_tracks_to_playlist(&self, _owner_id: &str, playlist_id: &str, track_ids: &[String]) -> ServiceResult<()> {
        self.record(Call::AddTracks {
            playlist_id: playlist_id.to_string(),
            track_ids: track_ids.to_vec(),
        });
        Ok(())
    }

    fn remove_track_from_playlist(&self, _owner_id: &str, playlist_id: &str, track_id: &str) -> ServiceResult<()> {
        self.record(Call::RemoveTrack {
            playlist_id: playlist_id.to_string(),
            track_id: track_id.to_string(),
        });
        Ok(())
    }

    fn follow_artists(&self, artist_ids: &[String]) -> ServiceResult<()> {
        self.record(Call::Follow(artist_ids.to_vec()));
        Ok(())
    }

    fn search_artist(&self, name: &str) -> ServiceResult<Vec<ArtistRef>> {
        self.record(Call::Search(name.to_string()));
        if self.failing_searches.contains(name) {
            return Err(ServiceError::new(format!("search for {} failed", name)));
        }
        Ok(self.search_results.get(name).cloned().unwrap_or_default())
    }

    fn followed_artists(&self, after: Option<&str>, limit: usize) -> ServiceResult<ArtistPage> {
        self.record(Call::FollowedArtists { after: after.map(String::from) });
        let start = match after {
            Some(cursor) => self.followed.iter().position(|a| a.id == cursor).map(|i| i + 1).unwrap_or(self.followed.len()),
            None => 0,
        };
        let artists: Vec<ArtistRef> = self.followed.iter().skip(start).take(limit).cloned().collect();
        let next_cursor = if start + artists.len() < self.followed.len() { artists.last().map(|a| a.id.clone()) } else { None };
        Ok(ArtistPage { artists, next_cursor })
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockState {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub genre: Option<String>,
    pub year: Option<i32>,
    pub comment: Option<String>,
    pub saves: usize,
    pub fail_save: bool,
}

/// An in-memory song. Clones share state, so a test can keep one handle and inspect what the code
/// under test wrote through the other.
#[derive(Debug, Clone, Default)]
pub struct MockSong {
    pub state: Arc<Mutex<MockState>>,
}

impl MockSong {
    pub fn new(artist: &str, title: &str) -> Self {
        let song = MockSong::default();
        {
            let mut state = song.state();
            state.artist = Some(artist.to_string());
            state.title = Some(title.to_string());
        }
        song
    }

    pub fn with_genre(self, genre: &str) -> Self {
        self.state().genre = Some(genre.to_string());
        self
    }

    pub fn with_year(self, year: i32) -> Self {
        self.state().year = Some(year);
        self
    }

    pub fn with_comment(self, comment: &str) -> Self {
        self.state().comment = Some(comment.to_string());
        self
    }

    pub fn failing_save(self) -> Self {
        self.state().fail_save = true;
        self
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("mock song lock poisoned")
    }

    pub fn local_file(&self) -> LocalFile {
        let path = PathBuf::from(format!("{}.mp3", self.state().title.clone().unwrap_or_default()));
        LocalFile::new(path, Box::new(self.clone()))
    }
}

impl SongFile for MockSong {
    fn title(&self) -> Option<String> {
        self.state().title.clone()
    }

    fn artist(&self) -> Option<String> {
        self.state().artist.clone()
    }

    fn genre(&self) -> Option<String> {
        self.state().genre.clone()
    }

    fn year(&self) -> Option<i32> {
        self.state().year
    }

    fn comment(&self) -> Option<String> {
        self.state().comment.clone()
    }

    fn set_genre(&mut self, genre: &str) {
        self.state().genre = Some(genre.to_string());
    }

    fn set_year(&mut self, year: i32) {
        self.state().year = Some(year);
    }

    fn set_comment(&mut self, comment: &str) {
        self.state().comment = Some(comment.to_string());
    }

    fn save(&mut self) -> Result<()> {
        let mut state = self.state();
        if state.fail_save {
            return Err(SyncError::Save {
                path: PathBuf::from(format!("{}.mp3", state.title.clone().unwrap_or_default())),
                message: "disk full".to_string(),
            });
        }
        state.saves += 1;
        Ok(())
    }
}
