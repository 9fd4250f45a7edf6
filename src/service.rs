/// The service module describes the remote music service as the set of blocking operations this
/// crate needs from it. The HTTP client and its authentication live outside of the crate; callers
/// hand an implementation of [`MusicService`] to every operation that talks to the service.
use crate::common::{ArtistRef, PlaylistRef, RemoteTrack};
use crate::error::ServiceError;
use serde::{Deserialize, Serialize};

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// The page size used for every paginated listing.
pub const PAGE_SIZE: usize = 50;
/// The most track ids a single add call accepts.
pub const MAX_TRACKS_PER_ADD: usize = 100;
/// The most artist ids a single follow call accepts.
pub const MAX_ARTISTS_PER_FOLLOW: usize = 50;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackPage {
    pub tracks: Vec<RemoteTrack>,
    pub next_offset: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub name: String,
    /// `YYYY`, `YYYY-MM` or `YYYY-MM-DD`, depending on how precise the service is.
    pub release_date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistPage {
    pub artists: Vec<ArtistRef>,
    pub next_cursor: Option<String>,
}

pub trait MusicService: Sync {
    /// Lists the playlists of the authenticated user, or of `owner` when given.
    fn list_playlists(&self, owner: Option<&str>) -> ServiceResult<Vec<PlaylistRef>>;

    fn list_playlist_tracks(&self, owner_id: &str, playlist_id: &str, offset: usize, limit: usize) -> ServiceResult<TrackPage>;

    fn get_album(&self, album_id: &str) -> ServiceResult<Album>;

    fn create_playlist(&self, user_id: &str, name: &str) -> ServiceResult<PlaylistRef>;

    fn replace_playlist_tracks(&self, owner_id: &str, playlist_id: &str, track_ids: &[String]) -> ServiceResult<()>;

    /// Callers pass at most [`MAX_TRACKS_PER_ADD`] ids.
    fn add_tracks_to_playlist(&self, owner_id: &str, playlist_id: &str, track_ids: &[String]) -> ServiceResult<()>;

    fn remove_track_from_playlist(&self, owner_id: &str, playlist_id: &str, track_id: &str) -> ServiceResult<()>;

    /// Callers pass at most [`MAX_ARTISTS_PER_FOLLOW`] ids.
    fn follow_artists(&self, artist_ids: &[String]) -> ServiceResult<()>;

    fn search_artist(&self, name: &str) -> ServiceResult<Vec<ArtistRef>>;

    fn followed_artists(&self, after: Option<&str>, limit: usize) -> ServiceResult<ArtistPage>;
}
