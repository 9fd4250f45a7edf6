/// The common module holds the small value types every other module passes around: the song
/// identity key, the remote track and playlist records, and the local metadata record.
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

/// Identity of a song across local files, remote tracks and metadata records.
///
/// Two different recordings with the same artist and title share a key; whichever is seen last
/// wins wherever keys are collected into a map.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SongKey {
    pub artist: String,
    pub title: String,
}

impl SongKey {
    pub fn new(artist: &str, title: &str) -> Self {
        Self {
            artist: clean_tag_value(artist).to_string(),
            title: clean_tag_value(title).to_string(),
        }
    }

    pub fn is_incomplete(&self) -> bool {
        self.artist.is_empty() || self.title.is_empty()
    }
}

impl fmt::Display for SongKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.artist, self.title)
    }
}

// Keys are stored as the JSON text of a two element array so they can be used as object keys
// in the snapshot document.
impl Serialize for SongKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let text = serde_json::to_string(&[&self.artist, &self.title]).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    }
}

impl<'de> Deserialize<'de> for SongKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        let parts: Vec<String> = serde_json::from_str(&text).map_err(D::Error::custom)?;
        match <[String; 2]>::try_from(parts) {
            Ok([artist, title]) => Ok(SongKey { artist, title }),
            Err(parts) => Err(D::Error::custom(format!("song key requires two parts, got {}", parts.len()))),
        }
    }
}

/// Strips the trailing control characters (mostly NUL padding) some tag writers leave behind.
pub fn clean_tag_value(value: &str) -> &str {
    value.trim_end_matches(char::is_control)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistRef {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "OwnerID")]
    pub owner_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistRef {
    #[serde(rename = "ID", alias = "id")]
    pub id: String,
    #[serde(rename = "Name", alias = "name")]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumRef {
    #[serde(rename = "ID", alias = "id")]
    pub id: String,
    #[serde(rename = "Name", alias = "name", default)]
    pub name: String,
}

/// Snapshots are written with capitalized field names. The service's lowercase names are accepted
/// when reading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTrack {
    #[serde(rename = "ID", alias = "id")]
    pub id: String,
    #[serde(rename = "Name", alias = "name")]
    pub name: String,
    #[serde(rename = "Artists", alias = "artists", default)]
    pub artists: Vec<ArtistRef>,
    #[serde(rename = "Album", alias = "album", default)]
    pub album: AlbumRef,
}

impl RemoteTrack {
    pub fn artist_names(&self) -> Vec<&str> {
        self.artists.iter().map(|a| a.name.as_str()).collect()
    }

    /// The key the track is indexed under: all artist names joined with ", " and the track name.
    pub fn song_key(&self) -> SongKey {
        SongKey::new(&self.artist_names().join(", "), &self.name)
    }
}

/// A track record from the local metadata source (e.g. a media library export).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(alias = "Artist")]
    pub artist: String,
    /// 0-100 in steps of 20, one step per star.
    #[serde(alias = "Rating", default)]
    pub rating: u32,
}

impl MetadataRecord {
    pub fn song_key(&self) -> SongKey {
        SongKey::new(&self.artist, &self.name)
    }
}

pub fn uniq<T: Clone + Eq + Hash>(xs: Vec<T>) -> Vec<T> {
    let mut rv = Vec::new();
    let mut seen = HashSet::new();
    for x in xs {
        if seen.insert(x.clone()) {
            rv.push(x);
        }
    }
    rv
}
