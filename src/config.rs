/// The config module provides the config schema and parsing logic.
///
/// Every key is optional. Decode errors name the file that failed.
use crate::error::{Result, SyncExpectedError};
use crate::genre::GenreRules;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 3 stars on the 0-100 metadata scale.
pub const DEFAULT_MIN_RATING: u32 = 60;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default, deserialize_with = "expand_paths")]
    pub music_dirs: Vec<PathBuf>,
    #[serde(default = "default_cache_file", deserialize_with = "expand_path")]
    pub cache_file: PathBuf,
    #[serde(default, deserialize_with = "expand_optional_path")]
    pub log_dir: Option<PathBuf>,
    /// A JSON array of metadata records exported from the media library.
    #[serde(default, deserialize_with = "expand_optional_path")]
    pub metadata_file: Option<PathBuf>,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub tags: TagsConfig,
    #[serde(default)]
    pub artists: ArtistsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    /// Only playlists whose names match contribute to the track graph.
    #[serde(with = "serde_regex", default = "default_playlist_regex")]
    pub playlist_regex: Regex,
    #[serde(default)]
    pub output_playlist: OutputPlaylist,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OutputPlaylist {
    /// Unset until the playlist has been created once.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default = "default_output_name")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TagsConfig {
    #[serde(flatten)]
    pub genre: GenreRules,
    /// Substrings stripped from the free text of every comment.
    #[serde(default)]
    pub comment_removals: Vec<String>,
    /// Files whose genre carries this token are removed from their playlists.
    #[serde(default = "default_delete_tag")]
    pub delete_tag: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArtistsConfig {
    #[serde(default)]
    pub skip: Vec<String>,
    /// Local artist name to the name to search for remotely.
    #[serde(default)]
    pub overrides: BTreeMap<String, String>,
    #[serde(default = "default_min_rating")]
    pub min_rating: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            music_dirs: Vec::new(),
            cache_file: default_cache_file(),
            log_dir: None,
            metadata_file: None,
            remote: RemoteConfig::default(),
            tags: TagsConfig::default(),
            artists: ArtistsConfig::default(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            playlist_regex: default_playlist_regex(),
            output_playlist: OutputPlaylist::default(),
        }
    }
}

impl Default for OutputPlaylist {
    fn default() -> Self {
        OutputPlaylist {
            id: None,
            name: default_output_name(),
        }
    }
}

impl Default for TagsConfig {
    fn default() -> Self {
        TagsConfig {
            genre: GenreRules::default(),
            comment_removals: Vec::new(),
            delete_tag: default_delete_tag(),
        }
    }
}

impl Default for ArtistsConfig {
    fn default() -> Self {
        ArtistsConfig {
            skip: Vec::new(),
            overrides: BTreeMap::new(),
            min_rating: default_min_rating(),
        }
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("tagsync").join("config.toml"))
    }

    pub fn parse(config_path_override: Option<&Path>) -> Result<Config> {
        let cfgpath = match config_path_override {
            Some(p) => p.to_path_buf(),
            None => Config::default_path().ok_or_else(|| SyncExpectedError::Generic("Could not determine the configuration directory".to_string()))?,
        };
        debug!("Reading configuration from {}", cfgpath.display());

        let cfgtext = match fs::read_to_string(&cfgpath) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(SyncExpectedError::ConfigNotFound { path: cfgpath }.into()),
            Err(e) => return Err(e.into()),
        };
        Config::from_toml(&cfgtext, &cfgpath)
    }

    pub fn from_toml(text: &str, path: &Path) -> Result<Config> {
        let config: Config = toml::from_str(text).map_err(|e| SyncExpectedError::ConfigDecode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.tags.delete_tag.trim().is_empty() {
            return Err(SyncExpectedError::InvalidConfigValue {
                key: "tags.delete_tag".to_string(),
                message: "must not be empty".to_string(),
            }
            .into());
        }
        if self.tags.delete_tag.contains(' ') {
            return Err(SyncExpectedError::InvalidConfigValue {
                key: "tags.delete_tag".to_string(),
                message: format!("{:?} must be a single genre token", self.tags.delete_tag),
            }
            .into());
        }
        if self.remote.output_playlist.name.trim().is_empty() {
            return Err(SyncExpectedError::InvalidConfigValue {
                key: "remote.output_playlist.name".to_string(),
                message: "must not be empty".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

fn default_cache_file() -> PathBuf {
    dirs::cache_dir().unwrap_or_else(std::env::temp_dir).join("tagsync").join("playlists.json")
}

fn default_playlist_regex() -> Regex {
    Regex::new(".*").unwrap()
}

fn default_output_name() -> String {
    "Missing".to_string()
}

fn default_delete_tag() -> String {
    "delete".to_string()
}

fn default_min_rating() -> u32 {
    DEFAULT_MIN_RATING
}

fn expand(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

fn expand_path<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<PathBuf, D::Error> {
    Ok(expand(&String::deserialize(deserializer)?))
}

fn expand_optional_path<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<PathBuf>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.map(|raw| expand(&raw)))
}

fn expand_paths<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<PathBuf>, D::Error> {
    Ok(Vec::<String>::deserialize(deserializer)?.iter().map(|raw| expand(raw)).collect())
}
