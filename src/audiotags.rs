/// The audiotags module abstracts over tag reading and writing for the supported audio formats,
/// exposing the handful of fields the tag sync cares about (artist, title, genre, year and
/// comment) through the single [`SongFile`] interface.
///
/// Each format has its own backend: `id3` for MP3, `mp4ameta` for M4A and `lofty` for FLAC and
/// Ogg/Opus. The backend is chosen from the file extension when the file is opened.
use crate::common::{clean_tag_value, SongKey};
use crate::error::{Result, SyncError, SyncExpectedError};
use id3::{Tag as Id3Tag, TagLike};
use mp4ameta::Tag as Mp4Tag;
use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

pub const SUPPORTED_AUDIO_EXTENSIONS: &[&str] = &[".mp3", ".m4a", ".ogg", ".opus", ".flac"];

static YEAR_PREFIX_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(\d{4})").unwrap());

const COMMENT_LANG: &str = "eng";

/// The tag fields of one audio file. Setters only touch the in-memory tag; nothing reaches the
/// disk until [`SongFile::save`].
pub trait SongFile: Send {
    fn title(&self) -> Option<String>;
    fn artist(&self) -> Option<String>;
    fn genre(&self) -> Option<String>;
    fn year(&self) -> Option<i32>;
    fn comment(&self) -> Option<String>;

    fn set_genre(&mut self, genre: &str);
    fn set_year(&mut self, year: i32);
    fn set_comment(&mut self, comment: &str);

    fn save(&mut self) -> Result<()>;
}

/// An audio file on disk together with its tag backend. Every read strips the trailing control
/// characters some taggers pad values with.
pub struct LocalFile {
    pub path: PathBuf,
    pub song: Box<dyn SongFile>,
}

impl std::fmt::Debug for LocalFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalFile").field("path", &self.path).finish_non_exhaustive()
    }
}

impl LocalFile {
    pub fn new(path: impl Into<PathBuf>, song: Box<dyn SongFile>) -> Self {
        Self { path: path.into(), song }
    }

    pub fn open(path: &Path) -> Result<LocalFile> {
        Ok(LocalFile::new(path, open_song_file(path)?))
    }

    pub fn title(&self) -> String {
        cleaned(self.song.title())
    }

    pub fn artist(&self) -> String {
        cleaned(self.song.artist())
    }

    pub fn genre(&self) -> String {
        cleaned(self.song.genre())
    }

    pub fn comment(&self) -> String {
        cleaned(self.song.comment())
    }

    pub fn year(&self) -> Option<i32> {
        self.song.year()
    }

    pub fn key(&self) -> SongKey {
        SongKey::new(&self.artist(), &self.title())
    }
}

fn cleaned(value: Option<String>) -> String {
    value.as_deref().map(clean_tag_value).unwrap_or_default().to_string()
}

fn extension_of(p: &Path) -> String {
    p.extension().and_then(|s| s.to_str()).map(|s| format!(".{}", s.to_lowercase())).unwrap_or_default()
}

pub fn is_supported(p: &Path) -> bool {
    SUPPORTED_AUDIO_EXTENSIONS.contains(&extension_of(p).as_str())
}

/// Opens the tag backend matching the file's extension.
pub fn open_song_file(p: &Path) -> Result<Box<dyn SongFile>> {
    match extension_of(p).as_str() {
        ".mp3" => Ok(Box::new(Id3File::open(p)?)),
        ".m4a" => Ok(Box::new(Mp4File::open(p)?)),
        ".flac" | ".ogg" | ".opus" => Ok(Box::new(LoftyFile::open(p)?)),
        _ => Err(SyncExpectedError::UnsupportedFiletype { path: p.to_path_buf() }.into()),
    }
}

/// Recursively collects every supported audio file under `dirs` and opens them in parallel. The
/// result is ordered by path.
pub fn load_music_files<P: AsRef<Path>>(dirs: &[P]) -> Result<Vec<LocalFile>> {
    let mut paths: Vec<PathBuf> = Vec::new();
    for dir in dirs {
        let dir = dir.as_ref();
        debug!("Scanning {} for music files", dir.display());
        for entry in WalkDir::new(dir).follow_links(true) {
            let entry = entry.map_err(|e| SyncError::Generic(format!("Failed to walk {}: {}", dir.display(), e)))?;
            if entry.file_type().is_file() && is_supported(entry.path()) {
                paths.push(entry.into_path());
            }
        }
    }
    paths.sort();

    let files = paths.par_iter().map(|p| LocalFile::open(p)).collect::<Result<Vec<_>>>()?;
    info!("Loaded {} local music files", files.len());
    Ok(files)
}

pub fn parse_year(value: &str) -> Option<i32> {
    YEAR_PREFIX_REGEX.captures(value).and_then(|caps| caps[1].parse().ok())
}

fn tag_error(p: &Path, e: impl std::fmt::Display) -> SyncError {
    SyncError::Tag {
        path: p.to_path_buf(),
        message: e.to_string(),
    }
}

fn save_error(p: &Path, e: impl std::fmt::Display) -> SyncError {
    SyncError::Save {
        path: p.to_path_buf(),
        message: e.to_string(),
    }
}

pub struct Id3File {
    path: PathBuf,
    tag: Id3Tag,
}

impl Id3File {
    pub fn open(p: &Path) -> Result<Id3File> {
        let tag = match Id3Tag::read_from_path(p) {
            Ok(tag) => tag,
            Err(e) if matches!(e.kind, id3::ErrorKind::NoTag) => Id3Tag::new(),
            Err(e) => return Err(tag_error(p, e)),
        };
        Ok(Id3File { path: p.to_path_buf(), tag })
    }

    fn text(&self, frame_id: &str) -> Option<String> {
        self.tag.get(frame_id).and_then(|f| f.content().text()).map(String::from)
    }
}

impl SongFile for Id3File {
    fn title(&self) -> Option<String> {
        self.tag.title().map(String::from)
    }

    fn artist(&self) -> Option<String> {
        self.tag.artist().map(String::from)
    }

    fn genre(&self) -> Option<String> {
        self.tag.genre().map(String::from)
    }

    fn year(&self) -> Option<i32> {
        self.text("TDRC").or_else(|| self.text("TYER")).as_deref().and_then(parse_year)
    }

    fn comment(&self) -> Option<String> {
        let texts: Vec<&str> = self.tag.comments().filter(|c| c.lang == COMMENT_LANG).map(|c| c.text.as_str()).collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.concat())
        }
    }

    fn set_genre(&mut self, genre: &str) {
        self.tag.set_genre(genre);
    }

    fn set_year(&mut self, year: i32) {
        self.tag.remove("TYER");
        self.tag.set_text("TDRC", year.to_string());
    }

    fn set_comment(&mut self, comment: &str) {
        self.tag.remove("COMM");
        self.tag.add_frame(id3::frame::Comment {
            lang: COMMENT_LANG.to_string(),
            description: String::new(),
            text: comment.to_string(),
        });
    }

    fn save(&mut self) -> Result<()> {
        self.tag.write_to_path(&self.path, id3::Version::Id3v24).map_err(|e| save_error(&self.path, e))
    }
}

pub struct Mp4File {
    path: PathBuf,
    tag: Mp4Tag,
}

impl Mp4File {
    pub fn open(p: &Path) -> Result<Mp4File> {
        let tag = Mp4Tag::read_from_path(p).map_err(|e| tag_error(p, e))?;
        Ok(Mp4File { path: p.to_path_buf(), tag })
    }
}

impl SongFile for Mp4File {
    fn title(&self) -> Option<String> {
        self.tag.title().map(String::from)
    }

    fn artist(&self) -> Option<String> {
        self.tag.artist().map(String::from)
    }

    fn genre(&self) -> Option<String> {
        self.tag.genre().map(String::from)
    }

    fn year(&self) -> Option<i32> {
        self.tag.year().and_then(parse_year)
    }

    fn comment(&self) -> Option<String> {
        self.tag.comment().map(String::from)
    }

    fn set_genre(&mut self, genre: &str) {
        self.tag.set_genre(genre);
    }

    fn set_year(&mut self, year: i32) {
        self.tag.set_year(year.to_string());
    }

    fn set_comment(&mut self, comment: &str) {
        self.tag.set_comment(comment);
    }

    fn save(&mut self) -> Result<()> {
        self.tag.write_to_path(&self.path).map_err(|e| save_error(&self.path, e))
    }
}

/// FLAC and Ogg/Opus files, whose Vorbis comments are read and written through lofty.
pub struct LoftyFile {
    path: PathBuf,
    tag: lofty::tag::Tag,
}

impl LoftyFile {
    pub fn open(p: &Path) -> Result<LoftyFile> {
        use lofty::prelude::TaggedFileExt;
        use lofty::probe::Probe;

        let tagged_file = Probe::open(p)
            .map_err(|e| tag_error(p, e))?
            .guess_file_type()
            .map_err(|e| tag_error(p, e))?
            .read()
            .map_err(|e| tag_error(p, e))?;
        let tag = match tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) {
            Some(tag) => tag.clone(),
            None => lofty::tag::Tag::new(tagged_file.primary_tag_type()),
        };
        Ok(LoftyFile { path: p.to_path_buf(), tag })
    }

    fn get(&self, key: &lofty::prelude::ItemKey) -> Option<String> {
        self.tag.get_string(key).map(String::from)
    }
}

impl SongFile for LoftyFile {
    fn title(&self) -> Option<String> {
        self.get(&lofty::prelude::ItemKey::TrackTitle)
    }

    fn artist(&self) -> Option<String> {
        self.get(&lofty::prelude::ItemKey::TrackArtist)
    }

    fn genre(&self) -> Option<String> {
        self.get(&lofty::prelude::ItemKey::Genre)
    }

    fn year(&self) -> Option<i32> {
        use lofty::prelude::ItemKey;
        self.get(&ItemKey::RecordingDate).or_else(|| self.get(&ItemKey::Year)).as_deref().and_then(parse_year)
    }

    fn comment(&self) -> Option<String> {
        self.get(&lofty::prelude::ItemKey::Comment)
    }

    fn set_genre(&mut self, genre: &str) {
        self.tag.insert_text(lofty::prelude::ItemKey::Genre, genre.to_string());
    }

    fn set_year(&mut self, year: i32) {
        use lofty::prelude::ItemKey;
        self.tag.remove_key(&ItemKey::Year);
        self.tag.insert_text(ItemKey::RecordingDate, year.to_string());
    }

    fn set_comment(&mut self, comment: &str) {
        self.tag.insert_text(lofty::prelude::ItemKey::Comment, comment.to_string());
    }

    fn save(&mut self) -> Result<()> {
        use lofty::config::WriteOptions;
        use lofty::prelude::TagExt;
        self.tag.save_to_path(&self.path, WriteOptions::default()).map_err(|e| save_error(&self.path, e))
    }
}
