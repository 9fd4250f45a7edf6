/// The graph_cache module persists the track graph between runs so that tagging does not have to
/// paginate every playlist each time. The snapshot is a single JSON document that is replaced
/// wholesale on every save.
use crate::error::{Result, SyncError};
use crate::graph::TrackGraph;
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::{debug, info};

/// Where a snapshot lives.
pub trait SnapshotStore {
    /// Returns `None` when no snapshot has been written yet.
    fn read(&self) -> io::Result<Option<Vec<u8>>>;
    fn write(&self, data: &[u8]) -> io::Result<()>;
    fn location(&self) -> String;
}

#[derive(Debug, Clone)]
pub struct FileStore {
    pub path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SnapshotStore for FileStore {
    fn read(&self) -> io::Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, data: &[u8]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, data)
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

pub struct GraphCache<S: SnapshotStore> {
    store: S,
}

impl<S: SnapshotStore> GraphCache<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn load(&self) -> Result<Option<TrackGraph>> {
        let Some(data) = self.store.read()? else {
            debug!("No cached track graph at {}", self.store.location());
            return Ok(None);
        };
        let graph: TrackGraph = serde_json::from_slice(&data).map_err(|source| SyncError::CacheCorrupt {
            location: self.store.location(),
            source,
        })?;
        debug!("Loaded cached track graph with {} tracks from {}", graph.tracks.len(), self.store.location());
        Ok(Some(graph))
    }

    pub fn save(&self, graph: &TrackGraph) -> Result<()> {
        let data = serde_json::to_vec_pretty(graph)?;
        self.store.write(&data)?;
        info!("Saved track graph with {} tracks to {}", graph.tracks.len(), self.store.location());
        Ok(())
    }

    /// Returns the cached graph when there is one, and otherwise fetches a fresh graph without
    /// saving it.
    pub fn get_or_fetch<F>(&self, fetch: F) -> Result<TrackGraph>
    where
        F: FnOnce() -> Result<TrackGraph>,
    {
        match self.load()? {
            Some(graph) => Ok(graph),
            None => fetch(),
        }
    }

    pub fn refresh<F>(&self, fetch: F) -> Result<TrackGraph>
    where
        F: FnOnce() -> Result<TrackGraph>,
    {
        let graph = fetch()?;
        self.save(&graph)?;
        Ok(graph)
    }
}
