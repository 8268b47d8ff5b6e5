//! The data provider seam.
//!
//! A provider owns the raw sources of a session. The session runtime asks
//! it for a fresh [`Dataset`] on every reload and hands every selection
//! change back to it, so a provider can persist selections wherever its
//! sources live.

use crate::error::ProviderError;
use coda_core::{Dataset, EdgeColumns, EdgeId, VertexId};
use std::path::{Path, PathBuf};

pub trait DataProvider: Send {
    /// Short name used in logs and session info.
    fn name(&self) -> &str;

    /// Reads all sources and returns the merged tables.
    ///
    /// Loading is all or nothing: when an error is returned the provider
    /// keeps its previous state and the next call retries every source
    /// that was not read successfully.
    fn load(&mut self) -> Result<Dataset, ProviderError>;

    /// Edge table columns holding the endpoint vertex ids.
    fn edge_columns(&self) -> EdgeColumns {
        EdgeColumns::default()
    }

    /// Paths the file watcher should observe. Empty for providers that
    /// do not read from disk.
    fn watched_paths(&self) -> Vec<PathBuf> {
        Vec::new()
    }

    /// Called for every debounced file event. Returns true if `path` is
    /// one of the sources and its modification time advanced.
    fn mark_changed(&mut self, _path: &Path) -> bool {
        false
    }

    /// Makes the next [`load`](Self::load) read every source again,
    /// changed or not.
    fn mark_all_dirty(&mut self) {}

    /// Vertex ids to select right after the first load, if any.
    fn initial_vertex_selection(&self) -> Result<Option<Vec<VertexId>>, ProviderError> {
        Ok(None)
    }

    /// Receives the vertex selection whenever it changes.
    fn write_vertex_selection(&mut self, _ids: &[VertexId]) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Receives the edge selection whenever it changes.
    fn write_edge_selection(&mut self, _ids: &[EdgeId]) -> Result<(), ProviderError> {
        Ok(())
    }
}
