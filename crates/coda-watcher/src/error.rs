use coda_core::DataError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// The provider has nothing to read vertices from.
    #[error("No vertex sources configured")]
    NoVertexSources,
}

impl ProviderError {
    /// True if the error describes inconsistent data, as opposed to a
    /// source that could not be read at all.
    pub fn is_integrity(&self) -> bool {
        matches!(self, ProviderError::Data(e) if e.is_integrity())
    }

    /// True if a watched path was missing or unreadable.
    pub fn is_source_unavailable(&self) -> bool {
        match self {
            ProviderError::Data(e) => e.is_source_unavailable(),
            ProviderError::NoVertexSources => true,
            ProviderError::Watch(_) => false,
        }
    }
}
