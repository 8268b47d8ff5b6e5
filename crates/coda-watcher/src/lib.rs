//! CoDA Watcher - Data providers and source watching
//!
//! A [`DataProvider`] turns some external source into the vertex and edge
//! tables of a session. Two providers ship with CoDA:
//!
//! - [`FilesystemProvider`] joins CSV files from disk and tracks which of
//!   them changed since the last load.
//! - [`RandomProvider`] generates a random colony, handy for trying out
//!   the views without real data.
//!
//! [`SourceWatcher`] observes the files of a provider and reports changed
//! paths on a tokio channel.

mod error;
mod filesystem;
mod provider;
mod random;
mod watcher;

pub use error::ProviderError;
pub use filesystem::FilesystemProvider;
pub use provider::DataProvider;
pub use random::RandomProvider;
pub use watcher::{SourceWatcher, DEFAULT_DEBOUNCE_MS};
