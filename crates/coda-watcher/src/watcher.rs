//! Debounced file watching.
//!
//! Editors and exporters often write a file in several steps. Events are
//! debounced per path, and only paths of configured sources are
//! forwarded. The watcher observes the parent directories rather than
//! the files themselves so that atomic replace-by-rename is seen too.

use crate::error::ProviderError;
use crate::filesystem::normalize;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Default debounce window in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 150;

/// Watches source files and sends the path of every changed source.
///
/// Watching stops when the value is dropped.
pub struct SourceWatcher {
    _debouncer: Debouncer<RecommendedWatcher>,
    paths: Vec<PathBuf>,
}

impl SourceWatcher {
    /// Starts watching `paths`. Changed paths are sent on `tx`; a closed
    /// receiver silently ends forwarding.
    pub fn spawn(
        paths: &[PathBuf],
        debounce: Duration,
        tx: mpsc::Sender<PathBuf>,
    ) -> Result<Self, ProviderError> {
        let watched: HashSet<PathBuf> = paths.iter().map(|p| normalize(p)).collect();
        let filter = watched.clone();

        let mut debouncer = new_debouncer(debounce, move |result: DebounceEventResult| {
            match result {
                Ok(events) => {
                    for event in events {
                        let path = normalize(&event.path);
                        if !is_watched(&path, &filter) {
                            continue;
                        }
                        debug!("File event: {}", path.display());
                        if tx.blocking_send(path).is_err() {
                            return;
                        }
                    }
                }
                Err(e) => warn!("Watch error: {}", e),
            }
        })?;

        for dir in watch_dirs(&watched) {
            debouncer
                .watcher()
                .watch(&dir, RecursiveMode::NonRecursive)?;
            debug!("Watching directory {}", dir.display());
        }

        let mut paths: Vec<PathBuf> = watched.into_iter().collect();
        paths.sort();
        info!(
            "File watcher started for {} sources (debounce {}ms)",
            paths.len(),
            debounce.as_millis()
        );

        Ok(Self {
            _debouncer: debouncer,
            paths,
        })
    }

    /// The watched source paths, sorted.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

fn is_watched(path: &Path, watched: &HashSet<PathBuf>) -> bool {
    watched.contains(path)
}

/// Distinct parent directories of `paths`.
fn watch_dirs(paths: &HashSet<PathBuf>) -> BTreeSet<PathBuf> {
    paths
        .iter()
        .filter_map(|p| p.parent())
        .map(Path::to_path_buf)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_dirs_are_deduplicated() {
        let paths: HashSet<PathBuf> = [
            "/data/run1/polyps.csv",
            "/data/run1/edges.csv",
            "/data/run2/shape.csv",
        ]
        .iter()
        .map(PathBuf::from)
        .collect();

        let dirs: Vec<_> = watch_dirs(&paths).into_iter().collect();
        assert_eq!(
            dirs,
            vec![PathBuf::from("/data/run1"), PathBuf::from("/data/run2")]
        );
    }

    #[test]
    fn test_only_sources_pass() {
        let watched: HashSet<PathBuf> = [PathBuf::from("/data/polyps.csv")].into_iter().collect();

        assert!(is_watched(Path::new("/data/polyps.csv"), &watched));
        assert!(!is_watched(Path::new("/data/selection.csv"), &watched));
        assert!(!is_watched(Path::new("/data/polyps.csv.tmp"), &watched));
    }

    #[test]
    fn test_spawn_reports_paths() {
        let dir = tempfile::tempdir().unwrap();
        let polyps = dir.path().join("polyps.csv");
        std::fs::write(&polyps, "volume\n1\n").unwrap();

        let (tx, _rx) = mpsc::channel(8);
        let watcher = SourceWatcher::spawn(
            &[polyps.clone(), polyps.clone()],
            Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            tx,
        )
        .unwrap();

        assert_eq!(watcher.paths(), &[normalize(&polyps)]);
    }
}
