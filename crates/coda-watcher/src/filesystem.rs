//! CSV files on the local filesystem.
//!
//! Several vertex files and several edge files are joined positionally
//! into one vertex and one edge table. Every column is prefixed with the
//! prefix of its file (the file stem unless given), except for the edge
//! id columns, which keep their plain names.
//!
//! Each file carries a dirty flag. Only dirty files are read again on
//! reload; clean files are served from the cached table.

use crate::error::ProviderError;
use crate::provider::DataProvider;
use coda_core::{
    read_selection_mask, read_table, write_selection, Dataset, DataError, EdgeColumns, EdgeId,
    Table, VertexId,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Vertex,
    Edge,
}

#[derive(Debug)]
struct SourceFile {
    path: PathBuf,
    kind: SourceKind,
    prefix: String,
    dirty: bool,
    /// Modification time observed when the cached table was read.
    modified: Option<SystemTime>,
    table: Option<Table>,
}

/// Reads vertex and edge tables from CSV files and writes selections
/// back as CSV.
#[derive(Debug)]
pub struct FilesystemProvider {
    files: Vec<SourceFile>,
    edge_columns: EdgeColumns,
    selection_mask: Option<PathBuf>,
    vertex_selection_output: Option<PathBuf>,
    edge_selection_output: Option<PathBuf>,
}

impl FilesystemProvider {
    pub fn new(edge_columns: EdgeColumns) -> Self {
        Self {
            files: Vec::new(),
            edge_columns,
            selection_mask: None,
            vertex_selection_output: None,
            edge_selection_output: None,
        }
    }

    /// Adds a vertex CSV. The prefix defaults to the file stem.
    pub fn add_vertex_csv(&mut self, path: impl AsRef<Path>, prefix: Option<&str>) {
        self.add_source(path.as_ref(), prefix, SourceKind::Vertex);
    }

    /// Adds an edge CSV. The prefix defaults to the file stem.
    pub fn add_edge_csv(&mut self, path: impl AsRef<Path>, prefix: Option<&str>) {
        self.add_source(path.as_ref(), prefix, SourceKind::Edge);
    }

    /// Sets a one-column CSV whose non-zero rows form the initial vertex
    /// selection.
    pub fn with_selection_mask(mut self, path: impl AsRef<Path>) -> Self {
        self.selection_mask = Some(normalize(path.as_ref()));
        self
    }

    /// Writes every vertex selection change to `path`.
    pub fn with_vertex_selection_output(mut self, path: impl AsRef<Path>) -> Self {
        self.vertex_selection_output = Some(path.as_ref().to_path_buf());
        self
    }

    /// Writes every edge selection change to `path`.
    pub fn with_edge_selection_output(mut self, path: impl AsRef<Path>) -> Self {
        self.edge_selection_output = Some(path.as_ref().to_path_buf());
        self
    }

    /// Number of configured vertex files.
    pub fn vertex_file_count(&self) -> usize {
        self.count(SourceKind::Vertex)
    }

    /// Number of configured edge files.
    pub fn edge_file_count(&self) -> usize {
        self.count(SourceKind::Edge)
    }

    /// Paths that will be read on the next load.
    pub fn dirty_paths(&self) -> Vec<&Path> {
        self.files
            .iter()
            .filter(|f| f.dirty || f.table.is_none())
            .map(|f| f.path.as_path())
            .collect()
    }

    fn count(&self, kind: SourceKind) -> usize {
        self.files.iter().filter(|f| f.kind == kind).count()
    }

    fn add_source(&mut self, path: &Path, prefix: Option<&str>, kind: SourceKind) {
        let path = normalize(path);
        let prefix = match prefix {
            Some(p) => p.to_string(),
            None => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };

        debug!("Watching {:?} source {} (prefix '{}')", kind, path.display(), prefix);
        self.files.push(SourceFile {
            path,
            kind,
            prefix,
            dirty: true,
            modified: None,
            table: None,
        });
    }

    fn merge(&self, fresh: &[Option<(Table, Option<SystemTime>)>]) -> Result<Dataset, DataError> {
        let mut vertex_parts = Vec::new();
        let mut edge_parts = Vec::new();
        let mut ids_claimed = false;
        let id_columns = self.edge_columns.names();

        for (file, fresh) in self.files.iter().zip(fresh) {
            let table = match fresh.as_ref().map(|(t, _)| t).or(file.table.as_ref()) {
                Some(table) => table,
                None => continue,
            };

            match file.kind {
                SourceKind::Vertex => vertex_parts.push(table.prefixed(&file.prefix, &[])),
                SourceKind::Edge => {
                    // The first file holding both id columns provides them.
                    let has_ids = id_columns.iter().all(|c| table.contains_column(c));
                    if has_ids && !ids_claimed {
                        ids_claimed = true;
                        edge_parts.push(table.prefixed(&file.prefix, &id_columns));
                    } else {
                        edge_parts.push(table.prefixed(&file.prefix, &[]));
                    }
                }
            }
        }

        Ok(Dataset::new(
            Table::hconcat(vertex_parts)?,
            Table::hconcat(edge_parts)?,
        ))
    }
}

impl DataProvider for FilesystemProvider {
    fn name(&self) -> &str {
        "filesystem"
    }

    fn load(&mut self) -> Result<Dataset, ProviderError> {
        if self.vertex_file_count() == 0 {
            return Err(ProviderError::NoVertexSources);
        }

        debug!("Reading {:?}", self.dirty_paths());

        // Read everything first; nothing is committed unless all files
        // were read and joined.
        let mut fresh = Vec::with_capacity(self.files.len());
        for file in &self.files {
            if file.dirty || file.table.is_none() {
                let modified = modified_time(&file.path);
                fresh.push(Some((read_table(&file.path)?, modified)));
            } else {
                fresh.push(None);
            }
        }

        let dataset = self.merge(&fresh)?;
        let reread = fresh.iter().filter(|f| f.is_some()).count();

        for (file, fresh) in self.files.iter_mut().zip(fresh) {
            if let Some((table, modified)) = fresh {
                file.table = Some(table);
                file.modified = modified;
                file.dirty = false;
            }
        }

        info!(
            "Loaded {} vertices and {} edges ({} of {} files re-read)",
            dataset.vertex_count(),
            dataset.edge_count(),
            reread,
            self.files.len()
        );
        Ok(dataset)
    }

    fn edge_columns(&self) -> EdgeColumns {
        self.edge_columns.clone()
    }

    fn watched_paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }

    fn mark_changed(&mut self, path: &Path) -> bool {
        let path = normalize(path);
        let mut changed = false;

        for file in self.files.iter_mut().filter(|f| f.path == path) {
            let current = modified_time(&file.path);
            let advanced = match (file.modified, current) {
                (Some(seen), Some(now)) => now > seen,
                // Never read, or the file vanished: either way the next
                // load has to look at it.
                _ => true,
            };

            if advanced {
                debug!("Source changed: {}", file.path.display());
                file.dirty = true;
                changed = true;
            }
        }

        changed
    }

    fn mark_all_dirty(&mut self) {
        for file in &mut self.files {
            file.dirty = true;
        }
    }

    fn initial_vertex_selection(&self) -> Result<Option<Vec<VertexId>>, ProviderError> {
        match &self.selection_mask {
            Some(path) => Ok(Some(read_selection_mask(path)?)),
            None => Ok(None),
        }
    }

    fn write_vertex_selection(&mut self, ids: &[VertexId]) -> Result<(), ProviderError> {
        if let Some(path) = &self.vertex_selection_output {
            write_selection(path, ids)?;
            debug!("Wrote {} selected vertices to {}", ids.len(), path.display());
        }
        Ok(())
    }

    fn write_edge_selection(&mut self, ids: &[EdgeId]) -> Result<(), ProviderError> {
        if let Some(path) = &self.edge_selection_output {
            write_selection(path, ids)?;
            debug!("Wrote {} selected edges to {}", ids.len(), path.display());
        }
        Ok(())
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Makes `path` comparable with the absolute paths reported by the
/// file watcher.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use coda_core::Column;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    /// Moves the modification time forward so the change is visible even
    /// on filesystems with coarse timestamps.
    fn touch(path: &Path) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(60))
            .unwrap();
    }

    fn colony(dir: &TempDir) -> FilesystemProvider {
        let polyps = write(dir, "polyps.csv", "volume,kind\n1.5,calyx\n2.0,calyx\n3.5,bud\n");
        let shape = write(dir, "shape.csv", "length\n10\n12\n9\n");
        let edges = write(dir, "edges.csv", "source,target,weight\n0,1,0.5\n0,2,0.7\n");

        let mut provider = FilesystemProvider::new(EdgeColumns::default());
        provider.add_vertex_csv(&polyps, None);
        provider.add_vertex_csv(&shape, Some("geom"));
        provider.add_edge_csv(&edges, None);
        provider
    }

    #[test]
    fn test_load_merges_and_prefixes() {
        let dir = tempdir().unwrap();
        let mut provider = colony(&dir);

        let dataset = provider.load().unwrap();
        assert_eq!(dataset.vertex_count(), 3);
        assert_eq!(
            dataset.vertices.column_names().collect::<Vec<_>>(),
            vec!["polyps:volume", "polyps:kind", "geom:length"]
        );
        assert_eq!(
            dataset.edges.column_names().collect::<Vec<_>>(),
            vec!["source", "target", "edges:weight"]
        );
        assert_eq!(
            dataset.edges.column("target"),
            Some(&Column::Integer(vec![1, 2]))
        );
        assert!(provider.dirty_paths().is_empty());
    }

    #[test]
    fn test_second_edge_file_keeps_prefix() {
        let dir = tempdir().unwrap();
        let polyps = write(&dir, "polyps.csv", "volume\n1\n2\n");
        let a = write(&dir, "a.csv", "source,target\n0,1\n");
        let b = write(&dir, "b.csv", "source,target\n1,0\n");

        let mut provider = FilesystemProvider::new(EdgeColumns::default());
        provider.add_vertex_csv(&polyps, None);
        provider.add_edge_csv(&a, None);
        provider.add_edge_csv(&b, None);

        let dataset = provider.load().unwrap();
        assert_eq!(
            dataset.edges.column_names().collect::<Vec<_>>(),
            vec!["source", "target", "b:source", "b:target"]
        );
    }

    #[test]
    fn test_clean_files_are_served_from_cache() {
        let dir = tempdir().unwrap();
        let mut provider = colony(&dir);
        provider.load().unwrap();

        let shape = write(&dir, "shape.csv", "length\n1\n1\n1\n");
        let cached = provider.load().unwrap();
        assert_eq!(
            cached.vertices.column("geom:length"),
            Some(&Column::Integer(vec![10, 12, 9]))
        );

        touch(&shape);
        assert!(provider.mark_changed(&shape));
        assert_eq!(provider.dirty_paths(), vec![normalize(&shape).as_path()]);

        let reloaded = provider.load().unwrap();
        assert_eq!(
            reloaded.vertices.column("geom:length"),
            Some(&Column::Integer(vec![1, 1, 1]))
        );
    }

    #[test]
    fn test_mark_all_dirty_rereads_unnotified_edits() {
        let dir = tempdir().unwrap();
        let mut provider = colony(&dir);
        provider.load().unwrap();

        // Edited on disk, but no change was ever reported.
        write(&dir, "polyps.csv", "volume,kind\n1,a\n2,b\n3,c\n");
        write(&dir, "shape.csv", "length\n4\n5\n6\n");

        provider.mark_all_dirty();
        assert_eq!(provider.dirty_paths().len(), 3);

        let dataset = provider.load().unwrap();
        assert_eq!(
            dataset.vertices.column("geom:length"),
            Some(&Column::Integer(vec![4, 5, 6]))
        );
        assert_eq!(
            dataset.vertices.column("polyps:volume"),
            Some(&Column::Integer(vec![1, 2, 3]))
        );
        assert!(provider.dirty_paths().is_empty());
    }

    #[test]
    fn test_mark_changed_requires_newer_timestamp() {
        let dir = tempdir().unwrap();
        let mut provider = colony(&dir);
        provider.load().unwrap();

        let polyps = dir.path().join("polyps.csv");
        assert!(!provider.mark_changed(&polyps));
        assert!(!provider.mark_changed(&dir.path().join("unrelated.csv")));

        touch(&polyps);
        assert!(provider.mark_changed(&polyps));
    }

    #[test]
    fn test_failed_load_commits_nothing() {
        let dir = tempdir().unwrap();
        let mut provider = colony(&dir);
        provider.load().unwrap();

        // One row short: cannot be joined with polyps.csv.
        let shape = write(&dir, "shape.csv", "length\n10\n12\n");
        touch(&shape);
        provider.mark_changed(&shape);

        let err = provider.load().unwrap_err();
        assert!(err.is_integrity());
        assert_eq!(provider.dirty_paths().len(), 1);

        write(&dir, "shape.csv", "length\n7\n8\n9\n");
        touch(&shape);
        let dataset = provider.load().unwrap();
        assert_eq!(
            dataset.vertices.column("geom:length"),
            Some(&Column::Integer(vec![7, 8, 9]))
        );
    }

    #[test]
    fn test_missing_source() {
        let dir = tempdir().unwrap();
        let mut provider = FilesystemProvider::new(EdgeColumns::default());
        provider.add_vertex_csv(dir.path().join("absent.csv"), None);

        let err = provider.load().unwrap_err();
        assert!(err.is_source_unavailable());
    }

    #[test]
    fn test_requires_vertex_source() {
        let mut provider = FilesystemProvider::new(EdgeColumns::default());
        assert!(matches!(
            provider.load(),
            Err(ProviderError::NoVertexSources)
        ));
    }

    #[test]
    fn test_selection_mask_and_outputs() {
        let dir = tempdir().unwrap();
        let mask = write(&dir, "mask.csv", "0\n1\n1\n");
        let vertex_out = dir.path().join("vertex_selection.csv");
        let edge_out = dir.path().join("edge_selection.csv");

        let mut provider = colony(&dir)
            .with_selection_mask(&mask)
            .with_vertex_selection_output(&vertex_out)
            .with_edge_selection_output(&edge_out);

        assert_eq!(provider.initial_vertex_selection().unwrap(), Some(vec![1, 2]));

        provider.write_vertex_selection(&[0, 2]).unwrap();
        provider.write_edge_selection(&[]).unwrap();

        assert_eq!(fs::read_to_string(&vertex_out).unwrap(), "index\n0\n2\n");
        assert_eq!(fs::read_to_string(&edge_out).unwrap(), "index\n");
    }

    #[test]
    fn test_watched_paths_are_absolute() {
        let dir = tempdir().unwrap();
        let provider = colony(&dir);

        let paths = provider.watched_paths();
        assert_eq!(paths.len(), 3);
        assert!(paths.iter().all(|p| p.is_absolute()));
        assert_eq!(provider.vertex_file_count(), 2);
        assert_eq!(provider.edge_file_count(), 1);
    }
}
