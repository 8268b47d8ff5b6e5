//! Project configuration.
//!
//! Looked up in `.coda/config.json` under the working directory, then in
//! the user config directory. Missing files fall back to defaults.

use coda_core::EdgeColumns;
use coda_graph::TraversalMode;
use coda_server::{OrchestratorConfig, DEFAULT_PORT};
use coda_watcher::DEFAULT_DEBOUNCE_MS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_DIR: &str = ".coda";
pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodaConfig {
    pub edge_columns: EdgeColumns,
    pub debounce_ms: u64,
    pub automatic_reload: bool,
    pub traversal_mode: TraversalMode,
    pub select_induced_edges: bool,
    pub port: u16,
}

impl Default for CodaConfig {
    fn default() -> Self {
        Self {
            edge_columns: EdgeColumns::default(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            automatic_reload: false,
            traversal_mode: TraversalMode::default(),
            select_induced_edges: false,
            port: DEFAULT_PORT,
        }
    }
}

impl CodaConfig {
    /// Loads the first config file found for `root`.
    pub fn load(root: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        for path in Self::candidates(root) {
            if path.is_file() {
                debug!("Loading config from {}", path.display());
                return Self::read(&path);
            }
        }
        Ok(Self::default())
    }

    pub fn read(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let text = fs::read_to_string(path)?;
        let config = serde_json::from_str(&text)
            .map_err(|e| format!("invalid config {}: {}", path.display(), e))?;
        Ok(config)
    }

    pub fn write(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    fn candidates(root: &Path) -> Vec<PathBuf> {
        let mut paths = vec![root.join(CONFIG_DIR).join(CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("coda").join(CONFIG_FILE));
        }
        paths
    }

    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            automatic_reload: self.automatic_reload,
            traversal_mode: self.traversal_mode,
            select_induced_edges: self.select_induced_edges,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, r#"{"traversal_mode": "ancestors", "port": 9000}"#).unwrap();

        let config = CodaConfig::read(&path).unwrap();
        assert_eq!(config.traversal_mode, TraversalMode::Ancestors);
        assert_eq!(config.port, 9000);
        assert_eq!(config.debounce_ms, DEFAULT_DEBOUNCE_MS);
        assert_eq!(config.edge_columns, EdgeColumns::default());
    }

    #[test]
    fn test_project_config_is_found() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(CONFIG_DIR)).unwrap();

        let config = CodaConfig {
            automatic_reload: true,
            ..CodaConfig::default()
        };
        config
            .write(&dir.path().join(CONFIG_DIR).join(CONFIG_FILE))
            .unwrap();

        let loaded = CodaConfig::load(dir.path()).unwrap();
        assert!(loaded.automatic_reload);
        assert!(loaded.orchestrator().automatic_reload);
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "{ not json").unwrap();

        let err = CodaConfig::read(&path).unwrap_err();
        assert!(err.to_string().contains("invalid config"));
    }
}
