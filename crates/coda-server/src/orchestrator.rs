//! Reload orchestration.
//!
//! The orchestrator owns everything a session mutates: the published
//! generation, the selection, the subgraph tool and the plot surface. Its
//! [`ReloadState`] decides what may happen when:
//!
//! ```text
//! idle | error ──change──▶ change_detected ──begin──▶ reloading
//!                                                      │
//!                             ◀──────ok──── idle ◀─────┤
//!                             ◀────failed── error ◀────┘
//! ```
//!
//! While reloading, interactions are not applied. The latest one is kept
//! and handed back through [`Orchestrator::take_pending`] once the reload
//! finished. A change reported during a reload is remembered and turns
//! the final state into `change_detected`.
//!
//! The orchestrator is synchronous; reading the sources happens elsewhere
//! and its result is passed to [`Orchestrator::complete_reload`].

use crate::error::{ReloadError, ToolError};
use crate::generation::Generation;
use crate::selection::{RemapSummary, SelectionKind, SelectionState};
use crate::tool::{PlotSurface, Point, Renderer, SubgraphTool, EDGE_SOURCE, VERTEX_SOURCE};
use coda_core::{describe, Column, ColumnSummary, Dataset, EdgeColumns, VertexId};
use coda_graph::{GraphBuilder, GraphIndex, TraversalMode};
use coda_watcher::ProviderError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where the reload protocol currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum ReloadState {
    Idle,
    ChangeDetected,
    Reloading,
    /// The last reload failed; the previous generation is still served.
    Error(String),
}

impl std::fmt::Display for ReloadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReloadState::Idle => write!(f, "idle"),
            ReloadState::ChangeDetected => write!(f, "change detected"),
            ReloadState::Reloading => write!(f, "reloading"),
            ReloadState::Error(message) => write!(f, "failed: {}", message),
        }
    }
}

/// A user request that changes the selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Interaction {
    /// A tap on a plot, hit-tested on the server.
    Tap {
        point: Point,
        #[serde(default)]
        mode: Option<TraversalMode>,
    },
    /// Traversal roots already resolved by the client.
    SelectRoots {
        roots: Vec<VertexId>,
        #[serde(default)]
        mode: Option<TraversalMode>,
    },
    /// A selection set by a view directly, e.g. a lasso or a spreadsheet.
    SetSelection {
        selection: SelectionKind,
        ids: Vec<usize>,
    },
}

/// What became of a submitted interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// The selection was replaced; `changed` lists the affected sets.
    Applied { changed: Vec<SelectionKind> },
    /// Nothing was hit, or the new selection equals the old one.
    Unchanged,
    /// A reload is running; the interaction is applied afterwards unless
    /// a newer one replaces it.
    Queued,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Start a reload as soon as a change is detected.
    pub automatic_reload: bool,
    pub traversal_mode: TraversalMode,
    /// Mirror every subgraph selection onto the induced edges.
    pub select_induced_edges: bool,
}

/// Result of a successful reload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReloadReport {
    pub generation: u64,
    pub vertex_count: usize,
    pub edge_count: usize,
    pub remap: RemapSummary,
    pub stale: Vec<String>,
}

pub struct Orchestrator {
    state: ReloadState,
    generation: Arc<Generation>,
    selection: SelectionState,
    tool: SubgraphTool,
    surface: PlotSurface,
    pending: Option<Interaction>,
    change_during_reload: bool,
    automatic_reload: bool,
    select_induced_edges: bool,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self {
            state: ReloadState::Idle,
            generation: Arc::new(Generation::empty()),
            selection: SelectionState::new(),
            tool: SubgraphTool::new(config.traversal_mode),
            surface: PlotSurface::new(),
            pending: None,
            change_during_reload: false,
            automatic_reload: config.automatic_reload,
            select_induced_edges: config.select_induced_edges,
        }
    }

    pub fn state(&self) -> &ReloadState {
        &self.state
    }

    pub fn is_reloading(&self) -> bool {
        self.state == ReloadState::Reloading
    }

    /// The generation currently served.
    pub fn generation(&self) -> &Arc<Generation> {
        &self.generation
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn tool(&self) -> &SubgraphTool {
        &self.tool
    }

    pub fn automatic_reload(&self) -> bool {
        self.automatic_reload
    }

    pub fn set_automatic_reload(&mut self, enabled: bool) {
        self.automatic_reload = enabled;
    }

    pub fn set_mode(&mut self, mode: TraversalMode) {
        self.tool.mode = mode;
    }

    /// Records that a source changed. Returns true if a reload should be
    /// started right away.
    pub fn notify_change(&mut self) -> bool {
        if self.is_reloading() {
            debug!("Change detected during reload, remembering it");
            self.change_during_reload = true;
            return false;
        }

        self.state = ReloadState::ChangeDetected;
        self.automatic_reload
    }

    /// True if a change is waiting and reloads start automatically.
    pub fn should_reload(&self) -> bool {
        self.automatic_reload && self.state == ReloadState::ChangeDetected
    }

    /// An explicit reload request: marks a change and begins reloading.
    pub fn request_reload(&mut self) -> Result<(), ReloadError> {
        if self.is_reloading() {
            return Err(ReloadError::AlreadyReloading);
        }
        self.state = ReloadState::ChangeDetected;
        self.begin_reload()
    }

    /// Acquires the reload guard.
    pub fn begin_reload(&mut self) -> Result<(), ReloadError> {
        match self.state {
            ReloadState::ChangeDetected => {
                self.state = ReloadState::Reloading;
                debug!("Reload started (generation {})", self.generation.id);
                Ok(())
            }
            ReloadState::Reloading => Err(ReloadError::AlreadyReloading),
            ref state => Err(ReloadError::InvalidTransition {
                action: "begin reload",
                state: state.clone(),
            }),
        }
    }

    /// Finishes a reload with the tables read from the provider.
    ///
    /// On success the graph index is rebuilt, derived columns are marked
    /// stale, the selection is remapped and the new generation published.
    /// On failure the previous generation and selection stay untouched.
    /// Either way the guard is released.
    pub fn complete_reload(
        &mut self,
        loaded: Result<Dataset, ProviderError>,
        edge_columns: &EdgeColumns,
    ) -> Result<ReloadReport, ReloadError> {
        if !self.is_reloading() {
            return Err(ReloadError::InvalidTransition {
                action: "complete reload",
                state: self.state.clone(),
            });
        }

        let built = loaded
            .map_err(ReloadError::from)
            .and_then(|dataset| self.build_generation(dataset, edge_columns));

        match built {
            Ok(generation) => {
                let vertex_count = generation.vertex_count();
                let edge_count = generation.edge_count();

                let remap = self.selection.remap(vertex_count, edge_count);
                self.surface.truncate_source(VERTEX_SOURCE, vertex_count);
                self.surface.truncate_source(EDGE_SOURCE, edge_count);

                let report = ReloadReport {
                    generation: generation.id,
                    vertex_count,
                    edge_count,
                    remap,
                    stale: generation.stale.clone(),
                };
                self.generation = Arc::new(generation);
                self.release(ReloadState::Idle);

                info!(
                    "Reload complete: generation {} ({} vertices, {} edges)",
                    report.generation, report.vertex_count, report.edge_count
                );
                Ok(report)
            }
            Err(e) => {
                warn!("Reload failed, keeping generation {}: {}", self.generation.id, e);
                self.release(ReloadState::Error(e.to_string()));
                Err(e)
            }
        }
    }

    /// Hands back the interaction queued during the last reload.
    pub fn take_pending(&mut self) -> Option<Interaction> {
        self.pending.take()
    }

    /// Applies an interaction, or queues it while reloading.
    pub fn submit(&mut self, interaction: Interaction) -> Result<Outcome, ToolError> {
        if self.is_reloading() {
            if self.pending.replace(interaction).is_some() {
                debug!("Replaced queued interaction");
            }
            return Ok(Outcome::Queued);
        }
        self.apply(interaction)
    }

    /// Stores glyph positions reported by a client.
    pub fn update_layout(&mut self, renderer: Renderer) {
        self.surface.update(renderer);
    }

    pub fn remove_layout(&mut self, renderer: &str) -> bool {
        self.surface.remove(renderer).is_some()
    }

    /// Appends derived vertex columns to the current generation.
    pub fn append_features(
        &mut self,
        columns: Vec<(String, Column)>,
    ) -> Result<Arc<Generation>, ReloadError> {
        if self.is_reloading() {
            return Err(ReloadError::InvalidTransition {
                action: "append features",
                state: self.state.clone(),
            });
        }

        let next = self.generation.with_derived(columns)?;
        self.generation = Arc::new(next);
        Ok(self.generation.clone())
    }

    /// Column statistics over the current selection of `kind`, or over
    /// all rows when nothing of that kind is selected.
    pub fn statistics(&self, kind: SelectionKind) -> Vec<ColumnSummary> {
        let table = match kind {
            SelectionKind::Vertex => &self.generation.vertices,
            SelectionKind::Edge => &self.generation.edges,
        };
        let rows = self.selection.get_selected(kind);
        describe(table, Some(rows.as_slice()))
    }

    fn build_generation(
        &self,
        dataset: Dataset,
        edge_columns: &EdgeColumns,
    ) -> Result<Generation, ReloadError> {
        let mut builder = GraphBuilder::new(dataset.vertex_count());
        builder.add_table(&dataset.edges, edge_columns)?;
        let graph = builder.build()?;

        Ok(Generation::next(&self.generation, dataset, graph))
    }

    fn release(&mut self, next: ReloadState) {
        self.state = if std::mem::take(&mut self.change_during_reload) {
            ReloadState::ChangeDetected
        } else {
            next
        };
    }

    fn apply(&mut self, interaction: Interaction) -> Result<Outcome, ToolError> {
        let graph: &GraphIndex = &self.generation.graph;

        match interaction {
            Interaction::Tap { point, mode } => {
                match self.tool.tap(&self.surface, graph, point, mode)? {
                    Some(closure) => Ok(self.install_closure(closure)),
                    None => Ok(Outcome::Unchanged),
                }
            }
            Interaction::SelectRoots { roots, mode } => {
                let closure = self.tool.select(graph, &roots, mode)?;
                Ok(self.install_closure(closure))
            }
            Interaction::SetSelection { selection, ids } => {
                let count = match selection {
                    SelectionKind::Vertex => self.generation.vertex_count(),
                    SelectionKind::Edge => self.generation.edge_count(),
                };
                if let Some(&id) = ids.iter().find(|&&id| id >= count) {
                    return Err(ToolError::InvalidSelection {
                        kind: match selection {
                            SelectionKind::Vertex => "vertex",
                            SelectionKind::Edge => "edge",
                        },
                        id,
                        count,
                    });
                }

                if self.selection.set_selected(selection, ids) {
                    Ok(Outcome::Applied {
                        changed: vec![selection],
                    })
                } else {
                    Ok(Outcome::Unchanged)
                }
            }
        }
    }

    fn install_closure(&mut self, closure: Vec<VertexId>) -> Outcome {
        let mut changed = Vec::new();

        if self.select_induced_edges {
            let edges = self.generation.graph.induced_edges(&closure);
            if self.selection.set_selected(SelectionKind::Edge, edges) {
                changed.push(SelectionKind::Edge);
            }
        }
        if self.selection.set_selected(SelectionKind::Vertex, closure) {
            changed.insert(0, SelectionKind::Vertex);
        }

        if changed.is_empty() {
            Outcome::Unchanged
        } else {
            Outcome::Applied { changed }
        }
    }
}
