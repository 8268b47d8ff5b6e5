//! The session runtime.
//!
//! One tokio task owns the [`Orchestrator`] and the data provider and
//! processes commands strictly one after another. Everything else talks
//! to it through a cloneable [`SessionHandle`]:
//!
//! - requests go over an mpsc channel, answers come back on a oneshot;
//! - the current generation is published on a `watch` channel;
//! - selection changes, new generations and reload status are broadcast
//!   as [`SessionEvent`]s.
//!
//! Reading the sources is blocking I/O and runs on the blocking pool. The
//! provider moves into that worker and comes back with the result, so the
//! session task keeps answering requests in the meantime.

use crate::error::{ReloadError, SessionError, ToolError};
use crate::generation::{Generation, GenerationInfo};
use crate::orchestrator::{
    Interaction, Orchestrator, OrchestratorConfig, Outcome, ReloadReport, ReloadState,
};
use crate::selection::SelectionKind;
use crate::tool::{Point, Renderer};
use chrono::{DateTime, Utc};
use coda_core::{Column, ColumnSummary, Dataset, VertexId};
use coda_graph::TraversalMode;
use coda_watcher::{DataProvider, ProviderError, SourceWatcher};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const COMMAND_QUEUE: usize = 256;
const EVENT_QUEUE: usize = 256;

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

/// Messages broadcast to every subscriber.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum SessionEvent {
    /// A new generation was published, or derived columns were added.
    GenerationUpdate(GenerationInfo),
    /// The vertex or edge selection was replaced.
    SelectionUpdate(SelectionPayload),
    /// The reload state changed.
    ReloadStatus(ReloadStatusPayload),
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectionPayload {
    pub generation: u64,
    pub vertices: Vec<usize>,
    pub edges: Vec<usize>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReloadStatusPayload {
    pub state: ReloadState,
    pub generation: u64,
    /// Present when a reload just succeeded.
    pub report: Option<ReloadReport>,
    pub timestamp: DateTime<Utc>,
}

/// Answer to [`SessionHandle::info`].
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub provider: String,
    pub reload: ReloadState,
    pub automatic_reload: bool,
    pub mode: TraversalMode,
    pub generation: GenerationInfo,
    pub selected_vertices: usize,
    pub selected_edges: usize,
    pub version: &'static str,
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

enum SessionCommand {
    Interact {
        interaction: Interaction,
        reply: oneshot::Sender<Result<Outcome, ToolError>>,
    },
    GetSelection {
        kind: SelectionKind,
        reply: oneshot::Sender<Vec<usize>>,
    },
    Reload {
        reply: oneshot::Sender<Result<(), ReloadError>>,
    },
    SourceChanged {
        path: PathBuf,
    },
    Info {
        reply: oneshot::Sender<SessionInfo>,
    },
    UpdateLayout {
        renderer: Renderer,
    },
    AppendFeatures {
        columns: Vec<(String, Column)>,
        reply: oneshot::Sender<Result<GenerationInfo, ReloadError>>,
    },
    Statistics {
        kind: SelectionKind,
        reply: oneshot::Sender<Vec<ColumnSummary>>,
    },
    SetMode {
        mode: TraversalMode,
    },
}

type LoadResult = (Box<dyn DataProvider>, Result<Dataset, ProviderError>);

// ─────────────────────────────────────────────────────────────────────────────
// SessionHandle
// ─────────────────────────────────────────────────────────────────────────────

/// A cloneable handle to a running session.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    generation: watch::Receiver<Arc<Generation>>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionHandle {
    /// Submits a selection interaction.
    pub async fn interact(&self, interaction: Interaction) -> Result<Outcome, SessionError> {
        let result = self
            .request(|reply| SessionCommand::Interact { interaction, reply })
            .await?;
        Ok(result?)
    }

    /// Hit-tests `point` and selects the closure of everything hit.
    pub async fn tap(
        &self,
        point: Point,
        mode: Option<TraversalMode>,
    ) -> Result<Outcome, SessionError> {
        self.interact(Interaction::Tap { point, mode }).await
    }

    /// Selects the closure of `roots`.
    pub async fn select_roots(
        &self,
        roots: Vec<VertexId>,
        mode: Option<TraversalMode>,
    ) -> Result<Outcome, SessionError> {
        self.interact(Interaction::SelectRoots { roots, mode }).await
    }

    /// Replaces the selection of `kind`.
    pub async fn set_selection(
        &self,
        kind: SelectionKind,
        ids: Vec<usize>,
    ) -> Result<Outcome, SessionError> {
        self.interact(Interaction::SetSelection {
            selection: kind,
            ids,
        })
        .await
    }

    pub async fn get_selection(&self, kind: SelectionKind) -> Result<Vec<usize>, SessionError> {
        self.request(|reply| SessionCommand::GetSelection { kind, reply })
            .await
    }

    /// Starts a reload. Completion is reported through events and the
    /// generation channel.
    pub async fn reload(&self) -> Result<(), SessionError> {
        let result = self.request(|reply| SessionCommand::Reload { reply }).await?;
        Ok(result?)
    }

    /// Reports a file event for `path`.
    pub async fn source_changed(&self, path: PathBuf) -> Result<(), SessionError> {
        self.send(SessionCommand::SourceChanged { path }).await
    }

    pub async fn info(&self) -> Result<SessionInfo, SessionError> {
        self.request(|reply| SessionCommand::Info { reply }).await
    }

    /// Stores the glyph positions of a client renderer for hit-testing.
    pub async fn update_layout(&self, renderer: Renderer) -> Result<(), SessionError> {
        self.send(SessionCommand::UpdateLayout { renderer }).await
    }

    /// Appends derived vertex columns to the current generation.
    pub async fn append_features(
        &self,
        columns: Vec<(String, Column)>,
    ) -> Result<GenerationInfo, SessionError> {
        let result = self
            .request(|reply| SessionCommand::AppendFeatures { columns, reply })
            .await?;
        Ok(result?)
    }

    pub async fn statistics(
        &self,
        kind: SelectionKind,
    ) -> Result<Vec<ColumnSummary>, SessionError> {
        self.request(|reply| SessionCommand::Statistics { kind, reply })
            .await
    }

    /// Changes the default traversal mode of the subgraph tool.
    pub async fn set_mode(&self, mode: TraversalMode) -> Result<(), SessionError> {
        self.send(SessionCommand::SetMode { mode }).await
    }

    /// The generation published most recently.
    pub fn generation(&self) -> Arc<Generation> {
        self.generation.borrow().clone()
    }

    /// A receiver that is notified on every published generation.
    pub fn watch_generation(&self) -> watch::Receiver<Arc<Generation>> {
        self.generation.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    async fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::Closed)
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, SessionError> {
        let (reply, response) = oneshot::channel();
        self.send(command(reply)).await?;
        response.await.map_err(|_| SessionError::Closed)
    }
}

/// Forwards debounced file events of `paths` to the session.
///
/// Watching stops when the returned watcher is dropped.
pub fn watch_sources(
    handle: &SessionHandle,
    paths: &[PathBuf],
    debounce: Duration,
) -> Result<SourceWatcher, ProviderError> {
    let (tx, mut rx) = mpsc::channel::<PathBuf>(64);
    let watcher = SourceWatcher::spawn(paths, debounce, tx)?;

    let handle = handle.clone();
    tokio::spawn(async move {
        while let Some(path) = rx.recv().await {
            if handle.source_changed(path).await.is_err() {
                break;
            }
        }
    });

    Ok(watcher)
}

// ─────────────────────────────────────────────────────────────────────────────
// Session task
// ─────────────────────────────────────────────────────────────────────────────

/// The state owned by the session task.
pub struct Session {
    orchestrator: Orchestrator,
    /// `None` while a reload holds the provider.
    provider: Option<Box<dyn DataProvider>>,
    provider_name: String,
    /// Sources reported while the provider was busy loading.
    pending_changes: Vec<PathBuf>,
    initial_selection_applied: bool,
    generation_tx: watch::Sender<Arc<Generation>>,
    events: broadcast::Sender<SessionEvent>,
    loaded_tx: mpsc::Sender<LoadResult>,
}

impl Session {
    /// Spawns the session task and starts the initial load.
    ///
    /// The task ends once every handle has been dropped.
    pub fn spawn(
        provider: Box<dyn DataProvider>,
        config: OrchestratorConfig,
    ) -> (SessionHandle, JoinHandle<()>) {
        let orchestrator = Orchestrator::new(config);
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_QUEUE);
        let (loaded_tx, loaded_rx) = mpsc::channel(1);
        let (generation_tx, generation_rx) = watch::channel(orchestrator.generation().clone());
        let (events, _) = broadcast::channel(EVENT_QUEUE);

        let session = Session {
            orchestrator,
            provider_name: provider.name().to_string(),
            provider: Some(provider),
            pending_changes: Vec::new(),
            initial_selection_applied: false,
            generation_tx,
            events: events.clone(),
            loaded_tx,
        };

        let handle = SessionHandle {
            commands: commands_tx,
            generation: generation_rx,
            events,
        };

        let task = tokio::spawn(session.run(commands_rx, loaded_rx));
        (handle, task)
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<SessionCommand>,
        mut loaded: mpsc::Receiver<LoadResult>,
    ) {
        info!("Session started with {} provider", self.provider_name);

        match self.orchestrator.request_reload() {
            Ok(()) => self.start_reload(false),
            Err(e) => error!("Initial load not started: {}", e),
        }

        loop {
            tokio::select! {
                Some((provider, result)) = loaded.recv() => {
                    self.finish_reload(provider, result);
                }
                command = commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
            }
        }

        info!("Session closed");
    }

    fn handle(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Interact { interaction, reply } => {
                let _ = reply.send(self.interact(interaction));
            }
            SessionCommand::GetSelection { kind, reply } => {
                let _ = reply.send(self.orchestrator.selection().get_selected(kind));
            }
            SessionCommand::Reload { reply } => {
                let result = self.orchestrator.request_reload();
                if result.is_ok() {
                    self.start_reload(true);
                }
                let _ = reply.send(result);
            }
            SessionCommand::SourceChanged { path } => self.source_changed(path),
            SessionCommand::Info { reply } => {
                let _ = reply.send(self.info());
            }
            SessionCommand::UpdateLayout { renderer } => {
                debug!(
                    "Layout update for {} ({} glyphs)",
                    renderer.id,
                    renderer.glyphs.len()
                );
                self.orchestrator.update_layout(renderer);
            }
            SessionCommand::AppendFeatures { columns, reply } => {
                let result = self.orchestrator.append_features(columns).map(|generation| {
                    let info = generation.info();
                    self.generation_tx.send_replace(generation);
                    self.emit(SessionEvent::GenerationUpdate(info.clone()));
                    info
                });
                let _ = reply.send(result);
            }
            SessionCommand::Statistics { kind, reply } => {
                let _ = reply.send(self.orchestrator.statistics(kind));
            }
            SessionCommand::SetMode { mode } => {
                info!("Traversal mode set to {}", mode);
                self.orchestrator.set_mode(mode);
            }
        }
    }

    fn interact(&mut self, interaction: Interaction) -> Result<Outcome, ToolError> {
        let outcome = self.orchestrator.submit(interaction)?;
        if let Outcome::Applied { changed } = &outcome {
            self.publish_selection();
            for kind in changed {
                self.persist_selection(*kind);
            }
        }
        Ok(outcome)
    }

    fn source_changed(&mut self, path: PathBuf) {
        let changed = match self.provider.as_mut() {
            Some(provider) => provider.mark_changed(&path),
            // Reloading: handed to the provider once it is back.
            None => {
                self.pending_changes.push(path.clone());
                true
            }
        };
        if !changed {
            return;
        }

        info!("Source changed: {}", path.display());
        if self.orchestrator.notify_change() {
            self.begin_reload();
        } else if !self.orchestrator.is_reloading() {
            self.publish_status(None);
        }
    }

    fn begin_reload(&mut self) {
        match self.orchestrator.begin_reload() {
            Ok(()) => self.start_reload(false),
            Err(e) => warn!("Reload not started: {}", e),
        }
    }

    /// Hands the provider to a blocking worker. With `force`, every
    /// source is read again instead of only the changed ones.
    fn start_reload(&mut self, force: bool) {
        let mut provider = match self.provider.take() {
            Some(provider) => provider,
            None => {
                warn!("Provider is busy, reload not started");
                return;
            }
        };

        if force {
            provider.mark_all_dirty();
        }

        self.publish_status(None);
        let loaded = self.loaded_tx.clone();
        tokio::task::spawn_blocking(move || {
            let result = provider.load();
            let _ = loaded.blocking_send((provider, result));
        });
    }

    fn finish_reload(
        &mut self,
        mut provider: Box<dyn DataProvider>,
        result: Result<Dataset, ProviderError>,
    ) {
        for path in self.pending_changes.drain(..) {
            provider.mark_changed(&path);
        }
        let edge_columns = provider.edge_columns();
        self.provider = Some(provider);

        match self.orchestrator.complete_reload(result, &edge_columns) {
            Ok(report) => {
                let generation = self.orchestrator.generation().clone();
                self.generation_tx.send_replace(generation.clone());
                self.emit(SessionEvent::GenerationUpdate(generation.info()));

                if !self.initial_selection_applied {
                    self.initial_selection_applied = true;
                    self.apply_initial_selection();
                }

                // Remapping may have dropped ids; views and the provider
                // get the surviving selection either way.
                self.publish_selection();
                self.persist_selection(SelectionKind::Vertex);
                self.persist_selection(SelectionKind::Edge);

                self.publish_status(Some(report));
            }
            Err(e) => {
                error!("Reload failed: {}", e);
                self.publish_status(None);
            }
        }

        if let Some(interaction) = self.orchestrator.take_pending() {
            debug!("Replaying queued interaction");
            if let Err(e) = self.interact(interaction) {
                warn!("Queued interaction rejected: {}", e);
            }
        }

        if self.orchestrator.should_reload() {
            self.begin_reload();
        }
    }

    fn apply_initial_selection(&mut self) {
        let ids = match self.provider.as_ref().map(|p| p.initial_vertex_selection()) {
            Some(Ok(Some(ids))) => ids,
            Some(Ok(None)) | None => return,
            Some(Err(e)) => {
                warn!("Initial selection not loaded: {}", e);
                return;
            }
        };

        info!("Applying initial selection of {} vertices", ids.len());
        let interaction = Interaction::SetSelection {
            selection: SelectionKind::Vertex,
            ids,
        };
        if let Err(e) = self.orchestrator.submit(interaction) {
            warn!("Initial selection rejected: {}", e);
        }
    }

    fn persist_selection(&mut self, kind: SelectionKind) {
        let ids = self.orchestrator.selection().get_selected(kind);
        let provider = match self.provider.as_mut() {
            Some(provider) => provider,
            None => return,
        };

        let written = match kind {
            SelectionKind::Vertex => provider.write_vertex_selection(&ids),
            SelectionKind::Edge => provider.write_edge_selection(&ids),
        };
        if let Err(e) = written {
            warn!("Failed to write {} selection: {}", kind, e);
        }
    }

    fn publish_selection(&self) {
        let selection = self.orchestrator.selection();
        self.emit(SessionEvent::SelectionUpdate(SelectionPayload {
            generation: self.orchestrator.generation().id,
            vertices: selection.get_selected(SelectionKind::Vertex),
            edges: selection.get_selected(SelectionKind::Edge),
            timestamp: Utc::now(),
        }));
    }

    fn publish_status(&self, report: Option<ReloadReport>) {
        self.emit(SessionEvent::ReloadStatus(ReloadStatusPayload {
            state: self.orchestrator.state().clone(),
            generation: self.orchestrator.generation().id,
            report,
            timestamp: Utc::now(),
        }));
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn info(&self) -> SessionInfo {
        let selection = self.orchestrator.selection();
        SessionInfo {
            provider: self.provider_name.clone(),
            reload: self.orchestrator.state().clone(),
            automatic_reload: self.orchestrator.automatic_reload(),
            mode: self.orchestrator.tool().mode,
            generation: self.orchestrator.generation().info(),
            selected_vertices: selection.len(SelectionKind::Vertex),
            selected_edges: selection.len(SelectionKind::Edge),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
