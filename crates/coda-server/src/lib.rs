//! CoDA Server - Session runtime and WebSocket server
//!
//! This crate hosts a coral colony analysis session: it loads data
//! through a [`coda_watcher::DataProvider`], keeps the current generation
//! of tables and ancestry graph, and serves selections to clients.
//!
//! The server supports:
//! - Multiple concurrent connections
//! - JSON-RPC 2.0 messages
//! - Selection and reload updates pushed to every client
//! - Debounced reloads when source files change
//!
//! All state changes go through a single session task, see [`Session`].

mod error;
mod generation;
mod handlers;
mod orchestrator;
mod protocol;
mod selection;
mod server;
mod session;
mod tool;

pub use error::{ReloadError, SessionError, ToolError};
pub use generation::{Generation, GenerationInfo};
pub use orchestrator::{
    Interaction, Orchestrator, OrchestratorConfig, Outcome, ReloadReport, ReloadState,
};
pub use protocol::{Request, Response, RpcError};
pub use selection::{RemapSummary, SelectionKind, SelectionState};
pub use server::{process_message, CodaServer, ServerConfig, DEFAULT_PORT};
pub use session::{
    watch_sources, ReloadStatusPayload, SelectionPayload, Session, SessionEvent, SessionHandle,
    SessionInfo,
};
pub use tool::{
    Glyph, HitTest, PlotSurface, Point, Renderer, SubgraphTool, DEFAULT_HIT_RADIUS, EDGE_SOURCE,
    VERTEX_SOURCE,
};
