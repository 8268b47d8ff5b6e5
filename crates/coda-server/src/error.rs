use crate::orchestrator::ReloadState;
use coda_core::DataError;
use coda_graph::GraphError;
use coda_watcher::ProviderError;
use thiserror::Error;

/// Errors of a single interaction. The session keeps running.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    /// A root or selected id is not part of the current generation.
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("{kind} id {id} is out of range ({count} available)")]
    InvalidSelection {
        kind: &'static str,
        id: usize,
        count: usize,
    },
}

/// Errors of the reload protocol.
#[derive(Error, Debug)]
pub enum ReloadError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error("A reload is already in progress")]
    AlreadyReloading,

    /// A transition was requested that the current state does not allow.
    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: ReloadState,
    },
}

/// Errors returned by [`SessionHandle`](crate::SessionHandle) calls.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Reload(#[from] ReloadError),

    /// The session task has stopped.
    #[error("Session is closed")]
    Closed,
}
