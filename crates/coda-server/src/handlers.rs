//! Request handlers for protocol methods.
//!
//! Each handler implements one JSON-RPC method on top of a
//! [`SessionHandle`].

use crate::error::{ReloadError, SessionError};
use crate::protocol::{
    FeaturesAppendParams, KindParams, Response, SelectionSetParams, SubgraphSelectParams,
    TapParams, OUT_OF_RANGE, RELOAD_FAILED, SESSION_CLOSED,
};
use crate::session::SessionHandle;
use crate::tool::{Point, Renderer};
use coda_core::Column;
use serde_json::Value;
use std::time::Instant;
use tracing::debug;

fn error_response(id: Option<Value>, error: SessionError) -> Response {
    let code = match &error {
        SessionError::Tool(_) => OUT_OF_RANGE,
        SessionError::Reload(_) => RELOAD_FAILED,
        SessionError::Closed => SESSION_CLOSED,
    };
    Response::error(id, code, error.to_string())
}

/// Handles the session.info method.
pub async fn handle_info(session: &SessionHandle, id: Option<Value>) -> Response {
    match session.info().await {
        Ok(info) => Response::success(id, info),
        Err(e) => error_response(id, e),
    }
}

/// Handles the selection.get method.
pub async fn handle_selection_get(
    session: &SessionHandle,
    id: Option<Value>,
    params: KindParams,
) -> Response {
    match session.get_selection(params.kind).await {
        Ok(ids) => Response::success(
            id,
            serde_json::json!({
                "kind": params.kind,
                "ids": ids,
                "generation": session.generation().id
            }),
        ),
        Err(e) => error_response(id, e),
    }
}

/// Handles the selection.set method.
pub async fn handle_selection_set(
    session: &SessionHandle,
    id: Option<Value>,
    params: SelectionSetParams,
) -> Response {
    debug!("Set {} selection: {} ids", params.kind, params.ids.len());

    match session.set_selection(params.kind, params.ids).await {
        Ok(outcome) => Response::success(id, outcome),
        Err(e) => error_response(id, e),
    }
}

/// Handles the subgraph.select method.
pub async fn handle_subgraph_select(
    session: &SessionHandle,
    id: Option<Value>,
    params: SubgraphSelectParams,
) -> Response {
    let start = Instant::now();
    debug!("Subgraph selection from roots {:?}", params.roots);

    match session.select_roots(params.roots, params.mode).await {
        Ok(outcome) => Response::success(
            id,
            serde_json::json!({
                "outcome": outcome,
                "queryTime": start.elapsed().as_millis()
            }),
        ),
        Err(e) => error_response(id, e),
    }
}

/// Handles the tap method.
pub async fn handle_tap(session: &SessionHandle, id: Option<Value>, params: TapParams) -> Response {
    let start = Instant::now();

    match session.tap(Point::new(params.x, params.y), params.mode).await {
        Ok(outcome) => Response::success(
            id,
            serde_json::json!({
                "outcome": outcome,
                "queryTime": start.elapsed().as_millis()
            }),
        ),
        Err(e) => error_response(id, e),
    }
}

/// Handles the layout.update method.
pub async fn handle_layout_update(
    session: &SessionHandle,
    id: Option<Value>,
    renderer: Renderer,
) -> Response {
    let glyphs = renderer.glyphs.len();
    match session.update_layout(renderer).await {
        Ok(()) => Response::success(id, serde_json::json!({ "glyphs": glyphs })),
        Err(e) => error_response(id, e),
    }
}

/// Handles the reload method.
pub async fn handle_reload(session: &SessionHandle, id: Option<Value>) -> Response {
    match session.reload().await {
        Ok(()) => Response::success(id, serde_json::json!({ "started": true })),
        Err(SessionError::Reload(ReloadError::AlreadyReloading)) => {
            Response::success(id, serde_json::json!({ "started": false }))
        }
        Err(e) => error_response(id, e),
    }
}

/// Handles the features.append method.
pub async fn handle_features_append(
    session: &SessionHandle,
    id: Option<Value>,
    params: FeaturesAppendParams,
) -> Response {
    let columns = params
        .columns
        .into_iter()
        .map(|c| (c.name, Column::Numeric(c.values)))
        .collect();

    match session.append_features(columns).await {
        Ok(info) => Response::success(id, info),
        Err(e) => error_response(id, e),
    }
}

/// Handles the statistics method.
pub async fn handle_statistics(
    session: &SessionHandle,
    id: Option<Value>,
    params: KindParams,
) -> Response {
    match session.statistics(params.kind).await {
        Ok(summaries) => Response::success(id, summaries),
        Err(e) => error_response(id, e),
    }
}
