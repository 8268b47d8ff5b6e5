//! WebSocket server.
//!
//! Every client gets the current state on connect, can send JSON-RPC
//! requests, and receives every [`SessionEvent`] as it is broadcast.

use crate::handlers::{
    handle_features_append, handle_info, handle_layout_update, handle_reload,
    handle_selection_get, handle_selection_set, handle_statistics, handle_subgraph_select,
    handle_tap,
};
use crate::protocol::{Request, Response};
use crate::selection::SelectionKind;
use crate::session::{ReloadStatusPayload, SelectionPayload, SessionEvent, SessionHandle};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Port the server binds to unless configured otherwise.
pub const DEFAULT_PORT: u16 = 5006;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
        }
    }
}

/// The CoDA WebSocket server.
pub struct CodaServer {
    config: ServerConfig,
    session: SessionHandle,
}

impl CodaServer {
    pub fn new(session: SessionHandle, config: ServerConfig) -> Self {
        Self { config, session }
    }

    /// Runs the server, accepting connections until the listener fails.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let listener = TcpListener::bind(&self.config.addr).await?;
        info!("CoDA server listening on ws://{}", self.config.addr);

        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    let client = Uuid::new_v4();
                    debug!("New connection from {} (client {})", addr, client);

                    let session = self.session.clone();
                    let events = session.subscribe();
                    tokio::spawn(async move {
                        if let Err(e) = handle_client(stream, addr, client, session, events).await {
                            warn!("Connection error from client {}: {}", client, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Handles a single WebSocket client connection.
async fn handle_client(
    stream: TcpStream,
    addr: SocketAddr,
    client: Uuid,
    session: SessionHandle,
    mut events: broadcast::Receiver<SessionEvent>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws_stream = accept_async(stream).await?;
    let (mut write, mut read) = ws_stream.split();
    info!("Client {} connected from {}", client, addr);

    for event in snapshot(&session).await? {
        write.send(Message::Text(serde_json::to_string(&event)?)).await?;
    }
    debug!("Sent initial snapshot to client {}", client);

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let response = process_message(&text, &session).await;
                        write.send(Message::Text(serde_json::to_string(&response)?)).await?;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        write.send(Message::Pong(data)).await?;
                    }
                    Some(Ok(Message::Close(_))) => {
                        debug!("Client {} disconnected", client);
                        break;
                    }
                    Some(Err(e)) => {
                        warn!("Message error from client {}: {}", client, e);
                        break;
                    }
                    None => break,
                    _ => {}
                }
            }

            event = events.recv() => {
                match event {
                    Ok(event) => {
                        let json = serde_json::to_string(&event)?;
                        if write.send(Message::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Client {} lagged by {} events", client, n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    info!("Connection closed: client {}", client);
    Ok(())
}

/// The events a new client needs to catch up with the session.
async fn snapshot(session: &SessionHandle) -> Result<Vec<SessionEvent>, crate::SessionError> {
    let info = session.info().await?;
    let vertices = session.get_selection(SelectionKind::Vertex).await?;
    let edges = session.get_selection(SelectionKind::Edge).await?;
    let now = Utc::now();

    Ok(vec![
        SessionEvent::GenerationUpdate(info.generation.clone()),
        SessionEvent::SelectionUpdate(SelectionPayload {
            generation: info.generation.id,
            vertices,
            edges,
            timestamp: now,
        }),
        SessionEvent::ReloadStatus(ReloadStatusPayload {
            state: info.reload,
            generation: info.generation.id,
            report: None,
            timestamp: now,
        }),
    ])
}

fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T, String> {
    // Methods without parameters may omit them entirely.
    let params = if params.is_null() {
        Value::Object(Default::default())
    } else {
        params
    };
    serde_json::from_value(params).map_err(|e| e.to_string())
}

/// Processes a JSON-RPC message and returns a response.
pub async fn process_message(text: &str, session: &SessionHandle) -> Response {
    let request: Request = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(_) => return Response::parse_error(),
    };

    let id = request.id.clone();
    if !request.jsonrpc.is_empty() && request.jsonrpc != "2.0" {
        return Response::invalid_request(id, format!("Unsupported version {}", request.jsonrpc));
    }

    let method = request.method.as_str();
    debug!("Processing method: {}", method);

    match method {
        "session.info" => handle_info(session, id).await,

        "selection.get" => match parse_params(request.params) {
            Ok(params) => handle_selection_get(session, id, params).await,
            Err(e) => Response::invalid_params(id, e),
        },

        "selection.set" => match parse_params(request.params) {
            Ok(params) => handle_selection_set(session, id, params).await,
            Err(e) => Response::invalid_params(id, e),
        },

        "subgraph.select" => match parse_params(request.params) {
            Ok(params) => handle_subgraph_select(session, id, params).await,
            Err(e) => Response::invalid_params(id, e),
        },

        "tap" => match parse_params(request.params) {
            Ok(params) => handle_tap(session, id, params).await,
            Err(e) => Response::invalid_params(id, e),
        },

        "layout.update" => match parse_params(request.params) {
            Ok(renderer) => handle_layout_update(session, id, renderer).await,
            Err(e) => Response::invalid_params(id, e),
        },

        "reload" => handle_reload(session, id).await,

        "features.append" => match parse_params(request.params) {
            Ok(params) => handle_features_append(session, id, params).await,
            Err(e) => Response::invalid_params(id, e),
        },

        "statistics" => match parse_params(request.params) {
            Ok(params) => handle_statistics(session, id, params).await,
            Err(e) => Response::invalid_params(id, e),
        },

        _ => Response::method_not_found(id, method),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::OrchestratorConfig;
    use crate::session::Session;
    use coda_watcher::RandomProvider;
    use std::time::Duration;

    async fn session() -> SessionHandle {
        let provider = RandomProvider::new(Some(11)).with_samples(10);
        let (handle, _task) = Session::spawn(Box::new(provider), OrchestratorConfig::default());
        let mut generation = handle.watch_generation();
        tokio::time::timeout(Duration::from_secs(5), generation.wait_for(|g| g.id == 1))
            .await
            .unwrap()
            .unwrap();
        handle
    }

    async fn call(session: &SessionHandle, request: Value) -> Value {
        let response = process_message(&request.to_string(), session).await;
        serde_json::to_value(response).unwrap()
    }

    #[tokio::test]
    async fn test_session_info() {
        let session = session().await;
        let response = call(
            &session,
            serde_json::json!({"jsonrpc": "2.0", "id": 1, "method": "session.info"}),
        )
        .await;

        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["provider"], "random");
        assert_eq!(response["result"]["generation"]["vertex_count"], 10);
        assert_eq!(response["result"]["reload"]["state"], "idle");
    }

    #[tokio::test]
    async fn test_subgraph_select_and_get() {
        let session = session().await;

        // Vertex 0 is the root of the random tree, so it reaches everything.
        let response = call(
            &session,
            serde_json::json!({
                "jsonrpc": "2.0", "id": 2, "method": "subgraph.select",
                "params": {"roots": [0]}
            }),
        )
        .await;
        assert_eq!(response["result"]["outcome"]["status"], "applied");

        let response = call(
            &session,
            serde_json::json!({"jsonrpc": "2.0", "id": 3, "method": "selection.get"}),
        )
        .await;
        assert_eq!(
            response["result"]["ids"],
            serde_json::json!([0, 1, 2, 3, 4, 5, 6, 7, 8, 9])
        );
    }

    #[tokio::test]
    async fn test_errors() {
        let session = session().await;

        let response = process_message("not json", &session).await;
        assert_eq!(response.error.unwrap().code, crate::protocol::PARSE_ERROR);

        let response = call(
            &session,
            serde_json::json!({"jsonrpc": "2.0", "id": 4, "method": "impact"}),
        )
        .await;
        assert_eq!(response["error"]["code"], crate::protocol::METHOD_NOT_FOUND);

        let response = call(
            &session,
            serde_json::json!({
                "jsonrpc": "2.0", "id": 5, "method": "subgraph.select",
                "params": {"roots": [99]}
            }),
        )
        .await;
        assert_eq!(response["error"]["code"], crate::protocol::OUT_OF_RANGE);

        let response = call(
            &session,
            serde_json::json!({
                "jsonrpc": "2.0", "id": 6, "method": "selection.set",
                "params": {"ids": "all"}
            }),
        )
        .await;
        assert_eq!(response["error"]["code"], crate::protocol::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_features_and_statistics() {
        let session = session().await;
        let values: Vec<f64> = (0..10).map(|v| v as f64).collect();

        let response = call(
            &session,
            serde_json::json!({
                "jsonrpc": "2.0", "id": 7, "method": "features.append",
                "params": {"columns": [{"name": "pca:0", "values": values}]}
            }),
        )
        .await;
        assert_eq!(response["result"]["derived"], serde_json::json!(["pca:0"]));

        let response = call(
            &session,
            serde_json::json!({
                "jsonrpc": "2.0", "id": 8, "method": "statistics",
                "params": {"kind": "vertex"}
            }),
        )
        .await;
        let summaries = response["result"].as_array().unwrap();
        let pca = summaries.iter().find(|s| s["column"] == "pca:0").unwrap();
        assert_eq!(pca["count"], 10);
        assert_eq!(pca["50%"], 4.5);
    }

    #[test]
    fn test_default_config() {
        assert_eq!(ServerConfig::default().addr.port(), DEFAULT_PORT);
    }
}
