//! JSON-RPC 2.0 message types and method parameters.

use crate::selection::SelectionKind;
use coda_graph::{TraversalMode, VertexId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

/// A root or id outside the current generation.
pub const OUT_OF_RANGE: i32 = -32001;
/// Reload could not start or derived columns were rejected.
pub const RELOAD_FAILED: i32 = -32002;
/// The session task has stopped.
pub const SESSION_CLOSED: i32 = -32003;

#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub jsonrpc: &'static str,
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

impl Response {
    pub fn success<T: Serialize>(id: Option<Value>, result: T) -> Self {
        match serde_json::to_value(result) {
            Ok(value) => Self {
                jsonrpc: "2.0",
                id,
                result: Some(value),
                error: None,
            },
            Err(e) => Self::error(id, INTERNAL_ERROR, e.to_string()),
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }

    pub fn parse_error() -> Self {
        Self::error(None, PARSE_ERROR, "Parse error")
    }

    pub fn invalid_request(id: Option<Value>, message: impl Into<String>) -> Self {
        Self::error(id, INVALID_REQUEST, message)
    }

    pub fn invalid_params(id: Option<Value>, message: impl Into<String>) -> Self {
        Self::error(id, INVALID_PARAMS, message)
    }

    pub fn method_not_found(id: Option<Value>, method: &str) -> Self {
        Self::error(id, METHOD_NOT_FOUND, format!("Method not found: {}", method))
    }
}

fn vertex_kind() -> SelectionKind {
    SelectionKind::Vertex
}

/// Parameters of `selection.get` and `statistics`.
#[derive(Debug, Clone, Deserialize)]
pub struct KindParams {
    #[serde(default = "vertex_kind")]
    pub kind: SelectionKind,
}

/// Parameters of `selection.set`.
#[derive(Debug, Clone, Deserialize)]
pub struct SelectionSetParams {
    #[serde(default = "vertex_kind")]
    pub kind: SelectionKind,
    pub ids: Vec<usize>,
}

/// Parameters of `subgraph.select`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubgraphSelectParams {
    pub roots: Vec<VertexId>,
    #[serde(default)]
    pub mode: Option<TraversalMode>,
}

/// Parameters of `tap`.
#[derive(Debug, Clone, Deserialize)]
pub struct TapParams {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub mode: Option<TraversalMode>,
}

/// One derived column of `features.append`, one value per vertex.
#[derive(Debug, Clone, Deserialize)]
pub struct DerivedColumn {
    pub name: String,
    pub values: Vec<f64>,
}

/// Parameters of `features.append`.
#[derive(Debug, Clone, Deserialize)]
pub struct FeaturesAppendParams {
    pub columns: Vec<DerivedColumn>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request: Request =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"method":"session.info"}"#).unwrap();
        assert_eq!(request.method, "session.info");
        assert!(request.params.is_null());

        let params: KindParams = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(params.kind, SelectionKind::Vertex);
    }

    #[test]
    fn test_error_response_shape() {
        let response = Response::method_not_found(Some(Value::from(7)), "impact");
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["id"], 7);
        assert_eq!(json["error"]["code"], METHOD_NOT_FOUND);
        assert!(json.get("result").is_none());
    }

    #[test]
    fn test_select_params() {
        let params: SubgraphSelectParams =
            serde_json::from_value(serde_json::json!({"roots": [0, 4], "mode": "ancestors"}))
                .unwrap();
        assert_eq!(params.roots, vec![0, 4]);
        assert_eq!(params.mode, Some(TraversalMode::Ancestors));
    }
}
