//! MCP JSON-RPC protocol types

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use serde_json::value::RawValue;

/// Protocol revision this client implements.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC version marker.
pub const JSONRPC_VERSION: &str = "2.0";

/// Request id used for `initialize`.
pub const INITIALIZE_ID: u64 = 1;

/// Request id used for `tools/list`.
pub const LIST_TOOLS_ID: u64 = 2;

/// Request id used for `tools/call`.
pub const CALL_TOOL_ID: u64 = 3;

/// JSON-RPC request
#[derive(Debug, Clone, Serialize)]
pub struct McpRequest {
    pub jsonrpc: &'static str,
    pub method: String,
    pub params: Value,
    pub id: u64,
}

impl McpRequest {
    /// Create a new request
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: method.into(),
            params,
            id,
        }
    }

    /// Create an initialize request
    #[must_use]
    pub fn initialize(client_name: &str, client_version: &str) -> Self {
        Self::new(
            INITIALIZE_ID,
            "initialize",
            serde_json::json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {
                    "name": client_name,
                    "version": client_version
                }
            }),
        )
    }

    /// Create a tools/list request
    #[must_use]
    pub fn list_tools() -> Self {
        Self::new(LIST_TOOLS_ID, "tools/list", serde_json::json!({}))
    }

    /// Create a tools/call request
    ///
    /// `arguments` is omitted from the params when `None`.
    #[must_use]
    pub fn call_tool(name: &str, arguments: Option<Value>) -> Self {
        let mut params = serde_json::Map::new();
        params.insert("name".to_string(), Value::String(name.to_string()));
        if let Some(arguments) = arguments {
            params.insert("arguments".to_string(), arguments);
        }
        Self::new(CALL_TOOL_ID, "tools/call", Value::Object(params))
    }
}

/// JSON-RPC response
///
/// Exactly one of a result or an error is present. Wire objects carrying
/// both, or neither, fail to deserialize.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawResponse")]
pub struct McpResponse {
    pub jsonrpc: String,
    pub id: Option<u64>,
    pub outcome: Outcome,
}

/// Payload of a [`McpResponse`].
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The `result` member, byte-for-byte as received.
    Success(Box<RawValue>),
    /// The `error` member, parsed and byte-for-byte as received.
    Failure { error: McpError, raw: Box<RawValue> },
}

impl McpResponse {
    /// Check if the response is successful
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }

    /// Get the result or error
    pub fn into_result(self) -> Result<Box<RawValue>, McpError> {
        match self.outcome {
            Outcome::Success(result) => Ok(result),
            Outcome::Failure { error, .. } => Err(error),
        }
    }

    /// The raw `result` or `error` member, whichever is present.
    #[must_use]
    pub fn into_raw(self) -> Box<RawValue> {
        match self.outcome {
            Outcome::Success(raw) | Outcome::Failure { raw, .. } => raw,
        }
    }
}

#[derive(Deserialize)]
struct RawResponse {
    jsonrpc: String,
    #[serde(default)]
    id: Option<u64>,
    #[serde(default, deserialize_with = "present")]
    result: Option<Box<RawValue>>,
    #[serde(default, deserialize_with = "present")]
    error: Option<Box<RawValue>>,
}

/// Maps a member that is present on the wire to `Some`, including `null`.
fn present<'de, D>(deserializer: D) -> Result<Option<Box<RawValue>>, D::Error>
where
    D: Deserializer<'de>,
{
    Box::<RawValue>::deserialize(deserializer).map(Some)
}

impl TryFrom<RawResponse> for McpResponse {
    type Error = String;

    fn try_from(raw: RawResponse) -> Result<Self, Self::Error> {
        if raw.jsonrpc != JSONRPC_VERSION {
            return Err(format!("unsupported jsonrpc version {:?}", raw.jsonrpc));
        }

        let outcome = match (raw.result, raw.error) {
            (Some(result), None) => Outcome::Success(result),
            (None, Some(raw_error)) => {
                let error = serde_json::from_str(raw_error.get())
                    .map_err(|e| format!("malformed error object: {e}"))?;
                Outcome::Failure {
                    error,
                    raw: raw_error,
                }
            }
            (Some(_), Some(_)) => return Err("response has both result and error".to_string()),
            (None, None) => return Err("response has neither result nor error".to_string()),
        };

        Ok(Self {
            jsonrpc: raw.jsonrpc,
            id: raw.id,
            outcome,
        })
    }
}

/// JSON-RPC error
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct McpError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl std::fmt::Display for McpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MCP error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for McpError {}

/// MCP tool definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpTool {
    /// Tool name
    pub name: String,
    /// Tool description
    #[serde(default)]
    pub description: String,
    /// JSON Schema for input parameters
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub input_schema: Value,
}

/// tools/list result
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListToolsResult {
    pub tools: Vec<McpTool>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// Initialize result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub server_info: ServerInfo,
}

/// Remote server identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}
