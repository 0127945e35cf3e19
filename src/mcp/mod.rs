//! Model Context Protocol (MCP) client implementation
//!
//! Speaks JSON-RPC over HTTP to remote tool servers: handshake, tool
//! enumeration and tool invocation. Responses arrive as line-framed event
//! streams (see [`envelope`]); redirects are followed without losing the POST
//! body (see [`redirect`]).

mod client;
pub mod envelope;
mod error;
mod protocol;
pub mod redirect;

pub use client::{CLIENT_NAME, ClientOptions, DEFAULT_TIMEOUT, Endpoint, McpClient};
pub use error::{Error, FramingError, Result, TransportError};
pub use protocol::{
    CALL_TOOL_ID, INITIALIZE_ID, InitializeResult, LIST_TOOLS_ID, McpError, McpRequest,
    McpResponse, McpTool, Outcome, PROTOCOL_VERSION, ServerInfo,
};
pub use redirect::{DEFAULT_MAX_REDIRECTS, RedirectPolicy};
