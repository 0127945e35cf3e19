//! mcpli - invoke tools on remote MCP servers from the command line.
//!
//! Servers are registered once (`mcpli add`), which performs the MCP
//! handshake and caches the server's tool list. Each cached tool then becomes
//! a subcommand: `mcpli <server> <tool> [json-arguments]`.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐
//! │     CLI     │──▶│   Config    │  servers.json / config.toml
//! └──────┬──────┘   └─────────────┘
//!        │
//! ┌──────┴──────┐   ┌─────────────┐   ┌─────────────┐
//! │ MCP client  │──▶│  Redirects  │──▶│  Envelope   │
//! └─────────────┘   └─────────────┘   └─────────────┘
//! ```

pub mod build_info;
pub mod cli;
pub mod config;
pub mod mcp;
pub mod terminal;

pub use config::{Config, ServerEntry, ServerRegistry};
pub use mcp::{ClientOptions, Endpoint, McpClient};
