//! Registered servers, persisted as JSON.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::expand::expand_headers;
use crate::mcp::{self, Endpoint, InitializeResult, McpTool, ServerInfo};

/// One registered server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerEntry {
    /// Server URL.
    pub url: String,

    /// Static headers as entered, before `${VAR}` expansion.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    /// Protocol version negotiated at the last refresh.
    pub protocol_version: String,

    /// Server identity reported at the last refresh.
    pub server_info: ServerInfo,

    /// Tools reported at the last refresh, in server order.
    #[serde(default)]
    pub tools: Vec<McpTool>,

    /// Time of the last refresh.
    pub updated_at: DateTime<Utc>,
}

impl ServerEntry {
    /// Build an entry from a fresh handshake and tool list.
    #[must_use]
    pub fn new(
        url: impl Into<String>,
        headers: BTreeMap<String, String>,
        handshake: InitializeResult,
        tools: Vec<McpTool>,
    ) -> Self {
        Self {
            url: url.into(),
            headers,
            protocol_version: handshake.protocol_version,
            server_info: handshake.server_info,
            tools,
            updated_at: Utc::now(),
        }
    }

    /// Replace the server-reported fields, keeping URL and headers.
    pub fn refresh(&mut self, handshake: InitializeResult, tools: Vec<McpTool>) {
        self.protocol_version = handshake.protocol_version;
        self.server_info = handshake.server_info;
        self.tools = tools;
        self.updated_at = Utc::now();
    }

    /// Endpoint with headers expanded from the current environment.
    pub fn endpoint(&self) -> mcp::Result<Endpoint> {
        Endpoint::new(&self.url, expand_headers(&self.headers))
    }

    /// Look up a tool by name.
    #[must_use]
    pub fn tool(&self, name: &str) -> Option<&McpTool> {
        self.tools.iter().find(|t| t.name == name)
    }
}

/// All registered servers, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerRegistry {
    #[serde(default)]
    servers: BTreeMap<String, ServerEntry>,
}

impl ServerRegistry {
    /// Load from the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&super::Config::servers_path()?)
    }

    /// Load from `path`. A missing file is an empty registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Save to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&super::Config::servers_path()?)
    }

    /// Save to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    /// Get a server by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ServerEntry> {
        self.servers.get(name)
    }

    /// Get a server by name for modification.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut ServerEntry> {
        self.servers.get_mut(name)
    }

    /// Check whether a server is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.servers.contains_key(name)
    }

    /// Add or replace a server.
    pub fn insert(&mut self, name: impl Into<String>, entry: ServerEntry) {
        self.servers.insert(name.into(), entry);
    }

    /// Remove a server, returning its entry.
    pub fn remove(&mut self, name: &str) -> Option<ServerEntry> {
        self.servers.remove(name)
    }

    /// Servers in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ServerEntry)> {
        self.servers.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    /// Number of registered servers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    /// Check if no servers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry() -> ServerEntry {
        ServerEntry::new(
            "https://mcp.example.com/mcp/",
            BTreeMap::from([("x-user".to_string(), "${MCPLI_TEST_USER}".to_string())]),
            InitializeResult {
                protocol_version: "2024-11-05".to_string(),
                server_info: ServerInfo {
                    name: "acme".to_string(),
                    version: "1.0".to_string(),
                },
            },
            vec![McpTool {
                name: "search".to_string(),
                description: "Search the catalogue".to_string(),
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": { "q": { "type": "string", "default": null } }
                }),
            }],
        )
    }

    #[test]
    fn missing_file_is_empty_registry() {
        let temp_dir = TempDir::new().unwrap();
        let registry = ServerRegistry::load_from(&temp_dir.path().join("servers.json")).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn save_and_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("servers.json");

        let mut registry = ServerRegistry::default();
        registry.insert("acme", entry());
        registry.save_to(&path).unwrap();

        let loaded = ServerRegistry::load_from(&path).unwrap();
        assert_eq!(loaded, registry);

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let stored = &raw["servers"]["acme"];
        assert_eq!(stored["headers"]["x-user"], "${MCPLI_TEST_USER}");
        assert_eq!(stored["server_info"]["name"], "acme");
        assert_eq!(stored["tools"][0]["inputSchema"]["type"], "object");
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("servers.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(ServerRegistry::load_from(&path).is_err());
    }

    #[test]
    fn iterates_in_name_order() {
        let mut registry = ServerRegistry::default();
        registry.insert("zeta", entry());
        registry.insert("alpha", entry());
        let names: Vec<_> = registry.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["alpha", "zeta"]);
    }

    #[test]
    fn refresh_keeps_url_and_headers() {
        let mut server = entry();
        let before = server.updated_at;
        server.refresh(
            InitializeResult {
                protocol_version: "2025-03-26".to_string(),
                server_info: ServerInfo {
                    name: "acme".to_string(),
                    version: "2.0".to_string(),
                },
            },
            Vec::new(),
        );
        assert_eq!(server.url, "https://mcp.example.com/mcp/");
        assert!(server.headers.contains_key("x-user"));
        assert_eq!(server.server_info.version, "2.0");
        assert!(server.tools.is_empty());
        assert!(server.updated_at >= before);
    }

    #[test]
    fn endpoint_leaves_unset_placeholders() {
        let server = entry();
        let endpoint = server.endpoint().unwrap();
        assert_eq!(endpoint.url().as_str(), "https://mcp.example.com/mcp/");
        assert_eq!(
            endpoint.headers().get("x-user").unwrap(),
            "${MCPLI_TEST_USER}"
        );
    }

    #[test]
    fn finds_tools_by_name() {
        let server = entry();
        assert!(server.tool("search").is_some());
        assert!(server.tool("missing").is_none());
    }
}
