//! `add`, `update`, `remove` and `list`.

use std::collections::BTreeMap;

use anyhow::Context as _;

use super::Session;
use crate::config::{ServerEntry, expand_headers};
use crate::mcp::{ClientOptions, Endpoint, InitializeResult, McpClient, McpTool};
use crate::terminal;

/// Parse `key: value` header arguments.
///
/// # Errors
///
/// Returns an error for an argument without `:` or with an empty key.
pub fn parse_headers(raw: &[String]) -> anyhow::Result<BTreeMap<String, String>> {
    raw.iter()
        .map(|header| {
            let (key, value) = header
                .split_once(':')
                .with_context(|| format!("invalid header format: {header:?} (expected 'key: value')"))?;
            let key = key.trim();
            if key.is_empty() {
                anyhow::bail!("invalid header format: {header:?} (empty key)");
            }
            Ok((key.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Check that `name` can be used as a subcommand.
///
/// # Errors
///
/// Returns an error for empty names, names with whitespace or a leading `-`,
/// and names taken by built-in commands.
pub fn validate_server_name(name: &str) -> anyhow::Result<()> {
    if name.is_empty() || name.starts_with('-') || name.chars().any(char::is_whitespace) {
        anyhow::bail!("invalid server name: {name:?}");
    }
    if super::is_reserved(name) {
        anyhow::bail!("server name {name:?} is reserved for a built-in command");
    }
    Ok(())
}

/// Handshake and enumerate tools, reporting progress.
async fn fetch(
    endpoint: Endpoint,
    options: ClientOptions,
) -> anyhow::Result<(InitializeResult, Vec<McpTool>)> {
    println!("Connecting to {}...", endpoint.url());
    let client = McpClient::new(endpoint, options)?;

    let handshake = client
        .initialize(None)
        .await
        .context("failed to initialize")?;
    println!(
        "Connected to {} v{}",
        handshake.server_info.name, handshake.server_info.version
    );

    println!("Fetching tools...");
    let tools = client
        .list_tools(None)
        .await
        .context("failed to list tools")?;
    println!("Found {} tools", tools.len());

    Ok((handshake, tools))
}

pub(super) async fn add(
    session: &mut Session,
    name: &str,
    url: &str,
    headers: &[String],
) -> anyhow::Result<()> {
    validate_server_name(name)?;
    if session.registry.contains(name) {
        anyhow::bail!("server {name:?} already exists (use 'mcpli update {name}' to refresh)");
    }

    let headers = parse_headers(headers)?;
    let endpoint = Endpoint::new(url, expand_headers(&headers))?;
    let (handshake, tools) = fetch(endpoint, session.options).await?;

    tracing::info!(server = %name, tools = tools.len(), "registering server");
    session
        .registry
        .insert(name, ServerEntry::new(url, headers, handshake, tools));
    session.save().context("failed to save config")?;

    println!("Server {name:?} added successfully");
    Ok(())
}

pub(super) async fn update(session: &mut Session, name: &str) -> anyhow::Result<()> {
    let entry = session
        .registry
        .get(name)
        .with_context(|| format!("server {name:?} not found"))?;
    let (handshake, tools) = fetch(entry.endpoint()?, session.options).await?;

    if let Some(entry) = session.registry.get_mut(name) {
        entry.refresh(handshake, tools);
    }
    session.save().context("failed to save config")?;

    println!("Server {name:?} updated successfully");
    Ok(())
}

pub(super) fn remove(session: &mut Session, name: &str) -> anyhow::Result<()> {
    if session.registry.remove(name).is_none() {
        anyhow::bail!("server {name:?} not found");
    }
    session.save().context("failed to save config")?;

    println!("Server {name:?} removed");
    Ok(())
}

pub(super) fn list(session: &Session, server: Option<&str>) -> anyhow::Result<()> {
    let Some(name) = server else {
        if session.registry.is_empty() {
            println!("No servers configured. Use 'mcpli add' to add one.");
            return Ok(());
        }
        for (name, entry) in session.registry.iter() {
            println!("{name} - {} ({} tools)", entry.url, entry.tools.len());
        }
        return Ok(());
    };

    let entry = session
        .registry
        .get(name)
        .with_context(|| format!("server {name:?} not found"))?;

    if entry.tools.is_empty() {
        println!("No tools available");
        return Ok(());
    }

    print!("{}", super::server_help(name, entry, terminal::width()));
    Ok(())
}
