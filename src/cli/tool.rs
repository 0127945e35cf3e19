//! Server and tool subcommands.

use std::collections::HashSet;
use std::fmt::Write as _;

use anyhow::Context as _;
use clap::{Arg, Command};

use super::Session;
use crate::config::ServerEntry;
use crate::mcp::{McpClient, McpTool};
use crate::terminal;

/// Argument id of a tool's JSON arguments.
pub(super) const ARGUMENTS: &str = "arguments";

const SHORT_DESCRIPTION_CHARS: usize = 60;
const DESCRIPTION_INDENT: &str = "      ";

/// Subcommand for one registered server.
#[must_use]
pub fn server_command(name: &str, server: &ServerEntry) -> Command {
    let tools = unique_tools(name, server);

    Command::new(name.to_string())
        .about(format!("Invoke tools on the {name} server"))
        .long_about(format!(
            "Server: {}\nURL: {}",
            server.server_info.name, server.url
        ))
        .disable_help_subcommand(true)
        .subcommands(tools.map(tool_command))
}

/// Tools of `server` in order, keeping the first of any repeated name.
fn unique_tools<'a>(name: &'a str, server: &'a ServerEntry) -> impl Iterator<Item = &'a McpTool> {
    let mut seen = HashSet::new();
    server.tools.iter().filter(move |tool| {
        let fresh = seen.insert(tool.name.as_str());
        if !fresh {
            tracing::warn!(server = %name, tool = %tool.name, "duplicate tool name; skipping");
        }
        fresh
    })
}

fn tool_command(tool: &McpTool) -> Command {
    let mut command = Command::new(tool.name.clone()).arg(
        Arg::new(ARGUMENTS)
            .value_name("JSON-ARGUMENTS")
            .help("Tool arguments as a JSON object"),
    );

    if !tool.description.is_empty() {
        command = command
            .about(terminal::truncate(&tool.description, SHORT_DESCRIPTION_CHARS))
            .long_about(terminal::wrap(&tool.description, terminal::width(), ""));
    }

    if !tool.input_schema.is_null() {
        if let Ok(schema) = serde_json::to_string_pretty(&tool.input_schema) {
            command = command.after_long_help(format!("Input schema:\n{schema}"));
        }
    }

    command
}

/// Help text listing a server's tools, wrapped to `width` columns.
#[must_use]
pub fn server_help(name: &str, server: &ServerEntry, width: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Server: {}", server.server_info.name);
    let _ = writeln!(out, "URL: {}", server.url);
    let _ = writeln!(out);
    let _ = writeln!(out, "Tools:");

    let description_width = width.saturating_sub(DESCRIPTION_INDENT.len());
    for tool in unique_tools(name, server) {
        let _ = writeln!(out, "  {}", tool.name);
        if !tool.description.is_empty() {
            let wrapped = terminal::wrap(&tool.description, description_width, DESCRIPTION_INDENT);
            let _ = writeln!(out, "{DESCRIPTION_INDENT}{wrapped}");
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(
        out,
        "Use \"mcpli {name} <tool> --help\" for more information about a tool."
    );
    out
}

/// Call `tool` on the registered server `server` and return the raw JSON
/// result.
///
/// # Errors
///
/// Returns an error if the server is unknown, the arguments are not JSON, or
/// the request fails. Errors reported by the tool itself are returned as
/// output, not as an error.
pub async fn invoke(
    session: &Session,
    server: &str,
    tool: &str,
    arguments: Option<&str>,
) -> anyhow::Result<String> {
    let entry = session
        .registry
        .get(server)
        .with_context(|| format!("server {server:?} not found"))?;
    if entry.tool(tool).is_none() {
        anyhow::bail!("tool {tool:?} not found on server {server:?} (try 'mcpli update {server}')");
    }

    let client = McpClient::new(entry.endpoint()?, session.options)?;
    tracing::info!(server = %server, tool = %tool, "calling tool");
    let result = client.call_tool(tool, arguments, None).await?;

    Ok(result.get().to_string())
}
