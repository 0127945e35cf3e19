//! CLI command parsing and execution.
//!
//! The command tree is built in one step from the loaded server registry:
//! the built-in management commands come from [`Cli`], and each registered
//! server contributes a subcommand with one nested subcommand per tool.

mod server;
mod tool;

use std::path::PathBuf;

use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, Subcommand};

use crate::build_info;
use crate::config::ServerRegistry;
use crate::mcp::ClientOptions;

pub use server::{parse_headers, validate_server_name};
pub use tool::{invoke, server_command, server_help};

/// mcpli - invoke MCP server tools from the command line.
#[derive(Parser)]
#[command(name = "mcpli")]
#[command(about = "MCP CLI - invoke MCP server tools from the command line")]
#[command(long_about = "mcpli is a command line interface for MCP (Model Context Protocol) servers.

Add servers with 'mcpli add', then invoke their tools directly:
  mcpli <server> <tool> [json-arguments]")]
#[command(after_help = "Examples:
  mcpli add knuspr https://mcp.knuspr.de/mcp/ -H 'rhl-email: ${ROHLIK_USERNAME}'
  mcpli knuspr search_products '{\"query\": \"milk\"}'
  mcpli knuspr get_cart")]
#[command(version, propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Add a new MCP server and fetch its tools.
    ///
    /// Header values may reference environment variables as ${VAR_NAME};
    /// they are stored unexpanded and expanded on every request.
    Add {
        /// Name used as the server's subcommand.
        name: String,

        /// MCP endpoint URL.
        url: String,

        /// HTTP header in 'key: value' format (repeatable).
        #[arg(short = 'H', long = "header", value_name = "KEY: VALUE")]
        headers: Vec<String>,
    },

    /// Refresh a server's identity and tool definitions.
    Update {
        /// Server name.
        name: String,
    },

    /// Remove a configured server.
    Remove {
        /// Server name.
        name: String,
    },

    /// List servers, or the tools of one server.
    List {
        /// Server whose tools to list.
        server: Option<String>,
    },
}

/// What the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// No subcommand: print usage.
    Usage,
    /// A built-in management command.
    Builtin(Commands),
    /// A server subcommand without a tool.
    ServerHelp { server: String },
    /// A tool call.
    Tool {
        server: String,
        tool: String,
        arguments: Option<String>,
    },
}

/// Parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed {
    pub verbose: u8,
    pub invocation: Invocation,
}

impl Parsed {
    /// Interpret matches produced by [`build_command`].
    ///
    /// # Errors
    ///
    /// Returns an error if a built-in command's arguments cannot be extracted.
    pub fn from_matches(matches: &ArgMatches) -> anyhow::Result<Self> {
        let verbose = matches.get_count("verbose");

        let invocation = match matches.subcommand() {
            None => Invocation::Usage,
            Some((name, _)) if Commands::has_subcommand(name) => {
                Invocation::Builtin(Commands::from_arg_matches(matches)?)
            }
            Some((server, server_matches)) => match server_matches.subcommand() {
                None => Invocation::ServerHelp {
                    server: server.to_string(),
                },
                Some((tool, tool_matches)) => Invocation::Tool {
                    server: server.to_string(),
                    tool: tool.to_string(),
                    arguments: tool_matches.get_one::<String>(tool::ARGUMENTS).cloned(),
                },
            },
        };

        Ok(Self {
            verbose,
            invocation,
        })
    }
}

/// Whether `name` is taken by a built-in command.
#[must_use]
pub fn is_reserved(name: &str) -> bool {
    name == "help" || Commands::has_subcommand(name)
}

/// Build the full command tree for `registry`.
#[must_use]
pub fn build_command(registry: &ServerRegistry) -> clap::Command {
    let base = Cli::command().version(build_info::version_string());

    registry.iter().fold(base, |command, (name, server)| {
        if is_reserved(name) {
            tracing::warn!(server = %name, "server name shadows a built-in command; skipping");
            return command;
        }
        command.subcommand(tool::server_command(name, server))
    })
}

/// State shared by command handlers.
#[derive(Debug, Clone)]
pub struct Session {
    /// Registry loaded at startup.
    pub registry: ServerRegistry,
    /// Where the registry is saved.
    pub registry_path: PathBuf,
    /// HTTP client settings.
    pub options: ClientOptions,
}

impl Session {
    /// Persist the registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry file cannot be written.
    pub fn save(&self) -> anyhow::Result<()> {
        self.registry.save_to(&self.registry_path)
    }
}

/// Run an invocation other than [`Invocation::Usage`].
///
/// # Errors
///
/// Returns an error if the command fails; nothing is persisted in that case.
pub async fn execute(session: &mut Session, invocation: Invocation) -> anyhow::Result<()> {
    match invocation {
        Invocation::Usage => {
            let mut command = build_command(&session.registry);
            command.print_help()?;
        }
        Invocation::Builtin(Commands::Add { name, url, headers }) => {
            server::add(session, &name, &url, &headers).await?;
        }
        Invocation::Builtin(Commands::Update { name }) => {
            server::update(session, &name).await?;
        }
        Invocation::Builtin(Commands::Remove { name }) => {
            server::remove(session, &name)?;
        }
        Invocation::Builtin(Commands::List { server }) => {
            server::list(session, server.as_deref())?;
        }
        Invocation::ServerHelp { server } => {
            let entry = session
                .registry
                .get(&server)
                .ok_or_else(|| anyhow::anyhow!("server {server:?} not found"))?;
            print!("{}", server_help(&server, entry, crate::terminal::width()));
        }
        Invocation::Tool {
            server,
            tool,
            arguments,
        } => {
            let output = invoke(session, &server, &tool, arguments.as_deref()).await?;
            println!("{output}");
        }
    }

    Ok(())
}
