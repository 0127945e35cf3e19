use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use mcpli::{
    Config, ServerRegistry,
    cli::{self, Parsed, Session},
};

#[tokio::main]
async fn main() -> ExitCode {
    // Server subcommands come from the registry, so it is loaded before
    // parsing. A broken registry still leaves the built-in commands usable.
    let loaded = ServerRegistry::load();
    let registry = match &loaded {
        Ok(registry) => registry.clone(),
        Err(_) => ServerRegistry::default(),
    };

    let matches = cli::build_command(&registry).get_matches();
    let parsed = match Parsed::from_matches(&matches) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    init_logging(parsed.verbose);

    match run(parsed, loaded).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    // RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(parsed: Parsed, loaded: anyhow::Result<ServerRegistry>) -> anyhow::Result<()> {
    let config = Config::load()?;
    let mut session = Session {
        registry: loaded?,
        registry_path: Config::servers_path()?,
        options: config.client.options(),
    };

    cli::execute(&mut session, parsed.invocation).await
}
