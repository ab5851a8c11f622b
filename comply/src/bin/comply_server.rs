#![cfg_attr(not(test), deny(clippy::expect_used, clippy::unwrap_used))]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use comply::server::{self, ServerKind};
use comply_core::load_catalog;
use comply_core::state::StateStore;

/// CLI for the scenario test server.
#[derive(Parser)]
#[command(
    name = "comply-server",
    version,
    about = "Deliberately varied MCP test server for conformance scenarios"
)]
struct ServerCli {
    /// Server definition to expose (CalcServer, FileServer, ErrorServer).
    #[arg(long)]
    server_name: String,
    /// Path to the scenario catalog; defaults to scenarios/data.json.
    #[arg(long, value_name = "PATH")]
    scenarios_data: Option<PathBuf>,
    #[command(subcommand)]
    transport: Transport,
}

#[derive(Subcommand)]
enum Transport {
    /// Serve a single session over stdin/stdout.
    Stdio,
    /// Serve streamable HTTP sessions on a local port.
    Http {
        /// Port to listen on.
        #[arg(long, default_value_t = 8000)]
        port: u16,
    },
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();
    let cli = ServerCli::parse();

    let catalog = match load_catalog(cli.scenarios_data.as_deref()) {
        Ok(catalog) => catalog,
        Err(error) => {
            eprintln!("{error}");
            return ExitCode::from(1);
        }
    };
    let Some(definition) = catalog.server(&cli.server_name) else {
        eprintln!("server '{}' not found in catalog", cli.server_name);
        return ExitCode::from(1);
    };
    let Some(kind) = ServerKind::from_name(&cli.server_name) else {
        eprintln!("server '{}' is not implemented", cli.server_name);
        return ExitCode::from(1);
    };
    if definition.description != kind.description() {
        log::warn!(
            "description mismatch for {}: catalog says '{}', implementation says '{}'",
            kind.name(),
            definition.description,
            kind.description()
        );
    }

    log::info!("starting {} server", kind.name());
    let store = Arc::new(StateStore::new());
    let outcome = match cli.transport {
        Transport::Stdio => server::run_stdio(kind, store).await,
        Transport::Http { port } => server::run_http(kind, store, port).await,
    };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::from(1)
        }
    }
}
