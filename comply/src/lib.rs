//! Scenario-driven MCP conformance harness.
//!
//! The `comply` binary drives one numbered scenario against a server under
//! test; `comply-server` exposes the deliberately varied test servers the
//! scenarios expect. Both load the same declarative catalog.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use comply_core::{load_catalog, Catalog};

pub mod client;
pub mod executor;
pub mod server;

use client::{HttpTarget, ScenarioClient, StdioTarget};

/// CLI for the scenario client driver.
#[derive(Parser)]
#[command(name = "comply", version, about = "Scenario-driven MCP conformance client")]
pub struct Cli {
    /// Scenario id to execute.
    #[arg(long)]
    pub scenario_id: u32,
    /// Client identity participating in the scenario (e.g. client1).
    #[arg(long)]
    pub id: String,
    /// Path to the scenario catalog; defaults to scenarios/data.json.
    #[arg(long, value_name = "PATH")]
    pub scenarios_data: Option<PathBuf>,
    #[command(subcommand)]
    pub target: Target,
}

/// Where the server under test lives.
#[derive(Debug, Eq, PartialEq, Subcommand)]
pub enum Target {
    /// Spawn a server process and connect over stdio.
    Stdio {
        /// Command to execute.
        #[arg(long)]
        command: String,
        /// Command arguments (repeatable).
        #[arg(long = "arg")]
        args: Vec<String>,
        /// Environment variables (KEY=VALUE, repeatable).
        #[arg(long = "env")]
        env: Vec<String>,
        /// Working directory for the server process.
        #[arg(long)]
        cwd: Option<String>,
    },
    /// Connect to a running server over streamable HTTP.
    Http {
        /// MCP endpoint URL.
        #[arg(long)]
        url: String,
    },
}

/// Parses KEY=VALUE environment entries.
pub fn parse_env_vars(entries: &[String]) -> Result<BTreeMap<String, String>, String> {
    let mut env = BTreeMap::new();
    for entry in entries {
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| format!("invalid env entry: '{entry}'"))?;
        if key.is_empty() {
            return Err(format!("invalid env entry: '{entry}'"));
        }
        env.insert(key.to_string(), value.to_string());
    }
    Ok(env)
}

fn failure_exit(scenario_id: u32, message: &str) -> ExitCode {
    eprintln!("✗ Scenario {scenario_id} failed: {message}");
    ExitCode::from(1)
}

/// Runs the scenario client driver to completion.
pub async fn run(cli: Cli) -> ExitCode {
    let scenario_id = cli.scenario_id;
    let catalog = match load_catalog(cli.scenarios_data.as_deref()) {
        Ok(catalog) => catalog,
        Err(error) => return failure_exit(scenario_id, &error.to_string()),
    };
    if let Err(error) = executor::validate_runners(&catalog) {
        return failure_exit(scenario_id, &error.to_string());
    }
    if let Err(error) = check_preconditions(&catalog, scenario_id, &cli.id, &cli.target) {
        return failure_exit(scenario_id, &error.to_string());
    }

    // The responder is fixed per scenario and registered before the session
    // handshake; elicitation requests can arrive as soon as the first call
    // is in flight.
    let handler = ScenarioClient::new(cli.id.clone(), executor::responder_for(scenario_id));
    let session = match connect(&cli.target, handler).await {
        Ok(session) => session,
        Err(error) => return failure_exit(scenario_id, &error),
    };

    let outcome = executor::execute(&catalog, scenario_id, &cli.id, &session).await;
    if let Err(error) = session.cancel().await {
        log::debug!("session teardown reported: {error}");
    }
    match outcome {
        Ok(()) => {
            println!("✓ Scenario {scenario_id} passed");
            ExitCode::SUCCESS
        }
        Err(error) => failure_exit(scenario_id, &error.to_string()),
    }
}

fn check_preconditions(
    catalog: &Catalog,
    scenario_id: u32,
    client_id: &str,
    target: &Target,
) -> Result<(), executor::ScenarioError> {
    let scenario = catalog
        .scenario(scenario_id)
        .ok_or(executor::ScenarioError::UnknownScenario(scenario_id))?;
    if !scenario.client_ids.iter().any(|id| id == client_id) {
        return Err(executor::ScenarioError::NotAParticipant {
            scenario_id,
            client_id: client_id.to_string(),
        });
    }
    if scenario.http_only && matches!(target, Target::Stdio { .. }) {
        return Err(executor::ScenarioError::HttpOnly(scenario_id));
    }
    Ok(())
}

async fn connect(
    target: &Target,
    handler: ScenarioClient,
) -> Result<client::ClientSession, String> {
    match target {
        Target::Stdio {
            command,
            args,
            env,
            cwd,
        } => {
            let env = parse_env_vars(env)?;
            let target = StdioTarget {
                command: command.clone(),
                args: args.clone(),
                env,
                cwd: cwd.clone(),
            };
            client::connect_stdio(&target, handler)
                .await
                .map_err(|error| error.to_string())
        }
        Target::Http { url } => {
            let target = HttpTarget { url: url.clone() };
            client::connect_http(&target, handler)
                .await
                .map_err(|error| error.to_string())
        }
    }
}
