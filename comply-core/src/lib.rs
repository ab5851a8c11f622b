//! Scenario catalog and shared engine types for the comply conformance harness.
//!
//! The catalog is the declarative source of truth for what the harness can
//! exercise: which test servers exist and which numbered scenarios run
//! against them. It is loaded once at process start and read-only afterwards.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub mod elicit;
pub mod errors;
pub mod expr;
pub mod schema;
pub mod state;

pub use rmcp::model::{ErrorCode, ErrorData};

/// Default catalog location, relative to the working directory.
pub const DEFAULT_CATALOG_PATH: &str = "scenarios/data.json";

/// The full scenario catalog: server definitions plus numbered scenarios.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Catalog {
    /// Test server definitions keyed by server name.
    pub servers: BTreeMap<String, ServerDefinition>,
    /// The numbered conformance scenarios.
    pub scenarios: Vec<ScenarioDefinition>,
}

/// Declarative description of one test server.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ServerDefinition {
    /// Human-readable server description; implementations must match it.
    pub description: String,
}

/// One numbered conformance scenario.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ScenarioDefinition {
    /// Stable scenario identifier.
    pub id: u32,
    /// What the scenario exercises and what outcome it expects.
    pub description: String,
    /// Client identities that participate in this scenario.
    pub client_ids: Vec<String>,
    /// Name of the server definition the scenario runs against.
    pub server_name: String,
    /// Whether the scenario only makes sense over an HTTP transport.
    #[serde(default)]
    pub http_only: bool,
}

impl Catalog {
    /// Looks up a scenario by id.
    pub fn scenario(&self, id: u32) -> Option<&ScenarioDefinition> {
        self.scenarios.iter().find(|scenario| scenario.id == id)
    }

    /// Looks up a server definition by name.
    pub fn server(&self, name: &str) -> Option<&ServerDefinition> {
        self.servers.get(name)
    }

    /// Parses a catalog from JSON and applies load-time validation.
    pub fn from_json(path: &Path, payload: &str) -> Result<Self, CatalogError> {
        let catalog: Catalog =
            serde_json::from_str(payload).map_err(|error| CatalogError::Parse {
                path: path.to_path_buf(),
                error,
            })?;
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = Vec::with_capacity(self.scenarios.len());
        for scenario in &self.scenarios {
            if seen.contains(&scenario.id) {
                return Err(CatalogError::DuplicateScenario {
                    scenario_id: scenario.id,
                });
            }
            seen.push(scenario.id);
            if !self.servers.contains_key(&scenario.server_name) {
                return Err(CatalogError::UnknownServer {
                    scenario_id: scenario.id,
                    server_name: scenario.server_name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Errors produced while loading the scenario catalog.
#[derive(Debug)]
pub enum CatalogError {
    /// The catalog file could not be read.
    Io {
        /// Path that failed to load.
        path: PathBuf,
        /// Underlying I/O error.
        error: io::Error,
    },
    /// The catalog file was not valid JSON for the catalog shape.
    Parse {
        /// Path that failed to parse.
        path: PathBuf,
        /// Underlying parse error.
        error: serde_json::Error,
    },
    /// A scenario references a server that is not defined.
    UnknownServer {
        /// Offending scenario id.
        scenario_id: u32,
        /// The undefined server name.
        server_name: String,
    },
    /// Two scenarios share the same id.
    DuplicateScenario {
        /// The duplicated scenario id.
        scenario_id: u32,
    },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Io { path, error } => {
                write!(f, "failed to read catalog at {}: {error}", path.display())
            }
            CatalogError::Parse { path, error } => {
                write!(f, "failed to parse catalog at {}: {error}", path.display())
            }
            CatalogError::UnknownServer {
                scenario_id,
                server_name,
            } => write!(
                f,
                "scenario {scenario_id} references undefined server '{server_name}'"
            ),
            CatalogError::DuplicateScenario { scenario_id } => {
                write!(f, "scenario id {scenario_id} is defined more than once")
            }
        }
    }
}

impl std::error::Error for CatalogError {}

/// Loads the catalog from an override path or the default location.
pub fn load_catalog(path: Option<&Path>) -> Result<Catalog, CatalogError> {
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_CATALOG_PATH));
    let payload = fs::read_to_string(path).map_err(|error| CatalogError::Io {
        path: path.to_path_buf(),
        error,
    })?;
    Catalog::from_json(path, &payload)
}
