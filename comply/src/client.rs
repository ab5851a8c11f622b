//! Client-side session bootstrap for the scenario executor.
//!
//! `ScenarioClient` is the handler end of the session: it carries the client
//! identity (the per-connection state partition key, presented as
//! `clientInfo.name` during `initialize`) and the elicitation responder the
//! scenario selected before connecting.

use std::collections::BTreeMap;
use std::fmt;

use rmcp::model::{
    ClientCapabilities, ClientInfo, CreateElicitationRequestParam, CreateElicitationResult,
    Implementation, ProgressNotificationParam,
};
use rmcp::service::{ClientInitializeError, NotificationContext, RequestContext, RunningService};
use rmcp::transport::{StreamableHttpClientTransport, TokioChildProcess};
use rmcp::{ClientHandler, ErrorData, RoleClient, ServiceExt};

use comply_core::elicit::{self, ElicitationResponder};

/// A connected scenario session.
pub type ClientSession = RunningService<RoleClient, ScenarioClient>;

/// Stdio endpoint: a server process the client spawns and owns.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StdioTarget {
    /// Command to execute.
    pub command: String,
    /// Command-line arguments.
    pub args: Vec<String>,
    /// Environment variables to add or override.
    pub env: BTreeMap<String, String>,
    /// Optional working directory.
    pub cwd: Option<String>,
}

impl StdioTarget {
    /// Creates a stdio target with defaults for args, env, and cwd.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            cwd: None,
        }
    }
}

/// Streamable-HTTP endpoint.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HttpTarget {
    /// MCP endpoint URL.
    pub url: String,
}

/// Errors produced while establishing a scenario session.
#[derive(Debug)]
pub enum ConnectError {
    /// The stdio server process could not be spawned.
    Spawn(std::io::Error),
    /// The MCP handshake failed.
    Initialize(ClientInitializeError),
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectError::Spawn(error) => write!(f, "failed to spawn server process: {error}"),
            ConnectError::Initialize(error) => write!(f, "failed to initialize session: {error}"),
        }
    }
}

impl std::error::Error for ConnectError {}

/// The scenario driver's client handler.
#[derive(Clone)]
pub struct ScenarioClient {
    client_id: String,
    responder: Option<ElicitationResponder>,
}

impl ScenarioClient {
    /// Creates a handler for `client_id` with an optional elicitation
    /// responder. The responder must be chosen before connecting; it cannot
    /// be swapped mid-session.
    pub fn new(client_id: impl Into<String>, responder: Option<ElicitationResponder>) -> Self {
        Self {
            client_id: client_id.into(),
            responder,
        }
    }

    /// The identity this handler presents during `initialize`.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }
}

impl ClientHandler for ScenarioClient {
    fn get_info(&self) -> ClientInfo {
        ClientInfo {
            protocol_version: Default::default(),
            capabilities: ClientCapabilities::builder().enable_elicitation().build(),
            client_info: Implementation {
                name: self.client_id.clone(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
        }
    }

    fn create_elicitation(
        &self,
        params: CreateElicitationRequestParam,
        _context: RequestContext<RoleClient>,
    ) -> impl std::future::Future<Output = Result<CreateElicitationResult, ErrorData>> + Send + '_
    {
        let result = match &self.responder {
            Some(responder) => responder.respond(&params),
            // No responder registered: decline rather than invent data.
            None => elicit::unhandled_response(),
        };
        log::debug!(
            "elicitation '{}' answered with {:?}",
            params.message,
            result.action
        );
        std::future::ready(Ok(result))
    }

    fn on_progress(
        &self,
        params: ProgressNotificationParam,
        _context: NotificationContext<RoleClient>,
    ) -> impl std::future::Future<Output = ()> + Send + '_ {
        log::debug!("progress notification: {params:?}");
        std::future::ready(())
    }
}

/// Spawns the stdio server and establishes a session over its pipes.
pub async fn connect_stdio(
    target: &StdioTarget,
    handler: ScenarioClient,
) -> Result<ClientSession, ConnectError> {
    let mut command = tokio::process::Command::new(&target.command);
    command.args(&target.args);
    for (key, value) in &target.env {
        command.env(key, value);
    }
    if let Some(cwd) = &target.cwd {
        command.current_dir(cwd);
    }
    let transport = TokioChildProcess::new(command).map_err(ConnectError::Spawn)?;
    handler
        .serve(transport)
        .await
        .map_err(ConnectError::Initialize)
}

/// Establishes a session against a streamable-HTTP endpoint.
pub async fn connect_http(
    target: &HttpTarget,
    handler: ScenarioClient,
) -> Result<ClientSession, ConnectError> {
    let transport = StreamableHttpClientTransport::from_uri(target.url.as_str());
    handler
        .serve(transport)
        .await
        .map_err(ConnectError::Initialize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::ElicitationAction;
    use serde_json::json;

    fn elicitation_request(message: &str) -> CreateElicitationRequestParam {
        CreateElicitationRequestParam {
            message: message.to_string(),
            requested_schema: rmcp::model::ElicitationSchema::from_json_schema(
                json!({ "type": "object" })
                    .as_object()
                    .cloned()
                    .expect("schema object"),
            )
            .expect("elicitation schema"),
        }
    }

    #[test]
    fn handler_advertises_its_client_identity() {
        let handler = ScenarioClient::new("client1", None);
        let info = handler.get_info();
        assert_eq!(info.client_info.name, "client1");
        assert!(info.capabilities.elicitation.is_some());
    }

    #[test]
    fn responder_is_consulted_when_registered() {
        let handler = ScenarioClient::new(
            "client1",
            Some(ElicitationResponder::AcceptInteger {
                field: "b",
                value: 20,
            }),
        );
        let result = match &handler.responder {
            Some(responder) => {
                responder.respond(&elicitation_request("Please provide the second number (b):"))
            }
            None => unreachable!(),
        };
        assert_eq!(result.action, ElicitationAction::Accept);
    }

    #[test]
    fn missing_responder_declines() {
        let result = elicit::unhandled_response();
        assert_eq!(result.action, ElicitationAction::Decline);
    }

    #[test]
    fn stdio_target_defaults_are_empty() {
        let target = StdioTarget::new("comply-server");
        assert_eq!(target.command, "comply-server");
        assert!(target.args.is_empty());
        assert!(target.env.is_empty());
        assert!(target.cwd.is_none());
    }
}
