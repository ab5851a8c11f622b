//! The deliberately varied scenario test servers.
//!
//! Each server is a plain [`rmcp::ServerHandler`]; all of them share one
//! [`StateStore`] partitioned by client identity. Identity is the
//! `clientInfo.name` a client presented during `initialize`, read from the
//! request peer — handlers never consult ambient state.

use std::sync::Arc;

use axum::Router;
use rmcp::model::{JsonObject, ProgressNotificationParam, ProgressToken};
use rmcp::service::Peer;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::{stdio, StreamableHttpServerConfig, StreamableHttpService};
use rmcp::{ErrorData, RoleServer, ServiceExt};
use serde::de::DeserializeOwned;
use serde_json::Value;

use comply_core::state::StateStore;

mod calc;
mod error;
mod file;

pub use calc::{CalcServer, CALC_SERVER_DESCRIPTION};
pub use error::{ErrorServer, ERROR_SERVER_DESCRIPTION};
pub use file::{FileServer, FILE_SERVER_DESCRIPTION};

/// Identity used when a peer somehow has no initialize info.
const DEFAULT_CLIENT_ID: &str = "default";

/// The server implementations the harness can expose.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ServerKind {
    /// Calculator tools, the special-number resource, and elicitation.
    Calc,
    /// Virtual filesystem tools, resources, and prompts.
    File,
    /// Error injection, slow operations, and malformed output.
    Error,
}

impl ServerKind {
    /// Resolves a catalog server name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "CalcServer" => Some(Self::Calc),
            "FileServer" => Some(Self::File),
            "ErrorServer" => Some(Self::Error),
            _ => None,
        }
    }

    /// The catalog name for this server.
    pub fn name(self) -> &'static str {
        match self {
            Self::Calc => "CalcServer",
            Self::File => "FileServer",
            Self::Error => "ErrorServer",
        }
    }

    /// The description this implementation advertises.
    pub fn description(self) -> &'static str {
        match self {
            Self::Calc => CALC_SERVER_DESCRIPTION,
            Self::File => FILE_SERVER_DESCRIPTION,
            Self::Error => ERROR_SERVER_DESCRIPTION,
        }
    }
}

/// Serves the selected server over stdio until the peer disconnects.
pub async fn run_stdio(kind: ServerKind, store: Arc<StateStore>) -> Result<(), String> {
    match kind {
        ServerKind::Calc => wait(CalcServer::new(store).serve(stdio()).await).await,
        ServerKind::File => wait(FileServer::new(store).serve(stdio()).await).await,
        ServerKind::Error => wait(ErrorServer::new().serve(stdio()).await).await,
    }
}

async fn wait<S, E>(
    served: Result<rmcp::service::RunningService<RoleServer, S>, E>,
) -> Result<(), String>
where
    S: rmcp::service::Service<RoleServer>,
    E: std::fmt::Display,
{
    let service = served.map_err(|error| format!("failed to start MCP stdio server: {error}"))?;
    service
        .waiting()
        .await
        .map_err(|error| format!("MCP stdio server failed: {error}"))?;
    Ok(())
}

/// Serves the selected server over streamable HTTP on `port`.
///
/// Every HTTP session gets its own handler instance over the shared store,
/// so per-client isolation behaves the same as over stdio.
pub async fn run_http(kind: ServerKind, store: Arc<StateStore>, port: u16) -> Result<(), String> {
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .map_err(|error| format!("failed to bind 127.0.0.1:{port}: {error}"))?;
    let config = StreamableHttpServerConfig {
        stateful_mode: true,
        sse_keep_alive: None,
        ..Default::default()
    };
    let router = match kind {
        ServerKind::Calc => {
            let service: StreamableHttpService<CalcServer, LocalSessionManager> =
                StreamableHttpService::new(
                    move || Ok(CalcServer::new(Arc::clone(&store))),
                    Default::default(),
                    config,
                );
            Router::new().nest_service("/mcp", service)
        }
        ServerKind::File => {
            let service: StreamableHttpService<FileServer, LocalSessionManager> =
                StreamableHttpService::new(
                    move || Ok(FileServer::new(Arc::clone(&store))),
                    Default::default(),
                    config,
                );
            Router::new().nest_service("/mcp", service)
        }
        ServerKind::Error => {
            let service: StreamableHttpService<ErrorServer, LocalSessionManager> =
                StreamableHttpService::new(move || Ok(ErrorServer::new()), Default::default(), config);
            Router::new().nest_service("/mcp", service)
        }
    };
    log::info!("serving {} on http://127.0.0.1:{port}/mcp", kind.name());
    axum::serve(listener, router)
        .await
        .map_err(|error| format!("MCP HTTP server failed: {error}"))
}

/// Resolves the calling client's identity from the session peer.
pub(crate) fn client_identity(peer: &Peer<RoleServer>) -> String {
    peer.peer_info()
        .map(|info| info.client_info.name.to_string())
        .unwrap_or_else(|| DEFAULT_CLIENT_ID.to_string())
}

/// Deserializes tool arguments, mapping failures to invalid-params errors.
pub(crate) fn parse_args<T: DeserializeOwned>(
    tool: &str,
    arguments: Option<JsonObject>,
) -> Result<T, ErrorData> {
    let arguments = arguments.unwrap_or_default();
    serde_json::from_value(Value::Object(arguments)).map_err(|error| {
        ErrorData::invalid_params(format!("invalid arguments for tool '{tool}': {error}"), None)
    })
}

/// Emits a progress notification when the request carries a progress token.
///
/// Requests without a token get no wire traffic; MCP has nothing to
/// correlate such a notification to.
pub(crate) async fn report_progress(
    peer: &Peer<RoleServer>,
    token: Option<&ProgressToken>,
    progress: u64,
    total: u64,
    message: &str,
) {
    let Some(token) = token else {
        return;
    };
    let notification = ProgressNotificationParam {
        progress_token: token.clone(),
        progress: progress as _,
        total: Some(total as _),
        message: Some(message.to_string()),
    };
    if let Err(error) = peer.notify_progress(notification).await {
        log::debug!("failed to emit progress notification: {error}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_kind_resolves_catalog_names() {
        assert_eq!(ServerKind::from_name("CalcServer"), Some(ServerKind::Calc));
        assert_eq!(ServerKind::from_name("FileServer"), Some(ServerKind::File));
        assert_eq!(ServerKind::from_name("ErrorServer"), Some(ServerKind::Error));
        assert_eq!(ServerKind::from_name("OtherServer"), None);
    }

    #[test]
    fn server_kind_round_trips_through_name() {
        for kind in [ServerKind::Calc, ServerKind::File, ServerKind::Error] {
            assert_eq!(ServerKind::from_name(kind.name()), Some(kind));
            assert!(!kind.description().is_empty());
        }
    }

    #[test]
    fn parse_args_rejects_wrong_shapes() {
        #[derive(serde::Deserialize, Debug)]
        struct Args {
            #[allow(dead_code)]
            a: i64,
        }
        let arguments = serde_json::json!({ "a": "ten" })
            .as_object()
            .cloned();
        let error = parse_args::<Args>("add", arguments).expect_err("error");
        assert!(error.message.contains("invalid arguments for tool 'add'"));
    }

    #[test]
    fn parse_args_defaults_missing_arguments_to_empty_object() {
        #[derive(serde::Deserialize)]
        struct Args {
            #[serde(default)]
            duration: Option<u64>,
        }
        let args = parse_args::<Args>("timeout", None).expect("args");
        assert_eq!(args.duration, None);
    }
}
