//! In-process client/server wiring for integration tests.
//!
//! Scenario tests need a live bidirectional session — elicitation flows
//! server→client mid-call — so both ends run in the same process over an
//! in-memory duplex pipe instead of scripted transports.

use ctor::ctor;

#[ctor]
fn init_test_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default())
        .is_test(true)
        .try_init();
}

use rmcp::model::{CallToolResult, ReadResourceResult, ResourceContents};
use rmcp::service::{RoleClient, RoleServer, RunningService};
use rmcp::{ClientHandler, ServerHandler, ServiceExt};

const DUPLEX_BUFFER: usize = 4096;

/// Connects a server handler and a client handler over an in-memory pipe.
///
/// Returns both running services; drop or cancel the client to tear the
/// session down.
pub async fn serve_pair<S, C>(
    server: S,
    client: C,
) -> (RunningService<RoleServer, S>, RunningService<RoleClient, C>)
where
    S: ServerHandler + Send + 'static,
    C: ClientHandler + Send + 'static,
{
    let (client_io, server_io) = tokio::io::duplex(DUPLEX_BUFFER);
    let server_task = tokio::spawn(async move { server.serve(server_io).await });
    let client = client
        .serve(client_io)
        .await
        .expect("connect in-process client");
    let server = server_task
        .await
        .expect("join in-process server task")
        .expect("serve in-process server");
    (server, client)
}

/// First text block of a tool result.
pub fn text_of(result: &CallToolResult) -> &str {
    result
        .content
        .first()
        .and_then(|content| content.as_text())
        .map(|text| text.text.as_str())
        .expect("tool result text content")
}

/// First text block of a resource read.
pub fn resource_text_of(result: &ReadResourceResult) -> &str {
    match result.contents.first() {
        Some(ResourceContents::TextResourceContents { text, .. }) => text.as_str(),
        _ => panic!("resource read text contents"),
    }
}
