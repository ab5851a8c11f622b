//! ErrorServer: error injection, slow operations, and malformed output.

use std::time::Duration;

use rmcp::handler::server::common::schema_for_type;
use rmcp::handler::server::ServerHandler;
use rmcp::model::{
    AnnotateAble, CallToolRequestParam, CallToolResult, ListResourcesResult, ListToolsResult,
    PaginatedRequestParam, RawResource, ReadResourceRequestParam, ReadResourceResult,
    ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData, RoleServer};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use super::{parse_args, report_progress};

/// Description advertised by ErrorServer; must match the catalog entry.
pub const ERROR_SERVER_DESCRIPTION: &str =
    "A server designed to test error handling and edge cases";

const NOT_FOUND_RESOURCE_URI: &str = "error://not-found";
const TIMEOUT_STEP_INTERVAL: Duration = Duration::from_millis(100);
const TIMEOUT_STEPS_PER_SECOND: u64 = 10;

/// Error-injection test server. Holds no per-client state.
#[derive(Clone, Default)]
pub struct ErrorServer;

impl ErrorServer {
    /// Creates an ErrorServer.
    pub fn new() -> Self {
        Self
    }
}

#[derive(Deserialize, JsonSchema)]
struct TimeoutArgs {
    /// Seconds the tool should keep running.
    #[serde(default = "default_timeout_duration")]
    duration: u64,
}

fn default_timeout_duration() -> u64 {
    5
}

/// Declared output shape for `invalid_response`; the handler deliberately
/// returns something else.
#[derive(JsonSchema)]
struct StatusOutput {
    #[allow(dead_code)]
    status: String,
}

fn error_tools() -> Vec<Tool> {
    let empty_args = json!({ "type": "object" })
        .as_object()
        .cloned()
        .unwrap_or_default();
    let mut invalid_response = Tool::new(
        "invalid_response",
        "Returns a response that doesn't match its declared schema",
        empty_args.clone(),
    );
    invalid_response.output_schema = Some(schema_for_type::<StatusOutput>().into());
    vec![
        Tool::new(
            "always_error",
            "Always returns a tool execution error",
            empty_args.clone(),
        ),
        Tool::new(
            "timeout",
            "Takes a long time to execute, useful for testing timeouts",
            schema_for_type::<TimeoutArgs>(),
        ),
        invalid_response,
    ]
}

impl ServerHandler for ErrorServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(ERROR_SERVER_DESCRIPTION.to_string()),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            ..Default::default()
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, ErrorData>> + Send + '_ {
        std::future::ready(Ok(ListToolsResult {
            tools: error_tools(),
            ..Default::default()
        }))
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, ErrorData>> + Send + '_ {
        async move {
            match request.name.as_ref() {
                "always_error" => Err(ErrorData::invalid_params(
                    "This tool always fails for testing purposes",
                    None,
                )),
                "timeout" => {
                    let args: TimeoutArgs = parse_args("timeout", request.arguments)?;
                    let total_steps = args.duration * TIMEOUT_STEPS_PER_SECOND;
                    let token = context.meta.get_progress_token();
                    for step in 0..total_steps {
                        report_progress(
                            &context.peer,
                            token.as_ref(),
                            step,
                            total_steps,
                            &format!("Step {}/{}", step + 1, total_steps),
                        )
                        .await;
                        // The step loop must stop promptly when the caller
                        // aborts; nothing may keep running to completion.
                        tokio::select! {
                            _ = context.ct.cancelled() => {
                                log::debug!("timeout tool cancelled at step {step}");
                                return Err(ErrorData::internal_error(
                                    "timeout tool cancelled before completion",
                                    None,
                                ));
                            }
                            _ = tokio::time::sleep(TIMEOUT_STEP_INTERVAL) => {}
                        }
                    }
                    report_progress(
                        &context.peer,
                        token.as_ref(),
                        total_steps,
                        total_steps,
                        "Completed",
                    )
                    .await;
                    Ok(CallToolResult::success(vec![rmcp::model::Content::text(
                        format!("Completed after {} seconds", args.duration),
                    )]))
                }
                "invalid_response" => Ok(CallToolResult::structured(json!({
                    "unexpected_field": "this should not be here",
                    "malformed": true
                }))),
                other => Err(ErrorData::invalid_params(
                    format!("tool '{other}' not found"),
                    Some(json!({
                        "available_tools": ["always_error", "timeout", "invalid_response"]
                    })),
                )),
            }
        }
    }

    fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourcesResult, ErrorData>> + Send + '_ {
        std::future::ready(Ok(ListResourcesResult {
            resources: vec![RawResource {
                uri: NOT_FOUND_RESOURCE_URI.to_string(),
                name: "not-found".to_string(),
                title: None,
                description: Some("A resource that always returns not found error".to_string()),
                mime_type: None,
                size: None,
                icons: None,
            }
            .no_annotation()],
            ..Default::default()
        }))
    }

    fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ReadResourceResult, ErrorData>> + Send + '_ {
        let response = if request.uri == NOT_FOUND_RESOURCE_URI {
            Err(ErrorData::invalid_params(
                "This resource is designed to always fail",
                None,
            ))
        } else {
            Err(ErrorData::resource_not_found(
                format!("resource '{}' not found", request.uri),
                None,
            ))
        };
        std::future::ready(response)
    }
}
