//! CalcServer: arithmetic tools, the trig gate, the special-number resource,
//! and the elicitation-driven `ambiguous_add`.

use std::sync::Arc;

use rmcp::handler::server::common::schema_for_type;
use rmcp::handler::server::ServerHandler;
use rmcp::model::{
    AnnotateAble, CallToolRequestParam, CallToolResult, Content, CreateElicitationRequestParam,
    GetPromptRequestParam, GetPromptResult, ListPromptsResult, ListResourcesResult,
    ListToolsResult, PaginatedRequestParam, Prompt, PromptMessage, PromptMessageContent,
    PromptMessageRole, RawResource, ReadResourceRequestParam, ReadResourceResult,
    ResourceContents, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::{Peer, RequestContext};
use rmcp::{ErrorData, RoleServer};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use comply_core::elicit::ElicitationOutcome;
use comply_core::state::StateStore;
use comply_core::{errors, expr};

use super::{client_identity, parse_args, report_progress};

/// Description advertised by CalcServer; must match the catalog entry.
pub const CALC_SERVER_DESCRIPTION: &str = "A calculator server with basic arithmetic operations, trigonometric functions, resource management, sampling capabilities, and prompt templates";

const SPECIAL_NUMBER_URI: &str = "resource://special-number";
const EXAMPLE_MATHS_PROMPT_NAME: &str = "example-maths";
const EXAMPLE_MATHS_PROMPT: &str =
    "Help me solve mathematical problems step by step. Show your work and explain each step clearly.";

/// Calculator test server.
#[derive(Clone)]
pub struct CalcServer {
    store: Arc<StateStore>,
}

impl CalcServer {
    /// Creates a CalcServer over the shared state store.
    pub fn new(store: Arc<StateStore>) -> Self {
        Self { store }
    }
}

#[derive(Deserialize, JsonSchema)]
struct AddArgs {
    a: i64,
    b: i64,
}

#[derive(Deserialize, JsonSchema)]
struct AmbiguousAddArgs {
    a: i64,
}

#[derive(Deserialize, JsonSchema)]
struct TrigArgs {
    x: f64,
}

#[derive(Deserialize, JsonSchema)]
struct SetTrigAllowedArgs {
    allowed: bool,
}

#[derive(Deserialize, JsonSchema)]
struct WriteSpecialNumberArgs {
    value: i64,
}

#[derive(Deserialize, JsonSchema)]
struct EvalArgs {
    expression: String,
}

/// Payload requested from the client when `ambiguous_add` elicits `b`.
#[derive(Deserialize, JsonSchema)]
struct SecondOperand {
    #[allow(dead_code)]
    b: i64,
}

fn calc_tools(trig_allowed: bool) -> Vec<Tool> {
    let mut tools = vec![
        Tool::new(
            "add",
            "Adds two numbers a and b together and returns the sum",
            schema_for_type::<AddArgs>(),
        ),
        Tool::new(
            "ambiguous_add",
            "Adds two numbers together but only accepts 'a' input and uses elicitation to request 'b' input from the user",
            schema_for_type::<AmbiguousAddArgs>(),
        ),
        Tool::new(
            "set_trig_allowed",
            "Enables or disables trigonometric functions (cos and sin) per-client",
            schema_for_type::<SetTrigAllowedArgs>(),
        ),
        Tool::new(
            "write_special_number",
            "Updates the special number resource with a new value",
            schema_for_type::<WriteSpecialNumberArgs>(),
        ),
        Tool::new(
            "eval_with_sampling",
            "Evaluates a string arithmetic expression using LLM sampling to parse and compute the result",
            schema_for_type::<EvalArgs>(),
        ),
    ];
    if trig_allowed {
        tools.push(Tool::new(
            "cos",
            "Calculates the cosine of an angle in radians (disabled by default)",
            schema_for_type::<TrigArgs>(),
        ));
        tools.push(Tool::new(
            "sin",
            "Calculates the sine of an angle in radians (disabled by default)",
            schema_for_type::<TrigArgs>(),
        ));
    }
    tools
}

fn trig_result(store: &StateStore, client_id: &str, value: f64) -> Result<CallToolResult, ErrorData> {
    if !store.with_state(client_id, |state| state.trig_allowed) {
        return Err(errors::feature_disabled(
            "Trigonometric functions are disabled",
        ));
    }
    Ok(CallToolResult::success(vec![Content::text(
        value.to_string(),
    )]))
}

async fn ambiguous_add(
    peer: &Peer<RoleServer>,
    args: AmbiguousAddArgs,
) -> Result<CallToolResult, ErrorData> {
    let request = CreateElicitationRequestParam {
        message: format!(
            "Please provide the second number (b) to add to {}:",
            args.a
        ),
        requested_schema: rmcp::model::ElicitationSchema::from_json_schema(
            schema_for_type::<SecondOperand>(),
        )
        .map_err(|error| {
            ErrorData::internal_error(
                format!("failed to build elicitation schema: {error}"),
                None,
            )
        })?,
    };
    let result = peer.create_elicitation(request).await.map_err(|error| {
        ErrorData::internal_error(format!("elicitation exchange failed: {error}"), None)
    })?;
    match ElicitationOutcome::from_result(result) {
        outcome @ ElicitationOutcome::Accept(_) => {
            let b = outcome.integer_field("b").ok_or_else(|| {
                ErrorData::invalid_params("elicitation accepted without an integer 'b'", None)
            })?;
            Ok(CallToolResult::success(vec![Content::text(
                (args.a + b).to_string(),
            )]))
        }
        ElicitationOutcome::Decline => Err(errors::user_declined(
            "User declined to provide input for parameter b",
        )),
        ElicitationOutcome::Cancel => Err(errors::user_cancelled(
            "User cancelled the elicitation request",
        )),
    }
}

impl ServerHandler for CalcServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(CALC_SERVER_DESCRIPTION.to_string()),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .enable_prompts()
                .build(),
            ..Default::default()
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, ErrorData>> + Send + '_ {
        let trig_allowed = self
            .store
            .with_state(&client_identity(&context.peer), |state| state.trig_allowed);
        std::future::ready(Ok(ListToolsResult {
            tools: calc_tools(trig_allowed),
            ..Default::default()
        }))
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, ErrorData>> + Send + '_ {
        let store = Arc::clone(&self.store);
        async move {
            let client_id = client_identity(&context.peer);
            match request.name.as_ref() {
                "add" => {
                    let args: AddArgs = parse_args("add", request.arguments)?;
                    Ok(CallToolResult::success(vec![Content::text(
                        (args.a + args.b).to_string(),
                    )]))
                }
                "ambiguous_add" => {
                    let args = parse_args("ambiguous_add", request.arguments)?;
                    ambiguous_add(&context.peer, args).await
                }
                "cos" => {
                    let args: TrigArgs = parse_args("cos", request.arguments)?;
                    trig_result(&store, &client_id, args.x.cos())
                }
                "sin" => {
                    let args: TrigArgs = parse_args("sin", request.arguments)?;
                    trig_result(&store, &client_id, args.x.sin())
                }
                "set_trig_allowed" => {
                    let args: SetTrigAllowedArgs =
                        parse_args("set_trig_allowed", request.arguments)?;
                    store.with_state(&client_id, |state| state.trig_allowed = args.allowed);
                    let verb = if args.allowed { "enabled" } else { "disabled" };
                    Ok(CallToolResult::success(vec![Content::text(format!(
                        "Trigonometric functions {verb}"
                    ))]))
                }
                "write_special_number" => {
                    let args: WriteSpecialNumberArgs =
                        parse_args("write_special_number", request.arguments)?;
                    store.with_state(&client_id, |state| state.special_number = args.value);
                    Ok(CallToolResult::success(vec![Content::text(format!(
                        "Special number updated to {}",
                        args.value
                    ))]))
                }
                "eval_with_sampling" => {
                    let args: EvalArgs = parse_args("eval_with_sampling", request.arguments)?;
                    let token = context.meta.get_progress_token();
                    report_progress(&context.peer, token.as_ref(), 0, 100, "Starting evaluation")
                        .await;
                    let value = expr::evaluate(&args.expression).map_err(|error| {
                        log::debug!("expression rejected: {error}");
                        errors::evaluation_error(format!(
                            "Cannot evaluate expression: {}",
                            args.expression
                        ))
                    })?;
                    report_progress(
                        &context.peer,
                        token.as_ref(),
                        100,
                        100,
                        "Evaluation complete",
                    )
                    .await;
                    Ok(CallToolResult::success(vec![Content::text(
                        value.to_string(),
                    )]))
                }
                other => Err(ErrorData::invalid_params(
                    format!("tool '{other}' not found"),
                    Some(json!({
                        "available_tools": calc_tools(
                            store.with_state(&client_id, |state| state.trig_allowed)
                        )
                        .iter()
                        .map(|tool| tool.name.to_string())
                        .collect::<Vec<_>>()
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
            resources: vec![special_number_resource()],
            ..Default::default()
        }))
    }

    fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ReadResourceResult, ErrorData>> + Send + '_ {
        let response = if request.uri == SPECIAL_NUMBER_URI {
            let value = self
                .store
                .with_state(&client_identity(&context.peer), |state| {
                    state.special_number
                });
            Ok(ReadResourceResult {
                contents: vec![ResourceContents::text(
                    value.to_string(),
                    SPECIAL_NUMBER_URI,
                )],
            })
        } else {
            Err(ErrorData::resource_not_found(
                format!("resource '{}' not found", request.uri),
                None,
            ))
        };
        std::future::ready(response)
    }

    fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListPromptsResult, ErrorData>> + Send + '_ {
        std::future::ready(Ok(ListPromptsResult {
            prompts: vec![Prompt::new(
                EXAMPLE_MATHS_PROMPT_NAME,
                Some("A prompt template that helps with mathematical problem solving"),
                None,
            )],
            ..Default::default()
        }))
    }

    fn get_prompt(
        &self,
        request: GetPromptRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<GetPromptResult, ErrorData>> + Send + '_ {
        let response = if request.name == EXAMPLE_MATHS_PROMPT_NAME {
            Ok(GetPromptResult {
                description: Some(
                    "A prompt template that helps with mathematical problem solving".to_string(),
                ),
                messages: vec![PromptMessage {
                    role: PromptMessageRole::User,
                    content: PromptMessageContent::Text {
                        text: EXAMPLE_MATHS_PROMPT.to_string(),
                    },
                }],
            })
        } else {
            Err(ErrorData::invalid_params(
                format!("prompt '{}' not found", request.name),
                Some(json!({ "available_prompts": [EXAMPLE_MATHS_PROMPT_NAME] })),
            ))
        };
        std::future::ready(response)
    }
}

fn special_number_resource() -> rmcp::model::Resource {
    RawResource {
        uri: SPECIAL_NUMBER_URI.to_string(),
        name: "special-number".to_string(),
        title: None,
        description: Some(
            "A mutable number resource that can be read and updated via tools".to_string(),
        ),
        mime_type: Some("text/plain".to_string()),
        size: None,
        icons: None,
    }
    .no_annotation()
}
