//! FileServer: tools and resources over each client's virtual filesystem.

use std::sync::Arc;

use rmcp::handler::server::common::schema_for_type;
use rmcp::handler::server::ServerHandler;
use rmcp::model::{
    AnnotateAble, CallToolRequestParam, CallToolResult, Content, GetPromptRequestParam,
    GetPromptResult, JsonObject, ListPromptsResult, ListResourceTemplatesResult,
    ListResourcesResult, ListToolsResult, PaginatedRequestParam, Prompt, PromptArgument,
    PromptMessage, PromptMessageContent, PromptMessageRole, RawResource, RawResourceTemplate,
    ReadResourceRequestParam, ReadResourceResult, ResourceContents, ServerCapabilities,
    ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData, RoleServer};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use comply_core::errors;
use comply_core::state::StateStore;

use super::{client_identity, parse_args};

/// Description advertised by FileServer; must match the catalog entry.
pub const FILE_SERVER_DESCRIPTION: &str =
    "A server that provides file system access with resource templates and subscriptions";

const STATIC_FILE_URI: &str = "file:///test/static.txt";
const STATIC_FILE_CONTENT: &str = "Static test file content";
const FILE_URI_PREFIX: &str = "file:///";
const CODE_REVIEW_PROMPT_NAME: &str = "code_review";
const CODE_REVIEW_PROMPT: &str =
    "Please review this code for best practices, potential bugs, and improvement opportunities.";
const SUMMARIZE_FILE_PROMPT_NAME: &str = "summarize_file";

/// Virtual-filesystem test server.
#[derive(Clone)]
pub struct FileServer {
    store: Arc<StateStore>,
}

impl FileServer {
    /// Creates a FileServer over the shared state store.
    pub fn new(store: Arc<StateStore>) -> Self {
        Self { store }
    }
}

#[derive(Deserialize, JsonSchema)]
struct WriteFileArgs {
    path: String,
    content: String,
}

#[derive(Deserialize, JsonSchema)]
struct DeleteFileArgs {
    path: String,
}

/// Normalizes a template-captured path to the absolute form the store keys
/// files by: `file:///readme.txt` addresses `/readme.txt`.
fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

fn file_tools() -> Vec<Tool> {
    vec![
        Tool::new(
            "write_file",
            "Writes content to a file at the specified path",
            schema_for_type::<WriteFileArgs>(),
        ),
        Tool::new(
            "delete_file",
            "Deletes a file at the specified path",
            schema_for_type::<DeleteFileArgs>(),
        ),
    ]
}

fn prompt_argument(arguments: &Option<JsonObject>, name: &str) -> Result<String, ErrorData> {
    arguments
        .as_ref()
        .and_then(|arguments| arguments.get(name))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            ErrorData::invalid_params(format!("prompt requires argument '{name}'"), None)
        })
}

impl ServerHandler for FileServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(FILE_SERVER_DESCRIPTION.to_string()),
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
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, ErrorData>> + Send + '_ {
        std::future::ready(Ok(ListToolsResult {
            tools: file_tools(),
            ..Default::default()
        }))
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, ErrorData>> + Send + '_ {
        let store = Arc::clone(&self.store);
        let client_id = client_identity(&context.peer);
        let response = match request.name.as_ref() {
            "write_file" => parse_args::<WriteFileArgs>("write_file", request.arguments).map(
                |args| {
                    store.with_state(&client_id, |state| {
                        state.files.insert(args.path.clone(), args.content.clone());
                    });
                    CallToolResult::success(vec![Content::text(format!(
                        "File {} written successfully",
                        args.path
                    ))])
                },
            ),
            "delete_file" => parse_args::<DeleteFileArgs>("delete_file", request.arguments)
                .and_then(|args| {
                    let removed = store
                        .with_state(&client_id, |state| state.files.remove(&args.path));
                    match removed {
                        Some(_) => Ok(CallToolResult::success(vec![Content::text(format!(
                            "File {} deleted successfully",
                            args.path
                        ))])),
                        None => Err(errors::not_found(format!("File not found: {}", args.path))),
                    }
                }),
            other => Err(ErrorData::invalid_params(
                format!("tool '{other}' not found"),
                Some(json!({ "available_tools": ["write_file", "delete_file"] })),
            )),
        };
        std::future::ready(response)
    }

    fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourcesResult, ErrorData>> + Send + '_ {
        std::future::ready(Ok(ListResourcesResult {
            resources: vec![RawResource {
                uri: STATIC_FILE_URI.to_string(),
                name: "static.txt".to_string(),
                title: None,
                description: Some("A static test file resource".to_string()),
                mime_type: Some("text/plain".to_string()),
                size: None,
                icons: None,
            }
            .no_annotation()],
            ..Default::default()
        }))
    }

    fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourceTemplatesResult, ErrorData>> + Send + '_
    {
        std::future::ready(Ok(ListResourceTemplatesResult {
            resource_templates: vec![RawResourceTemplate {
                uri_template: "file:///{path}".to_string(),
                name: "file".to_string(),
                title: None,
                description: Some("Access any file by providing its path".to_string()),
                mime_type: Some("text/plain".to_string()),
            }
            .no_annotation()],
            ..Default::default()
        }))
    }

    fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ReadResourceResult, ErrorData>> + Send + '_ {
        let uri = request.uri;
        let response = if uri == STATIC_FILE_URI {
            // Fixed content, independent of per-client state.
            Ok(ReadResourceResult {
                contents: vec![ResourceContents::text(STATIC_FILE_CONTENT, STATIC_FILE_URI)],
            })
        } else if let Some(raw_path) = uri.strip_prefix(FILE_URI_PREFIX) {
            let path = normalize_path(raw_path);
            let content = self
                .store
                .with_state(&client_identity(&context.peer), |state| {
                    state.files.get(&path).cloned()
                });
            match content {
                Some(content) => Ok(ReadResourceResult {
                    contents: vec![ResourceContents::text(content, uri.clone())],
                }),
                None => Err(errors::not_found(format!("File not found: {path}"))),
            }
        } else {
            Err(ErrorData::resource_not_found(
                format!("resource '{uri}' not found"),
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
            prompts: vec![
                Prompt::new(
                    CODE_REVIEW_PROMPT_NAME,
                    Some("Analyzes code quality and suggests improvements"),
                    None,
                ),
                Prompt::new(
                    SUMMARIZE_FILE_PROMPT_NAME,
                    Some("Summarizes the content of a file at the given path"),
                    Some(vec![PromptArgument {
                        name: "path".to_string(),
                        title: None,
                        description: Some("Path of the file to summarize".to_string()),
                        required: Some(true),
                    }]),
                ),
            ],
            ..Default::default()
        }))
    }

    fn get_prompt(
        &self,
        request: GetPromptRequestParam,
        context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<GetPromptResult, ErrorData>> + Send + '_ {
        let response = match request.name.as_ref() {
            CODE_REVIEW_PROMPT_NAME => Ok(prompt_result(
                "Analyzes code quality and suggests improvements",
                CODE_REVIEW_PROMPT.to_string(),
            )),
            SUMMARIZE_FILE_PROMPT_NAME => {
                prompt_argument(&request.arguments, "path").map(|path| {
                    let content = self
                        .store
                        .with_state(&client_identity(&context.peer), |state| {
                            state.files.get(&path).cloned()
                        });
                    // A missing file is a soft failure here: the prompt still
                    // renders, as ordinary text.
                    let text = match content {
                        Some(content) => format!(
                            "Please summarize the following file content from {path}:\n\n{content}"
                        ),
                        None => format!("File not found: {path}"),
                    };
                    prompt_result("Summarizes the content of a file at the given path", text)
                })
            }
            other => Err(ErrorData::invalid_params(
                format!("prompt '{other}' not found"),
                Some(json!({
                    "available_prompts": [CODE_REVIEW_PROMPT_NAME, SUMMARIZE_FILE_PROMPT_NAME]
                })),
            )),
        };
        std::future::ready(response)
    }
}

fn prompt_result(description: &str, text: String) -> GetPromptResult {
    GetPromptResult {
        description: Some(description.to_string()),
        messages: vec![PromptMessage {
            role: PromptMessageRole::User,
            content: PromptMessageContent::Text { text },
        }],
    }
}
