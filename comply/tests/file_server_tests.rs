//! FileServer behavior: the virtual filesystem, templates, and prompts.

use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParam, GetPromptRequestParam, PromptMessageContent, ReadResourceRequestParam,
};
use rmcp::service::ServiceError;
use rmcp::ErrorData;
use serde_json::json;

use comply::client::ScenarioClient;
use comply::server::FileServer;
use comply_core::errors;
use comply_core::state::StateStore;
use comply_test_support::{resource_text_of, serve_pair, text_of};

fn args(value: serde_json::Value) -> Option<rmcp::model::JsonObject> {
    value.as_object().cloned()
}

fn mcp_error(error: ServiceError) -> ErrorData {
    match error {
        ServiceError::McpError(data) => data,
        other => panic!("expected protocol error, got {other}"),
    }
}

fn prompt_text(result: &rmcp::model::GetPromptResult) -> String {
    match &result.messages.first().expect("prompt message").content {
        PromptMessageContent::Text { text } => text.clone(),
        other => panic!("expected text prompt content, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn written_files_are_readable_through_the_template() {
    let store = Arc::new(StateStore::new());
    let (_server, client) = serve_pair(
        FileServer::new(store),
        ScenarioClient::new("client1", None),
    )
    .await;

    let written = client
        .call_tool(CallToolRequestParam {
            name: "write_file".into(),
            arguments: args(json!({ "path": "/notes.txt", "content": "remember the milk" })),
        })
        .await
        .expect("write file");
    assert_eq!(text_of(&written), "File /notes.txt written successfully");

    let read = client
        .read_resource(ReadResourceRequestParam {
            uri: "file:///notes.txt".into(),
        })
        .await
        .expect("read written file");
    assert_eq!(resource_text_of(&read), "remember the milk");

    // Seeded files resolve the same way.
    let seeded = client
        .read_resource(ReadResourceRequestParam {
            uri: "file:///readme.txt".into(),
        })
        .await
        .expect("read seeded file");
    assert_eq!(resource_text_of(&seeded), "Initial readme content");

    client.cancel().await.expect("session teardown");
}

#[tokio::test(flavor = "multi_thread")]
async fn deleting_a_file_makes_later_reads_fail() {
    let store = Arc::new(StateStore::new());
    let (_server, client) = serve_pair(
        FileServer::new(store),
        ScenarioClient::new("client1", None),
    )
    .await;

    let deleted = client
        .call_tool(CallToolRequestParam {
            name: "delete_file".into(),
            arguments: args(json!({ "path": "/readme.txt" })),
        })
        .await
        .expect("delete seeded file");
    assert_eq!(text_of(&deleted), "File /readme.txt deleted successfully");

    let read_error = mcp_error(
        client
            .read_resource(ReadResourceRequestParam {
                uri: "file:///readme.txt".into(),
            })
            .await
            .expect_err("file is gone"),
    );
    assert_eq!(read_error.code, errors::NOT_FOUND);

    let delete_error = mcp_error(
        client
            .call_tool(CallToolRequestParam {
                name: "delete_file".into(),
                arguments: args(json!({ "path": "/missing.txt" })),
            })
            .await
            .expect_err("nothing to delete"),
    );
    assert_eq!(delete_error.code, errors::NOT_FOUND);
    assert!(delete_error.message.contains("File not found"));

    client.cancel().await.expect("session teardown");
}

#[tokio::test(flavor = "multi_thread")]
async fn files_are_isolated_between_identities() {
    let store = Arc::new(StateStore::new());
    let (_server1, client1) = serve_pair(
        FileServer::new(Arc::clone(&store)),
        ScenarioClient::new("client1", None),
    )
    .await;
    let (_server2, client2) = serve_pair(
        FileServer::new(Arc::clone(&store)),
        ScenarioClient::new("client2", None),
    )
    .await;

    client1
        .call_tool(CallToolRequestParam {
            name: "delete_file".into(),
            arguments: args(json!({ "path": "/watched.txt" })),
        })
        .await
        .expect("client1 delete");

    // client2's copy is untouched.
    let read = client2
        .read_resource(ReadResourceRequestParam {
            uri: "file:///watched.txt".into(),
        })
        .await
        .expect("client2 read");
    assert_eq!(resource_text_of(&read), "Initial watched content");

    client1.cancel().await.expect("client1 teardown");
    client2.cancel().await.expect("client2 teardown");
}

#[tokio::test(flavor = "multi_thread")]
async fn static_resource_ignores_state() {
    let store = Arc::new(StateStore::new());
    let (_server, client) = serve_pair(
        FileServer::new(Arc::clone(&store)),
        ScenarioClient::new("client1", None),
    )
    .await;

    client
        .call_tool(CallToolRequestParam {
            name: "delete_file".into(),
            arguments: args(json!({ "path": "/test/static.txt" })),
        })
        .await
        .expect("delete the shadowing state entry");

    let read = client
        .read_resource(ReadResourceRequestParam {
            uri: "file:///test/static.txt".into(),
        })
        .await
        .expect("static read still works");
    assert_eq!(resource_text_of(&read), "Static test file content");

    client.cancel().await.expect("session teardown");
}

#[tokio::test(flavor = "multi_thread")]
async fn prompts_render_fixed_and_templated_text() {
    let store = Arc::new(StateStore::new());
    let (_server, client) = serve_pair(
        FileServer::new(store),
        ScenarioClient::new("client1", None),
    )
    .await;

    let review = client
        .get_prompt(GetPromptRequestParam {
            name: "code_review".into(),
            arguments: None,
        })
        .await
        .expect("code_review prompt");
    assert!(prompt_text(&review).contains("review this code"));

    let summary = client
        .get_prompt(GetPromptRequestParam {
            name: "summarize_file".into(),
            arguments: args(json!({ "path": "/readme.txt" })),
        })
        .await
        .expect("summarize_file prompt");
    let text = prompt_text(&summary);
    assert!(text.contains("Please summarize the following file content from /readme.txt"));
    assert!(text.contains("Initial readme content"));

    // Missing file: a soft not-found message rendered as normal text, not a
    // protocol error.
    let missing = client
        .get_prompt(GetPromptRequestParam {
            name: "summarize_file".into(),
            arguments: args(json!({ "path": "/missing.txt" })),
        })
        .await
        .expect("summarize_file prompt for missing file");
    assert_eq!(prompt_text(&missing), "File not found: /missing.txt");

    client.cancel().await.expect("session teardown");
}

#[tokio::test(flavor = "multi_thread")]
async fn template_listing_advertises_the_file_template() {
    let store = Arc::new(StateStore::new());
    let (_server, client) = serve_pair(
        FileServer::new(store),
        ScenarioClient::new("client1", None),
    )
    .await;

    let templates = client
        .list_resource_templates(Default::default())
        .await
        .expect("resource templates");
    let uris: Vec<String> = templates
        .resource_templates
        .iter()
        .map(|template| template.uri_template.clone())
        .collect();
    assert_eq!(uris, vec!["file:///{path}".to_string()]);

    client.cancel().await.expect("session teardown");
}
