//! Direct exercises of CalcServer behavior outside the numbered scenarios.

use std::sync::Arc;

use rmcp::model::{CallToolRequestParam, ReadResourceRequestParam};
use rmcp::service::ServiceError;
use rmcp::ErrorData;
use serde_json::json;

use comply::client::ScenarioClient;
use comply::server::CalcServer;
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

#[tokio::test(flavor = "multi_thread")]
async fn trig_calls_fail_until_enabled_for_that_client() {
    let store = Arc::new(StateStore::new());
    let (_server, client) = serve_pair(
        CalcServer::new(Arc::clone(&store)),
        ScenarioClient::new("client1", None),
    )
    .await;

    let error = client
        .call_tool(CallToolRequestParam {
            name: "cos".into(),
            arguments: args(json!({ "x": 0.0 })),
        })
        .await
        .expect_err("trig is disabled by default");
    let error = mcp_error(error);
    assert_eq!(error.code, errors::FEATURE_DISABLED);
    assert!(error.message.contains("disabled"));

    let confirmation = client
        .call_tool(CallToolRequestParam {
            name: "set_trig_allowed".into(),
            arguments: args(json!({ "allowed": true })),
        })
        .await
        .expect("enable trig");
    assert_eq!(text_of(&confirmation), "Trigonometric functions enabled");

    let result = client
        .call_tool(CallToolRequestParam {
            name: "cos".into(),
            arguments: args(json!({ "x": 0.0 })),
        })
        .await
        .expect("cos(0)");
    assert_eq!(text_of(&result), "1");

    client.cancel().await.expect("session teardown");
}

#[tokio::test(flavor = "multi_thread")]
async fn special_number_is_isolated_between_identities() {
    let store = Arc::new(StateStore::new());
    let (_server1, client1) = serve_pair(
        CalcServer::new(Arc::clone(&store)),
        ScenarioClient::new("client1", None),
    )
    .await;
    let (_server2, client2) = serve_pair(
        CalcServer::new(Arc::clone(&store)),
        ScenarioClient::new("client2", None),
    )
    .await;

    client1
        .call_tool(CallToolRequestParam {
            name: "write_special_number".into(),
            arguments: args(json!({ "value": 100 })),
        })
        .await
        .expect("write special number");

    let own = client1
        .read_resource(ReadResourceRequestParam {
            uri: "resource://special-number".into(),
        })
        .await
        .expect("client1 read");
    assert_eq!(resource_text_of(&own), "100");

    // client2 still observes the initial value.
    let other = client2
        .read_resource(ReadResourceRequestParam {
            uri: "resource://special-number".into(),
        })
        .await
        .expect("client2 read");
    assert_eq!(resource_text_of(&other), "42");

    client1.cancel().await.expect("client1 teardown");
    client2.cancel().await.expect("client2 teardown");
}

#[tokio::test(flavor = "multi_thread")]
async fn eval_with_sampling_covers_table_and_fallback() {
    let store = Arc::new(StateStore::new());
    let (_server, client) = serve_pair(
        CalcServer::new(store),
        ScenarioClient::new("client1", None),
    )
    .await;

    let table = client
        .call_tool(CallToolRequestParam {
            name: "eval_with_sampling".into(),
            arguments: args(json!({ "expression": "(2 + 3) * (4 + 5)" })),
        })
        .await
        .expect("table expression");
    assert_eq!(text_of(&table), "45");

    let fallback = client
        .call_tool(CallToolRequestParam {
            name: "eval_with_sampling".into(),
            arguments: args(json!({ "expression": "6 * 7" })),
        })
        .await
        .expect("fallback expression");
    assert_eq!(text_of(&fallback), "42");

    let error = client
        .call_tool(CallToolRequestParam {
            name: "eval_with_sampling".into(),
            arguments: args(json!({ "expression": "two plus two" })),
        })
        .await
        .expect_err("unparseable expression");
    let error = mcp_error(error);
    assert_eq!(error.code, errors::EVALUATION_ERROR);
    assert!(error.message.contains("Cannot evaluate expression"));

    client.cancel().await.expect("session teardown");
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_tools_and_resources_are_rejected() {
    let store = Arc::new(StateStore::new());
    let (_server, client) = serve_pair(
        CalcServer::new(store),
        ScenarioClient::new("client1", None),
    )
    .await;

    let tool_error = mcp_error(
        client
            .call_tool(CallToolRequestParam {
                name: "subtract".into(),
                arguments: None,
            })
            .await
            .expect_err("no such tool"),
    );
    assert_eq!(tool_error.code, rmcp::model::ErrorCode::INVALID_PARAMS);

    let resource_error = mcp_error(
        client
            .read_resource(ReadResourceRequestParam {
                uri: "resource://other".into(),
            })
            .await
            .expect_err("no such resource"),
    );
    assert_eq!(resource_error.code, errors::NOT_FOUND);

    client.cancel().await.expect("session teardown");
}
