//! The scenario executor: maps scenario ids to literal call sequences.
//!
//! Dispatch is a lookup table from scenario id to runner function, validated
//! exhaustively against the catalog at startup so an id without a runner is
//! caught before any connection is made. Runners perform the exact calls the
//! scenario prescribes and assert on results; nothing is retried or
//! recovered locally.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use rmcp::model::{
    CallToolRequestParam, CallToolResult, GetPromptRequestParam, PromptMessageContent,
    ReadResourceRequestParam, ReadResourceResult, ResourceContents,
};
use rmcp::service::ServiceError;
use serde_json::{json, Value};

use comply_core::elicit::ElicitationResponder;
use comply_core::{errors, Catalog};

use crate::client::ClientSession;

/// Boxed future returned by a scenario runner.
type ScenarioFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ScenarioError>> + Send + 'a>>;

/// One entry in the scenario dispatch table.
pub type ScenarioRunner = for<'a> fn(&'a ClientSession, &'a str) -> ScenarioFuture<'a>;

/// Errors produced while executing a scenario.
#[derive(Debug)]
pub enum ScenarioError {
    /// The scenario id is not in the catalog.
    UnknownScenario(u32),
    /// The client id is not a declared participant of the scenario.
    NotAParticipant {
        /// The scenario id.
        scenario_id: u32,
        /// The rejected client id.
        client_id: String,
    },
    /// The scenario requires an HTTP transport.
    HttpOnly(u32),
    /// The catalog names a scenario this executor has no runner for.
    MissingRunner(u32),
    /// The session layer failed.
    Session(ServiceError),
    /// A scenario assertion did not hold.
    Assertion(String),
}

impl fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioError::UnknownScenario(id) => write!(f, "scenario {id} not found"),
            ScenarioError::NotAParticipant {
                scenario_id,
                client_id,
            } => write!(f, "client '{client_id}' is not part of scenario {scenario_id}"),
            ScenarioError::HttpOnly(id) => {
                write!(f, "scenario {id} requires an HTTP transport")
            }
            ScenarioError::MissingRunner(id) => {
                write!(f, "scenario {id} is in the catalog but has no runner")
            }
            ScenarioError::Session(error) => write!(f, "session error: {error}"),
            ScenarioError::Assertion(message) => write!(f, "assertion failed: {message}"),
        }
    }
}

impl std::error::Error for ScenarioError {}

impl From<ServiceError> for ScenarioError {
    fn from(error: ServiceError) -> Self {
        ScenarioError::Session(error)
    }
}

/// Picks the elicitation responder a scenario needs, before connecting.
pub fn responder_for(scenario_id: u32) -> Option<ElicitationResponder> {
    match scenario_id {
        2 => Some(ElicitationResponder::AcceptInteger {
            field: "b",
            value: 20,
        }),
        24 => Some(ElicitationResponder::Decline),
        _ => None,
    }
}

/// Looks up the runner for a scenario id.
pub fn runner_for(scenario_id: u32) -> Option<ScenarioRunner> {
    match scenario_id {
        1 => Some(|session, client_id| Box::pin(scenario_basic_add(session, client_id))),
        2 => Some(|session, client_id| Box::pin(scenario_elicited_add(session, client_id))),
        3 => Some(|session, client_id| Box::pin(scenario_trig_visibility(session, client_id))),
        4 => Some(|session, client_id| Box::pin(scenario_special_number(session, client_id))),
        5 => Some(|session, client_id| Box::pin(scenario_maths_prompt(session, client_id))),
        6 => Some(|session, client_id| Box::pin(scenario_eval_with_sampling(session, client_id))),
        24 => Some(|session, client_id| Box::pin(scenario_declined_add(session, client_id))),
        25 => Some(|session, client_id| Box::pin(scenario_concurrent_adds(session, client_id))),
        _ => None,
    }
}

/// Verifies every cataloged scenario has a runner. Run once at startup.
pub fn validate_runners(catalog: &Catalog) -> Result<(), ScenarioError> {
    for scenario in &catalog.scenarios {
        if runner_for(scenario.id).is_none() {
            return Err(ScenarioError::MissingRunner(scenario.id));
        }
    }
    Ok(())
}

/// Executes one scenario against an established session.
pub async fn execute(
    catalog: &Catalog,
    scenario_id: u32,
    client_id: &str,
    session: &ClientSession,
) -> Result<(), ScenarioError> {
    let scenario = catalog
        .scenario(scenario_id)
        .ok_or(ScenarioError::UnknownScenario(scenario_id))?;
    if !scenario.client_ids.iter().any(|id| id == client_id) {
        return Err(ScenarioError::NotAParticipant {
            scenario_id,
            client_id: client_id.to_string(),
        });
    }
    let runner = runner_for(scenario_id).ok_or(ScenarioError::MissingRunner(scenario_id))?;
    log::info!("running scenario {scenario_id}: {}", scenario.description);
    runner(session, client_id).await
}

fn ensure(condition: bool, message: impl Into<String>) -> Result<(), ScenarioError> {
    if condition {
        Ok(())
    } else {
        Err(ScenarioError::Assertion(message.into()))
    }
}

fn arguments(value: Value) -> Option<rmcp::model::JsonObject> {
    value.as_object().cloned()
}

fn text_content(result: &CallToolResult) -> Result<String, ScenarioError> {
    result
        .content
        .first()
        .and_then(|content| content.as_text())
        .map(|text| text.text.clone())
        .ok_or_else(|| ScenarioError::Assertion("tool result carried no text content".to_string()))
}

fn int_content(result: &CallToolResult) -> Result<i64, ScenarioError> {
    let text = text_content(result)?;
    text.trim()
        .parse::<i64>()
        .map_err(|_| ScenarioError::Assertion(format!("expected integer content, got '{text}'")))
}

fn float_content(result: &CallToolResult) -> Result<f64, ScenarioError> {
    let text = text_content(result)?;
    text.trim()
        .parse::<f64>()
        .map_err(|_| ScenarioError::Assertion(format!("expected numeric content, got '{text}'")))
}

fn resource_text(result: &ReadResourceResult) -> Result<String, ScenarioError> {
    match result.contents.first() {
        Some(ResourceContents::TextResourceContents { text, .. }) => Ok(text.clone()),
        _ => Err(ScenarioError::Assertion(
            "resource read carried no text contents".to_string(),
        )),
    }
}

async fn call_add(session: &ClientSession, a: i64, b: i64) -> Result<CallToolResult, ScenarioError> {
    session
        .call_tool(CallToolRequestParam {
            name: "add".into(),
            arguments: arguments(json!({ "a": a, "b": b })),
        })
        .await
        .map_err(ScenarioError::from)
}

async fn scenario_basic_add(session: &ClientSession, _client_id: &str) -> Result<(), ScenarioError> {
    let result = call_add(session, 10, 20).await?;
    let value = int_content(&result)?;
    ensure(value == 30, format!("expected 30, got {value}"))
}

async fn scenario_elicited_add(
    session: &ClientSession,
    _client_id: &str,
) -> Result<(), ScenarioError> {
    let result = session
        .call_tool(CallToolRequestParam {
            name: "ambiguous_add".into(),
            arguments: arguments(json!({ "a": 10 })),
        })
        .await?;
    let value = int_content(&result)?;
    ensure(value == 30, format!("expected 30, got {value}"))
}

async fn scenario_trig_visibility(
    session: &ClientSession,
    client_id: &str,
) -> Result<(), ScenarioError> {
    if client_id == "client1" {
        session
            .call_tool(CallToolRequestParam {
                name: "set_trig_allowed".into(),
                arguments: arguments(json!({ "allowed": true })),
            })
            .await?;
        let tools = session.list_tools(Default::default()).await?;
        let names: Vec<String> = tools
            .tools
            .iter()
            .map(|tool| tool.name.to_string())
            .collect();
        ensure(
            names.contains(&"cos".to_string()) && names.contains(&"sin".to_string()),
            format!("expected cos and sin in tools, got {names:?}"),
        )
    } else {
        let tools = session.list_tools(Default::default()).await?;
        let names: Vec<String> = tools
            .tools
            .iter()
            .map(|tool| tool.name.to_string())
            .collect();
        ensure(
            !names.contains(&"cos".to_string()) && !names.contains(&"sin".to_string()),
            format!("expected cos and sin NOT in tools, got {names:?}"),
        )
    }
}

async fn scenario_special_number(
    session: &ClientSession,
    _client_id: &str,
) -> Result<(), ScenarioError> {
    let initial = session
        .read_resource(ReadResourceRequestParam {
            uri: "resource://special-number".into(),
        })
        .await?;
    let initial_value = resource_text(&initial)?;
    ensure(
        initial_value.trim() == "42",
        format!("expected initial value 42, got {initial_value}"),
    )?;

    session
        .call_tool(CallToolRequestParam {
            name: "write_special_number".into(),
            arguments: arguments(json!({ "value": 100 })),
        })
        .await?;

    let updated = session
        .read_resource(ReadResourceRequestParam {
            uri: "resource://special-number".into(),
        })
        .await?;
    let updated_value = resource_text(&updated)?;
    ensure(
        updated_value.trim() == "100",
        format!("expected updated value 100, got {updated_value}"),
    )
}

async fn scenario_maths_prompt(
    session: &ClientSession,
    _client_id: &str,
) -> Result<(), ScenarioError> {
    let prompt = session
        .get_prompt(GetPromptRequestParam {
            name: "example-maths".into(),
            arguments: None,
        })
        .await?;
    let first = prompt
        .messages
        .first()
        .ok_or_else(|| ScenarioError::Assertion("expected at least one prompt message".to_string()))?;
    let text = match &first.content {
        PromptMessageContent::Text { text } => text.clone(),
        other => {
            return Err(ScenarioError::Assertion(format!(
                "expected text prompt content, got {other:?}"
            )))
        }
    };
    ensure(
        text.to_lowercase().contains("mathematical"),
        format!("expected mathematical content in prompt, got: {text}"),
    )
}

async fn scenario_eval_with_sampling(
    session: &ClientSession,
    _client_id: &str,
) -> Result<(), ScenarioError> {
    let result = session
        .call_tool(CallToolRequestParam {
            name: "eval_with_sampling".into(),
            arguments: arguments(json!({ "expression": "2 + 2 * 3" })),
        })
        .await?;
    let value = float_content(&result)?;
    ensure(value == 8.0, format!("expected 8.0, got {value}"))
}

async fn scenario_declined_add(
    session: &ClientSession,
    _client_id: &str,
) -> Result<(), ScenarioError> {
    match session
        .call_tool(CallToolRequestParam {
            name: "ambiguous_add".into(),
            arguments: arguments(json!({ "a": 10 })),
        })
        .await
    {
        Ok(result) if result.is_error.unwrap_or(false) => {
            let text = text_content(&result)?;
            ensure(
                text.to_lowercase().contains("declined"),
                format!("wrong error message: {text}"),
            )
        }
        Ok(_) => Err(ScenarioError::Assertion(
            "expected an error but the call succeeded".to_string(),
        )),
        Err(ServiceError::McpError(error)) => ensure(
            error.code == errors::USER_DECLINED || error.message.to_lowercase().contains("declined"),
            format!("wrong error: code {:?}, message '{}'", error.code, error.message),
        ),
        Err(other) => Err(ScenarioError::Session(other)),
    }
}

async fn scenario_concurrent_adds(
    session: &ClientSession,
    _client_id: &str,
) -> Result<(), ScenarioError> {
    // Three calls in flight at once; join_all keeps issuance order.
    let results = futures::future::join_all([
        call_add(session, 1, 2),
        call_add(session, 3, 4),
        call_add(session, 5, 6),
    ])
    .await;
    for (result, expected) in results.into_iter().zip([3i64, 7, 11]) {
        let value = int_content(&result?)?;
        ensure(
            value == expected,
            format!("expected {expected}, got {value}"),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn shipped_catalog() -> Catalog {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../scenarios/data.json");
        comply_core::load_catalog(Some(&path)).expect("shipped catalog")
    }

    #[test]
    fn every_cataloged_scenario_has_a_runner() {
        validate_runners(&shipped_catalog()).expect("full coverage");
    }

    #[test]
    fn unknown_scenario_has_no_runner() {
        assert!(runner_for(999).is_none());
    }

    #[test]
    fn responders_are_a_pure_function_of_scenario_id() {
        assert_eq!(
            responder_for(2),
            Some(ElicitationResponder::AcceptInteger {
                field: "b",
                value: 20
            })
        );
        assert_eq!(responder_for(24), Some(ElicitationResponder::Decline));
        for id in [1, 3, 4, 5, 6, 25] {
            assert_eq!(responder_for(id), None);
        }
    }

    #[test]
    fn validate_runners_flags_uncovered_ids() {
        let mut catalog = shipped_catalog();
        catalog.scenarios.push(comply_core::ScenarioDefinition {
            id: 999,
            description: "uncovered".to_string(),
            client_ids: vec!["client1".to_string()],
            server_name: "CalcServer".to_string(),
            http_only: false,
        });
        let error = validate_runners(&catalog).expect_err("missing runner");
        assert!(matches!(error, ScenarioError::MissingRunner(999)));
    }

    #[test]
    fn scenario_errors_render_for_operators() {
        let error = ScenarioError::NotAParticipant {
            scenario_id: 3,
            client_id: "client9".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "client 'client9' is not part of scenario 3"
        );
        assert_eq!(
            ScenarioError::UnknownScenario(42).to_string(),
            "scenario 42 not found"
        );
    }
}
