//! Elicitation exchange outcomes and the client-side responder policy.
//!
//! An elicitation is a mid-call request from a server tool back to the
//! calling client for additional structured input. Exactly one exchange is
//! outstanding per in-flight call; the session layer correlates the
//! request/response pair, so this module only models the two ends: decoding
//! the outcome on the server side and producing a response on the client
//! side.
//!
//! Policy: a client that has not registered a responder answers `decline`.
//! Declining is the conservative default — the harness never invents data on
//! behalf of a user, and scenarios specifically probe for the resulting
//! "declined" error.

use rmcp::model::{
    CreateElicitationRequestParam, CreateElicitationResult, ElicitationAction, ElicitationSchema,
};
use serde_json::{json, Value};

/// Terminal outcome of one elicitation exchange, as seen by the initiating
/// tool handler.
#[derive(Clone, Debug, PartialEq)]
pub enum ElicitationOutcome {
    /// The user supplied the requested payload.
    Accept(Value),
    /// The user declined to provide input.
    Decline,
    /// The user cancelled the exchange.
    Cancel,
}

impl ElicitationOutcome {
    /// Decodes a protocol-level elicitation result.
    ///
    /// An accept with no content is treated as an empty object: the action is
    /// authoritative, missing fields surface later as validation failures.
    pub fn from_result(result: CreateElicitationResult) -> Self {
        match result.action {
            ElicitationAction::Accept => {
                Self::Accept(result.content.unwrap_or_else(|| json!({})))
            }
            ElicitationAction::Decline => Self::Decline,
            ElicitationAction::Cancel => Self::Cancel,
        }
    }

    /// Extracts an integer field from an accepted payload.
    pub fn integer_field(&self, field: &str) -> Option<i64> {
        match self {
            Self::Accept(content) => content.get(field).and_then(Value::as_i64),
            _ => None,
        }
    }
}

/// How a scenario client answers elicitation requests.
///
/// Responders are pure functions of the request parameters; picking one is
/// done per scenario before the session is established.
#[derive(Clone, Debug, PartialEq)]
pub enum ElicitationResponder {
    /// Accept with `{field: value}` when the prompt mentions `field`;
    /// decline otherwise.
    AcceptInteger {
        /// Field name the server is expected to ask for.
        field: &'static str,
        /// Value supplied on accept.
        value: i64,
    },
    /// Always decline.
    Decline,
    /// Always cancel.
    Cancel,
}

impl ElicitationResponder {
    /// Produces the response for one elicitation request.
    pub fn respond(&self, request: &CreateElicitationRequestParam) -> CreateElicitationResult {
        match self {
            Self::AcceptInteger { field, value } => {
                if request.message.to_lowercase().contains(field) {
                    let mut content = serde_json::Map::new();
                    content.insert((*field).to_string(), json!(value));
                    CreateElicitationResult {
                        action: ElicitationAction::Accept,
                        content: Some(Value::Object(content)),
                    }
                } else {
                    unhandled_response()
                }
            }
            Self::Decline => CreateElicitationResult {
                action: ElicitationAction::Decline,
                content: None,
            },
            Self::Cancel => CreateElicitationResult {
                action: ElicitationAction::Cancel,
                content: None,
            },
        }
    }
}

/// Response used when no responder is registered: decline.
pub fn unhandled_response() -> CreateElicitationResult {
    CreateElicitationResult {
        action: ElicitationAction::Decline,
        content: None,
    }
}
