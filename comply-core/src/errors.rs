//! Stable protocol error codes shared by the test servers and the executor.
//!
//! Each failure kind the scenarios pattern-match on gets its own code, so a
//! client can distinguish a declined elicitation from a disabled feature
//! without scraping messages. `NOT_FOUND` coincides with the MCP
//! resource-not-found code on purpose: file lookups and resource reads fail
//! the same way.

use rmcp::model::{ErrorCode, ErrorData};

/// The user declined an elicitation request.
pub const USER_DECLINED: ErrorCode = ErrorCode(-32000);
/// The user cancelled an elicitation request.
pub const USER_CANCELLED: ErrorCode = ErrorCode(-32001);
/// A scenario, file, or resource does not exist.
pub const NOT_FOUND: ErrorCode = ErrorCode(-32002);
/// A gated feature is disabled for the calling client.
pub const FEATURE_DISABLED: ErrorCode = ErrorCode(-32003);
/// An expression could not be evaluated.
pub const EVALUATION_ERROR: ErrorCode = ErrorCode(-32004);

/// Error for a declined elicitation; the message always contains "declined".
pub fn user_declined(message: impl Into<String>) -> ErrorData {
    ErrorData::new(USER_DECLINED, message.into(), None)
}

/// Error for a cancelled elicitation.
pub fn user_cancelled(message: impl Into<String>) -> ErrorData {
    ErrorData::new(USER_CANCELLED, message.into(), None)
}

/// Error for an absent file, resource, or scenario.
pub fn not_found(message: impl Into<String>) -> ErrorData {
    ErrorData::new(NOT_FOUND, message.into(), None)
}

/// Error for a feature that is disabled for the calling client.
pub fn feature_disabled(message: impl Into<String>) -> ErrorData {
    ErrorData::new(FEATURE_DISABLED, message.into(), None)
}

/// Error for an expression that failed to evaluate.
pub fn evaluation_error(message: impl Into<String>) -> ErrorData {
    ErrorData::new(EVALUATION_ERROR, message.into(), None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_pairwise_distinct() {
        let codes = [
            USER_DECLINED,
            USER_CANCELLED,
            NOT_FOUND,
            FEATURE_DISABLED,
            EVALUATION_ERROR,
            rmcp::model::ErrorCode::INVALID_PARAMS,
        ];
        for (index, left) in codes.iter().enumerate() {
            for right in &codes[index + 1..] {
                assert_ne!(left, right);
            }
        }
    }

    #[test]
    fn declined_error_carries_its_code_and_message() {
        let error = user_declined("User declined to provide input for parameter b");
        assert_eq!(error.code, USER_DECLINED);
        assert!(error.message.contains("declined"));
        assert!(error.data.is_none());
    }

    #[test]
    fn not_found_matches_the_mcp_resource_not_found_code() {
        assert_eq!(NOT_FOUND, rmcp::model::ErrorCode::RESOURCE_NOT_FOUND);
    }
}
