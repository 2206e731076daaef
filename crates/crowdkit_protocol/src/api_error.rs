//! Error bodies returned by the API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Well-known error codes.
pub mod codes {
    /// The idempotency token was already used for an operation.
    pub const OPERATION_ALREADY_EXISTS: &str = "OPERATION_ALREADY_EXISTS";
    /// The request failed validation; the payload maps fields to errors.
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    /// Unexpected server failure.
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
    /// Missing or invalid credentials.
    pub const AUTHENTICATION_ERROR: &str = "AUTHENTICATION_ERROR";
    /// Credentials lack permission.
    pub const ACCESS_DENIED: &str = "ACCESS_DENIED";
    /// The requested object does not exist.
    pub const DOES_NOT_EXIST: &str = "DOES_NOT_EXIST";
    /// The object is in a state that forbids the action.
    pub const CONFLICT_STATE: &str = "CONFLICT_STATE";
    /// Rate limit exceeded.
    pub const TOO_MANY_REQUESTS: &str = "TOO_MANY_REQUESTS";
    /// A dependency of the server is unavailable.
    pub const REMOTE_SERVICE_UNAVAILABLE: &str = "REMOTE_SERVICE_UNAVAILABLE";
    /// The action is not applicable.
    pub const INCORRECT_ACTION: &str = "INCORRECT_ACTION";
}

/// JSON body of a non-2xx response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// Error code, see [`codes`].
    pub code: String,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// Server-side request id, useful in support requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Code-specific details. For validation errors, a map of field to error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl ApiErrorBody {
    /// Creates a body without request id or payload.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            request_id: None,
            payload: None,
        }
    }

    /// Attaches a payload.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Attaches a request id.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}
