//! Error types for the mock backend.

use crowdkit_client::Response;
use crowdkit_protocol::{codes, unstructure, ApiErrorBody};
use serde_json::{Map, Value};
use thiserror::Error;

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors the backend answers with a non-2xx response.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    /// The request is malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// One or more fields failed validation.
    #[error("validation failed")]
    Validation {
        /// Field (or item index) to error details.
        payload: Map<String, Value>,
    },

    /// The record, operation or route does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The idempotency token was used before.
    #[error("operation {0} already exists")]
    OperationExists(String),

    /// Injected server failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BackendError {
    /// HTTP status of the error response.
    pub fn status(&self) -> u16 {
        match self {
            BackendError::InvalidRequest(_) | BackendError::Validation { .. } => 400,
            BackendError::NotFound(_) => 404,
            BackendError::OperationExists(_) => 409,
            BackendError::Internal(_) => 500,
        }
    }

    /// API error code of the error response.
    pub fn code(&self) -> &'static str {
        match self {
            BackendError::InvalidRequest(_) => codes::INCORRECT_ACTION,
            BackendError::Validation { .. } => codes::VALIDATION_ERROR,
            BackendError::NotFound(_) => codes::DOES_NOT_EXIST,
            BackendError::OperationExists(_) => codes::OPERATION_ALREADY_EXISTS,
            BackendError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Renders the error as an API response.
    pub fn into_response(self, request_id: &str) -> Response {
        let status = self.status();
        let mut body = ApiErrorBody::new(self.code(), self.to_string()).with_request_id(request_id);
        if let BackendError::Validation { payload } = self {
            body = body.with_payload(Value::Object(payload));
        }
        match unstructure(&body) {
            Ok(json) => Response::json(status, json),
            Err(_) => Response::empty(status),
        }
    }
}
