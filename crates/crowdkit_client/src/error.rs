//! Error types for the client.

use crate::config::{is_server_error, DEFAULT_RETRY_STATUSES};
use crate::transport::{TransportError, TransportErrorKind};
use crowdkit_protocol::{codes, structure, unstructure, ApiErrorBody, FieldValidationError, MapError, Operation};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur during client operations.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Network or transport error.
    #[error("transport error ({kind}): {message}")]
    Transport {
        /// Error message.
        message: String,
        /// What failed.
        kind: TransportErrorKind,
        /// Whether the request can be retried.
        retryable: bool,
    },

    /// The request timed out before a response arrived.
    #[error("request timed out")]
    Timeout,

    /// The server answered with a non-2xx status.
    #[error("api error: {0}")]
    Api(ApiError),

    /// A long-running operation ended with status `FAIL`.
    #[error("operation {} failed", .0.id)]
    FailedOperation(Box<Operation>),

    /// Waiting for an operation exceeded the configured deadline.
    #[error("operation {operation_id} not finished after {waited:?}")]
    OperationTimeout {
        /// Operation being waited for.
        operation_id: String,
        /// Time spent waiting.
        waited: Duration,
    },

    /// The server response did not have the expected shape.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// JSON could not be mapped to or from a typed record.
    #[error("mapping error: {0}")]
    Mapping(#[from] MapError),

    /// The configuration cannot drive a client.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ClientError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            kind,
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            kind,
            retryable: false,
        }
    }

    /// Returns true if this error can be retried under the default policy.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Transport { retryable, .. } => *retryable,
            ClientError::Timeout => true,
            ClientError::Api(api) => {
                is_server_error(api.status) || DEFAULT_RETRY_STATUSES.contains(&api.status)
            }
            _ => false,
        }
    }

    /// Returns true if the server reports that the idempotency token was already used.
    pub fn is_idempotency_collision(&self) -> bool {
        matches!(self, ClientError::Api(api) if api.kind == ApiErrorKind::OperationAlreadyExists)
    }

    /// Returns the API error, if this is one.
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            ClientError::Api(api) => Some(api),
            _ => None,
        }
    }
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        match err.kind {
            TransportErrorKind::Timeout => ClientError::Timeout,
            TransportErrorKind::Connect | TransportErrorKind::Io => {
                ClientError::transport_retryable(err.kind, err.message)
            }
            TransportErrorKind::Other => ClientError::transport_fatal(err.kind, err.message),
        }
    }
}

impl From<ApiError> for ClientError {
    fn from(err: ApiError) -> Self {
        ClientError::Api(err)
    }
}

/// Classification of an API error by its code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Per-field validation failure.
    Validation,
    /// Unexpected server failure.
    Internal,
    /// Missing or invalid credentials.
    Authentication,
    /// Credentials lack permission.
    AccessDenied,
    /// The object does not exist.
    DoesNotExist,
    /// The object's state forbids the action.
    ConflictState,
    /// Rate limit exceeded.
    TooManyRequests,
    /// A server dependency is unavailable.
    RemoteServiceUnavailable,
    /// The idempotency token was already used.
    OperationAlreadyExists,
    /// The action is not applicable.
    IncorrectAction,
    /// No error body, or a code this client does not know.
    Unknown,
}

impl ApiErrorKind {
    /// Maps an error code to its kind.
    pub fn from_code(code: &str) -> Self {
        match code {
            codes::VALIDATION_ERROR => ApiErrorKind::Validation,
            codes::INTERNAL_ERROR => ApiErrorKind::Internal,
            codes::AUTHENTICATION_ERROR => ApiErrorKind::Authentication,
            codes::ACCESS_DENIED => ApiErrorKind::AccessDenied,
            codes::DOES_NOT_EXIST => ApiErrorKind::DoesNotExist,
            codes::CONFLICT_STATE => ApiErrorKind::ConflictState,
            codes::TOO_MANY_REQUESTS => ApiErrorKind::TooManyRequests,
            codes::REMOTE_SERVICE_UNAVAILABLE => ApiErrorKind::RemoteServiceUnavailable,
            codes::OPERATION_ALREADY_EXISTS => ApiErrorKind::OperationAlreadyExists,
            codes::INCORRECT_ACTION => ApiErrorKind::IncorrectAction,
            _ => ApiErrorKind::Unknown,
        }
    }
}

/// A non-2xx response from the API.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{status} {code}: {message}")]
pub struct ApiError {
    /// HTTP status.
    pub status: u16,
    /// Classification of `code`.
    pub kind: ApiErrorKind,
    /// Error code from the body, empty if there was none.
    pub code: String,
    /// Message from the body, or the status when there was no body.
    pub message: String,
    /// Server-side request id.
    pub request_id: Option<String>,
    /// Code-specific details.
    pub payload: Option<Value>,
}

impl ApiError {
    /// Creates an error without request id or payload.
    pub fn new(
        status: u16,
        kind: ApiErrorKind,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            kind,
            code: code.into(),
            message: message.into(),
            request_id: None,
            payload: None,
        }
    }

    /// Builds the error for a response with the given status and optional JSON body.
    pub fn from_response(status: u16, body: Option<&Value>) -> Self {
        match body.and_then(|raw| structure::<ApiErrorBody>(raw.clone()).ok()) {
            Some(body) => Self {
                status,
                kind: ApiErrorKind::from_code(&body.code),
                code: body.code,
                message: body.message,
                request_id: body.request_id,
                payload: body.payload,
            },
            None => Self::new(
                status,
                ApiErrorKind::Unknown,
                "",
                format!("HTTP status {status}"),
            ),
        }
    }

    /// Builds a validation error from per-field errors of one item.
    pub fn validation(errors: &BTreeMap<String, FieldValidationError>) -> Self {
        let mut err = Self::new(
            400,
            ApiErrorKind::Validation,
            codes::VALIDATION_ERROR,
            "Validation failed",
        );
        err.payload = unstructure(errors).ok();
        err
    }

    /// Lists the fields named in a validation payload.
    pub fn invalid_fields(&self) -> Vec<String> {
        match &self.payload {
            Some(Value::Object(fields)) => fields.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }
}
