//! Transport layer abstraction for API requests.
//!
//! A transport sends one [`Request`] and returns the raw [`Response`],
//! whatever its status. Only failures to obtain a response at all are
//! reported as [`TransportError`]; status handling belongs to the client.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET.
    Get,
    /// POST.
    Post,
    /// PATCH.
    Patch,
    /// PUT.
    Put,
    /// DELETE.
    Delete,
}

impl Method {
    /// Returns the method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An API request relative to `<base_url>/api`.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Path such as `/v1/tasks`.
    pub path: String,
    /// Query pairs in order.
    pub query: Vec<(String, String)>,
    /// JSON body.
    pub body: Option<Value>,
}

impl Request {
    /// Creates a request without query or body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Creates a GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// Creates a POST request with a JSON body.
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, path).with_body(body)
    }

    /// Appends query pairs.
    pub fn with_query(mut self, pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    /// Sets the JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Returns the first value of a query parameter.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Body of a response.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// A JSON document.
    Json(Value),
    /// Non-JSON content.
    Bytes(Vec<u8>),
    /// No content.
    Empty,
}

/// A response of any status.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// HTTP status.
    pub status: u16,
    /// Body.
    pub body: ResponseBody,
}

impl Response {
    /// Creates a response with a JSON body.
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: ResponseBody::Json(body),
        }
    }

    /// Creates a response without a body.
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            body: ResponseBody::Empty,
        }
    }

    /// Builds a response from raw bytes, recognizing JSON.
    pub fn from_bytes(status: u16, bytes: Vec<u8>) -> Self {
        let body = if bytes.is_empty() {
            ResponseBody::Empty
        } else {
            match serde_json::from_slice(&bytes) {
                Ok(value) => ResponseBody::Json(value),
                Err(_) => ResponseBody::Bytes(bytes),
            }
        };
        Self { status, body }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns the JSON body, if any.
    pub fn json_body(&self) -> Option<&Value> {
        match &self.body {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Consumes the response, returning the JSON body, if any.
    pub fn into_json(self) -> Option<Value> {
        match self.body {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }
}

/// What went wrong while obtaining a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The connection could not be established.
    Connect,
    /// No response within the timeout.
    Timeout,
    /// The connection broke mid-request.
    Io,
    /// Anything else, such as an invalid URL or TLS setup.
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransportErrorKind::Connect => "connect",
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Io => "io",
            TransportErrorKind::Other => "other",
        })
    }
}

/// Failure to obtain any response.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind} error: {message}")]
pub struct TransportError {
    /// What failed.
    pub kind: TransportErrorKind,
    /// Description.
    pub message: String,
}

impl TransportError {
    /// Creates a transport error.
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// A blocking transport.
///
/// Implementations must be safe to share across threads; each call is independent.
pub trait BlockingTransport: Send + Sync {
    /// Sends a request and waits for the response.
    fn send(&self, request: &Request) -> Result<Response, TransportError>;
}

/// An asynchronous transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a request and resolves to the response.
    async fn send(&self, request: &Request) -> Result<Response, TransportError>;
}

impl<T: BlockingTransport + ?Sized> BlockingTransport for Arc<T> {
    fn send(&self, request: &Request) -> Result<Response, TransportError> {
        (**self).send(request)
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: &Request) -> Result<Response, TransportError> {
        (**self).send(request).await
    }
}

/// Adapts a [`BlockingTransport`] to the [`Transport`] seam.
///
/// The returned future completes on first poll; it blocks the polling thread
/// for the duration of the request.
#[derive(Debug, Clone)]
pub struct Blocking<T>(pub T);

impl<T> Blocking<T> {
    /// Returns the wrapped transport.
    pub fn get_ref(&self) -> &T {
        &self.0
    }
}

#[async_trait]
impl<T: BlockingTransport> Transport for Blocking<T> {
    async fn send(&self, request: &Request) -> Result<Response, TransportError> {
        self.0.send(request)
    }
}

/// A scripted transport for testing.
///
/// Responses are returned in the order they were queued; every request is recorded.
#[derive(Debug, Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<Result<Response, TransportError>>>,
    requests: Mutex<Vec<Request>>,
}

impl MockTransport {
    /// Creates a mock transport with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response.
    pub fn push_response(&self, response: Response) {
        self.script.lock().push_back(Ok(response));
    }

    /// Queues a JSON response.
    pub fn push_json(&self, status: u16, body: Value) {
        self.push_response(Response::json(status, body));
    }

    /// Queues a transport failure.
    pub fn push_error(&self, error: TransportError) {
        self.script.lock().push_back(Err(error));
    }

    /// Returns all requests sent so far.
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().clone()
    }

    /// Returns the number of scripted responses not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

impl BlockingTransport for MockTransport {
    fn send(&self, request: &Request) -> Result<Response, TransportError> {
        self.requests.lock().push(request.clone());
        self.script.lock().pop_front().unwrap_or_else(|| {
            Err(TransportError::new(
                TransportErrorKind::Other,
                format!("no scripted response for {} {}", request.method, request.path),
            ))
        })
    }
}
