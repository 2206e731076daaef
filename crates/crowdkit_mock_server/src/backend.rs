//! The backend as a transport.

use crate::config::BackendConfig;
use crate::error::BackendError;
use crate::faults::{Fault, FaultPlan};
use crate::handler::RequestHandler;
use crowdkit_client::{
    BlockingTransport, Method, Request, Response, TransportError, TransportErrorKind,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// In-memory backend answering client requests directly.
///
/// Plug it into a client as a [`BlockingTransport`]; wrap it in
/// [`crowdkit_client::Blocking`] for the async client.
///
/// ```no_run
/// use crowdkit_mock_server::MockBackend;
/// use serde_json::json;
///
/// let backend = MockBackend::new();
/// let id = backend.insert("tasks", json!({"pool_id": "p"}));
/// assert_eq!(backend.count("tasks"), 1);
/// assert!(backend.get_record("tasks", &id).is_some());
/// ```
pub struct MockBackend {
    handler: RequestHandler,
    faults: FaultPlan,
    requests: Mutex<Vec<Request>>,
    request_counter: AtomicU64,
}

impl MockBackend {
    /// Creates a backend with the default configuration.
    pub fn new() -> Self {
        Self::with_config(BackendConfig::default())
    }

    /// Creates a backend with `config`.
    pub fn with_config(config: BackendConfig) -> Self {
        Self {
            handler: RequestHandler::new(config),
            faults: FaultPlan::new(),
            requests: Mutex::new(Vec::new()),
            request_counter: AtomicU64::new(0),
        }
    }

    /// Stores a record as if created earlier and returns its id.
    ///
    /// Non-object values are stored under a `value` field.
    pub fn insert(&self, collection: &str, record: Value) -> String {
        let record = match record {
            Value::Object(map) => map,
            other => {
                let mut map = serde_json::Map::new();
                map.insert("value".into(), other);
                map
            }
        };
        self.handler.insert(collection, record)
    }

    /// Number of records in a collection.
    pub fn count(&self, collection: &str) -> usize {
        self.handler.count(collection)
    }

    /// All records of a collection in id order.
    pub fn records(&self, collection: &str) -> Vec<Value> {
        self.handler.records(collection)
    }

    /// One record by id.
    pub fn get_record(&self, collection: &str, id: &str) -> Option<Value> {
        self.records(collection)
            .into_iter()
            .find(|record| record.get("id").and_then(Value::as_str) == Some(id))
    }

    /// Number of registered operations.
    pub fn operations_count(&self) -> usize {
        self.handler.operation_count()
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().clone()
    }

    /// Number of `method` requests whose path is exactly `path`.
    pub fn request_count(&self, method: Method, path: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|request| request.method == method && request.path == path)
            .count()
    }

    /// Forgets recorded requests.
    pub fn clear_requests(&self) {
        self.requests.lock().clear();
    }

    /// Queues a one-shot fault for the next matching request.
    pub fn inject(&self, method: Method, path_prefix: &str, fault: Fault) {
        self.faults.push(method, path_prefix, fault);
    }

    /// Number of injected faults not yet triggered.
    pub fn pending_faults(&self) -> usize {
        self.faults.pending()
    }

    /// Configuration in use.
    pub fn config(&self) -> &BackendConfig {
        self.handler.config()
    }

    fn respond(&self, request: &Request, request_id: &str) -> Response {
        match self.handler.handle(request) {
            Ok(response) => response,
            Err(err) => {
                debug!(request_id, status = err.status(), error = %err, "request rejected");
                err.into_response(request_id)
            }
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockingTransport for MockBackend {
    fn send(&self, request: &Request) -> Result<Response, TransportError> {
        let request_id = format!(
            "req-{}",
            self.request_counter.fetch_add(1, Ordering::Relaxed) + 1
        );
        self.requests.lock().push(request.clone());

        let Some(fault) = self.faults.take(request.method, &request.path) else {
            return Ok(self.respond(request, &request_id));
        };
        warn!(request_id, method = %request.method, path = %request.path, ?fault, "injecting fault");
        match fault {
            Fault::Network => Err(TransportError::new(
                TransportErrorKind::Connect,
                "connection refused",
            )),
            Fault::Timeout => Err(TransportError::new(
                TransportErrorKind::Timeout,
                "request timed out",
            )),
            Fault::ServerError => {
                Ok(BackendError::Internal("injected failure".into()).into_response(&request_id))
            }
            Fault::LostResponse => {
                let lost = self.respond(request, &request_id);
                debug!(request_id, status = lost.status, "response dropped");
                Ok(BackendError::Internal("response lost".into()).into_response(&request_id))
            }
        }
    }
}
