//! Request routing and collection semantics.

use crate::config::BackendConfig;
use crate::error::{BackendError, BackendResult};
use crate::operations::OperationStore;
use crate::storage::Storage;
use crowdkit_client::{Method, Request, Response};
use crowdkit_protocol::{
    structure, unstructure, CreateParameters, Entity, LogItemType, Money, Operation,
    OperationLogItem, OperationStatus, OperationType, Task, TaskSuite, UserBonus,
    CORRELATION_KEY,
};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use tracing::{debug, info};
use uuid::Uuid;

/// Log entry type written when a pool is opened after creation.
const POOL_OPEN_LOG_TYPE: &str = "POOL_OPEN";

/// How a collection is created and validated.
#[derive(Debug, Clone, Copy)]
struct CollectionMeta {
    name: &'static str,
    operation_type: &'static str,
    log_types: &'static [&'static str],
    id_field: &'static str,
    scope_field: Option<&'static str>,
    required: &'static [&'static str],
}

impl CollectionMeta {
    fn of<E: Entity>(required: &'static [&'static str]) -> Self {
        Self {
            name: E::COLLECTION,
            operation_type: E::OPERATION_TYPE,
            log_types: E::CREATE_LOG_TYPES,
            id_field: E::OUTPUT_ID_FIELD,
            scope_field: E::SCOPE_FIELD,
            required,
        }
    }

    fn lookup(segment: &str) -> BackendResult<Self> {
        [
            Self::of::<Task>(&["pool_id"]),
            Self::of::<TaskSuite>(&["pool_id", "tasks"]),
            Self::of::<UserBonus>(&["user_id", "amount"]),
        ]
        .into_iter()
        .find(|meta| meta.name == segment)
        .ok_or_else(|| BackendError::NotFound(format!("collection {segment}")))
    }

    fn created_log_type(&self) -> LogItemType {
        LogItemType::from(self.log_types.first().copied().unwrap_or("CREATE"))
    }

    fn rejected_log_type(&self) -> LogItemType {
        LogItemType::from(self.log_types.get(1).copied().unwrap_or("VALIDATE"))
    }
}

fn field_error(code: &str, message: &str) -> Value {
    json!({ "code": code, "message": message })
}

/// Checks an item, returning its field errors.
fn validate(meta: &CollectionMeta, item: &Map<String, Value>) -> Result<(), Map<String, Value>> {
    let mut errors = Map::new();
    for field in meta.required {
        let missing = match item.get(*field) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(Value::Array(a)) => a.is_empty(),
            _ => false,
        };
        if missing {
            errors.insert(
                field.to_string(),
                field_error("VALUE_REQUIRED", "Value must be present and not equal to null"),
            );
        }
    }
    if let Some(Value::Object(inputs)) = item.get("input_values") {
        for (name, value) in inputs {
            if value.is_null() {
                errors.insert(
                    format!("input_values.{name}"),
                    field_error("VALUE_REQUIRED", "Value must be present and not equal to null"),
                );
            }
        }
    }
    if let Some(amount) = item.get("amount").filter(|amount| !amount.is_null()) {
        if structure::<Money>(amount.clone()).is_err() {
            errors.insert(
                "amount".into(),
                field_error("INVALID_VALUE", "Value must be a decimal number"),
            );
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn to_json<T: Serialize>(value: &T) -> BackendResult<Value> {
    unstructure(value).map_err(|e| BackendError::Internal(e.to_string()))
}

/// Outcome of one submitted item.
enum ItemOutcome {
    Created(Value),
    Rejected(Map<String, Value>),
    Skipped,
}

/// Handles API requests against in-memory state.
pub struct RequestHandler {
    config: BackendConfig,
    storage: RwLock<Storage>,
    operations: Mutex<OperationStore>,
}

impl RequestHandler {
    /// Creates a handler with empty state.
    pub fn new(config: BackendConfig) -> Self {
        Self {
            config,
            storage: RwLock::new(Storage::new()),
            operations: Mutex::new(OperationStore::new()),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Stores a record directly, bypassing validation and operations.
    pub fn insert(&self, collection: &str, record: Map<String, Value>) -> String {
        self.storage.write().insert(collection, record)
    }

    /// Returns all records of a collection in id order.
    pub fn records(&self, collection: &str) -> Vec<Value> {
        self.storage.read().records(collection)
    }

    /// Returns the number of records in a collection.
    pub fn count(&self, collection: &str) -> usize {
        self.storage.read().count(collection)
    }

    /// Returns the number of registered operations.
    pub fn operation_count(&self) -> usize {
        self.operations.lock().len()
    }

    /// Routes a request.
    pub fn handle(&self, request: &Request) -> BackendResult<Response> {
        let segments: Vec<&str> = request.path.trim_matches('/').split('/').collect();
        match (request.method, segments.as_slice()) {
            (Method::Get, ["v1", "operations", id]) => self.get_operation(id),
            (Method::Get, ["v1", "operations", id, "log"]) => self.get_operation_log(id),
            (Method::Get, ["v1", collection]) => {
                self.search(CollectionMeta::lookup(collection)?, &request.query)
            }
            (Method::Get, ["v1", collection, id]) => {
                self.get_record(CollectionMeta::lookup(collection)?, id)
            }
            (Method::Post, ["v1", collection]) => {
                self.create(CollectionMeta::lookup(collection)?, request)
            }
            _ => Err(BackendError::NotFound(format!(
                "{} {}",
                request.method, request.path
            ))),
        }
    }

    fn get_operation(&self, id: &str) -> BackendResult<Response> {
        let operation = self
            .operations
            .lock()
            .read(id)
            .ok_or_else(|| BackendError::NotFound(format!("operation {id}")))?;
        Ok(Response::json(200, to_json(&operation)?))
    }

    fn get_operation_log(&self, id: &str) -> BackendResult<Response> {
        let log = self
            .operations
            .lock()
            .log(id)
            .ok_or_else(|| BackendError::NotFound(format!("operation {id}")))?;
        Ok(Response::json(200, to_json(&log)?))
    }

    fn get_record(&self, meta: CollectionMeta, id: &str) -> BackendResult<Response> {
        let record = self
            .storage
            .read()
            .get(meta.name, id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(format!("{} {id}", meta.name)))?;
        Ok(Response::json(200, record))
    }

    fn search(&self, meta: CollectionMeta, query: &[(String, String)]) -> BackendResult<Response> {
        let (items, has_more) = self.storage.read().search(
            meta.name,
            query,
            self.config.default_limit,
            self.config.max_limit,
        )?;
        debug!(collection = meta.name, items = items.len(), has_more, "search");
        Ok(Response::json(
            200,
            json!({ "items": items, "has_more": has_more }),
        ))
    }

    fn create(&self, meta: CollectionMeta, request: &Request) -> BackendResult<Response> {
        let params = CreateParameters::from_query(&request.query)
            .map_err(|e| BackendError::InvalidRequest(e.to_string()))?;
        let (raw_items, single) = match &request.body {
            Some(Value::Array(items)) => (items.clone(), false),
            Some(item @ Value::Object(_)) => (vec![item.clone()], true),
            _ => {
                return Err(BackendError::InvalidRequest(
                    "body must be an object or an array".into(),
                ))
            }
        };
        if raw_items.len() > self.config.max_batch_size {
            return Err(BackendError::InvalidRequest(format!(
                "batch of {} exceeds {}",
                raw_items.len(),
                self.config.max_batch_size
            )));
        }
        let items = raw_items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => Ok(map),
                _ => Err(BackendError::InvalidRequest("items must be objects".into())),
            })
            .collect::<BackendResult<Vec<_>>>()?;

        let mut operations = self.operations.lock();
        let operation_id = params
            .operation_id
            .map_or_else(|| Uuid::new_v4().to_string(), |id| id.to_string());
        if operations.contains(&operation_id) {
            return Err(BackendError::OperationExists(operation_id));
        }

        let checks: Vec<_> = items.iter().map(|item| validate(&meta, item)).collect();
        let reject_all =
            params.skip_invalid_items == Some(false) && checks.iter().any(Result::is_err);

        let mut storage = self.storage.write();
        let mut log = Vec::with_capacity(items.len());
        let mut outcomes = Vec::with_capacity(items.len());
        let mut scopes = BTreeSet::new();
        for (mut item, check) in items.into_iter().zip(checks) {
            let mut input = Map::new();
            if let Some(key) = item.remove(CORRELATION_KEY) {
                input.insert(CORRELATION_KEY.into(), key);
            }
            if let Some(field) = meta.scope_field {
                if let Some(scope) = item.get(field) {
                    input.insert(field.into(), scope.clone());
                    if let Some(scope) = scope.as_str() {
                        scopes.insert(scope.to_string());
                    }
                }
            }

            match check {
                Ok(()) if reject_all => outcomes.push(ItemOutcome::Skipped),
                Ok(()) => {
                    let id = storage.insert(meta.name, item);
                    let mut output = Map::new();
                    output.insert(meta.id_field.into(), Value::String(id.clone()));
                    log.push(OperationLogItem {
                        item_type: meta.created_log_type(),
                        success: true,
                        input,
                        output,
                    });
                    let record = storage.get(meta.name, &id).cloned().unwrap_or(Value::Null);
                    outcomes.push(ItemOutcome::Created(record));
                }
                Err(errors) => {
                    log.push(OperationLogItem {
                        item_type: meta.rejected_log_type(),
                        success: false,
                        input,
                        output: errors.clone(),
                    });
                    outcomes.push(ItemOutcome::Rejected(errors));
                }
            }
        }
        drop(storage);

        if params.open_pool == Some(true) && !reject_all {
            for pool_id in scopes {
                let mut input = Map::new();
                input.insert("pool_id".into(), Value::String(pool_id));
                log.push(OperationLogItem {
                    item_type: LogItemType::from(POOL_OPEN_LOG_TYPE),
                    success: true,
                    input,
                    output: Map::new(),
                });
            }
        }

        let final_status = if reject_all {
            OperationStatus::Fail
        } else {
            OperationStatus::Success
        };
        let mut operation = Operation::new(
            operation_id,
            OperationType::from(meta.operation_type),
            OperationStatus::Pending,
        );
        operation.parameters = Some(Value::Array(
            request
                .query
                .iter()
                .map(|(k, v)| json!({ "name": k, "value": v }))
                .collect(),
        ));
        operation.details = Some(json!({ "items_count": outcomes.len() }));

        if params.async_mode {
            let reported =
                operations.register(operation, final_status, log, self.config.running_polls);
            info!(
                operation_id = %reported.id,
                collection = meta.name,
                items = outcomes.len(),
                "operation started"
            );
            return Ok(Response::json(202, to_json(&reported)?));
        }
        operations.register_finished(operation, final_status, log);
        drop(operations);

        if single {
            return match outcomes.pop() {
                Some(ItemOutcome::Created(record)) => Ok(Response::json(201, record)),
                Some(ItemOutcome::Rejected(payload)) => Err(BackendError::Validation { payload }),
                _ => Err(BackendError::Internal("single item was not processed".into())),
            };
        }

        let mut created = Map::new();
        let mut rejected = Map::new();
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                ItemOutcome::Created(record) => {
                    created.insert(index.to_string(), record);
                }
                ItemOutcome::Rejected(errors) => {
                    rejected.insert(index.to_string(), Value::Object(errors));
                }
                ItemOutcome::Skipped => {}
            }
        }
        if reject_all {
            return Err(BackendError::Validation { payload: rejected });
        }
        Ok(Response::json(
            201,
            json!({ "items": created, "validation_errors": rejected }),
        ))
    }
}
