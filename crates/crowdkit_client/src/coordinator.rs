//! Idempotent creation of entities.
//!
//! A create call gets one operation id for its whole lifetime. It is sent on
//! every attempt, so a retried submission either starts the operation or
//! collides with the one an earlier attempt already started; a collision is
//! resolved by reading that operation instead of failing.
//!
//! Every submitted item is tagged with a correlation key, in both modes, since
//! a synchronous call that collided with its own earlier attempt is answered
//! by an operation too. Once the operation finishes, its log maps keys to
//! produced ids or validation errors, and the produced records are read back
//! in bulk.

use crate::client::Client;
use crate::error::{ApiError, ClientError, ClientResult};
use crate::retry::execute_with_retry;
use crate::sleep::Sleeper;
use crate::transport::{Request, Response, Transport};
use chrono::Utc;
use crowdkit_protocol::{
    structure, unstructure, BatchCreateResult, CreateParameters, Entity, Operation,
    OperationLogItem, OperationType, CORRELATION_KEY,
};
use futures::TryStreamExt;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

/// Phase of a create call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatePhase {
    /// Payload being prepared.
    Building,
    /// Request in flight, possibly retried.
    Submitting,
    /// The server answered with the result itself.
    SubmittedSyncDone,
    /// The server answered with an operation.
    SubmittedAsyncPending,
    /// Waiting for the operation to finish.
    Polling,
    /// The operation succeeded.
    Succeeded,
    /// The operation failed.
    Failed,
    /// Matching log entries to submitted items.
    Reconciling,
    /// Result returned to the caller.
    Done,
}

impl CreatePhase {
    /// Returns true if the call can move from `self` to `next`.
    pub fn can_advance_to(self, next: CreatePhase) -> bool {
        use CreatePhase::*;
        matches!(
            (self, next),
            (Building, Submitting)
                | (Submitting, SubmittedSyncDone)
                | (Submitting, SubmittedAsyncPending)
                | (SubmittedSyncDone, Done)
                | (SubmittedAsyncPending, Polling)
                | (SubmittedAsyncPending, Done)
                | (Polling, Succeeded)
                | (Polling, Failed)
                | (Succeeded, Reconciling)
                | (Reconciling, Done)
        )
    }

    /// Returns true for phases with no successor.
    pub fn is_terminal(self) -> bool {
        matches!(self, CreatePhase::Done | CreatePhase::Failed)
    }
}

impl fmt::Display for CreatePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CreatePhase::Building => "building",
            CreatePhase::Submitting => "submitting",
            CreatePhase::SubmittedSyncDone => "submitted_sync_done",
            CreatePhase::SubmittedAsyncPending => "submitted_async_pending",
            CreatePhase::Polling => "polling",
            CreatePhase::Succeeded => "succeeded",
            CreatePhase::Failed => "failed",
            CreatePhase::Reconciling => "reconciling",
            CreatePhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Tracks the phase of one create call.
struct CreateTracker {
    operation_id: Uuid,
    collection: &'static str,
    phase: CreatePhase,
}

impl CreateTracker {
    fn new(operation_id: Uuid, collection: &'static str) -> Self {
        Self {
            operation_id,
            collection,
            phase: CreatePhase::Building,
        }
    }

    fn advance(&mut self, next: CreatePhase) -> ClientResult<()> {
        if !self.phase.can_advance_to(next) {
            return Err(ClientError::Protocol(format!(
                "create {} cannot move from {} to {}",
                self.operation_id, self.phase, next
            )));
        }
        debug!(
            operation_id = %self.operation_id,
            collection = self.collection,
            from = %self.phase,
            to = %next,
            "create phase"
        );
        self.phase = next;
        Ok(())
    }
}

/// What the server answered to a create request.
enum Submission {
    /// An operation to wait for.
    Operation(Operation),
    /// The created record or batch result itself.
    Direct(Value),
}

fn normalize(response: Response) -> ClientResult<Submission> {
    let status = response.status;
    let body = response
        .into_json()
        .ok_or_else(|| ClientError::Protocol(format!("create answered {status} without a body")))?;
    if status == 202 || looks_like_operation(&body) {
        Ok(Submission::Operation(structure(body)?))
    } else {
        Ok(Submission::Direct(body))
    }
}

fn looks_like_operation(body: &Value) -> bool {
    body.get("status").map_or(false, Value::is_string)
        && body.get("type").map_or(false, Value::is_string)
}

fn tag_item(raw: &mut Value, key: &str) -> ClientResult<()> {
    match raw {
        Value::Object(map) => {
            map.insert(CORRELATION_KEY.to_string(), Value::String(key.to_string()));
            Ok(())
        }
        _ => Err(ClientError::Protocol(
            "entity did not serialize to a JSON object".into(),
        )),
    }
}

fn is_create_entry<E: Entity>(entry: &OperationLogItem) -> bool {
    E::CREATE_LOG_TYPES.contains(&entry.item_type.as_str())
}

impl<T: Transport, S: Sleeper> Client<T, S> {
    /// Creates a batch and returns the outcome of every submitted item.
    ///
    /// Keys of the result are the items' positions in `items`. Successes are
    /// full records as stored by the server.
    pub async fn create_batch<E: Entity>(
        &self,
        items: &[E],
        params: CreateParameters,
    ) -> ClientResult<BatchCreateResult<E>> {
        if items.is_empty() {
            debug!(collection = E::COLLECTION, "empty batch, nothing to create");
            return Ok(BatchCreateResult::new());
        }

        let (params, mut tracker) = self.begin::<E>(params);
        let mut keys = HashMap::with_capacity(items.len());
        let payload = items
            .iter()
            .enumerate()
            .map(|(index, item)| -> ClientResult<Value> {
                let mut raw = unstructure(item)?;
                let key = self.tokens().correlation_key();
                tag_item(&mut raw, &key)?;
                keys.insert(key, index);
                Ok(raw)
            })
            .collect::<ClientResult<Vec<Value>>>()?;

        match self
            .submit(E::collection_path(), Value::Array(payload), &params, &mut tracker)
            .await?
        {
            Submission::Direct(body) => {
                tracker.advance(CreatePhase::SubmittedSyncDone)?;
                let result = structure(body)?;
                tracker.advance(CreatePhase::Done)?;
                Ok(result)
            }
            Submission::Operation(operation) => {
                let operation = self.await_success(operation, &mut tracker).await?;
                tracker.advance(CreatePhase::Reconciling)?;
                let result = self.reconcile::<E>(&operation, &keys, items.len()).await?;
                tracker.advance(CreatePhase::Done)?;
                info!(
                    operation_id = %operation.id,
                    collection = E::COLLECTION,
                    created = result.items.len(),
                    rejected = result.validation_errors.len(),
                    "batch created"
                );
                Ok(result)
            }
        }
    }

    /// Creates one record.
    ///
    /// A rejected item is reported as a validation [`ClientError::Api`].
    pub async fn create<E: Entity>(&self, item: &E, params: CreateParameters) -> ClientResult<E> {
        let (params, mut tracker) = self.begin::<E>(params);
        let mut raw = unstructure(item)?;
        let key = self.tokens().correlation_key();
        tag_item(&mut raw, &key)?;

        match self
            .submit(E::collection_path(), raw, &params, &mut tracker)
            .await?
        {
            Submission::Direct(body) => {
                tracker.advance(CreatePhase::SubmittedSyncDone)?;
                let created = structure(body)?;
                tracker.advance(CreatePhase::Done)?;
                Ok(created)
            }
            Submission::Operation(operation) => {
                let operation = self.await_success(operation, &mut tracker).await?;
                tracker.advance(CreatePhase::Reconciling)?;
                let log = self.get_operation_log(&operation.id).await?;
                let entry = log
                    .iter()
                    .filter(|entry| is_create_entry::<E>(entry))
                    .find(|entry| entry.correlation_key(CORRELATION_KEY) == Some(key.as_str()))
                    .ok_or_else(|| {
                        ClientError::Protocol(format!(
                            "operation {} log has no entry for the submitted item",
                            operation.id
                        ))
                    })?;

                if !entry.success {
                    let errors = entry.field_errors()?;
                    return Err(ClientError::Api(ApiError::validation(&errors)));
                }
                let id = entry.produced_id(E::OUTPUT_ID_FIELD).ok_or_else(|| {
                    ClientError::Protocol(format!(
                        "operation {} log entry has no {}",
                        operation.id,
                        E::OUTPUT_ID_FIELD
                    ))
                })?;
                let created = self.get::<E>(&id).await?;
                tracker.advance(CreatePhase::Done)?;
                Ok(created)
            }
        }
    }

    /// Submits a batch and returns the operation without waiting for it.
    ///
    /// If the server completes the batch synchronously, or there is nothing to
    /// submit, a pseudo operation in `SUCCESS` is returned instead.
    pub async fn create_async<E: Entity>(
        &self,
        items: &[E],
        params: CreateParameters,
    ) -> ClientResult<Operation> {
        if items.is_empty() {
            debug!(collection = E::COLLECTION, "empty batch, nothing to create");
            return Ok(Operation::pseudo(OperationType::from(E::OPERATION_TYPE)));
        }

        let (params, mut tracker) = self.begin::<E>(params);
        let payload = items
            .iter()
            .map(unstructure)
            .collect::<Result<Vec<Value>, _>>()?;

        match self
            .submit(E::collection_path(), Value::Array(payload), &params, &mut tracker)
            .await?
        {
            Submission::Direct(_) => {
                tracker.advance(CreatePhase::SubmittedSyncDone)?;
                tracker.advance(CreatePhase::Done)?;
                Ok(Operation::pseudo(OperationType::from(E::OPERATION_TYPE)))
            }
            Submission::Operation(operation) => {
                tracker.advance(CreatePhase::SubmittedAsyncPending)?;
                tracker.advance(CreatePhase::Done)?;
                Ok(operation)
            }
        }
    }

    /// Waits until `operation` reaches a terminal status.
    ///
    /// Returns the final operation on success and
    /// [`ClientError::FailedOperation`] otherwise.
    pub async fn wait_operation(&self, operation: Operation) -> ClientResult<Operation> {
        let finished = self.poll_operation(operation).await?;
        if finished.is_success() {
            Ok(finished)
        } else {
            Err(ClientError::FailedOperation(Box::new(finished)))
        }
    }

    fn begin<E: Entity>(&self, params: CreateParameters) -> (CreateParameters, CreateTracker) {
        let operation_id = params
            .operation_id
            .unwrap_or_else(|| self.tokens().operation_id());
        let params = CreateParameters {
            operation_id: Some(operation_id),
            ..params
        };
        (params, CreateTracker::new(operation_id, E::COLLECTION))
    }

    /// Posts the payload under the retry policy with a fixed operation id.
    async fn submit(
        &self,
        path: String,
        body: Value,
        params: &CreateParameters,
        tracker: &mut CreateTracker,
    ) -> ClientResult<Submission> {
        tracker.advance(CreatePhase::Submitting)?;
        let operation_id = tracker.operation_id;
        let request = Request::post(path, body).with_query(params.to_query());

        let answered = execute_with_retry::<S, _, _, _>(&self.config().retry, "create", |attempt| {
            let request = &request;
            async move {
                match self.send_once(request).await {
                    Ok(response) => Ok(Some(response)),
                    Err(err) if err.is_idempotency_collision() => {
                        info!(
                            %operation_id,
                            attempt = attempt + 1,
                            "operation already exists, resuming it"
                        );
                        Ok(None)
                    }
                    Err(err) => Err(err),
                }
            }
        })
        .await?;

        match answered {
            Some(response) => normalize(response),
            None => Ok(Submission::Operation(
                self.get_operation(&operation_id.to_string()).await?,
            )),
        }
    }

    async fn await_success(
        &self,
        operation: Operation,
        tracker: &mut CreateTracker,
    ) -> ClientResult<Operation> {
        tracker.advance(CreatePhase::SubmittedAsyncPending)?;
        tracker.advance(CreatePhase::Polling)?;
        let finished = self.poll_operation(operation).await?;
        if finished.is_success() {
            tracker.advance(CreatePhase::Succeeded)?;
            Ok(finished)
        } else {
            tracker.advance(CreatePhase::Failed)?;
            Err(ClientError::FailedOperation(Box::new(finished)))
        }
    }

    async fn poll_operation(&self, operation: Operation) -> ClientResult<Operation> {
        if operation.is_completed() {
            return Ok(operation);
        }

        let poll = &self.config().poll;
        let started = Instant::now();
        let just_started = operation.started.as_ref().map_or(true, |at| {
            (Utc::now().naive_utc() - at.as_naive())
                .to_std()
                .map_or(true, |age| age < poll.initial_delay)
        });
        if just_started {
            S::sleep_for(poll.initial_delay).await;
        }

        let mut polls = 0u32;
        loop {
            let current = self.get_operation(&operation.id).await?;
            polls += 1;
            if current.is_completed() {
                info!(
                    operation_id = %current.id,
                    status = %current.status,
                    polls,
                    "operation finished"
                );
                return Ok(current);
            }

            let waited = started.elapsed();
            if poll.timeout.map_or(false, |timeout| waited >= timeout) {
                return Err(ClientError::OperationTimeout {
                    operation_id: current.id,
                    waited,
                });
            }

            let delay = poll.interval_for(polls - 1);
            debug!(
                operation_id = %current.id,
                status = %current.status,
                progress = ?current.progress,
                delay_ms = delay.as_millis() as u64,
                "operation still running"
            );
            S::sleep_for(delay).await;
        }
    }

    /// Matches log entries to submitted positions and reads back created records.
    async fn reconcile<E: Entity>(
        &self,
        operation: &Operation,
        keys: &HashMap<String, usize>,
        submitted: usize,
    ) -> ClientResult<BatchCreateResult<E>> {
        let log = self.get_operation_log(&operation.id).await?;
        let mut result = BatchCreateResult::new();
        // scope -> produced id -> submitted position
        let mut produced: BTreeMap<Option<String>, BTreeMap<String, String>> = BTreeMap::new();

        for entry in log.iter().filter(|entry| is_create_entry::<E>(entry)) {
            let Some(index) = entry
                .correlation_key(CORRELATION_KEY)
                .and_then(|key| keys.get(key))
            else {
                continue;
            };
            let index = index.to_string();
            if entry.success {
                let id = entry.produced_id(E::OUTPUT_ID_FIELD).ok_or_else(|| {
                    ClientError::Protocol(format!(
                        "log entry for item {index} has no {}",
                        E::OUTPUT_ID_FIELD
                    ))
                })?;
                let scope = E::SCOPE_FIELD.and_then(|field| entry.input_str(field));
                produced.entry(scope).or_default().insert(id, index);
            } else {
                result.validation_errors.insert(index, entry.field_errors()?);
            }
        }

        let created: usize = produced.values().map(BTreeMap::len).sum();
        if created + result.validation_errors.len() != submitted {
            return Err(ClientError::Protocol(format!(
                "operation {} log accounts for {} of {} items",
                operation.id,
                created + result.validation_errors.len(),
                submitted
            )));
        }

        for (scope, ids) in &produced {
            self.read_back(scope.as_deref(), ids, &mut result.items)
                .await?;
        }

        if !result.is_complete_for(submitted) {
            return Err(ClientError::Protocol(format!(
                "operation {} result covers {} of {} items",
                operation.id,
                result.len(),
                submitted
            )));
        }
        Ok(result)
    }

    async fn read_back<E: Entity>(
        &self,
        scope: Option<&str>,
        ids: &BTreeMap<String, String>,
        items: &mut BTreeMap<String, E>,
    ) -> ClientResult<()> {
        let (Some(min), Some(max)) = (ids.keys().next(), ids.keys().next_back()) else {
            return Ok(());
        };
        debug!(
            collection = E::COLLECTION,
            scope = ?scope,
            min = %min,
            max = %max,
            count = ids.len(),
            "reading back"
        );

        let mut records = Box::pin(self.iterate_all::<E>(E::scoped_search(scope, min, max), None));
        while let Some(record) = records.try_next().await? {
            if let Some(index) = record.id().and_then(|id| ids.get(id)) {
                items.insert(index.clone(), record);
            }
        }

        match ids.iter().find(|(_, index)| !items.contains_key(*index)) {
            Some((id, index)) => Err(ClientError::Protocol(format!(
                "created item {index} (id {id}) is missing from read-back"
            ))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClientConfig, PollConfig, RetryConfig};
    use crate::sleep::NoSleep;
    use crate::token::SequentialTokens;
    use crate::transport::{Blocking, Method, MockTransport};
    use crowdkit_protocol::{Task, UserBonus};
    use futures::executor::block_on;
    use serde_json::{json, Map};
    use std::sync::Arc;
    use std::time::Duration;

    type TestClient = Client<Blocking<Arc<MockTransport>>, NoSleep>;

    fn client(mock: &Arc<MockTransport>, poll: PollConfig) -> TestClient {
        let config = ClientConfig::new("https://api.example.com", "token")
            .with_retry(RetryConfig::new(3).with_jitter(false))
            .with_poll(poll);
        Client::with_sleeper(config, Blocking(Arc::clone(mock)))
            .unwrap()
            .with_tokens(SequentialTokens::new())
    }

    fn task() -> Task {
        let mut input = Map::new();
        input.insert("url".into(), json!("https://img/1"));
        Task::new("pool-1", input)
    }

    fn op(status: &str) -> Value {
        json!({"id": "op-1", "type": "TASK.BATCH_CREATE", "status": status})
    }

    #[test]
    fn phase_transitions() {
        assert!(CreatePhase::Building.can_advance_to(CreatePhase::Submitting));
        assert!(CreatePhase::Polling.can_advance_to(CreatePhase::Failed));
        assert!(!CreatePhase::Building.can_advance_to(CreatePhase::Done));
        assert!(!CreatePhase::Failed.can_advance_to(CreatePhase::Reconciling));
        assert!(CreatePhase::Failed.is_terminal());
        assert!(!CreatePhase::Polling.is_terminal());
    }

    #[test]
    fn empty_batch_sends_nothing() {
        let mock = Arc::new(MockTransport::new());
        let result = block_on(client(&mock, PollConfig::immediate()).create_tasks(&[], CreateParameters::new()))
            .unwrap();
        assert!(result.is_empty());
        assert!(mock.requests().is_empty());
    }

    #[test]
    fn sync_batch_returns_server_result() {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(
            201,
            json!({
                "items": {"0": {"id": "t1", "pool_id": "pool-1", "input_values": {}}},
                "validation_errors": {
                    "1": {"pool_id": {"code": "VALUE_REQUIRED", "message": "required"}}
                }
            }),
        );
        let client = client(&mock, PollConfig::immediate());

        let result = block_on(client.create_tasks(
            &[task(), Task::default()],
            CreateParameters::new().with_async_mode(false),
        ))
        .unwrap();

        assert_eq!(result.items["0"].id.as_deref(), Some("t1"));
        assert_eq!(result.validation_errors["1"]["pool_id"].code, "VALUE_REQUIRED");
        let sent = &mock.requests()[0];
        assert_eq!(sent.method, Method::Post);
        assert_eq!(sent.query_param("async_mode"), Some("false"));
        assert_eq!(
            sent.query_param("operation_id"),
            Some(Uuid::from_u128(1).to_string().as_str())
        );
        let body = sent.body.as_ref().unwrap();
        assert_eq!(body[0][CORRELATION_KEY], json!("key-00000001"));
        assert_eq!(body[1][CORRELATION_KEY], json!("key-00000002"));
    }

    #[test]
    fn async_batch_reconciles_by_correlation_key() {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(202, op("RUNNING"));
        mock.push_json(200, op("SUCCESS"));
        mock.push_json(
            200,
            json!([
                {"type": "TASK_CREATE", "success": false,
                 "input": {"__client_uuid": "key-00000002", "pool_id": "pool-1"},
                 "output": {"input_values.url": {"code": "VALUE_REQUIRED", "message": "x"}}},
                {"type": "TASK_CREATE", "success": true,
                 "input": {"__client_uuid": "key-00000001", "pool_id": "pool-1"},
                 "output": {"task_id": "t7"}}
            ]),
        );
        mock.push_json(
            200,
            json!({"items": [{"id": "t7", "pool_id": "pool-1", "input_values": {}}], "has_more": false}),
        );
        let client = client(&mock, PollConfig::immediate());

        let result = block_on(client.create_tasks(&[task(), task()], CreateParameters::new())).unwrap();

        assert_eq!(result.items["0"].id.as_deref(), Some("t7"));
        assert!(result.validation_errors.contains_key("1"));
        let requests = mock.requests();
        assert_eq!(requests[1].path, "/v1/operations/op-1");
        assert_eq!(requests[2].path, "/v1/operations/op-1/log");
        assert_eq!(requests[3].query_param("pool_id"), Some("pool-1"));
        assert_eq!(requests[3].query_param("id_gte"), Some("t7"));
        assert_eq!(requests[3].query_param("id_lte"), Some("t7"));
    }

    #[test]
    fn conflict_resumes_existing_operation() {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(500, json!({"code": "INTERNAL_ERROR", "message": "lost"}));
        mock.push_json(409, json!({"code": "OPERATION_ALREADY_EXISTS", "message": "dup"}));
        mock.push_json(200, op("SUCCESS"));
        let client = client(&mock, PollConfig::immediate());

        let operation =
            block_on(client.create_tasks_async(&[task()], CreateParameters::new())).unwrap();

        assert!(operation.is_success());
        let requests = mock.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].query_param("operation_id"), requests[1].query_param("operation_id"));
        assert_eq!(
            requests[2].path,
            format!("/v1/operations/{}", Uuid::from_u128(1))
        );
    }

    #[test]
    fn sync_answer_to_async_call_is_pseudo_operation() {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(201, json!({"items": {}, "validation_errors": {}}));
        let client = client(&mock, PollConfig::immediate());

        let bonus = UserBonus::new("user-1", "2".parse().unwrap());
        let operation =
            block_on(client.create_user_bonuses_async(&[bonus], CreateParameters::new())).unwrap();
        assert!(operation.is_pseudo());
        assert_eq!(operation.op_type, OperationType::UserBonusBatchCreate);
        assert_eq!(mock.requests().len(), 1);
    }

    #[test]
    fn empty_async_batch_sends_nothing() {
        let mock = Arc::new(MockTransport::new());
        let client = client(&mock, PollConfig::immediate());

        let operation =
            block_on(client.create_tasks_async(&[], CreateParameters::new())).unwrap();
        assert!(operation.is_pseudo());
        assert!(operation.is_success());
        assert_eq!(operation.op_type, OperationType::TaskBatchCreate);
        assert!(mock.requests().is_empty());
    }

    #[test]
    fn failed_operation_is_reported() {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(202, op("RUNNING"));
        mock.push_json(200, op("FAIL"));
        let client = client(&mock, PollConfig::immediate());

        let err = block_on(client.create_tasks(&[task()], CreateParameters::new())).unwrap_err();
        match err {
            ClientError::FailedOperation(operation) => assert_eq!(operation.id, "op-1"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn polling_times_out() {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(200, op("RUNNING"));
        let client = client(&mock, PollConfig::immediate().with_timeout(Duration::ZERO));

        let running: Operation = structure(op("PENDING")).unwrap();
        let err = block_on(client.wait_operation(running)).unwrap_err();
        assert!(matches!(err, ClientError::OperationTimeout { .. }));
    }

    #[test]
    fn single_create_reports_validation_error() {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(
            202,
            json!({"id": "op-2", "type": "USER_BONUS.BATCH_CREATE", "status": "RUNNING"}),
        );
        mock.push_json(
            200,
            json!({"id": "op-2", "type": "USER_BONUS.BATCH_CREATE", "status": "SUCCESS"}),
        );
        mock.push_json(
            200,
            json!([{"type": "USER_BONUS_VALIDATE", "success": false,
                    "input": {"__client_uuid": "key-00000001"},
                    "output": {"amount": {"code": "VALUE_REQUIRED", "message": "required"}}}]),
        );
        let client = client(&mock, PollConfig::immediate());

        let bonus = UserBonus::new("user-1", "1.50".parse().unwrap());
        let err = block_on(client.create_user_bonus(&bonus, CreateParameters::new())).unwrap_err();
        let api = err.as_api().unwrap();
        assert_eq!(api.status, 400);
        assert_eq!(api.invalid_fields(), vec!["amount".to_string()]);
    }

    #[test]
    fn incomplete_log_is_a_protocol_error() {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(202, op("SUCCESS"));
        mock.push_json(200, json!([]));
        let client = client(&mock, PollConfig::immediate());

        let err = block_on(client.create_tasks(&[task()], CreateParameters::new())).unwrap_err();
        assert!(matches!(err, ClientError::Protocol(_)));
    }
}
