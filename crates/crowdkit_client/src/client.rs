//! The asynchronous client.

use crate::config::ClientConfig;
use crate::error::{ApiError, ClientError, ClientResult};
use crate::retry::execute_with_retry;
use crate::sleep::{Sleeper, TokioSleeper};
use crate::token::{RandomTokens, TokenGenerator};
use crate::transport::{Request, Response, Transport};
use crowdkit_protocol::{
    structure, BatchCreateResult, CreateParameters, Entity, Operation, OperationLogItem,
    SearchResult, SortItems, Task, TaskSearchRequest, TaskSuite, TaskSuiteSearchRequest,
    UserBonus, UserBonusSearchRequest,
};
use futures::Stream;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// Client for the crowdsourcing API.
///
/// Every operation is implemented once, asynchronously. `S` decides how the
/// client waits between retries and polls; see [`crate::BlockingClient`]
/// for synchronous use.
pub struct Client<T, S = TokioSleeper> {
    config: ClientConfig,
    transport: T,
    tokens: Arc<dyn TokenGenerator>,
    _sleeper: PhantomData<fn() -> S>,
}

impl<T: Transport> Client<T, TokioSleeper> {
    /// Creates a client that sleeps on the Tokio timer.
    pub fn new(config: ClientConfig, transport: T) -> ClientResult<Self> {
        Self::with_sleeper(config, transport)
    }
}

impl<T: Transport, S: Sleeper> Client<T, S> {
    /// Creates a client with an explicit sleeper type.
    pub fn with_sleeper(config: ClientConfig, transport: T) -> ClientResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            transport,
            tokens: Arc::new(RandomTokens),
            _sleeper: PhantomData,
        })
    }

    /// Replaces the source of idempotency tokens and correlation keys.
    pub fn with_tokens(mut self, tokens: impl TokenGenerator + 'static) -> Self {
        self.tokens = Arc::new(tokens);
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub(crate) fn tokens(&self) -> &dyn TokenGenerator {
        self.tokens.as_ref()
    }

    /// Sends one attempt, turning non-2xx responses into [`ClientError::Api`].
    pub(crate) async fn send_once(&self, request: &Request) -> ClientResult<Response> {
        debug!(method = %request.method, path = %request.path, "sending request");
        let response = self.transport.send(request).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(ApiError::from_response(response.status, response.json_body()).into())
        }
    }

    /// Sends a request under the retry policy.
    pub(crate) async fn execute(&self, request: &Request, label: &str) -> ClientResult<Response> {
        execute_with_retry::<S, _, _, _>(&self.config.retry, label, |_| self.send_once(request))
            .await
    }

    /// Sends a request under the retry policy and structures the JSON body.
    pub(crate) async fn execute_json<R: DeserializeOwned>(
        &self,
        request: &Request,
        label: &str,
    ) -> ClientResult<R> {
        let response = self.execute(request, label).await?;
        let body = response.into_json().ok_or_else(|| {
            ClientError::Protocol(format!(
                "{} {} returned no JSON body",
                request.method, request.path
            ))
        })?;
        Ok(structure(body)?)
    }

    /// Fetches an operation by id.
    pub async fn get_operation(&self, operation_id: &str) -> ClientResult<Operation> {
        let request = Request::get(format!("/v1/operations/{operation_id}"));
        self.execute_json(&request, "get_operation").await
    }

    /// Fetches the per-item log of an operation.
    pub async fn get_operation_log(&self, operation_id: &str) -> ClientResult<Vec<OperationLogItem>> {
        let request = Request::get(format!("/v1/operations/{operation_id}/log"));
        self.execute_json(&request, "get_operation_log").await
    }

    /// Fetches one record by id.
    pub async fn get<E: Entity>(&self, id: &str) -> ClientResult<E> {
        self.execute_json(&Request::get(E::record_path(id)), "get").await
    }

    // Tasks

    /// Fetches a task.
    pub async fn get_task(&self, task_id: &str) -> ClientResult<Task> {
        self.get(task_id).await
    }

    /// Creates one task.
    pub async fn create_task(&self, task: &Task, params: CreateParameters) -> ClientResult<Task> {
        self.create(task, params).await
    }

    /// Creates tasks, waiting for the result of every item.
    pub async fn create_tasks(
        &self,
        tasks: &[Task],
        params: CreateParameters,
    ) -> ClientResult<BatchCreateResult<Task>> {
        self.create_batch(tasks, params).await
    }

    /// Starts creating tasks and returns the operation handle.
    pub async fn create_tasks_async(
        &self,
        tasks: &[Task],
        params: CreateParameters,
    ) -> ClientResult<Operation> {
        self.create_async(tasks, params).await
    }

    /// Fetches one page of tasks.
    pub async fn find_tasks(
        &self,
        request: &TaskSearchRequest,
        sort: Option<&SortItems>,
        limit: Option<u32>,
    ) -> ClientResult<SearchResult<Task>> {
        self.find(request, sort, limit).await
    }

    /// Enumerates every matching task in id order.
    pub fn get_tasks(
        &self,
        request: TaskSearchRequest,
    ) -> impl Stream<Item = ClientResult<Task>> + '_ {
        self.iterate_all(request, None)
    }

    // Task suites

    /// Fetches a task suite.
    pub async fn get_task_suite(&self, task_suite_id: &str) -> ClientResult<TaskSuite> {
        self.get(task_suite_id).await
    }

    /// Creates one task suite.
    pub async fn create_task_suite(
        &self,
        task_suite: &TaskSuite,
        params: CreateParameters,
    ) -> ClientResult<TaskSuite> {
        self.create(task_suite, params).await
    }

    /// Creates task suites, waiting for the result of every item.
    pub async fn create_task_suites(
        &self,
        task_suites: &[TaskSuite],
        params: CreateParameters,
    ) -> ClientResult<BatchCreateResult<TaskSuite>> {
        self.create_batch(task_suites, params).await
    }

    /// Starts creating task suites and returns the operation handle.
    pub async fn create_task_suites_async(
        &self,
        task_suites: &[TaskSuite],
        params: CreateParameters,
    ) -> ClientResult<Operation> {
        self.create_async(task_suites, params).await
    }

    /// Fetches one page of task suites.
    pub async fn find_task_suites(
        &self,
        request: &TaskSuiteSearchRequest,
        sort: Option<&SortItems>,
        limit: Option<u32>,
    ) -> ClientResult<SearchResult<TaskSuite>> {
        self.find(request, sort, limit).await
    }

    /// Enumerates every matching task suite in id order.
    pub fn get_task_suites(
        &self,
        request: TaskSuiteSearchRequest,
    ) -> impl Stream<Item = ClientResult<TaskSuite>> + '_ {
        self.iterate_all(request, None)
    }

    // User bonuses

    /// Fetches a user bonus.
    pub async fn get_user_bonus(&self, user_bonus_id: &str) -> ClientResult<UserBonus> {
        self.get(user_bonus_id).await
    }

    /// Issues one bonus.
    pub async fn create_user_bonus(
        &self,
        bonus: &UserBonus,
        params: CreateParameters,
    ) -> ClientResult<UserBonus> {
        self.create(bonus, params).await
    }

    /// Issues bonuses, waiting for the result of every item.
    pub async fn create_user_bonuses(
        &self,
        bonuses: &[UserBonus],
        params: CreateParameters,
    ) -> ClientResult<BatchCreateResult<UserBonus>> {
        self.create_batch(bonuses, params).await
    }

    /// Starts issuing bonuses and returns the operation handle.
    pub async fn create_user_bonuses_async(
        &self,
        bonuses: &[UserBonus],
        params: CreateParameters,
    ) -> ClientResult<Operation> {
        self.create_async(bonuses, params).await
    }

    /// Fetches one page of user bonuses.
    pub async fn find_user_bonuses(
        &self,
        request: &UserBonusSearchRequest,
        sort: Option<&SortItems>,
        limit: Option<u32>,
    ) -> ClientResult<SearchResult<UserBonus>> {
        self.find(request, sort, limit).await
    }

    /// Enumerates every matching user bonus in id order.
    pub fn get_user_bonuses(
        &self,
        request: UserBonusSearchRequest,
    ) -> impl Stream<Item = ClientResult<UserBonus>> + '_ {
        self.iterate_all(request, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use crate::error::ApiErrorKind;
    use crate::sleep::NoSleep;
    use crate::transport::{Blocking, MockTransport, TransportError, TransportErrorKind};
    use futures::executor::block_on;
    use serde_json::json;

    fn client(mock: &Arc<MockTransport>) -> Client<Blocking<Arc<MockTransport>>, NoSleep> {
        let config = ClientConfig::new("https://api.example.com", "token")
            .with_retry(RetryConfig::new(3).with_jitter(false));
        Client::with_sleeper(config, Blocking(Arc::clone(mock))).unwrap()
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = ClientConfig::new("", "token");
        let result: ClientResult<Client<_, NoSleep>> =
            Client::with_sleeper(config, Blocking(MockTransport::new()));
        assert!(matches!(result, Err(ClientError::InvalidConfig(_))));
    }

    #[test]
    fn get_task_reads_record_path() {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(200, json!({"id": "7", "pool_id": "1", "input_values": {"q": "x"}}));

        let task = block_on(client(&mock).get_task("7")).unwrap();
        assert_eq!(task.id.as_deref(), Some("7"));
        assert_eq!(mock.requests()[0].path, "/v1/tasks/7");
    }

    #[test]
    fn transient_failures_are_retried() {
        let mock = Arc::new(MockTransport::new());
        mock.push_error(TransportError::new(TransportErrorKind::Connect, "refused"));
        mock.push_json(503, json!({"code": "REMOTE_SERVICE_UNAVAILABLE", "message": "later"}));
        mock.push_json(200, json!({"id": "op", "type": "TASK.BATCH_CREATE", "status": "SUCCESS"}));

        let op = block_on(client(&mock).get_operation("op")).unwrap();
        assert!(op.is_success());
        assert_eq!(mock.requests().len(), 3);
    }

    #[test]
    fn bad_gateway_is_retried() {
        let mock = Arc::new(MockTransport::new());
        mock.push_response(Response::empty(502));
        mock.push_json(200, json!({"id": "op", "type": "TASK.BATCH_CREATE", "status": "SUCCESS"}));

        let op = block_on(client(&mock).get_operation("op")).unwrap();
        assert!(op.is_success());
        assert_eq!(mock.requests().len(), 2);
    }

    #[test]
    fn api_errors_carry_details() {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(
            404,
            json!({"code": "DOES_NOT_EXIST", "message": "no such bonus", "request_id": "r"}),
        );

        let err = block_on(client(&mock).get_user_bonus("9")).unwrap_err();
        let api = err.as_api().unwrap();
        assert_eq!(api.kind, ApiErrorKind::DoesNotExist);
        assert_eq!(api.request_id.as_deref(), Some("r"));
        assert_eq!(mock.requests().len(), 1);
    }

    #[test]
    fn missing_body_is_a_protocol_error() {
        let mock = Arc::new(MockTransport::new());
        mock.push_response(Response::empty(200));

        let err = block_on(client(&mock).get_operation_log("op")).unwrap_err();
        assert!(matches!(err, ClientError::Protocol(_)));
    }
}
