//! Synchronous facade over [`Client`].

use crate::client::Client;
use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::pagination::ResumableCursor;
use crate::sleep::{Sleeper, ThreadSleeper};
use crate::token::TokenGenerator;
use crate::transport::{Blocking, BlockingTransport};
use crowdkit_protocol::{
    BatchCreateResult, CreateParameters, Entity, Operation, OperationLogItem, SearchResult,
    SortItems, Task, TaskSearchRequest, TaskSuite, TaskSuiteSearchRequest, UserBonus,
    UserBonusSearchRequest,
};
use futures::executor::{block_on, block_on_stream};

/// Blocking client.
///
/// Runs the asynchronous [`Client`] to completion on the calling thread, so
/// both share every retry, polling and reconciliation rule. Waits block the
/// thread.
pub struct BlockingClient<T: BlockingTransport, S: Sleeper = ThreadSleeper> {
    inner: Client<Blocking<T>, S>,
}

impl<T: BlockingTransport> BlockingClient<T, ThreadSleeper> {
    /// Creates a client that waits with `std::thread::sleep`.
    pub fn new(config: ClientConfig, transport: T) -> ClientResult<Self> {
        Self::with_sleeper(config, transport)
    }
}

impl<T: BlockingTransport, S: Sleeper> BlockingClient<T, S> {
    /// Creates a client with an explicit sleeper type.
    pub fn with_sleeper(config: ClientConfig, transport: T) -> ClientResult<Self> {
        Ok(Self {
            inner: Client::with_sleeper(config, Blocking(transport))?,
        })
    }

    /// Replaces the source of idempotency tokens and correlation keys.
    pub fn with_tokens(self, tokens: impl TokenGenerator + 'static) -> Self {
        Self {
            inner: self.inner.with_tokens(tokens),
        }
    }

    /// Returns the asynchronous client underneath.
    pub fn as_async(&self) -> &Client<Blocking<T>, S> {
        &self.inner
    }

    /// Returns the transport.
    pub fn transport(&self) -> &T {
        self.inner.transport().get_ref()
    }

    /// See [`Client::get_operation`].
    pub fn get_operation(&self, operation_id: &str) -> ClientResult<Operation> {
        block_on(self.inner.get_operation(operation_id))
    }

    /// See [`Client::get_operation_log`].
    pub fn get_operation_log(&self, operation_id: &str) -> ClientResult<Vec<OperationLogItem>> {
        block_on(self.inner.get_operation_log(operation_id))
    }

    /// See [`Client::wait_operation`].
    pub fn wait_operation(&self, operation: Operation) -> ClientResult<Operation> {
        block_on(self.inner.wait_operation(operation))
    }

    /// See [`Client::get`].
    pub fn get<E: Entity>(&self, id: &str) -> ClientResult<E> {
        block_on(self.inner.get(id))
    }

    /// See [`Client::create`].
    pub fn create<E: Entity>(&self, item: &E, params: CreateParameters) -> ClientResult<E> {
        block_on(self.inner.create(item, params))
    }

    /// See [`Client::create_batch`].
    pub fn create_batch<E: Entity>(
        &self,
        items: &[E],
        params: CreateParameters,
    ) -> ClientResult<BatchCreateResult<E>> {
        block_on(self.inner.create_batch(items, params))
    }

    /// See [`Client::create_async`].
    pub fn create_async<E: Entity>(
        &self,
        items: &[E],
        params: CreateParameters,
    ) -> ClientResult<Operation> {
        block_on(self.inner.create_async(items, params))
    }

    /// See [`Client::find`].
    pub fn find<E: Entity>(
        &self,
        request: &E::Search,
        sort: Option<&SortItems>,
        limit: Option<u32>,
    ) -> ClientResult<SearchResult<E>> {
        block_on(self.inner.find(request, sort, limit))
    }

    /// Lazily enumerates every matching `E`; see [`Client::iterate_all`].
    pub fn iterate_all<E: Entity>(
        &self,
        request: E::Search,
        page_size: Option<u32>,
    ) -> impl Iterator<Item = ClientResult<E>> + '_ {
        block_on_stream(Box::pin(self.inner.iterate_all(request, page_size)))
    }

    /// See [`Client::fetch_new`].
    pub fn fetch_new<E: Entity>(&self, cursor: &mut ResumableCursor<E>) -> ClientResult<Vec<E>> {
        block_on(self.inner.fetch_new(cursor))
    }

    /// Fetches a task.
    pub fn get_task(&self, task_id: &str) -> ClientResult<Task> {
        self.get(task_id)
    }

    /// Creates one task.
    pub fn create_task(&self, task: &Task, params: CreateParameters) -> ClientResult<Task> {
        self.create(task, params)
    }

    /// Creates tasks, waiting for the result of every item.
    pub fn create_tasks(
        &self,
        tasks: &[Task],
        params: CreateParameters,
    ) -> ClientResult<BatchCreateResult<Task>> {
        self.create_batch(tasks, params)
    }

    /// Starts creating tasks and returns the operation handle.
    pub fn create_tasks_async(
        &self,
        tasks: &[Task],
        params: CreateParameters,
    ) -> ClientResult<Operation> {
        self.create_async(tasks, params)
    }

    /// Fetches one page of tasks.
    pub fn find_tasks(
        &self,
        request: &TaskSearchRequest,
        sort: Option<&SortItems>,
        limit: Option<u32>,
    ) -> ClientResult<SearchResult<Task>> {
        self.find(request, sort, limit)
    }

    /// Enumerates every matching task in id order.
    pub fn get_tasks(
        &self,
        request: TaskSearchRequest,
    ) -> impl Iterator<Item = ClientResult<Task>> + '_ {
        self.iterate_all(request, None)
    }

    /// Fetches a task suite.
    pub fn get_task_suite(&self, task_suite_id: &str) -> ClientResult<TaskSuite> {
        self.get(task_suite_id)
    }

    /// Creates one task suite.
    pub fn create_task_suite(
        &self,
        task_suite: &TaskSuite,
        params: CreateParameters,
    ) -> ClientResult<TaskSuite> {
        self.create(task_suite, params)
    }

    /// Creates task suites, waiting for the result of every item.
    pub fn create_task_suites(
        &self,
        task_suites: &[TaskSuite],
        params: CreateParameters,
    ) -> ClientResult<BatchCreateResult<TaskSuite>> {
        self.create_batch(task_suites, params)
    }

    /// Starts creating task suites and returns the operation handle.
    pub fn create_task_suites_async(
        &self,
        task_suites: &[TaskSuite],
        params: CreateParameters,
    ) -> ClientResult<Operation> {
        self.create_async(task_suites, params)
    }

    /// Fetches one page of task suites.
    pub fn find_task_suites(
        &self,
        request: &TaskSuiteSearchRequest,
        sort: Option<&SortItems>,
        limit: Option<u32>,
    ) -> ClientResult<SearchResult<TaskSuite>> {
        self.find(request, sort, limit)
    }

    /// Enumerates every matching task suite in id order.
    pub fn get_task_suites(
        &self,
        request: TaskSuiteSearchRequest,
    ) -> impl Iterator<Item = ClientResult<TaskSuite>> + '_ {
        self.iterate_all(request, None)
    }

    /// Fetches a user bonus.
    pub fn get_user_bonus(&self, user_bonus_id: &str) -> ClientResult<UserBonus> {
        self.get(user_bonus_id)
    }

    /// Issues one bonus.
    pub fn create_user_bonus(
        &self,
        bonus: &UserBonus,
        params: CreateParameters,
    ) -> ClientResult<UserBonus> {
        self.create(bonus, params)
    }

    /// Issues bonuses, waiting for the result of every item.
    pub fn create_user_bonuses(
        &self,
        bonuses: &[UserBonus],
        params: CreateParameters,
    ) -> ClientResult<BatchCreateResult<UserBonus>> {
        self.create_batch(bonuses, params)
    }

    /// Starts issuing bonuses and returns the operation handle.
    pub fn create_user_bonuses_async(
        &self,
        bonuses: &[UserBonus],
        params: CreateParameters,
    ) -> ClientResult<Operation> {
        self.create_async(bonuses, params)
    }

    /// Fetches one page of user bonuses.
    pub fn find_user_bonuses(
        &self,
        request: &UserBonusSearchRequest,
        sort: Option<&SortItems>,
        limit: Option<u32>,
    ) -> ClientResult<SearchResult<UserBonus>> {
        self.find(request, sort, limit)
    }

    /// Enumerates every matching user bonus in id order.
    pub fn get_user_bonuses(
        &self,
        request: UserBonusSearchRequest,
    ) -> impl Iterator<Item = ClientResult<UserBonus>> + '_ {
        self.iterate_all(request, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sleep::NoSleep;
    use crate::transport::MockTransport;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn blocking_calls_share_async_behavior() {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(200, json!({"items": [{"id": "1", "user_id": "u", "amount": "2.5"}], "has_more": false}));
        mock.push_json(200, json!({"id": "op", "type": "USER_BONUS.BATCH_CREATE", "status": "SUCCESS"}));

        let config = ClientConfig::new("https://api.example.com", "token");
        let client: BlockingClient<_, NoSleep> =
            BlockingClient::with_sleeper(config, Arc::clone(&mock)).unwrap();

        let bonuses: Vec<UserBonus> = client
            .get_user_bonuses(UserBonusSearchRequest::for_user("u"))
            .collect::<ClientResult<_>>()
            .unwrap();
        assert_eq!(bonuses.len(), 1);
        assert_eq!(bonuses[0].amount.to_string(), "2.5");

        let operation = client.get_operation("op").unwrap();
        assert!(operation.is_success());
        assert_eq!(client.transport().requests().len(), 2);
    }
}
