//! Single-page search, exhaustive id-cursor iteration and resumable cursors.

use crate::client::Client;
use crate::error::{ClientError, ClientResult};
use crate::sleep::Sleeper;
use crate::transport::{Request, Transport};
use crowdkit_protocol::{Entity, SearchRequest, SearchResult, SortItems};
use futures::stream::{self, Stream, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// Cursor state between pages.
struct PageCursor<R> {
    request: R,
    page: u32,
    empty_pages: u32,
    done: bool,
}

impl<R: SearchRequest> PageCursor<R> {
    fn start(request: R) -> Self {
        Self {
            request,
            page: 0,
            empty_pages: 0,
            done: false,
        }
    }
}

/// Saved position of a [`ResumableCursor`].
///
/// Serializable so a consumer can persist it between runs and pick up
/// where it stopped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorState {
    /// Id of the last item handed out, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_id: Option<String>,
}

/// Id cursor over a collection that survives process restarts.
///
/// Each [`Client::fetch_new`] call returns the items past the saved
/// position. The position only moves when every page of the call was
/// fetched, so a failed call can simply be repeated.
pub struct ResumableCursor<E: Entity> {
    request: E::Search,
    state: CursorState,
    page_size: Option<u32>,
}

impl<E: Entity> ResumableCursor<E> {
    /// Starts before the first matching item.
    pub fn new(request: E::Search) -> Self {
        Self::resume(request, CursorState::default())
    }

    /// Continues from a saved state.
    pub fn resume(request: E::Search, state: CursorState) -> Self {
        Self {
            request,
            state,
            page_size: None,
        }
    }

    /// Overrides the configured page size.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Returns the current position.
    pub fn state(&self) -> &CursorState {
        &self.state
    }

    /// Consumes the cursor, returning its position.
    pub fn into_state(self) -> CursorState {
        self.state
    }

    fn page_cursor(&self) -> PageCursor<E::Search> {
        let request = match &self.state.last_id {
            Some(last_id) => self.request.clone().with_id_gt(last_id.clone()),
            None => self.request.clone(),
        };
        PageCursor::start(request)
    }
}

impl<E: Entity> fmt::Debug for ResumableCursor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResumableCursor")
            .field("collection", &E::COLLECTION)
            .field("state", &self.state)
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl<T: Transport, S: Sleeper> Client<T, S> {
    /// Fetches one page of `E` matching `request`.
    pub async fn find<E: Entity>(
        &self,
        request: &E::Search,
        sort: Option<&SortItems>,
        limit: Option<u32>,
    ) -> ClientResult<SearchResult<E>> {
        let mut query = request.to_query();
        if let Some(sort) = sort.filter(|sort| !sort.items().is_empty()) {
            query.push(("sort".to_string(), sort.to_string()));
        }
        if let Some(limit) = limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        let http = Request::get(E::collection_path()).with_query(query);
        self.execute_json(&http, "find").await
    }

    /// Enumerates every `E` matching `request`, ascending by id.
    ///
    /// Pages are requested lazily with an `id_gt` cursor set to the last id
    /// seen, so items inserted behind the cursor are never repeated. Any sort
    /// or `id_gt` on `request` is overridden.
    pub fn iterate_all<E: Entity>(
        &self,
        request: E::Search,
        page_size: Option<u32>,
    ) -> impl Stream<Item = ClientResult<E>> + '_ {
        let limit = page_size.or(self.config().pagination.page_size);
        stream::try_unfold(PageCursor::start(request), move |cursor| {
            self.next_page::<E>(cursor, limit)
        })
        .map_ok(|items| stream::iter(items.into_iter().map(Ok::<E, ClientError>)))
        .try_flatten()
    }

    /// Fetches every item past `cursor`, ascending by id.
    ///
    /// The cursor moves to the last returned id only if all pages arrived;
    /// on error it is left where it was. Calling again later returns items
    /// created since.
    pub async fn fetch_new<E: Entity>(
        &self,
        cursor: &mut ResumableCursor<E>,
    ) -> ClientResult<Vec<E>> {
        let limit = cursor.page_size.or(self.config().pagination.page_size);
        let mut pages = cursor.page_cursor();
        let mut items = Vec::new();

        while let Some((page, next)) = self.next_page::<E>(pages, limit).await? {
            items.extend(page);
            pages = next;
        }

        if let Some(last_id) = items.last().and_then(|item| item.id()) {
            cursor.state.last_id = Some(last_id.to_string());
        }
        info!(
            collection = E::COLLECTION,
            items = items.len(),
            last_id = cursor.state.last_id.as_deref(),
            "cursor advanced"
        );
        Ok(items)
    }

    async fn next_page<E: Entity>(
        &self,
        mut cursor: PageCursor<E::Search>,
        limit: Option<u32>,
    ) -> ClientResult<Option<(Vec<E>, PageCursor<E::Search>)>> {
        if cursor.done {
            return Ok(None);
        }

        let page: SearchResult<E> = self
            .find(&cursor.request, Some(&SortItems::by_id()), limit)
            .await?;
        cursor.page += 1;
        debug!(
            collection = E::COLLECTION,
            page = cursor.page,
            items = page.items.len(),
            has_more = page.has_more,
            "fetched page"
        );

        if !page.has_more {
            cursor.done = true;
            return Ok(Some((page.items, cursor)));
        }

        let Some(last) = page.items.last() else {
            cursor.empty_pages += 1;
            let max_empty = self.config().pagination.max_empty_pages;
            warn!(
                collection = E::COLLECTION,
                page = cursor.page,
                empty_pages = cursor.empty_pages,
                max_empty,
                "empty page reported more results"
            );
            if cursor.empty_pages >= max_empty {
                cursor.done = true;
            }
            return Ok(Some((Vec::new(), cursor)));
        };

        let last_id = last.id().ok_or_else(|| {
            ClientError::Protocol(format!("{} page item has no id", E::COLLECTION))
        })?;
        if cursor.request.id_gt() == Some(last_id) {
            return Err(ClientError::Protocol(format!(
                "{} cursor did not advance past id {last_id}",
                E::COLLECTION
            )));
        }

        cursor.empty_pages = 0;
        cursor.request = cursor.request.with_id_gt(last_id.to_string());
        Ok(Some((page.items, cursor)))
    }
}

#[cfg(test)]
mod tests {
    use super::{CursorState, ResumableCursor};
    use crate::config::{ClientConfig, PaginationConfig, RetryConfig};
    use crate::error::ClientError;
    use crate::sleep::NoSleep;
    use crate::transport::{Blocking, MockTransport};
    use crate::Client;
    use crowdkit_protocol::{SortItem, SortItems, Task, TaskSearchRequest};
    use futures::executor::{block_on, block_on_stream};
    use serde_json::json;
    use std::sync::Arc;

    type TestClient = Client<Blocking<Arc<MockTransport>>, NoSleep>;

    fn client(mock: &Arc<MockTransport>, pagination: PaginationConfig) -> TestClient {
        let config = ClientConfig::new("https://api.example.com", "token")
            .with_retry(RetryConfig::no_retry())
            .with_pagination(pagination);
        Client::with_sleeper(config, Blocking(Arc::clone(mock))).unwrap()
    }

    fn task(id: &str) -> serde_json::Value {
        json!({"id": id, "pool_id": "p", "input_values": {}})
    }

    fn collect(client: &TestClient, request: TaskSearchRequest) -> Vec<Result<Task, ClientError>> {
        block_on_stream(Box::pin(client.get_tasks(request))).collect()
    }

    #[test]
    fn find_renders_sort_and_limit() {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(200, json!({"items": [task("1")], "has_more": true}));
        let client = client(&mock, PaginationConfig::default());

        let sort = SortItems(vec![SortItem::desc("created"), SortItem::asc("id")]);
        let request = TaskSearchRequest::for_pool("p");
        let page = futures::executor::block_on(client.find_tasks(&request, Some(&sort), Some(5)))
            .unwrap();

        assert!(page.has_more);
        let sent = &mock.requests()[0];
        assert_eq!(sent.path, "/v1/tasks");
        assert_eq!(sent.query_param("pool_id"), Some("p"));
        assert_eq!(sent.query_param("sort"), Some("-created,id"));
        assert_eq!(sent.query_param("limit"), Some("5"));
    }

    #[test]
    fn cursor_follows_last_id() {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(200, json!({"items": [task("1"), task("2")], "has_more": true}));
        mock.push_json(200, json!({"items": [task("3")], "has_more": false}));
        let client = client(&mock, PaginationConfig::default().with_page_size(2));

        let ids: Vec<String> = collect(&client, TaskSearchRequest::for_pool("p"))
            .into_iter()
            .map(|task| task.unwrap().id.unwrap())
            .collect();
        assert_eq!(ids, ["1", "2", "3"]);

        let requests = mock.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].query_param("id_gt"), None);
        assert_eq!(requests[0].query_param("sort"), Some("id"));
        assert_eq!(requests[0].query_param("limit"), Some("2"));
        assert_eq!(requests[1].query_param("id_gt"), Some("2"));
    }

    #[test]
    fn empty_result_is_one_request() {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(200, json!({"items": [], "has_more": false}));
        let client = client(&mock, PaginationConfig::default());

        assert!(collect(&client, TaskSearchRequest::default()).is_empty());
        assert_eq!(mock.requests().len(), 1);
    }

    #[test]
    fn empty_page_with_more_stops_after_limit() {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(200, json!({"items": [task("1")], "has_more": true}));
        mock.push_json(200, json!({"items": [], "has_more": true}));
        mock.push_json(200, json!({"items": [], "has_more": true}));
        let client = client(&mock, PaginationConfig::default().with_max_empty_pages(2));

        let items = collect(&client, TaskSearchRequest::default());
        assert_eq!(items.len(), 1);
        assert_eq!(mock.requests().len(), 3);
    }

    #[test]
    fn default_config_stops_at_first_empty_page() {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(200, json!({"items": [task("1")], "has_more": true}));
        mock.push_json(200, json!({"items": [], "has_more": true}));
        mock.push_json(200, json!({"items": [task("2")], "has_more": false}));
        let client = client(&mock, PaginationConfig::default());

        let items = collect(&client, TaskSearchRequest::default());
        assert_eq!(items.len(), 1);
        assert_eq!(mock.requests().len(), 2);
    }

    #[test]
    fn stuck_cursor_is_a_protocol_error() {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(200, json!({"items": [task("5")], "has_more": true}));
        mock.push_json(200, json!({"items": [task("5")], "has_more": true}));
        let client = client(&mock, PaginationConfig::default());

        let items = collect(&client, TaskSearchRequest::default());
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(ClientError::Protocol(_))));
    }

    #[test]
    fn page_errors_end_the_stream() {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(500, json!({"code": "INTERNAL_ERROR", "message": "boom"}));
        let client = client(&mock, PaginationConfig::default());

        let items = collect(&client, TaskSearchRequest::default());
        assert_eq!(items.len(), 1);
        assert!(items[0].is_err());
    }

    #[test]
    fn resumable_cursor_advances_on_success() {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(200, json!({"items": [task("1"), task("2")], "has_more": true}));
        mock.push_json(200, json!({"items": [task("3")], "has_more": false}));
        mock.push_json(200, json!({"items": [], "has_more": false}));
        let client = client(&mock, PaginationConfig::default());

        let mut cursor = ResumableCursor::<Task>::new(TaskSearchRequest::for_pool("p"));
        let first = block_on(client.fetch_new(&mut cursor)).unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(cursor.state().last_id.as_deref(), Some("3"));

        assert!(block_on(client.fetch_new(&mut cursor)).unwrap().is_empty());
        assert_eq!(cursor.state().last_id.as_deref(), Some("3"));
        assert_eq!(mock.requests()[2].query_param("id_gt"), Some("3"));
        assert_eq!(mock.requests()[2].query_param("pool_id"), Some("p"));
    }

    #[test]
    fn resumable_cursor_keeps_state_on_error() {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(200, json!({"items": [task("4")], "has_more": true}));
        mock.push_json(500, json!({"code": "INTERNAL_ERROR", "message": "boom"}));
        let client = client(&mock, PaginationConfig::default());

        let state = CursorState {
            last_id: Some("3".to_string()),
        };
        let mut cursor =
            ResumableCursor::<Task>::resume(TaskSearchRequest::default(), state.clone())
                .with_page_size(1);
        assert!(block_on(client.fetch_new(&mut cursor)).is_err());
        assert_eq!(cursor.state(), &state);

        let requests = mock.requests();
        assert_eq!(requests[0].query_param("id_gt"), Some("3"));
        assert_eq!(requests[0].query_param("limit"), Some("1"));
    }

    #[test]
    fn cursor_state_serializes_compactly() {
        let fresh = serde_json::to_value(CursorState::default()).unwrap();
        assert_eq!(fresh, json!({}));

        let saved = json!({"last_id": "42"});
        let state: CursorState = serde_json::from_value(saved).unwrap();
        assert_eq!(state.last_id.as_deref(), Some("42"));
    }
}
