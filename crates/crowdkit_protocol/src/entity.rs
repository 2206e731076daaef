//! Entity records and their collection metadata.

use crate::mapper::{Money, ServerTimestamp};
use crate::search::{
    SearchRequest, TaskSearchRequest, TaskSuiteSearchRequest, UserBonusSearchRequest,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A record type that lives in an API collection and is created in batches.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection path segment, e.g. `tasks`.
    const COLLECTION: &'static str;
    /// Wire name of the batch-create operation type.
    const OPERATION_TYPE: &'static str;
    /// Log entry types written for this entity by a create operation.
    const CREATE_LOG_TYPES: &'static [&'static str];
    /// Output field of a successful log entry holding the produced id.
    const OUTPUT_ID_FIELD: &'static str;
    /// Input field narrowing read-back queries, if the collection has one.
    const SCOPE_FIELD: Option<&'static str>;

    /// Search request type of this collection.
    type Search: SearchRequest;

    /// Server-assigned id, absent before creation.
    fn id(&self) -> Option<&str>;

    /// Builds the read-back query for ids in `[id_gte, id_lte]` within `scope`.
    fn scoped_search(scope: Option<&str>, id_gte: &str, id_lte: &str) -> Self::Search;

    /// API path of the collection.
    fn collection_path() -> String {
        format!("/v1/{}", Self::COLLECTION)
    }

    /// API path of one record.
    fn record_path(id: &str) -> String {
        format!("/v1/{}/{}", Self::COLLECTION, id)
    }
}

/// A task assigned to performers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Task id. Read only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Pool the task belongs to.
    pub pool_id: String,
    /// Input data, keyed by input field name.
    #[serde(default)]
    pub input_values: Map<String, Value>,
    /// Hint shown in training tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_on_unknown_solution: Option<String>,
    /// Number of performers who should complete the task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlap: Option<u32>,
    /// Assign the task to every performer who qualifies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infinite_overlap: Option<bool>,
    /// Performers who may take the task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved_for: Option<Vec<String>>,
    /// Performers who may not take the task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unavailable_for: Option<Vec<String>>,
    /// Parent task when created by copying. Read only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_task_id: Option<String>,
    /// Remaining assignments. Read only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_overlap: Option<u32>,
    /// Creation time. Read only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<ServerTimestamp>,
}

impl Task {
    /// Creates a task for `pool_id` with the given input values.
    pub fn new(pool_id: impl Into<String>, input_values: Map<String, Value>) -> Self {
        Self {
            pool_id: pool_id.into(),
            input_values,
            ..Self::default()
        }
    }
}

impl Entity for Task {
    const COLLECTION: &'static str = "tasks";
    const OPERATION_TYPE: &'static str = "TASK.BATCH_CREATE";
    const CREATE_LOG_TYPES: &'static [&'static str] = &["TASK_CREATE", "TASK_VALIDATE"];
    const OUTPUT_ID_FIELD: &'static str = "task_id";
    const SCOPE_FIELD: Option<&'static str> = Some("pool_id");

    type Search = TaskSearchRequest;

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn scoped_search(scope: Option<&str>, id_gte: &str, id_lte: &str) -> TaskSearchRequest {
        TaskSearchRequest {
            pool_id: scope.map(str::to_string),
            id_gte: Some(id_gte.to_string()),
            id_lte: Some(id_lte.to_string()),
            ..TaskSearchRequest::default()
        }
    }
}

/// A task inside a task suite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuiteTask {
    /// Task id. Read only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Input data, keyed by input field name.
    #[serde(default)]
    pub input_values: Map<String, Value>,
    /// Parent task when created by copying. Read only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_task_id: Option<String>,
}

/// A set of tasks shown to a performer on one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskSuite {
    /// Suite id. Read only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Pool the suite belongs to.
    pub pool_id: String,
    /// Tasks of the suite.
    #[serde(default)]
    pub tasks: Vec<SuiteTask>,
    /// Number of performers who should complete the suite.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlap: Option<u32>,
    /// Assign the suite to every performer who qualifies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infinite_overlap: Option<bool>,
    /// Whether the suite mixes general, control and training tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mixed: Option<bool>,
    /// Performers who may take the suite.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved_for: Option<Vec<String>>,
    /// Remaining assignments. Read only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_overlap: Option<u32>,
    /// Creation time. Read only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<ServerTimestamp>,
}

impl TaskSuite {
    /// Creates a suite for `pool_id`.
    pub fn new(pool_id: impl Into<String>, tasks: Vec<SuiteTask>) -> Self {
        Self {
            pool_id: pool_id.into(),
            tasks,
            ..Self::default()
        }
    }
}

impl Entity for TaskSuite {
    const COLLECTION: &'static str = "task-suites";
    const OPERATION_TYPE: &'static str = "TASK_SUITE.BATCH_CREATE";
    const CREATE_LOG_TYPES: &'static [&'static str] =
        &["TASK_SUITE_CREATE", "TASK_SUITE_VALIDATE"];
    const OUTPUT_ID_FIELD: &'static str = "task_suite_id";
    const SCOPE_FIELD: Option<&'static str> = Some("pool_id");

    type Search = TaskSuiteSearchRequest;

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn scoped_search(scope: Option<&str>, id_gte: &str, id_lte: &str) -> TaskSuiteSearchRequest {
        TaskSuiteSearchRequest {
            pool_id: scope.map(str::to_string),
            id_gte: Some(id_gte.to_string()),
            id_lte: Some(id_lte.to_string()),
            ..TaskSuiteSearchRequest::default()
        }
    }
}

/// A bonus paid to a performer on top of task rewards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserBonus {
    /// Bonus id. Read only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Performer receiving the bonus.
    pub user_id: String,
    /// Amount in dollars.
    pub amount: Money,
    /// Assignment the bonus is paid for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment_id: Option<String>,
    /// Comment visible to the requester only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_comment: Option<String>,
    /// Message title per language code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_title: Option<BTreeMap<String, String>>,
    /// Message text per language code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_message: Option<BTreeMap<String, String>>,
    /// Pay without notifying the performer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub without_message: Option<bool>,
    /// Creation time. Read only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<ServerTimestamp>,
}

impl UserBonus {
    /// Creates a bonus without a message.
    pub fn new(user_id: impl Into<String>, amount: Money) -> Self {
        Self {
            id: None,
            user_id: user_id.into(),
            amount,
            assignment_id: None,
            private_comment: None,
            public_title: None,
            public_message: None,
            without_message: None,
            created: None,
        }
    }
}

impl Entity for UserBonus {
    const COLLECTION: &'static str = "user-bonuses";
    const OPERATION_TYPE: &'static str = "USER_BONUS.BATCH_CREATE";
    const CREATE_LOG_TYPES: &'static [&'static str] =
        &["USER_BONUS_PERSIST", "USER_BONUS_VALIDATE"];
    const OUTPUT_ID_FIELD: &'static str = "user_bonus_id";
    const SCOPE_FIELD: Option<&'static str> = None;

    type Search = UserBonusSearchRequest;

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn scoped_search(_scope: Option<&str>, id_gte: &str, id_lte: &str) -> UserBonusSearchRequest {
        UserBonusSearchRequest {
            id_gte: Some(id_gte.to_string()),
            id_lte: Some(id_lte.to_string()),
            ..UserBonusSearchRequest::default()
        }
    }
}
