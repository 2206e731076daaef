//! Search requests, sorting and result pages.

use crate::error::{MapError, MapResult};
use crate::mapper::ServerTimestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One page of a find-style query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult<E> {
    /// Items of this page, in the requested order.
    #[serde(default = "Vec::new")]
    pub items: Vec<E>,
    /// Whether more items match beyond this page.
    #[serde(default)]
    pub has_more: bool,
}

impl<E> SearchResult<E> {
    /// Creates a page.
    pub fn new(items: Vec<E>, has_more: bool) -> Self {
        Self { items, has_more }
    }
}

/// A find-style request with an `id_gt` cursor.
pub trait SearchRequest: Clone + Default + Send + Sync + 'static {
    /// Renders the set filters as query pairs.
    fn to_query(&self) -> Vec<(String, String)>;

    /// Returns the current `id_gt` filter.
    fn id_gt(&self) -> Option<&str>;

    /// Returns a copy of this request with `id_gt` replaced.
    fn with_id_gt(self, id: String) -> Self;
}

/// Ordered query pairs, skipping unset filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPairs(Vec<(String, String)>);

impl QueryPairs {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a pair.
    pub fn push(&mut self, key: &str, value: impl fmt::Display) -> &mut Self {
        self.0.push((key.to_string(), value.to_string()));
        self
    }

    /// Appends a pair if the value is set.
    pub fn push_opt<V: fmt::Display>(&mut self, key: &str, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.push(key, value);
        }
        self
    }

    /// Returns the pairs.
    pub fn into_vec(self) -> Vec<(String, String)> {
        self.0
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

/// Sort by one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortItem {
    /// Field name.
    pub field: String,
    /// Direction.
    pub order: SortOrder,
}

impl SortItem {
    /// Ascending by `field`.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Ascending,
        }
    }

    /// Descending by `field`.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Descending,
        }
    }
}

impl fmt::Display for SortItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.order {
            SortOrder::Ascending => f.write_str(&self.field),
            SortOrder::Descending => write!(f, "-{}", self.field),
        }
    }
}

/// Sort specification, rendered as `a,-b`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortItems(pub Vec<SortItem>);

impl SortItems {
    /// Ascending by `id`, the order used for exhaustive pagination.
    pub fn by_id() -> Self {
        Self(vec![SortItem::asc("id")])
    }

    /// Returns the items.
    pub fn items(&self) -> &[SortItem] {
        &self.0
    }
}

impl fmt::Display for SortItems {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{item}")?;
        }
        Ok(())
    }
}

impl FromStr for SortItems {
    type Err = MapError;

    fn from_str(s: &str) -> MapResult<Self> {
        let mut items = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let item = match part.strip_prefix('-') {
                Some(field) => SortItem::desc(field),
                None => SortItem::asc(part),
            };
            if item.field.is_empty() {
                return Err(MapError::invalid("sort", s));
            }
            items.push(item);
        }
        Ok(Self(items))
    }
}

impl From<Vec<SortItem>> for SortItems {
    fn from(items: Vec<SortItem>) -> Self {
        Self(items)
    }
}

fn push_ranges(
    query: &mut QueryPairs,
    ids: [&Option<String>; 4],
    created: [&Option<ServerTimestamp>; 4],
) {
    const SUFFIXES: [&str; 4] = ["lt", "lte", "gt", "gte"];
    for (suffix, id) in SUFFIXES.iter().zip(ids) {
        query.push_opt(&format!("id_{suffix}"), id.as_deref());
    }
    for (suffix, ts) in SUFFIXES.iter().zip(created) {
        query.push_opt(&format!("created_{suffix}"), ts.as_ref());
    }
}

/// Filters for finding tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskSearchRequest {
    /// Pool the tasks belong to.
    pub pool_id: Option<String>,
    /// Tasks with this overlap.
    pub overlap: Option<u32>,
    /// Id strictly less than.
    pub id_lt: Option<String>,
    /// Id less than or equal.
    pub id_lte: Option<String>,
    /// Id strictly greater than.
    pub id_gt: Option<String>,
    /// Id greater than or equal.
    pub id_gte: Option<String>,
    /// Created strictly before.
    pub created_lt: Option<ServerTimestamp>,
    /// Created at or before.
    pub created_lte: Option<ServerTimestamp>,
    /// Created strictly after.
    pub created_gt: Option<ServerTimestamp>,
    /// Created at or after.
    pub created_gte: Option<ServerTimestamp>,
}

impl TaskSearchRequest {
    /// Tasks of one pool.
    pub fn for_pool(pool_id: impl Into<String>) -> Self {
        Self {
            pool_id: Some(pool_id.into()),
            ..Self::default()
        }
    }
}

impl SearchRequest for TaskSearchRequest {
    fn to_query(&self) -> Vec<(String, String)> {
        let mut query = QueryPairs::new();
        query
            .push_opt("pool_id", self.pool_id.as_deref())
            .push_opt("overlap", self.overlap);
        push_ranges(
            &mut query,
            [&self.id_lt, &self.id_lte, &self.id_gt, &self.id_gte],
            [
                &self.created_lt,
                &self.created_lte,
                &self.created_gt,
                &self.created_gte,
            ],
        );
        query.into_vec()
    }

    fn id_gt(&self) -> Option<&str> {
        self.id_gt.as_deref()
    }

    fn with_id_gt(self, id: String) -> Self {
        Self {
            id_gt: Some(id),
            ..self
        }
    }
}

/// Filters for finding task suites.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskSuiteSearchRequest {
    /// Suites containing this task.
    pub task_id: Option<String>,
    /// Pool the suites belong to.
    pub pool_id: Option<String>,
    /// Suites with this overlap.
    pub overlap: Option<u32>,
    /// Id strictly less than.
    pub id_lt: Option<String>,
    /// Id less than or equal.
    pub id_lte: Option<String>,
    /// Id strictly greater than.
    pub id_gt: Option<String>,
    /// Id greater than or equal.
    pub id_gte: Option<String>,
    /// Created strictly before.
    pub created_lt: Option<ServerTimestamp>,
    /// Created at or before.
    pub created_lte: Option<ServerTimestamp>,
    /// Created strictly after.
    pub created_gt: Option<ServerTimestamp>,
    /// Created at or after.
    pub created_gte: Option<ServerTimestamp>,
}

impl TaskSuiteSearchRequest {
    /// Suites of one pool.
    pub fn for_pool(pool_id: impl Into<String>) -> Self {
        Self {
            pool_id: Some(pool_id.into()),
            ..Self::default()
        }
    }
}

impl SearchRequest for TaskSuiteSearchRequest {
    fn to_query(&self) -> Vec<(String, String)> {
        let mut query = QueryPairs::new();
        query
            .push_opt("task_id", self.task_id.as_deref())
            .push_opt("pool_id", self.pool_id.as_deref())
            .push_opt("overlap", self.overlap);
        push_ranges(
            &mut query,
            [&self.id_lt, &self.id_lte, &self.id_gt, &self.id_gte],
            [
                &self.created_lt,
                &self.created_lte,
                &self.created_gt,
                &self.created_gte,
            ],
        );
        query.into_vec()
    }

    fn id_gt(&self) -> Option<&str> {
        self.id_gt.as_deref()
    }

    fn with_id_gt(self, id: String) -> Self {
        Self {
            id_gt: Some(id),
            ..self
        }
    }
}

/// Filters for finding user bonuses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserBonusSearchRequest {
    /// Bonuses issued to this user.
    pub user_id: Option<String>,
    /// Bonuses with this private comment.
    pub private_comment: Option<String>,
    /// Id strictly less than.
    pub id_lt: Option<String>,
    /// Id less than or equal.
    pub id_lte: Option<String>,
    /// Id strictly greater than.
    pub id_gt: Option<String>,
    /// Id greater than or equal.
    pub id_gte: Option<String>,
    /// Created strictly before.
    pub created_lt: Option<ServerTimestamp>,
    /// Created at or before.
    pub created_lte: Option<ServerTimestamp>,
    /// Created strictly after.
    pub created_gt: Option<ServerTimestamp>,
    /// Created at or after.
    pub created_gte: Option<ServerTimestamp>,
}

impl UserBonusSearchRequest {
    /// Bonuses of one user.
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }
}

impl SearchRequest for UserBonusSearchRequest {
    fn to_query(&self) -> Vec<(String, String)> {
        let mut query = QueryPairs::new();
        query
            .push_opt("user_id", self.user_id.as_deref())
            .push_opt("private_comment", self.private_comment.as_deref());
        push_ranges(
            &mut query,
            [&self.id_lt, &self.id_lte, &self.id_gt, &self.id_gte],
            [
                &self.created_lt,
                &self.created_lte,
                &self.created_gt,
                &self.created_gte,
            ],
        );
        query.into_vec()
    }

    fn id_gt(&self) -> Option<&str> {
        self.id_gt.as_deref()
    }

    fn with_id_gt(self, id: String) -> Self {
        Self {
            id_gt: Some(id),
            ..self
        }
    }
}
