//! In-memory record storage with API-style search.

use crate::error::{BackendError, BackendResult};
use crowdkit_protocol::{ServerTimestamp, SortItems, SortOrder};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Comparison a filter key applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Bound {
    fn split(key: &str) -> (&str, Bound) {
        for (suffix, bound) in [
            ("_gte", Bound::Gte),
            ("_gt", Bound::Gt),
            ("_lte", Bound::Lte),
            ("_lt", Bound::Lt),
        ] {
            if let Some(field) = key.strip_suffix(suffix) {
                return (field, bound);
            }
        }
        (key, Bound::Eq)
    }

    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Bound::Eq => ordering == Ordering::Equal,
            Bound::Gt => ordering == Ordering::Greater,
            Bound::Gte => ordering != Ordering::Less,
            Bound::Lt => ordering == Ordering::Less,
            Bound::Lte => ordering != Ordering::Greater,
        }
    }
}

/// Compares a record field with a query value.
///
/// Numbers compare numerically, everything else by its text. Ids are
/// zero-padded, so text order is id order.
fn compare_to_query(field: &Value, query: &str) -> Option<Ordering> {
    match field {
        Value::Number(n) => {
            let left: f64 = n.to_string().parse().ok()?;
            let right: f64 = query.parse().ok()?;
            left.partial_cmp(&right)
        }
        Value::String(s) => Some(s.as_str().cmp(query)),
        Value::Bool(b) => Some(b.to_string().as_str().cmp(query)),
        _ => None,
    }
}

fn compare_fields(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    match (left, right) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let a: f64 = a.to_string().parse().unwrap_or(f64::NAN);
            let b: f64 = b.to_string().parse().unwrap_or(f64::NAN);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// Records of one collection, keyed by id.
#[derive(Debug, Default)]
struct Collection {
    records: BTreeMap<String, Value>,
}

/// Storage for every collection.
///
/// Ids come from one counter shared by all collections and are rendered
/// zero-padded to twelve digits.
#[derive(Debug, Default)]
pub struct Storage {
    collections: HashMap<String, Collection>,
    next_id: u64,
}

impl Storage {
    /// Creates empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `record`, assigning `id` and, if absent, `created`.
    pub fn insert(&mut self, collection: &str, mut record: Map<String, Value>) -> String {
        self.next_id += 1;
        let id = format!("{:012}", self.next_id);
        record.insert("id".into(), Value::String(id.clone()));
        record
            .entry("created")
            .or_insert_with(|| Value::String(ServerTimestamp::now().to_canonical()));
        self.collections
            .entry(collection.to_string())
            .or_default()
            .records
            .insert(id.clone(), Value::Object(record));
        id
    }

    /// Returns one record.
    pub fn get(&self, collection: &str, id: &str) -> Option<&Value> {
        self.collections.get(collection)?.records.get(id)
    }

    /// Returns the number of records in a collection.
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map_or(0, |c| c.records.len())
    }

    /// Returns all records of a collection in id order.
    pub fn records(&self, collection: &str) -> Vec<Value> {
        self.collections
            .get(collection)
            .map(|c| c.records.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Runs a find-style query: filters, then sort, then limit.
    ///
    /// Returns the page and whether more records matched.
    pub fn search(
        &self,
        collection: &str,
        query: &[(String, String)],
        default_limit: u32,
        max_limit: u32,
    ) -> BackendResult<(Vec<Value>, bool)> {
        let mut limit = default_limit;
        let mut sort = SortItems::by_id();
        let mut filters = Vec::new();
        for (key, value) in query {
            match key.as_str() {
                "limit" => {
                    limit = value
                        .parse()
                        .map_err(|_| BackendError::InvalidRequest(format!("bad limit {value}")))?;
                }
                "sort" => {
                    sort = value
                        .parse()
                        .map_err(|e| BackendError::InvalidRequest(format!("bad sort: {e}")))?;
                }
                _ => {
                    let (field, bound) = Bound::split(key);
                    filters.push((field, bound, value.as_str()));
                }
            }
        }
        if limit == 0 || limit > max_limit {
            return Err(BackendError::InvalidRequest(format!(
                "limit must be within 1..={max_limit}"
            )));
        }

        let Some(records) = self.collections.get(collection) else {
            return Ok((Vec::new(), false));
        };
        let mut matched: Vec<&Value> = records
            .records
            .values()
            .filter(|record| {
                filters.iter().all(|(field, bound, value)| {
                    record
                        .get(*field)
                        .and_then(|actual| compare_to_query(actual, value))
                        .map_or(false, |ordering| bound.accepts(ordering))
                })
            })
            .collect();

        matched.sort_by(|a, b| {
            sort.items()
                .iter()
                .map(|item| {
                    let ordering = compare_fields(a.get(&item.field), b.get(&item.field));
                    match item.order {
                        SortOrder::Ascending => ordering,
                        SortOrder::Descending => ordering.reverse(),
                    }
                })
                .find(|ordering| *ordering != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });

        let has_more = matched.len() > limit as usize;
        let page = matched
            .into_iter()
            .take(limit as usize)
            .cloned()
            .collect();
        Ok((page, has_more))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn query(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn ids(page: &[Value]) -> Vec<&str> {
        page.iter().map(|r| r["id"].as_str().unwrap()).collect()
    }

    fn seeded() -> Storage {
        let mut storage = Storage::new();
        for (pool, overlap) in [("a", 3), ("b", 1), ("a", 2), ("a", 5)] {
            storage.insert("tasks", object(json!({"pool_id": pool, "overlap": overlap})));
        }
        storage
    }

    #[test]
    fn ids_are_padded_and_ordered() {
        let storage = seeded();
        let all = storage.records("tasks");
        assert_eq!(ids(&all), ["000000000001", "000000000002", "000000000003", "000000000004"]);
        assert!(all[0].get("created").is_some());
        assert_eq!(storage.count("tasks"), 4);
        assert_eq!(storage.count("user-bonuses"), 0);
    }

    #[test]
    fn filters_combine() {
        let storage = seeded();
        let (page, has_more) = storage
            .search("tasks", &query(&[("pool_id", "a"), ("id_gt", "000000000001")]), 50, 100)
            .unwrap();
        assert_eq!(ids(&page), ["000000000003", "000000000004"]);
        assert!(!has_more);

        let (page, _) = storage
            .search("tasks", &query(&[("overlap_gte", "3")]), 50, 100)
            .unwrap();
        assert_eq!(ids(&page), ["000000000001", "000000000004"]);
    }

    #[test]
    fn sort_and_limit() {
        let storage = seeded();
        let (page, has_more) = storage
            .search("tasks", &query(&[("sort", "-overlap"), ("limit", "2")]), 50, 100)
            .unwrap();
        assert_eq!(ids(&page), ["000000000004", "000000000001"]);
        assert!(has_more);
    }

    #[test]
    fn invalid_limit_is_rejected() {
        let storage = seeded();
        let err = storage
            .search("tasks", &query(&[("limit", "0")]), 50, 100)
            .unwrap_err();
        assert_eq!(err.status(), 400);
        assert!(storage.search("tasks", &query(&[("limit", "x")]), 50, 100).is_err());
    }

    #[test]
    fn unknown_collection_is_empty() {
        let storage = Storage::new();
        let (page, has_more) = storage.search("tasks", &[], 50, 100).unwrap();
        assert!(page.is_empty());
        assert!(!has_more);
    }
}
