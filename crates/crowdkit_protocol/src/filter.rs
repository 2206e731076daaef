//! Filter-condition trees.
//!
//! A filter is either a leaf [`Condition`] or an `and`/`or` node over child
//! filters. Wire forms:
//!
//! - `{"and": [..]}` / `{"or": [..]}`
//! - `{"category": "profile", "key": "country", "operator": "EQ", "value": "FR"}`
//!
//! Nested nodes of the same kind are flattened when built through
//! [`FilterCondition::and`], [`FilterCondition::or`] or the `&`/`|` operators.
//!
//! No request in this workspace takes a filter. The tree is a standalone
//! builder for the `filter` field of audience settings a caller sends
//! itself; it serializes to and parses from that field's JSON.
//!
//! ```
//! use crowdkit_protocol::{CompareOperator, Condition, FilterCondition};
//! use serde_json::json;
//!
//! let filter = FilterCondition::from(Condition::profile("country", CompareOperator::Eq, "FR"))
//!     & FilterCondition::from(Condition::skill("224", CompareOperator::Gte, 80));
//! let wire = serde_json::to_value(&filter).unwrap();
//! assert_eq!(wire["and"][1]["key"], json!("224"));
//! ```

use crate::error::{MapError, MapResult};
use crate::mapper::{structure, unstructure};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::ops::{BitAnd, BitOr};

/// Comparison operator of a leaf condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompareOperator {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Contained in.
    In,
    /// Not contained in.
    NotIn,
}

impl CompareOperator {
    /// Returns the operator matching exactly the complement.
    pub fn inverted(self) -> Self {
        match self {
            CompareOperator::Eq => CompareOperator::Ne,
            CompareOperator::Ne => CompareOperator::Eq,
            CompareOperator::Gt => CompareOperator::Lte,
            CompareOperator::Lte => CompareOperator::Gt,
            CompareOperator::Gte => CompareOperator::Lt,
            CompareOperator::Lt => CompareOperator::Gte,
            CompareOperator::In => CompareOperator::NotIn,
            CompareOperator::NotIn => CompareOperator::In,
        }
    }
}

/// What a leaf condition looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterCategory {
    /// Performer profile data.
    Profile,
    /// Values computed by the platform.
    Computed,
    /// Skill levels, keyed by skill id.
    Skill,
}

/// A single comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Category of the key.
    pub category: FilterCategory,
    /// Field or skill id.
    pub key: String,
    /// Operator.
    pub operator: CompareOperator,
    /// Right-hand side; `null` is meaningful for skills.
    pub value: Value,
}

impl Condition {
    /// Creates a condition.
    pub fn new(
        category: FilterCategory,
        key: impl Into<String>,
        operator: CompareOperator,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            category,
            key: key.into(),
            operator,
            value: value.into(),
        }
    }

    /// Condition on a profile field.
    pub fn profile(key: impl Into<String>, operator: CompareOperator, value: impl Into<Value>) -> Self {
        Self::new(FilterCategory::Profile, key, operator, value)
    }

    /// Condition on a computed field.
    pub fn computed(key: impl Into<String>, operator: CompareOperator, value: impl Into<Value>) -> Self {
        Self::new(FilterCategory::Computed, key, operator, value)
    }

    /// Condition on a skill level.
    pub fn skill(skill_id: impl Into<String>, operator: CompareOperator, value: impl Into<Value>) -> Self {
        Self::new(FilterCategory::Skill, skill_id, operator, value)
    }

    /// Returns the complementary condition.
    pub fn inverted(&self) -> Self {
        Self {
            operator: self.operator.inverted(),
            ..self.clone()
        }
    }
}

/// A boolean tree of conditions.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterCondition {
    /// All children must hold.
    And(Vec<FilterCondition>),
    /// At least one child must hold.
    Or(Vec<FilterCondition>),
    /// A single comparison.
    Leaf(Condition),
}

impl FilterCondition {
    /// Conjunction, flattening nested `And` children.
    pub fn and(children: impl IntoIterator<Item = FilterCondition>) -> Self {
        let mut flat = Vec::new();
        for child in children {
            match child {
                FilterCondition::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        FilterCondition::And(flat)
    }

    /// Disjunction, flattening nested `Or` children.
    pub fn or(children: impl IntoIterator<Item = FilterCondition>) -> Self {
        let mut flat = Vec::new();
        for child in children {
            match child {
                FilterCondition::Or(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        FilterCondition::Or(flat)
    }

    /// Number of leaf conditions in the tree.
    pub fn leaf_count(&self) -> usize {
        match self {
            FilterCondition::And(children) | FilterCondition::Or(children) => {
                children.iter().map(FilterCondition::leaf_count).sum()
            }
            FilterCondition::Leaf(_) => 1,
        }
    }

    fn to_value(&self) -> MapResult<Value> {
        let (key, children) = match self {
            FilterCondition::And(children) => ("and", children),
            FilterCondition::Or(children) => ("or", children),
            FilterCondition::Leaf(condition) => return unstructure(condition),
        };
        let rendered = children
            .iter()
            .map(FilterCondition::to_value)
            .collect::<MapResult<Vec<_>>>()?;
        let mut map = Map::new();
        map.insert(key.to_string(), Value::Array(rendered));
        Ok(Value::Object(map))
    }

    fn from_value(raw: Value) -> MapResult<Self> {
        let Value::Object(mut map) = raw else {
            return Err(MapError::invalid("filter", raw.to_string()));
        };

        for (key, build) in [
            ("and", FilterCondition::And as fn(Vec<FilterCondition>) -> FilterCondition),
            ("or", FilterCondition::Or),
        ] {
            if let Some(children) = map.remove(key) {
                let Value::Array(children) = children else {
                    return Err(MapError::invalid("filter", children.to_string()));
                };
                let children = children
                    .into_iter()
                    .map(FilterCondition::from_value)
                    .collect::<MapResult<Vec<_>>>()?;
                return Ok(build(children));
            }
        }

        structure(Value::Object(map)).map(FilterCondition::Leaf)
    }
}

impl From<Condition> for FilterCondition {
    fn from(condition: Condition) -> Self {
        FilterCondition::Leaf(condition)
    }
}

impl BitAnd for FilterCondition {
    type Output = FilterCondition;

    fn bitand(self, rhs: Self) -> Self::Output {
        FilterCondition::and([self, rhs])
    }
}

impl BitOr for FilterCondition {
    type Output = FilterCondition;

    fn bitor(self, rhs: Self) -> Self::Output {
        FilterCondition::or([self, rhs])
    }
}

impl Serialize for FilterCondition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value()
            .map_err(<S::Error as serde::ser::Error>::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FilterCondition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Self::from_value(raw).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn country(code: &str) -> FilterCondition {
        Condition::profile("country", CompareOperator::Eq, code).into()
    }

    #[test]
    fn operators_invert() {
        for op in [
            CompareOperator::Eq,
            CompareOperator::Ne,
            CompareOperator::Gt,
            CompareOperator::Gte,
            CompareOperator::Lt,
            CompareOperator::Lte,
            CompareOperator::In,
            CompareOperator::NotIn,
        ] {
            assert_ne!(op.inverted(), op);
            assert_eq!(op.inverted().inverted(), op);
        }
        assert_eq!(CompareOperator::Gt.inverted(), CompareOperator::Lte);
    }

    #[test]
    fn same_kind_nodes_flatten() {
        let filter = country("FR") & country("DE") & country("IT");
        assert_eq!(filter.leaf_count(), 3);
        assert!(matches!(&filter, FilterCondition::And(children) if children.len() == 3));

        let mixed = (country("FR") | country("DE")) & country("IT");
        match mixed {
            FilterCondition::And(children) => {
                assert_eq!(children.len(), 2);
                assert!(matches!(children[0], FilterCondition::Or(_)));
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn wire_form() {
        let filter = FilterCondition::or([
            country("FR"),
            Condition::skill("224", CompareOperator::Gte, 80).into(),
        ]);

        let raw = unstructure(&filter).unwrap();
        assert_eq!(
            raw,
            json!({"or": [
                {"category": "profile", "key": "country", "operator": "EQ", "value": "FR"},
                {"category": "skill", "key": "224", "operator": "GTE", "value": 80}
            ]})
        );

        let back: FilterCondition = structure(raw).unwrap();
        assert_eq!(back, filter);
    }

    #[test]
    fn nested_wire_form_parses() {
        let raw = json!({"and": [
            {"or": [
                {"category": "computed", "key": "region_by_phone", "operator": "IN", "value": 225},
                {"category": "skill", "key": "1", "operator": "EQ", "value": null}
            ]},
            {"category": "profile", "key": "gender", "operator": "NOT_IN", "value": "MALE"}
        ]});
        let filter: FilterCondition = structure(raw).unwrap();
        assert_eq!(filter.leaf_count(), 3);
    }

    #[test]
    fn malformed_filters_are_rejected() {
        assert!(structure::<FilterCondition>(json!({"and": 3})).is_err());
        assert!(structure::<FilterCondition>(json!([1, 2])).is_err());
        assert!(structure::<FilterCondition>(json!({"key": "x"})).is_err());
    }

    #[test]
    fn inverted_condition_keeps_key() {
        let cond = Condition::computed("rating", CompareOperator::Lt, 4);
        let inv = cond.inverted();
        assert_eq!(inv.operator, CompareOperator::Gte);
        assert_eq!(inv.key, "rating");
    }
}
