//! Batch creation results.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A validation error for one field of one submitted item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValidationError {
    /// Machine-readable error code, e.g. `VALUE_REQUIRED`.
    pub code: String,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// Extra parameters of the failed check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<Value>>,
}

impl FieldValidationError {
    /// Creates an error without parameters.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            params: None,
        }
    }
}

/// Per-item outcome of a batch creation.
///
/// Both maps are keyed by the zero-based submission index rendered as a
/// decimal string. For a complete result every submitted index appears in
/// exactly one of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchCreateResult<E> {
    /// Created entities.
    #[serde(default = "BTreeMap::new")]
    pub items: BTreeMap<String, E>,
    /// Field errors of the rejected items.
    #[serde(default)]
    pub validation_errors: BTreeMap<String, BTreeMap<String, FieldValidationError>>,
}

impl<E> BatchCreateResult<E> {
    /// Creates an empty result.
    pub fn new() -> Self {
        Self {
            items: BTreeMap::new(),
            validation_errors: BTreeMap::new(),
        }
    }

    /// Number of items accounted for, created or rejected.
    pub fn len(&self) -> usize {
        self.items.len() + self.validation_errors.len()
    }

    /// Returns true if no item is accounted for.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.validation_errors.is_empty()
    }

    /// Returns true if every index in `0..submitted` appears in exactly one map.
    pub fn is_complete_for(&self, submitted: usize) -> bool {
        self.len() == submitted
            && (0..submitted).all(|i| {
                let key = i.to_string();
                self.items.contains_key(&key) != self.validation_errors.contains_key(&key)
            })
    }
}

impl<E> Default for BatchCreateResult<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::structure;
    use serde_json::json;

    #[test]
    fn completeness_check() {
        let mut result: BatchCreateResult<String> = BatchCreateResult::new();
        assert!(result.is_complete_for(0));

        result.items.insert("0".into(), "a".into());
        result.items.insert("1".into(), "b".into());
        result.validation_errors.insert(
            "2".into(),
            BTreeMap::from([(
                "pool_id".to_string(),
                FieldValidationError::new("VALUE_REQUIRED", "required"),
            )]),
        );

        assert_eq!(result.len(), 3);
        assert!(result.is_complete_for(3));
        assert!(!result.is_complete_for(4));
    }

    #[test]
    fn overlapping_index_is_incomplete() {
        let mut result: BatchCreateResult<String> = BatchCreateResult::new();
        result.items.insert("0".into(), "a".into());
        result
            .validation_errors
            .insert("0".into(), BTreeMap::new());
        assert!(!result.is_complete_for(2));
    }

    #[test]
    fn structure_from_server_body() {
        let result: BatchCreateResult<Value> = structure(json!({
            "items": {"0": {"id": "1"}},
            "validation_errors": {
                "1": {"pool_id": {"code": "VALUE_REQUIRED", "message": "Value must be present"}}
            }
        }))
        .unwrap();

        assert!(result.is_complete_for(2));
        assert_eq!(result.validation_errors["1"]["pool_id"].code, "VALUE_REQUIRED");
    }

    #[test]
    fn missing_maps_default_to_empty() {
        let result: BatchCreateResult<Value> = structure(json!({})).unwrap();
        assert!(result.is_empty());
    }
}
