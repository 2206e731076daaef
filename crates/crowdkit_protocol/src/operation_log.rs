//! Per-item operation log.

use crate::batch::FieldValidationError;
use crate::error::MapResult;
use crate::mapper::structure;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Input field carrying the client-side correlation key of a batch item.
pub const CORRELATION_KEY: &str = "__client_uuid";

wire_enum! {
    /// Type of an operation log entry.
    LogItemType {
        /// A task was created.
        TaskCreate => "TASK_CREATE",
        /// A task failed validation.
        TaskValidate => "TASK_VALIDATE",
        /// A task suite was created.
        TaskSuiteCreate => "TASK_SUITE_CREATE",
        /// A task suite failed validation.
        TaskSuiteValidate => "TASK_SUITE_VALIDATE",
        /// A user bonus was persisted.
        UserBonusPersist => "USER_BONUS_PERSIST",
        /// A user bonus failed validation.
        UserBonusValidate => "USER_BONUS_VALIDATE",
    }
}

/// One entry of an operation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationLogItem {
    /// Entry type.
    #[serde(rename = "type")]
    pub item_type: LogItemType,
    /// Whether the item was processed successfully.
    #[serde(default)]
    pub success: bool,
    /// The submitted item, echoed back.
    #[serde(default)]
    pub input: Map<String, Value>,
    /// Produced id on success, per-field errors on failure.
    #[serde(default)]
    pub output: Map<String, Value>,
}

impl OperationLogItem {
    /// Returns the correlation key echoed in the input, if any.
    pub fn correlation_key(&self, key_name: &str) -> Option<&str> {
        self.input.get(key_name).and_then(Value::as_str)
    }

    /// Returns the produced id stored under `field` in the output.
    ///
    /// Numeric ids are rendered as decimal strings.
    pub fn produced_id(&self, field: &str) -> Option<String> {
        match self.output.get(field)? {
            Value::String(id) => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }

    /// Returns the value of an input field rendered as a string.
    pub fn input_str(&self, field: &str) -> Option<String> {
        match self.input.get(field)? {
            Value::String(value) => Some(value.clone()),
            Value::Number(value) => Some(value.to_string()),
            _ => None,
        }
    }

    /// Structures the output as per-field validation errors.
    pub fn field_errors(&self) -> MapResult<BTreeMap<String, FieldValidationError>> {
        self.output
            .iter()
            .map(|(field, raw)| Ok((field.clone(), structure(raw.clone())?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(raw: Value) -> OperationLogItem {
        structure(raw).unwrap()
    }

    #[test]
    fn success_entry() {
        let item = entry(json!({
            "type": "TASK_CREATE",
            "success": true,
            "input": {"__client_uuid": "abc", "pool_id": "21"},
            "output": {"task_id": "0001"}
        }));

        assert_eq!(item.item_type, LogItemType::TaskCreate);
        assert_eq!(item.correlation_key(CORRELATION_KEY), Some("abc"));
        assert_eq!(item.produced_id("task_id").as_deref(), Some("0001"));
        assert_eq!(item.input_str("pool_id").as_deref(), Some("21"));
    }

    #[test]
    fn failure_entry_exposes_field_errors() {
        let item = entry(json!({
            "type": "TASK_VALIDATE",
            "success": false,
            "input": {"__client_uuid": "def"},
            "output": {
                "input_values.image": {"code": "VALUE_REQUIRED", "message": "Value must be present"}
            }
        }));

        let errors = item.field_errors().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors["input_values.image"].code, "VALUE_REQUIRED");
    }

    #[test]
    fn numeric_ids_become_strings() {
        let item = entry(json!({
            "type": "USER_BONUS_PERSIST",
            "success": true,
            "output": {"user_bonus_id": 42}
        }));
        assert_eq!(item.produced_id("user_bonus_id").as_deref(), Some("42"));
        assert_eq!(item.correlation_key(CORRELATION_KEY), None);
    }

    #[test]
    fn unrelated_types_are_preserved() {
        let item = entry(json!({"type": "POOL_OPEN", "success": true}));
        assert_eq!(item.item_type, LogItemType::Other("POOL_OPEN".into()));
        assert_eq!(item.item_type.as_str(), "POOL_OPEN");
    }
}
