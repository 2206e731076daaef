//! Error types for the object mapper.

use thiserror::Error;

/// Result type for mapping operations.
pub type MapResult<T> = Result<T, MapError>;

/// Errors that can occur while converting between JSON and typed records.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MapError {
    /// JSON could not be structured into the target type.
    #[error("cannot structure {target}: {message}")]
    Structure {
        /// Name of the target type.
        target: &'static str,
        /// Underlying serde message.
        message: String,
    },

    /// A typed value could not be rendered as JSON.
    #[error("cannot unstructure {source_type}: {message}")]
    Unstructure {
        /// Name of the source type.
        source_type: &'static str,
        /// Underlying serde message.
        message: String,
    },

    /// A scalar had an invalid textual form.
    #[error("invalid {what}: {value:?}")]
    InvalidValue {
        /// What kind of value was being parsed.
        what: &'static str,
        /// The offending input.
        value: String,
    },
}

impl MapError {
    /// Creates an invalid-value error.
    pub fn invalid(what: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            what,
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = MapError::Structure {
            target: "Task",
            message: "missing field `pool_id`".into(),
        };
        assert_eq!(
            err.to_string(),
            "cannot structure Task: missing field `pool_id`"
        );

        let err = MapError::invalid("timestamp", "yesterday");
        assert!(err.to_string().contains("yesterday"));
    }
}
