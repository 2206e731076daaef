//! Query parameters of create requests.

use crate::error::{MapError, MapResult};
use uuid::Uuid;

/// Parameters controlling a create request.
///
/// Rendered into the query string; booleans as `true`/`false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateParameters {
    /// Idempotency token. Generated by the client when absent.
    pub operation_id: Option<Uuid>,
    /// Let the server execute the request as a long-running operation.
    pub async_mode: bool,
    /// Create the valid items even if some items are invalid.
    pub skip_invalid_items: Option<bool>,
    /// Use the pool's default overlap for new tasks.
    pub allow_defaults: Option<bool>,
    /// Open the pool after creation if it is closed.
    pub open_pool: Option<bool>,
}

impl CreateParameters {
    /// Creates parameters for an asynchronous server-side operation.
    pub fn new() -> Self {
        Self {
            operation_id: None,
            async_mode: true,
            skip_invalid_items: None,
            allow_defaults: None,
            open_pool: None,
        }
    }

    /// Sets the idempotency token.
    pub fn with_operation_id(mut self, operation_id: Uuid) -> Self {
        self.operation_id = Some(operation_id);
        self
    }

    /// Sets the server execution mode.
    pub fn with_async_mode(mut self, async_mode: bool) -> Self {
        self.async_mode = async_mode;
        self
    }

    /// Sets whether invalid items are skipped instead of failing the request.
    pub fn with_skip_invalid_items(mut self, skip: bool) -> Self {
        self.skip_invalid_items = Some(skip);
        self
    }

    /// Sets whether pool defaults apply.
    pub fn with_allow_defaults(mut self, allow: bool) -> Self {
        self.allow_defaults = Some(allow);
        self
    }

    /// Sets whether the pool is opened after creation.
    pub fn with_open_pool(mut self, open: bool) -> Self {
        self.open_pool = Some(open);
        self
    }

    /// Renders the parameters as query pairs.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(id) = self.operation_id {
            query.push(("operation_id".to_string(), id.to_string()));
        }
        query.push(("async_mode".to_string(), bool_param(self.async_mode)));
        let flags = [
            ("skip_invalid_items", self.skip_invalid_items),
            ("allow_defaults", self.allow_defaults),
            ("open_pool", self.open_pool),
        ];
        for (name, value) in flags {
            if let Some(value) = value {
                query.push((name.to_string(), bool_param(value)));
            }
        }
        query
    }

    /// Parses parameters back from query pairs. Unknown keys are ignored.
    pub fn from_query(query: &[(String, String)]) -> MapResult<Self> {
        let mut params = Self::new();
        for (key, value) in query {
            match key.as_str() {
                "operation_id" => {
                    let id = Uuid::parse_str(value)
                        .map_err(|_| MapError::invalid("operation_id", value.as_str()))?;
                    params.operation_id = Some(id);
                }
                "async_mode" => params.async_mode = parse_bool(key, value)?,
                "skip_invalid_items" => params.skip_invalid_items = Some(parse_bool(key, value)?),
                "allow_defaults" => params.allow_defaults = Some(parse_bool(key, value)?),
                "open_pool" => params.open_pool = Some(parse_bool(key, value)?),
                _ => {}
            }
        }
        Ok(params)
    }
}

impl Default for CreateParameters {
    fn default() -> Self {
        Self::new()
    }
}

fn bool_param(value: bool) -> String {
    if value { "true" } else { "false" }.to_string()
}

fn parse_bool(key: &str, value: &str) -> MapResult<bool> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(MapError::InvalidValue {
            what: "boolean parameter",
            value: format!("{key}={value}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    #[test]
    fn defaults_to_async_mode() {
        let params = CreateParameters::default();
        assert!(params.async_mode);
        assert_eq!(params.to_query(), vec![pair("async_mode", "true")]);
    }

    #[test]
    fn renders_lowercase_booleans() {
        let id = Uuid::from_u128(1);
        let params = CreateParameters::new()
            .with_operation_id(id)
            .with_async_mode(false)
            .with_skip_invalid_items(true)
            .with_open_pool(false);

        assert_eq!(
            params.to_query(),
            vec![
                pair("operation_id", "00000000-0000-0000-0000-000000000001"),
                pair("async_mode", "false"),
                pair("skip_invalid_items", "true"),
                pair("open_pool", "false"),
            ]
        );
    }

    #[test]
    fn parses_back_from_query() {
        let params = CreateParameters::new()
            .with_operation_id(Uuid::from_u128(7))
            .with_allow_defaults(true);
        let parsed = CreateParameters::from_query(&params.to_query()).unwrap();
        assert_eq!(parsed, params);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(CreateParameters::from_query(&[pair("async_mode", "yes")]).is_err());
        assert!(CreateParameters::from_query(&[pair("operation_id", "nope")]).is_err());
        assert!(CreateParameters::from_query(&[pair("limit", "10")]).is_ok());
    }
}
