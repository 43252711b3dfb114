//! OData collection responses

use crate::error::{DataverseError, Result};
use serde_json::Value;

/// One page of rows
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResponse {
    pub value: Vec<Value>,
    pub count: Option<u64>,
    pub next_link: Option<String>,
}

impl QueryResponse {
    /// Parse an OData collection body
    pub fn from_json(json: Value) -> Result<Self> {
        let value = json
            .get("value")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                DataverseError::UnexpectedResponse("Missing or invalid 'value' array in response".to_string())
            })?
            .clone();

        let count = json.get("@odata.count").and_then(Value::as_u64);

        let next_link = json
            .get("@odata.nextLink")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self {
            value,
            count,
            next_link,
        })
    }

    pub fn has_more(&self) -> bool {
        self.next_link.is_some()
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_response_from_json() {
        let json = json!({
            "@odata.context": "https://org.crm.dynamics.com/api/data/v9.2/$metadata#accounts(name)",
            "value": [{"name": "A"}, {"name": "B"}],
            "@odata.count": 2,
            "@odata.nextLink": "https://org.crm.dynamics.com/api/data/v9.2/accounts?$skiptoken=x"
        });

        let response = QueryResponse::from_json(json).unwrap();

        assert_eq!(response.len(), 2);
        assert_eq!(response.count, Some(2));
        assert!(response.has_more());
    }

    #[test]
    fn test_last_page() {
        let response = QueryResponse::from_json(json!({"value": []})).unwrap();
        assert!(response.is_empty());
        assert!(!response.has_more());
        assert_eq!(response.count, None);
    }

    #[test]
    fn test_missing_value() {
        let err = QueryResponse::from_json(json!({"error": "x"})).unwrap_err();
        assert!(matches!(err, DataverseError::UnexpectedResponse(_)));
    }
}
