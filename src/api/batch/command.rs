//! Individual operations inside a `$batch` request

use crate::api::constants::headers;
use crate::api::keys::encode_altkeys;
use crate::error::{DataverseError, Result};
use serde_json::{Map, Value, json};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

impl RequestMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestMethod::Get => "GET",
            RequestMethod::Post => "POST",
            RequestMethod::Patch => "PATCH",
            RequestMethod::Put => "PUT",
            RequestMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<RequestMethod> for reqwest::Method {
    fn from(method: RequestMethod) -> Self {
        match method {
            RequestMethod::Get => reqwest::Method::GET,
            RequestMethod::Post => reqwest::Method::POST,
            RequestMethod::Patch => reqwest::Method::PATCH,
            RequestMethod::Put => reqwest::Method::PUT,
            RequestMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A single request carried inside a `$batch` body.
///
/// `url` is relative to the Web API endpoint (or a `$n` Content-ID
/// reference inside a changeset). Quoted alternate key values are
/// percent-encoded on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchCommand {
    pub url: String,
    pub method: RequestMethod,
    pub headers: Vec<(String, String)>,
    pub data: Option<Value>,
}

impl BatchCommand {
    /// Build a command, applying the single-column rewrite for PUT.
    ///
    /// PUT addresses one column: the data must hold exactly one entry, whose
    /// name is appended to the URL and whose value is sent as `{"value": v}`.
    pub fn new(url: impl Into<String>, method: RequestMethod, data: Option<Value>) -> Result<Self> {
        let mut url = url.into();
        let mut data = data;

        if method == RequestMethod::Put {
            let row = data
                .as_ref()
                .and_then(Value::as_object)
                .ok_or_else(|| DataverseError::validation("PUT requires a single-column object payload"))?;
            if row.len() != 1 {
                return Err(DataverseError::validation(format!(
                    "PUT updates exactly one column, got {}",
                    row.len()
                )));
            }
            let (column, value) = row
                .iter()
                .next()
                .map(|(k, v)| (k.clone(), v.clone()))
                .ok_or_else(|| DataverseError::validation("PUT payload is empty"))?;
            url = format!("{}/{}", url, column);
            data = Some(json!({ "value": value }));
        }

        Ok(Self {
            url: encode_altkeys(&url),
            method,
            headers: Vec::new(),
            data,
        })
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: encode_altkeys(&url.into()),
            method: RequestMethod::Get,
            headers: Vec::new(),
            data: None,
        }
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self {
            url: encode_altkeys(&url.into()),
            method: RequestMethod::Delete,
            headers: Vec::new(),
            data: None,
        }
    }

    pub fn post(url: impl Into<String>, data: Value) -> Self {
        Self {
            url: encode_altkeys(&url.into()),
            method: RequestMethod::Post,
            headers: Vec::new(),
            data: Some(data),
        }
    }

    pub fn patch(url: impl Into<String>, data: Value) -> Self {
        Self {
            url: encode_altkeys(&url.into()),
            method: RequestMethod::Patch,
            headers: Vec::new(),
            data: Some(data),
        }
    }

    pub fn put(url: impl Into<String>, row: Map<String, Value>) -> Result<Self> {
        Self::new(url, RequestMethod::Put, Some(Value::Object(row)))
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Content-Type line for the part body, if the command carries one
    pub fn content_type(&self) -> Option<String> {
        self.data.as_ref()?;
        match self.method {
            RequestMethod::Post => Some(format!("{}; type=entry", headers::APPLICATION_JSON)),
            _ => Some(headers::APPLICATION_JSON.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_rewrites_url_and_body() {
        let mut row = Map::new();
        row.insert("name".to_string(), json!("Contoso"));
        let cmd = BatchCommand::put("accounts(code='A1')", row).unwrap();

        assert_eq!(cmd.url, "accounts(code='A1')/name");
        assert_eq!(cmd.data, Some(json!({"value": "Contoso"})));
    }

    #[test]
    fn test_put_requires_single_column() {
        let mut row = Map::new();
        row.insert("a".to_string(), json!(1));
        row.insert("b".to_string(), json!(2));
        assert!(BatchCommand::put("accounts(code='A1')", row).is_err());
        assert!(BatchCommand::new("accounts(code='A1')", RequestMethod::Put, None).is_err());
    }

    #[test]
    fn test_post_content_type() {
        let cmd = BatchCommand::post("accounts", json!({"name": "x"}));
        assert_eq!(cmd.content_type().as_deref(), Some("application/json; type=entry"));

        let cmd = BatchCommand::patch("accounts(code='x')", json!({"name": "x"}));
        assert_eq!(cmd.content_type().as_deref(), Some("application/json"));

        assert_eq!(BatchCommand::get("accounts").content_type(), None);
    }

    #[test]
    fn test_url_is_encoded() {
        let cmd = BatchCommand::delete("accounts(name='Ærø')");
        assert_eq!(cmd.url, "accounts(name='%C3%86r%C3%B8')");
    }
}
