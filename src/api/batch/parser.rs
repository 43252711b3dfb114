//! Dataverse $batch response parser
//!
//! Parses multipart/mixed batch responses, descending into changeset parts.

use crate::error::{DataverseError, Result, extract_error_message};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
enum ParsingState {
    MultipartHeaders,
    HttpStatus,
    HttpHeaders,
    Body,
}

/// Individual response item from a batch
#[derive(Debug, Clone)]
pub struct BatchResponseItem {
    pub content_id: Option<u32>,
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
    pub is_success: bool,
}

impl BatchResponseItem {
    /// Body parsed as JSON, if there is one
    pub fn json(&self) -> Option<Value> {
        let body = self.body.as_deref()?.trim();
        if body.is_empty() {
            return None;
        }
        serde_json::from_str(body).ok()
    }

    /// Readable error message for a failed item
    pub fn error_message(&self) -> Option<String> {
        if self.is_success {
            return None;
        }
        self.body
            .as_deref()
            .and_then(extract_error_message)
            .or_else(|| Some(format!("HTTP {}", self.status_code)))
    }

    /// Convert a failed item into an API error
    pub fn to_error(&self) -> Option<DataverseError> {
        if self.is_success {
            return None;
        }
        Some(DataverseError::from_response(
            self.status_code,
            self.body.clone().unwrap_or_default(),
        ))
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Fail with the first unsuccessful item, if any
pub fn ensure_success(items: &[BatchResponseItem]) -> Result<()> {
    match items.iter().find_map(BatchResponseItem::to_error) {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

/// Parser for batch responses
pub struct BatchResponseParser;

impl BatchResponseParser {
    /// Parse a batch response into its items, in response order.
    ///
    /// `content_type` is the response's Content-Type header; when it carries
    /// no boundary, the first `--` line of the body is used.
    pub fn parse(content_type: Option<&str>, response_text: &str) -> Result<Vec<BatchResponseItem>> {
        let boundary = content_type
            .and_then(boundary_from_content_type)
            .map(Ok)
            .unwrap_or_else(|| first_boundary_line(response_text))?;

        Self::parse_multipart(response_text, &boundary)
    }

    fn parse_multipart(text: &str, boundary: &str) -> Result<Vec<BatchResponseItem>> {
        let mut results = Vec::new();

        for part in split_parts(text, boundary) {
            let part = part.trim();
            if part.is_empty() || part == "--" {
                continue;
            }

            match nested_boundary(part) {
                Some(changeset_boundary) => {
                    results.extend(Self::parse_multipart(part, &changeset_boundary)?);
                }
                None if contains_header(part, "Content-Type: application/http") => {
                    results.push(Self::parse_http_response(part)?);
                }
                None => {
                    log::debug!("Skipping batch part without an HTTP payload");
                }
            }
        }

        Ok(results)
    }

    /// Parse an individual HTTP response
    fn parse_http_response(response_text: &str) -> Result<BatchResponseItem> {
        let mut content_id = None;
        let mut status_code = None;
        let mut headers = HashMap::new();
        let mut state = ParsingState::MultipartHeaders;
        let mut body_lines = Vec::new();

        for raw_line in response_text.lines() {
            let line = raw_line.trim_end_matches('\r');

            match state {
                ParsingState::MultipartHeaders => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        state = ParsingState::HttpStatus;
                    } else if let Some((name, value)) = trimmed.split_once(':') {
                        if name.trim().eq_ignore_ascii_case("Content-ID") {
                            content_id = value.trim().parse().ok();
                        }
                    }
                }
                ParsingState::HttpStatus => {
                    let trimmed = line.trim();
                    if trimmed.starts_with("HTTP/") {
                        let code = trimmed.split_whitespace().nth(1).and_then(|s| s.parse().ok());
                        status_code = Some(code.ok_or_else(|| {
                            DataverseError::BatchParse(format!("Invalid status line: {}", trimmed))
                        })?);
                        state = ParsingState::HttpHeaders;
                    }
                }
                ParsingState::HttpHeaders => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        state = ParsingState::Body;
                    } else if let Some((name, value)) = trimmed.split_once(':') {
                        headers.insert(name.trim().to_string(), value.trim().to_string());
                    }
                }
                ParsingState::Body => body_lines.push(line),
            }
        }

        let status_code = status_code
            .ok_or_else(|| DataverseError::BatchParse("Batch part has no HTTP status line".to_string()))?;

        let body_text = body_lines.join("\n").trim().to_string();
        let body = if body_text.is_empty() { None } else { Some(body_text) };

        Ok(BatchResponseItem {
            content_id,
            status_code,
            headers,
            body,
            is_success: (200..300).contains(&status_code),
        })
    }
}

/// Split on `--boundary` delimiter lines
fn split_parts<'a>(text: &'a str, boundary: &str) -> Vec<&'a str> {
    let delimiter = format!("--{}", boundary);
    text.split(delimiter.as_str()).skip(1).collect()
}

fn contains_header(part: &str, header: &str) -> bool {
    part.lines()
        .take_while(|l| !l.trim().is_empty())
        .any(|l| l.trim().to_ascii_lowercase().starts_with(&header.to_ascii_lowercase()))
}

/// Boundary of a changeset part, read from its own Content-Type header
fn nested_boundary(part: &str) -> Option<String> {
    part.lines()
        .take_while(|l| !l.trim().is_empty())
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if !name.trim().eq_ignore_ascii_case("Content-Type") {
                return None;
            }
            if !value.trim().to_ascii_lowercase().starts_with("multipart/mixed") {
                return None;
            }
            boundary_from_content_type(value)
        })
}

fn boundary_from_content_type(content_type: &str) -> Option<String> {
    let pos = content_type.find("boundary=")?;
    let raw = &content_type[pos + "boundary=".len()..];
    let boundary = raw
        .split(|c: char| c == ';' || c.is_whitespace())
        .next()?
        .trim_matches('"');
    if boundary.is_empty() {
        None
    } else {
        Some(boundary.to_string())
    }
}

fn first_boundary_line(text: &str) -> Result<String> {
    text.lines()
        .map(|l| l.trim())
        .find(|l| l.starts_with("--") && l.len() > 2)
        .map(|l| l.trim_start_matches("--").trim_end_matches("--").to_string())
        .ok_or_else(|| DataverseError::BatchParse("Could not find batch boundary in response".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = "--batchresponse_1\r\n\
Content-Type: application/http\r\n\
Content-Transfer-Encoding: binary\r\n\
\r\n\
HTTP/1.1 200 OK\r\n\
Content-Type: application/json; odata.metadata=minimal\r\n\
OData-Version: 4.0\r\n\
\r\n\
{\"LogicalName\":\"account\",\"EntitySetName\":\"accounts\"}\r\n\
--batchresponse_1\r\n\
Content-Type: application/http\r\n\
Content-Transfer-Encoding: binary\r\n\
\r\n\
HTTP/1.1 404 Not Found\r\n\
Content-Type: application/json; odata.metadata=minimal\r\n\
\r\n\
{\"error\":{\"code\":\"0x80060888\",\"message\":\"Resource not found\"}}\r\n\
--batchresponse_1--\r\n";

    const CHANGESET_RESPONSE: &str = "--batchresponse_2\r\n\
Content-Type: multipart/mixed; boundary=changesetresponse_9\r\n\
\r\n\
--changesetresponse_9\r\n\
Content-Type: application/http\r\n\
Content-Transfer-Encoding: binary\r\n\
Content-ID: 1\r\n\
\r\n\
HTTP/1.1 204 No Content\r\n\
OData-Version: 4.0\r\n\
OData-EntityId: https://org.crm.dynamics.com/api/data/v9.2/contacts(00000000-0000-0000-0000-000000000001)\r\n\
\r\n\
\r\n\
--changesetresponse_9\r\n\
Content-Type: application/http\r\n\
Content-Transfer-Encoding: binary\r\n\
Content-ID: 2\r\n\
\r\n\
HTTP/1.1 204 No Content\r\n\
OData-Version: 4.0\r\n\
\r\n\
\r\n\
--changesetresponse_9--\r\n\
--batchresponse_2--\r\n";

    #[test]
    fn test_parse_plain_parts() {
        let items = BatchResponseParser::parse(
            Some("multipart/mixed; boundary=batchresponse_1"),
            RESPONSE,
        )
        .unwrap();

        assert_eq!(items.len(), 2);
        assert!(items[0].is_success);
        assert_eq!(items[0].json().unwrap()["EntitySetName"], "accounts");
        assert_eq!(items[0].header("odata-version"), Some("4.0"));

        assert!(!items[1].is_success);
        assert_eq!(items[1].status_code, 404);
        assert_eq!(
            items[1].error_message().unwrap(),
            "Dataverse Error [0x80060888]: Resource not found"
        );
        assert_eq!(items[1].to_error().unwrap().status_code(), Some(404));

        let err = ensure_success(&items).unwrap_err();
        assert_eq!(err.status_code(), Some(404));
        assert!(ensure_success(&items[..1]).is_ok());
    }

    #[test]
    fn test_boundary_falls_back_to_body() {
        let items = BatchResponseParser::parse(None, RESPONSE).unwrap();
        assert_eq!(items.len(), 2);

        let items = BatchResponseParser::parse(Some("multipart/mixed"), RESPONSE).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_parse_changeset() {
        let items = BatchResponseParser::parse(
            Some("multipart/mixed; boundary=\"batchresponse_2\""),
            CHANGESET_RESPONSE,
        )
        .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].content_id, Some(1));
        assert_eq!(items[1].content_id, Some(2));
        assert!(items.iter().all(|i| i.status_code == 204 && i.body.is_none()));
        assert!(items[0].header("OData-EntityId").unwrap().ends_with("000000000001)"));
    }

    #[test]
    fn test_missing_boundary() {
        let err = BatchResponseParser::parse(None, "no multipart here").unwrap_err();
        assert!(matches!(err, DataverseError::BatchParse(_)));
    }

    #[test]
    fn test_missing_status_line() {
        let text = "--b\r\nContent-Type: application/http\r\n\r\ngarbage\r\n--b--\r\n";
        assert!(BatchResponseParser::parse(Some("multipart/mixed; boundary=b"), text).is_err());
    }

    #[test]
    fn test_boundary_from_content_type() {
        assert_eq!(
            boundary_from_content_type("multipart/mixed; boundary=batchresponse_x; charset=utf-8").as_deref(),
            Some("batchresponse_x")
        );
        assert_eq!(boundary_from_content_type("application/json"), None);
    }
}
