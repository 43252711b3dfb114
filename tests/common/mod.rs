//! Shared helpers for tests against a wiremock server

#![allow(dead_code)]

use dataverse_api::api::resilience::ResilienceConfig;
use dataverse_api::api::{RateLimitConfig, RetryConfig};
use dataverse_api::{ClientConfig, DataverseClient, StaticToken};
use serde_json::Value;
use std::time::Duration;
use wiremock::MockServer;

pub const TOKEN: &str = "test-token";
pub const API: &str = "/api/data/v9.2";
pub const BOUNDARY: &str = "batchresponse_test";

/// Client pointed at the mock server, without rate limiting and with short retries
pub fn client(server: &MockServer) -> DataverseClient {
    client_with_batch_size(server, 500)
}

pub fn client_with_batch_size(server: &MockServer, batch_size: usize) -> DataverseClient {
    client_with(server, fast_retry(), no_rate_limit(), batch_size)
}

pub fn client_with(
    server: &MockServer,
    retry: RetryConfig,
    rate_limit: RateLimitConfig,
    batch_size: usize,
) -> DataverseClient {
    let resilience = ResilienceConfig::builder()
        .retry_config(retry)
        .rate_limit_config(rate_limit)
        .build();

    let config = ClientConfig::new(server.uri())
        .with_resilience(resilience)
        .with_batch_size(batch_size);
    DataverseClient::from_config(&config, StaticToken::new(TOKEN)).unwrap()
}

pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        base_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
        backoff_multiplier: 2.0,
        jitter: false,
    }
}

pub fn no_rate_limit() -> RateLimitConfig {
    RateLimitConfig {
        enabled: false,
        ..RateLimitConfig::default()
    }
}

pub fn api_path(path: &str) -> String {
    format!("{}/{}", API, path)
}

/// One part of a multipart `$batch` response
pub struct Part {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl Part {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: vec![],
            body: Some(body),
        }
    }

    pub fn no_content() -> Self {
        Self {
            status: 204,
            headers: vec![],
            body: None,
        }
    }

    pub fn created(entity_url: &str) -> Self {
        Self {
            status: 204,
            headers: vec![("OData-EntityId".to_string(), entity_url.to_string())],
            body: None,
        }
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        412 => "Precondition Failed",
        _ => "Unknown",
    }
}

/// Multipart body as Dataverse returns it for a non-transactional batch
pub fn batch_body(parts: &[Part]) -> String {
    let mut body = String::new();
    for part in parts {
        body.push_str(&format!("--{}\r\n", BOUNDARY));
        body.push_str("Content-Type: application/http\r\nContent-Transfer-Encoding: binary\r\n\r\n");
        body.push_str(&format!("HTTP/1.1 {} {}\r\n", part.status, reason(part.status)));
        if part.body.is_some() {
            body.push_str("Content-Type: application/json; odata.metadata=minimal\r\n");
        }
        body.push_str("OData-Version: 4.0\r\n");
        for (name, value) in &part.headers {
            body.push_str(&format!("{}: {}\r\n", name, value));
        }
        body.push_str("\r\n");
        if let Some(json) = &part.body {
            body.push_str(&json.to_string());
        }
        body.push_str("\r\n");
    }
    body.push_str(&format!("--{}--\r\n", BOUNDARY));
    body
}

pub fn batch_content_type() -> String {
    format!("multipart/mixed; boundary={}", BOUNDARY)
}

pub fn batch_template(parts: &[Part]) -> wiremock::ResponseTemplate {
    wiremock::ResponseTemplate::new(200).set_body_raw(batch_body(parts), &batch_content_type())
}

pub fn account_definition() -> Value {
    serde_json::json!({
        "LogicalName": "account",
        "EntitySetName": "accounts",
        "PrimaryIdAttribute": "accountid",
        "PrimaryNameAttribute": "name",
        "PrimaryImageAttribute": "entityimage",
        "MetadataId": "70816501-edb9-4740-a16c-6a5efbc05d84"
    })
}
