//! API constants for the Dataverse Web API

/// Dataverse Web API version
pub const API_VERSION: &str = "v9.2";

/// Base API path
pub const API_BASE_PATH: &str = "/api/data";

/// Full API path with version
pub fn api_path() -> String {
    format!("{}/{}", API_BASE_PATH, API_VERSION)
}

/// Batch endpoint for multi-operation requests
pub const BATCH_ENDPOINT: &str = "$batch";

/// Dataverse refuses more than this many operations per `$batch`
pub const MAX_BATCH_SIZE: usize = 1000;

pub const DEFAULT_BATCH_SIZE: usize = 500;

pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// `@odata.type` prefix for metadata payloads
pub const ODATA_TYPE_PREFIX: &str = "Microsoft.Dynamics.CRM.";

/// Standard headers for Dataverse requests
pub mod headers {
    pub const ACCEPT: &str = "Accept";
    pub const CONTENT_TYPE: &str = "Content-Type";
    pub const ODATA_VERSION_HEADER: &str = "OData-Version";
    pub const ODATA_MAX_VERSION_HEADER: &str = "OData-MaxVersion";
    pub const IF_MATCH: &str = "If-Match";
    pub const IF_NONE_MATCH: &str = "If-None-Match";
    pub const PREFER: &str = "Prefer";
    pub const SOLUTION_NAME: &str = "MSCRM.SolutionName";
    pub const FILE_NAME: &str = "x-ms-file-name";
    pub const ENTITY_ID: &str = "OData-EntityId";
    pub const RETRY_AFTER: &str = "Retry-After";

    pub const APPLICATION_JSON: &str = "application/json";
    pub const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";
    pub const CONTENT_TYPE_OCTET_STREAM: &str = "application/octet-stream";

    /// OData protocol version sent as both version headers
    pub const ODATA_VERSION: &str = "4.0";

    /// If-Match header for updates (any version)
    pub const IF_MATCH_ANY: &str = "*";

    pub const PREFER_CONTINUE_ON_ERROR: &str = "odata.continue-on-error";

    pub fn prefer_max_page_size(size: u32) -> String {
        format!("odata.maxpagesize={}", size)
    }
}

/// Default headers sent with every call, in order
pub fn default_headers() -> Vec<(String, String)> {
    vec![
        (headers::ACCEPT.to_string(), headers::APPLICATION_JSON.to_string()),
        (headers::CONTENT_TYPE.to_string(), headers::CONTENT_TYPE_JSON.to_string()),
        (headers::ODATA_VERSION_HEADER.to_string(), headers::ODATA_VERSION.to_string()),
        (headers::ODATA_MAX_VERSION_HEADER.to_string(), headers::ODATA_VERSION.to_string()),
    ]
}

/// Replace default headers with caller headers of the same name (case-insensitive)
pub fn merge_headers(overrides: &[(String, String)]) -> Vec<(String, String)> {
    let mut merged = default_headers();
    for (name, value) in overrides {
        match merged.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
            Some(existing) => existing.1 = value.clone(),
            None => merged.push((name.clone(), value.clone())),
        }
    }
    merged
}

/// Base endpoint of the Web API, always ending in `/`
pub fn api_endpoint(environment_url: &str) -> String {
    format!("{}{}/", environment_url.trim_end_matches('/'), api_path())
}

/// Resolve a request URL against the Web API endpoint.
///
/// Absolute URLs such as `@odata.nextLink` values are returned verbatim.
pub fn resolve_url(environment_url: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_string();
    }
    format!("{}{}", api_endpoint(environment_url), url.trim_start_matches('/'))
}

/// Build batch endpoint URL
pub fn batch_endpoint(environment_url: &str) -> String {
    resolve_url(environment_url, BATCH_ENDPOINT)
}

/// `EntityDefinitions(LogicalName='...')`
pub fn entity_definition_path(logical_name: &str) -> String {
    format!("EntityDefinitions(LogicalName='{}')", logical_name)
}

/// `RelationshipDefinitions(SchemaName='...')`
pub fn relationship_definition_path(schema_name: &str) -> String {
    format!("RelationshipDefinitions(SchemaName='{}')", schema_name)
}
