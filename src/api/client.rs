//! Dataverse Web API client
//!
//! Every request goes through [`DataverseClient::api_call`]: rate limiting,
//! bearer token, default OData headers, retry, and error mapping happen there.

use super::auth::TokenProvider;
use super::batch::{
    BatchCommand, BatchOptions, BatchRequestBuilder, BatchResponseItem, BatchResponseParser, chunk,
};
use super::constants::{self, headers};
use super::keys::encode_altkeys;
use super::query::{Query, QueryResponse};
use super::resilience::{RateLimiter, RetryPolicy};
use crate::config::ClientConfig;
use crate::entity::DataverseEntity;
use crate::error::{DataverseError, Result};
use crate::metadata::{
    AlternateKeyMetadata, AttributeMetadata, EntityMetadata, MetadataDefinition,
    OneToManyRelationshipMetadata, Publisher, Solution,
};
use crate::schema::{EntityDefinition, EntitySchema};
use log::{debug, info};
use reqwest::Method;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Request body
#[derive(Debug, Clone, Default)]
pub enum Payload {
    #[default]
    Empty,
    Json(Value),
    Text(String),
    Bytes(Vec<u8>),
}

type SchemaCache = Arc<Mutex<HashMap<String, Arc<EntitySchema>>>>;

/// Client for one Dataverse environment
#[derive(Clone)]
pub struct DataverseClient {
    environment_url: String,
    http_client: reqwest::Client,
    token_provider: Arc<dyn TokenProvider>,
    retry_policy: RetryPolicy,
    rate_limiter: RateLimiter,
    batch_size: usize,
    schema_cache: SchemaCache,
}

impl std::fmt::Debug for DataverseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataverseClient")
            .field("environment_url", &self.environment_url)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl DataverseClient {
    /// Client with default settings for `environment_url` (e.g. `https://org.crm4.dynamics.com`)
    pub fn new(environment_url: impl Into<String>, token_provider: impl TokenProvider + 'static) -> Result<Self> {
        Self::from_config(&ClientConfig::new(environment_url), token_provider)
    }

    pub fn from_config(config: &ClientConfig, token_provider: impl TokenProvider + 'static) -> Result<Self> {
        config.validate()?;

        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(config.timeout())
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("dataverse-api/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            environment_url: config.environment_url.trim_end_matches('/').to_string(),
            http_client,
            token_provider: Arc::new(token_provider),
            retry_policy: RetryPolicy::new(config.resilience.retry.clone()),
            rate_limiter: RateLimiter::new(config.resilience.rate_limit.clone()),
            batch_size: config.effective_batch_size(),
            schema_cache: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub fn environment_url(&self) -> &str {
        &self.environment_url
    }

    /// Web API base endpoint, ending in `/`
    pub fn api_endpoint(&self) -> String {
        constants::api_endpoint(&self.environment_url)
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Send one request and map non-success statuses to [`DataverseError::Api`].
    ///
    /// Relative URLs are resolved against the Web API endpoint after their
    /// quoted alternate key values are percent-encoded; absolute URLs (such
    /// as `@odata.nextLink`) are sent untouched. `extra_headers` replace
    /// default headers of the same name.
    pub async fn api_call(
        &self,
        method: Method,
        url: &str,
        params: &[(String, String)],
        extra_headers: &[(String, String)],
        payload: Payload,
    ) -> Result<reqwest::Response> {
        let token = self.token_provider.access_token().await?;

        let url = if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            constants::resolve_url(&self.environment_url, &encode_altkeys(url))
        };
        let request_headers = constants::merge_headers(extra_headers);

        debug!("{} {}", method, url);

        // Every attempt, retries included, draws from the client-wide bucket
        let rate_limiter = &self.rate_limiter;
        let response = self
            .retry_policy
            .execute(|| {
                let mut request = self
                    .http_client
                    .request(method.clone(), &url)
                    .bearer_auth(&token);
                for (name, value) in &request_headers {
                    request = request.header(name, value);
                }
                if !params.is_empty() {
                    request = request.query(params);
                }
                request = match &payload {
                    Payload::Empty => request,
                    Payload::Json(value) => request.body(value.to_string()),
                    Payload::Text(text) => request.body(text.clone()),
                    Payload::Bytes(bytes) => request.body(bytes.clone()),
                };
                async move {
                    rate_limiter.acquire().await;
                    request.send().await
                }
            })
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!("{} {} failed with {}: {}", method, url, status, body);
        Err(DataverseError::from_response(status.as_u16(), body))
    }

    pub async fn get(
        &self,
        url: &str,
        params: &[(String, String)],
        extra_headers: &[(String, String)],
    ) -> Result<reqwest::Response> {
        self.api_call(Method::GET, url, params, extra_headers, Payload::Empty).await
    }

    /// GET and parse the body as JSON
    pub async fn get_json(&self, url: &str, params: &[(String, String)]) -> Result<Value> {
        let response = self.get(url, params, &[]).await?;
        Ok(response.json().await?)
    }

    pub async fn post_json(
        &self,
        url: &str,
        body: &Value,
        extra_headers: &[(String, String)],
    ) -> Result<reqwest::Response> {
        self.api_call(Method::POST, url, &[], extra_headers, Payload::Json(body.clone()))
            .await
    }

    pub async fn patch_json(
        &self,
        url: &str,
        body: &Value,
        extra_headers: &[(String, String)],
    ) -> Result<reqwest::Response> {
        self.api_call(Method::PATCH, url, &[], extra_headers, Payload::Json(body.clone()))
            .await
    }

    pub async fn put_json(
        &self,
        url: &str,
        body: &Value,
        extra_headers: &[(String, String)],
    ) -> Result<reqwest::Response> {
        self.api_call(Method::PUT, url, &[], extra_headers, Payload::Json(body.clone()))
            .await
    }

    pub async fn delete(&self, url: &str, extra_headers: &[(String, String)]) -> Result<reqwest::Response> {
        self.api_call(Method::DELETE, url, &[], extra_headers, Payload::Empty)
            .await
    }

    /// Send commands through `$batch`, `batch_size` commands per request.
    ///
    /// Items come back in command order. Failed items are returned, not
    /// raised; a non-success status of the `$batch` request itself is an error.
    ///
    /// Content-IDs restart at 1 in every request, so a `$n` reference must
    /// point at an earlier command of the same transactional chunk.
    pub async fn batch(&self, commands: Vec<BatchCommand>, options: BatchOptions) -> Result<Vec<BatchResponseItem>> {
        if commands.is_empty() {
            return Ok(Vec::new());
        }

        let chunks = chunk(commands, self.batch_size);
        check_references(&chunks, options.transactional)?;
        let total = chunks.len();
        let mut items = Vec::new();

        for (index, commands) in chunks.into_iter().enumerate() {
            debug!("Sending batch {}/{} with {} commands", index + 1, total, commands.len());

            let mut builder = BatchRequestBuilder::new(&self.environment_url);
            builder = if options.transactional {
                builder.add_changeset(commands)
            } else {
                builder.add_requests(commands)
            };
            let request = builder.build();

            let mut batch_headers = vec![
                (headers::CONTENT_TYPE.to_string(), request.content_type.clone()),
                (headers::IF_NONE_MATCH.to_string(), "null".to_string()),
            ];
            if options.continue_on_error {
                batch_headers.push((
                    headers::PREFER.to_string(),
                    headers::PREFER_CONTINUE_ON_ERROR.to_string(),
                ));
            }

            let response = self
                .api_call(
                    Method::POST,
                    constants::BATCH_ENDPOINT,
                    &[],
                    &batch_headers,
                    Payload::Text(request.body),
                )
                .await?;

            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let text = response.text().await?;

            items.extend(BatchResponseParser::parse(content_type.as_deref(), &text)?);
        }

        Ok(items)
    }

    /// Read every row matching `query`, following `@odata.nextLink`
    pub async fn read(&self, entity_set: &str, query: &Query) -> Result<Vec<Value>> {
        let extra_headers = query.headers();
        let mut page = self.read_page(entity_set, query).await?;
        let mut rows = std::mem::take(&mut page.value);

        while let Some(next_link) = page.next_link.take() {
            if query.top.is_some_and(|top| rows.len() >= top as usize) {
                break;
            }
            page = self.read_next(&next_link, &extra_headers).await?;
            rows.append(&mut page.value);
        }

        if let Some(top) = query.top {
            rows.truncate(top as usize);
        }

        debug!("Read {} rows from {}", rows.len(), entity_set);
        Ok(rows)
    }

    /// Read the first page of rows matching `query`
    pub async fn read_page(&self, entity_set: &str, query: &Query) -> Result<QueryResponse> {
        let params = query.to_query_params()?;
        let response = self.get(entity_set, &params, &query.headers()).await?;
        QueryResponse::from_json(response.json().await?)
    }

    /// Fetch the page behind an `@odata.nextLink`; its query options are already embedded
    pub async fn read_next(&self, next_link: &str, extra_headers: &[(String, String)]) -> Result<QueryResponse> {
        let response = self.get(next_link, &[], extra_headers).await?;
        QueryResponse::from_json(response.json().await?)
    }

    /// Handle for a table without payload validation
    pub async fn entity(&self, logical_name: &str) -> Result<DataverseEntity> {
        let schema = self.schema(logical_name, false).await?;
        Ok(DataverseEntity::new(self.clone(), schema, false))
    }

    /// Handle for a table that validates payloads against its metadata
    pub async fn entity_validated(&self, logical_name: &str) -> Result<DataverseEntity> {
        let schema = self.schema(logical_name, true).await?;
        Ok(DataverseEntity::new(self.clone(), schema, true))
    }

    /// Cached schema for a table; fetched again when validation data is needed but missing
    pub async fn schema(&self, logical_name: &str, validate: bool) -> Result<Arc<EntitySchema>> {
        if let Some(schema) = self.cached_schema(logical_name) {
            if schema.validated || !validate {
                return Ok(schema);
            }
        }

        let schema = Arc::new(EntitySchema::fetch(self, logical_name, validate).await?);
        self.schema_cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(logical_name.to_string(), schema.clone());
        Ok(schema)
    }

    fn cached_schema(&self, logical_name: &str) -> Option<Arc<EntitySchema>> {
        self.schema_cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(logical_name)
            .cloned()
    }

    pub async fn get_entity_definition(&self, logical_name: &str) -> Result<EntityDefinition> {
        let params = vec![("$select".to_string(), EntityDefinition::SELECT.to_string())];
        let json = self
            .get_json(&constants::entity_definition_path(logical_name), &params)
            .await?;
        Ok(serde_json::from_value(json)?)
    }

    /// Create a table; returns its MetadataId
    pub async fn create_entity(&self, entity: &EntityMetadata, solution: Option<&str>) -> Result<String> {
        let response = self
            .post_json("EntityDefinitions", &entity.to_payload()?, &solution_header(solution))
            .await?;
        let id = entity_id(&response)?;
        info!("Created entity {} ({})", entity.schema_name, id);
        Ok(id)
    }

    pub async fn delete_entity(&self, logical_name: &str) -> Result<()> {
        self.delete(&constants::entity_definition_path(logical_name), &[])
            .await?;
        info!("Deleted entity {}", logical_name);
        Ok(())
    }

    /// Add a column to an existing table; returns its MetadataId
    pub async fn create_attribute(
        &self,
        entity_logical_name: &str,
        attribute: &AttributeMetadata,
        solution: Option<&str>,
    ) -> Result<String> {
        let url = format!("{}/Attributes", constants::entity_definition_path(entity_logical_name));
        let response = self
            .post_json(&url, &attribute.to_payload()?, &solution_header(solution))
            .await?;
        entity_id(&response)
    }

    pub async fn create_relationship(
        &self,
        relationship: &OneToManyRelationshipMetadata,
        solution: Option<&str>,
    ) -> Result<String> {
        let response = self
            .post_json("RelationshipDefinitions", &relationship.to_payload()?, &solution_header(solution))
            .await?;
        let id = entity_id(&response)?;
        info!("Created relationship {} ({})", relationship.schema_name, id);
        Ok(id)
    }

    pub async fn delete_relationship(&self, schema_name: &str) -> Result<()> {
        self.delete(&constants::relationship_definition_path(schema_name), &[])
            .await?;
        Ok(())
    }

    pub async fn create_alternate_key(
        &self,
        entity_logical_name: &str,
        key: &AlternateKeyMetadata,
    ) -> Result<String> {
        let url = format!("{}/Keys", constants::entity_definition_path(entity_logical_name));
        let response = self.post_json(&url, &key.to_payload()?, &[]).await?;
        entity_id(&response)
    }

    /// Create a publisher; returns its `publisherid`
    pub async fn create_publisher(&self, publisher: &Publisher) -> Result<String> {
        let response = self.post_json("publishers", &publisher.to_payload()?, &[]).await?;
        entity_id(&response)
    }

    /// Create a solution; returns its `solutionid`
    pub async fn create_solution(&self, solution: &Solution) -> Result<String> {
        let response = self.post_json("solutions", &solution.to_payload()?, &[]).await?;
        entity_id(&response)
    }

    /// Language codes (LCIDs) provisioned in the environment
    pub async fn get_language_codes(&self) -> Result<Vec<i64>> {
        let json = self.get_json("RetrieveAvailableLanguages", &[]).await?;
        let codes = json
            .get("LocaleIds")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                DataverseError::UnexpectedResponse(format!("RetrieveAvailableLanguages returned no LocaleIds: {}", json))
            })?
            .iter()
            .filter_map(Value::as_i64)
            .collect();
        Ok(codes)
    }
}

/// Content-ID a command URL refers to, e.g. `$1` or `$1/contact_customer_accounts`
fn content_id_reference(url: &str) -> Option<u32> {
    let rest = url.strip_prefix('$')?;
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

fn check_references(chunks: &[Vec<BatchCommand>], transactional: bool) -> Result<()> {
    for (chunk_index, commands) in chunks.iter().enumerate() {
        for (position, command) in commands.iter().enumerate() {
            let Some(reference) = content_id_reference(&command.url) else {
                continue;
            };
            if !transactional {
                return Err(DataverseError::validation(format!(
                    "'{}' references a Content-ID, which only exists in transactional batches",
                    command.url
                )));
            }
            if reference == 0 || reference as usize > position {
                return Err(DataverseError::validation(format!(
                    "'{}' in batch request {} does not reference an earlier command of the same request; \
                     reference chains must fit within one batch request",
                    command.url,
                    chunk_index + 1
                )));
            }
        }
    }
    Ok(())
}

fn solution_header(solution: Option<&str>) -> Vec<(String, String)> {
    solution
        .map(|name| vec![(headers::SOLUTION_NAME.to_string(), name.to_string())])
        .unwrap_or_default()
}

/// Id of the created record, taken from `OData-EntityId: .../set(<id>)`
fn entity_id(response: &reqwest::Response) -> Result<String> {
    let header = response
        .headers()
        .get(headers::ENTITY_ID)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| DataverseError::UnexpectedResponse("Response carried no OData-EntityId header".to_string()))?;

    id_from_entity_url(header).ok_or_else(|| {
        DataverseError::UnexpectedResponse(format!("Could not read an id from OData-EntityId '{}'", header))
    })
}

pub(crate) fn id_from_entity_url(url: &str) -> Option<String> {
    let start = url.rfind('(')? + 1;
    let end = url[start..].find(')')? + start;
    let id = &url[start..end];
    if id.is_empty() { None } else { Some(id.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::StaticToken;

    #[test]
    fn test_id_from_entity_url() {
        assert_eq!(
            id_from_entity_url(
                "https://org.crm.dynamics.com/api/data/v9.2/EntityDefinitions(5e0f8c4d-2b6f-ee11-8df0-000d3a8b6e0c)"
            )
            .as_deref(),
            Some("5e0f8c4d-2b6f-ee11-8df0-000d3a8b6e0c")
        );
        assert_eq!(id_from_entity_url("https://x/api/data/v9.2/accounts"), None);
        assert_eq!(id_from_entity_url("accounts()"), None);
    }

    #[test]
    fn test_content_id_reference() {
        assert_eq!(content_id_reference("$1"), Some(1));
        assert_eq!(content_id_reference("$12/contact_customer_accounts"), Some(12));
        assert_eq!(content_id_reference("$batch"), None);
        assert_eq!(content_id_reference("accounts"), None);
    }

    #[test]
    fn test_references_must_stay_in_chunk() {
        let create = || BatchCommand::post("accounts", serde_json::json!({"name": "A"}));
        let link = || BatchCommand::post("$1/contact_customer_accounts", serde_json::json!({"lastname": "B"}));

        assert!(check_references(&[vec![create(), link()]], true).is_ok());
        assert!(check_references(&[vec![create(), create()], vec![link()]], true).is_err());
        assert!(check_references(&[vec![link(), create()]], true).is_err());
        assert!(check_references(&[vec![create(), link()]], false).is_err());
    }

    #[test]
    fn test_solution_header() {
        assert!(solution_header(None).is_empty());
        assert_eq!(
            solution_header(Some("Core")),
            vec![("MSCRM.SolutionName".to_string(), "Core".to_string())]
        );
    }

    #[test]
    fn test_new_normalizes_url() {
        let client = DataverseClient::new("https://org.crm4.dynamics.com/", StaticToken::new("t")).unwrap();
        assert_eq!(client.environment_url(), "https://org.crm4.dynamics.com");
        assert_eq!(client.api_endpoint(), "https://org.crm4.dynamics.com/api/data/v9.2/");
        assert_eq!(client.batch_size(), constants::DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn test_new_rejects_invalid_url() {
        assert!(DataverseClient::new("", StaticToken::new("t")).is_err());
        assert!(DataverseClient::new("org.crm4.dynamics.com", StaticToken::new("t")).is_err());
    }
}
