//! Row operations against a single table
//!
//! Obtained through [`DataverseClient::entity`] (no validation) or
//! [`DataverseClient::entity_validated`]. With validation on, payloads are
//! checked against the table schema before anything is sent and a key is
//! picked automatically when none is given.

use crate::api::batch::{self, BatchCommand, BatchOptions, BatchResponseItem, Row, ensure_success};
use crate::api::client::{Payload, id_from_entity_url};
use crate::api::constants::headers;
use crate::api::keys::{KeyColumns, extract_key};
use crate::api::query::Query;
use crate::api::DataverseClient;
use crate::error::{DataverseError, Result};
use crate::schema::{EntitySchema, WriteMode};
use log::{debug, info};
use reqwest::Method;
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Image to upload into an image column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub file_name: String,
    pub payload: Vec<u8>,
}

impl ImageFile {
    pub fn new(file_name: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            payload,
        }
    }
}

/// Rows from a JSON value: an array of objects, or one object as a single row
pub fn to_rows(value: Value) -> Result<Vec<Row>> {
    match value {
        Value::Object(row) => Ok(vec![row]),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(row) => Ok(row),
                other => Err(DataverseError::validation(format!(
                    "Row {} is not a JSON object: {}",
                    index, other
                ))),
            })
            .collect(),
        other => Err(DataverseError::validation(format!(
            "Expected a JSON object or array of objects, got: {}",
            other
        ))),
    }
}

#[derive(Debug, Clone)]
pub struct DataverseEntity {
    client: DataverseClient,
    schema: Arc<EntitySchema>,
    validate: bool,
}

impl DataverseEntity {
    pub fn new(client: DataverseClient, schema: Arc<EntitySchema>, validate: bool) -> Self {
        Self {
            client,
            schema,
            validate,
        }
    }

    pub fn logical_name(&self) -> &str {
        &self.schema.entity.logical_name
    }

    pub fn entity_set_name(&self) -> &str {
        &self.schema.entity.entity_set_name
    }

    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    pub fn is_validating(&self) -> bool {
        self.validate
    }

    /// Read rows; with validation on, first-level expands must be relationships of this table
    pub async fn read(&self, query: &Query) -> Result<Vec<Value>> {
        if self.validate {
            for expand in &query.expand {
                if !self.schema.relationships.contains(&expand.table) {
                    return Err(DataverseError::validation(format!(
                        "'{}' is not a relationship of {}; valid targets: {}",
                        expand.table,
                        self.logical_name(),
                        self.schema.relationships.all().collect::<Vec<_>>().join(", ")
                    )));
                }
            }
        }
        self.client.read(self.entity_set_name(), query).await
    }

    /// Create rows; returns the ids of the new rows
    pub async fn insert(&self, rows: &[Row]) -> Result<Vec<String>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        if self.validate {
            self.schema.validate_payload(rows, WriteMode::Create)?;
        }

        debug!("Inserting {} rows into {}", rows.len(), self.entity_set_name());
        let items = self
            .execute(batch::create_commands(self.entity_set_name(), rows))
            .await?;

        let ids = items
            .iter()
            .filter_map(|item| item.header(headers::ENTITY_ID))
            .filter_map(id_from_entity_url)
            .collect();
        info!("Inserted {} rows into {}", rows.len(), self.entity_set_name());
        Ok(ids)
    }

    /// Create or update rows addressed by `key`
    pub async fn upsert(&self, rows: &[Row], key: Option<KeyColumns>) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let key = self.resolve_key(rows, key, Some(WriteMode::Upsert))?;
        debug!("Upserting {} rows into {}", rows.len(), self.entity_set_name());
        self.execute(batch::upsert_commands(self.entity_set_name(), rows, &key)?)
            .await?;
        info!("Upserted {} rows into {}", rows.len(), self.entity_set_name());
        Ok(())
    }

    /// Update existing rows; fails for rows that do not exist
    pub async fn update(&self, rows: &[Row], key: Option<KeyColumns>) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let key = self.resolve_key(rows, key, Some(WriteMode::Update))?;
        debug!("Updating {} rows in {}", rows.len(), self.entity_set_name());
        self.execute(batch::update_commands(self.entity_set_name(), rows, &key)?)
            .await?;
        info!("Updated {} rows in {}", rows.len(), self.entity_set_name());
        Ok(())
    }

    /// Update one column per row with PUT.
    ///
    /// Unless `liberal` is set, every row must update the same column.
    pub async fn update_single_column(&self, rows: &[Row], key: Option<KeyColumns>, liberal: bool) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let key = self.resolve_key(rows, key, Some(WriteMode::Update))?;

        if !liberal {
            let columns: BTreeSet<&str> = rows
                .iter()
                .flat_map(|row| row.keys())
                .filter(|col| !key.contains(col))
                .map(String::as_str)
                .collect();
            if columns.len() > 1 {
                return Err(DataverseError::validation(format!(
                    "Only one data column may be passed, found: {}. Use liberal mode to vary the column per row.",
                    columns.into_iter().collect::<Vec<_>>().join(", ")
                )));
            }
        }

        self.execute(batch::single_column_commands(self.entity_set_name(), rows, &key)?)
            .await?;
        info!("Updated {} rows in {}", rows.len(), self.entity_set_name());
        Ok(())
    }

    /// Update a single column of a single row with one PUT
    pub async fn update_single_value(&self, row: &Row, key: Option<KeyColumns>) -> Result<()> {
        let key = self.resolve_key(std::slice::from_ref(row), key, Some(WriteMode::Update))?;
        let (data, row_key) = extract_key(row, &key)?;

        let mut columns = data.into_iter();
        let (column, value) = match (columns.next(), columns.next()) {
            (Some(pair), None) => pair,
            _ => {
                return Err(DataverseError::validation(
                    "Can only update a single column using this function.",
                ));
            }
        };

        let url = format!("{}({})/{}", self.entity_set_name(), row_key, column);
        self.client.put_json(&url, &json!({ "value": value }), &[]).await?;
        info!("Updated {} of ({}) in {}", column, row_key, self.entity_set_name());
        Ok(())
    }

    /// Delete rows by primary id
    pub async fn delete(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.execute(batch::delete_commands(self.entity_set_name(), ids, None))
            .await?;
        info!("Deleted {} rows from {}", ids.len(), self.entity_set_name());
        Ok(())
    }

    /// Delete rows addressed by key columns
    pub async fn delete_by_key(&self, rows: &[Row], key: Option<KeyColumns>) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let key = self.resolve_key(rows, key, None)?;
        self.execute(batch::delete_by_key_commands(self.entity_set_name(), rows, &key)?)
            .await?;
        info!("Deleted {} rows from {}", rows.len(), self.entity_set_name());
        Ok(())
    }

    /// Clear one column of the given rows
    pub async fn delete_columns(&self, ids: &[String], column: &str) -> Result<()> {
        if self.validate && !self.schema.attributes.contains_key(column) {
            return Err(DataverseError::validation(format!(
                "Column '{}' not found in {}",
                column,
                self.logical_name()
            )));
        }
        if ids.is_empty() {
            return Ok(());
        }
        self.execute(batch::delete_commands(self.entity_set_name(), ids, Some(column)))
            .await?;
        info!("Cleared {} on {} rows of {}", column, ids.len(), self.entity_set_name());
        Ok(())
    }

    /// Upload an image into `column`, or the table's primary image column
    pub async fn upload_image(
        &self,
        image: &ImageFile,
        row: &Row,
        key: Option<KeyColumns>,
        column: Option<&str>,
    ) -> Result<()> {
        if self.validate {
            self.schema.check_extension(&image.file_name)?;
        }

        let column = column
            .or(self.schema.entity.primary_image_attribute.as_deref())
            .ok_or_else(|| {
                DataverseError::validation(format!(
                    "{} has no primary image column, one must be given",
                    self.logical_name()
                ))
            })?;

        let key = self.resolve_key(std::slice::from_ref(row), key, None)?;
        let (_, row_key) = extract_key(row, &key)?;

        let url = format!("{}({})/{}", self.entity_set_name(), row_key, column);
        let upload_headers = [
            (
                headers::CONTENT_TYPE.to_string(),
                headers::CONTENT_TYPE_OCTET_STREAM.to_string(),
            ),
            (headers::FILE_NAME.to_string(), image.file_name.clone()),
        ];

        self.client
            .api_call(
                Method::PATCH,
                &url,
                &[],
                &upload_headers,
                Payload::Bytes(image.payload.clone()),
            )
            .await?;
        info!("Uploaded {} to {}", image.file_name, url);
        Ok(())
    }

    /// Key for the rows: the given one, else the one validation finds.
    ///
    /// With validation on, columns are checked against the schema and, when
    /// `mode` is set, against what that write mode allows.
    pub(crate) fn resolve_key(
        &self,
        rows: &[Row],
        key: Option<KeyColumns>,
        mode: Option<WriteMode>,
    ) -> Result<KeyColumns> {
        let key = key.map(|k| k.normalize(&self.schema.entity.primary_id_attribute));

        if !self.validate {
            return key.ok_or_else(|| DataverseError::validation("Key column(s) must be specified."));
        }

        self.schema.validate_columns(rows)?;
        let key = match key {
            Some(key) => key,
            None => self.schema.find_key(rows)?,
        };

        if let Some(mode) = mode {
            let columns: BTreeSet<String> = rows.iter().flat_map(|row| row.keys().cloned()).collect();
            self.schema.find_invalid_columns(&key, &columns, mode)?;
            self.schema.validate_values(rows)?;
        }
        Ok(key)
    }

    async fn execute(&self, commands: Vec<BatchCommand>) -> Result<Vec<BatchResponseItem>> {
        let items = self.client.batch(commands, BatchOptions::default()).await?;
        ensure_success(&items)?;
        Ok(items)
    }
}
