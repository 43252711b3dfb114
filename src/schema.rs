//! Table schema retrieval and payload validation
//!
//! A schema always carries the entity definition (entity set name, primary
//! columns). Validating schemas also carry the writable columns, alternate
//! keys, relationships, picklist choices and the organization's language
//! and blocked file extensions.

use crate::api::DataverseClient;
use crate::api::batch::{BatchCommand, BatchOptions, BatchResponseItem, Row, ensure_success};
use crate::api::constants;
use crate::api::keys::KeyColumns;
use crate::error::{DataverseError, Result};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// The parts of `EntityDefinitions(LogicalName='...')` the client relies on
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EntityDefinition {
    pub logical_name: String,
    pub entity_set_name: String,
    pub primary_id_attribute: String,
    #[serde(default)]
    pub primary_name_attribute: Option<String>,
    #[serde(default)]
    pub primary_image_attribute: Option<String>,
    #[serde(default)]
    pub metadata_id: Option<String>,
}

impl EntityDefinition {
    pub const SELECT: &'static str =
        "LogicalName,EntitySetName,PrimaryIdAttribute,PrimaryNameAttribute,PrimaryImageAttribute,MetadataId";
}

/// Value type a column expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Float,
    Integer,
    String,
    DateTime,
    Bytes,
    Boolean,
    /// Lookups, owners, virtual columns and the like
    Other,
}

impl DataType {
    /// Map `AttributeTypeName.Value` (e.g. `StringType`)
    pub fn from_type_name(type_name: &str) -> Self {
        match type_name {
            "MoneyType" | "DoubleType" | "DecimalType" => DataType::Float,
            "BigIntType" | "IntegerType" => DataType::Integer,
            "PicklistType" | "StringType" | "MemoType" | "UniqueidentifierType" => DataType::String,
            "DateTimeType" => DataType::DateTime,
            "ImageType" | "FileType" => DataType::Bytes,
            "BooleanType" => DataType::Boolean,
            _ => DataType::Other,
        }
    }
}

/// Lower or upper bound of a column
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Limit {
    Number(f64),
    DateTime(DateTime<Utc>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityAttribute {
    pub schema_name: String,
    pub can_create: bool,
    pub can_update: bool,
    pub attribute_type: String,
    pub data_type: DataType,
    pub max_height: Option<u64>,
    pub max_length: Option<u64>,
    pub max_size_kb: Option<u64>,
    pub max_width: Option<u64>,
    pub max_value: Option<Limit>,
    pub min_value: Option<Limit>,
    /// Picklist label to option value, in the organization language
    pub choices: Option<BTreeMap<String, i64>>,
}

/// Navigation properties usable in `$expand`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Relationships {
    pub single_valued: Vec<String>,
    pub collection_valued: Vec<String>,
}

impl Relationships {
    pub fn contains(&self, navigation_property: &str) -> bool {
        self.single_valued.iter().any(|n| n == navigation_property)
            || self.collection_valued.iter().any(|n| n == navigation_property)
    }

    pub fn all(&self) -> impl Iterator<Item = &str> {
        self.single_valued
            .iter()
            .chain(self.collection_valued.iter())
            .map(String::as_str)
    }
}

/// What a payload is about to be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    Update,
    Upsert,
}

impl WriteMode {
    fn as_str(&self) -> &'static str {
        match self {
            WriteMode::Create => "create",
            WriteMode::Update => "update",
            WriteMode::Upsert => "upsert",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntitySchema {
    pub entity: EntityDefinition,
    /// Writable columns by logical name; empty unless `validated`
    pub attributes: BTreeMap<String, EntityAttribute>,
    pub altkeys: Vec<BTreeSet<String>>,
    pub relationships: Relationships,
    pub language_code: Option<i64>,
    pub blocked_extensions: Vec<String>,
    pub validated: bool,
}

impl EntitySchema {
    /// Schema holding only the entity definition
    pub fn basic(entity: EntityDefinition) -> Self {
        Self {
            entity,
            attributes: BTreeMap::new(),
            altkeys: Vec::new(),
            relationships: Relationships::default(),
            language_code: None,
            blocked_extensions: Vec::new(),
            validated: false,
        }
    }

    /// Fetch the schema of `logical_name` with one `$batch`, plus one more for picklists
    pub async fn fetch(client: &DataverseClient, logical_name: &str, validate: bool) -> Result<Self> {
        let base = constants::entity_definition_path(logical_name);

        let mut commands = vec![BatchCommand::get(format!(
            "{}?$select={}",
            base,
            EntityDefinition::SELECT
        ))];
        if validate {
            commands.extend([
                BatchCommand::get(format!("{}/Attributes", base)),
                BatchCommand::get(format!("{}/Keys", base)),
                BatchCommand::get("organizations?$select=languagecode,blockedattachments"),
                BatchCommand::get(format!("{}/OneToManyRelationships", base)),
                BatchCommand::get(format!("{}/ManyToOneRelationships", base)),
            ]);
        }

        let expected = commands.len();
        let items = client.batch(commands, BatchOptions::default()).await?;
        ensure_success(&items)?;
        let bodies = json_bodies(&items, expected)?;

        let entity: EntityDefinition = serde_json::from_value(bodies[0].clone())?;
        info!(
            "Fetched schema for {} (entity set {})",
            entity.logical_name, entity.entity_set_name
        );
        let mut schema = Self::basic(entity);

        if !validate {
            return Ok(schema);
        }

        let (language_code, blocked_extensions) = parse_organization(&bodies[3])?;
        schema.language_code = Some(language_code);
        schema.blocked_extensions = blocked_extensions;
        schema.attributes = parse_attributes(&bodies[1])?;
        schema.altkeys = parse_keys(&bodies[2])?;
        schema.relationships = parse_relationships(&bodies[4], &bodies[5])?;

        let picklists: Vec<String> = schema
            .attributes
            .iter()
            .filter(|(_, attr)| attr.attribute_type == "Picklist")
            .map(|(name, _)| name.clone())
            .collect();

        if !picklists.is_empty() {
            let commands: Vec<BatchCommand> = picklists
                .iter()
                .map(|column| BatchCommand::get(picklist_url(logical_name, column)))
                .collect();
            let items = client.batch(commands, BatchOptions::default()).await?;
            ensure_success(&items)?;

            for body in json_bodies(&items, picklists.len())? {
                let (column, choices) = parse_choices(&body, language_code)?;
                if let Some(attr) = schema.attributes.get_mut(&column) {
                    attr.choices = Some(choices);
                }
            }
        }

        schema.validated = true;
        debug!(
            "Schema for {}: {} columns, {} alternate keys",
            logical_name,
            schema.attributes.len(),
            schema.altkeys.len()
        );
        Ok(schema)
    }

    /// Every column in the payload must exist on the table
    pub fn validate_columns(&self, rows: &[Row]) -> Result<()> {
        let unknown: BTreeSet<&str> = rows
            .iter()
            .flat_map(|row| row.keys())
            .filter(|col| !self.attributes.contains_key(col.as_str()))
            .map(String::as_str)
            .collect();

        if unknown.is_empty() {
            Ok(())
        } else {
            Err(DataverseError::validation(format!(
                "Found bad payload columns not present in table schema: {}",
                unknown.into_iter().collect::<Vec<_>>().join(", ")
            )))
        }
    }

    /// Key usable for every row: the primary id, else the shortest alternate key
    pub fn find_key(&self, rows: &[Row]) -> Result<KeyColumns> {
        let complete: BTreeSet<&str> = match rows.split_first() {
            None => BTreeSet::new(),
            Some((first, rest)) => non_null_columns(first)
                .filter(|col| rest.iter().all(|row| row.get(*col).is_some_and(|v| !v.is_null())))
                .collect(),
        };

        let primary = self.entity.primary_id_attribute.as_str();
        if complete.contains(primary) {
            debug!("Primary id present in all rows, using as key");
            return Ok(KeyColumns::primary_id(primary));
        }

        let mut altkeys: Vec<&BTreeSet<String>> = self.altkeys.iter().collect();
        altkeys.sort_by_key(|key| key.len());

        altkeys
            .into_iter()
            .find(|key| key.iter().all(|col| complete.contains(col.as_str())))
            .map(|key| {
                debug!("Using alternate key {:?}", key);
                KeyColumns::alternate(key.iter().cloned())
            })
            .ok_or_else(|| {
                DataverseError::validation("No columns in payload to form consistent primary or alternate key.")
            })
    }

    /// Reject columns that cannot be written in `mode`; key columns are exempt
    pub fn find_invalid_columns(&self, key: &KeyColumns, columns: &BTreeSet<String>, mode: WriteMode) -> Result<()> {
        let mut invalid = BTreeSet::new();

        for column in columns {
            if key.contains(column) {
                continue;
            }
            let Some(attr) = self.attributes.get(column) else {
                continue;
            };

            let bad = match mode {
                WriteMode::Create => !attr.can_create,
                WriteMode::Update => !attr.can_update,
                WriteMode::Upsert => attr.can_create != attr.can_update,
            };
            if bad {
                invalid.insert(column.as_str());
            }
        }

        if invalid.is_empty() {
            return Ok(());
        }

        let listed = invalid.into_iter().collect::<Vec<_>>().join(", ");
        match mode {
            WriteMode::Upsert => {
                warn!("Found columns that may throw errors in upsert: {}", listed);
                Ok(())
            }
            _ => Err(DataverseError::validation(format!(
                "Found columns not valid for {}: {}",
                mode.as_str(),
                listed
            ))),
        }
    }

    /// Check values against column limits: text length, numeric and date ranges, picklist options
    pub fn validate_values(&self, rows: &[Row]) -> Result<()> {
        for row in rows {
            for (column, value) in row {
                if value.is_null() {
                    continue;
                }
                if let Some(attr) = self.attributes.get(column) {
                    check_value(column, attr, value)?;
                }
            }
        }
        Ok(())
    }

    /// Full payload validation; returns the key that addresses every row
    pub fn validate_payload(&self, rows: &[Row], mode: WriteMode) -> Result<KeyColumns> {
        self.validate_columns(rows)?;

        let key = self.find_key(rows);
        let columns: BTreeSet<String> = rows.iter().flat_map(|r| r.keys().cloned()).collect();

        match (key, mode) {
            (Ok(key), _) => {
                self.find_invalid_columns(&key, &columns, mode)?;
                self.validate_values(rows)?;
                Ok(key)
            }
            // New rows get their primary id from Dataverse
            (Err(_), WriteMode::Create) => {
                let key = KeyColumns::primary_id(&self.entity.primary_id_attribute);
                self.find_invalid_columns(&key, &columns, mode)?;
                self.validate_values(rows)?;
                Ok(key)
            }
            (Err(e), _) => Err(e),
        }
    }

    /// File extensions the organization refuses as attachments
    pub fn check_extension(&self, file_name: &str) -> Result<()> {
        let Some(extension) = file_extension(file_name) else {
            return Ok(());
        };
        if self.blocked_extensions.iter().any(|b| b.eq_ignore_ascii_case(&extension)) {
            return Err(DataverseError::validation(format!(
                "File extension '{}' blocked by organization.",
                extension
            )));
        }
        Ok(())
    }
}

fn non_null_columns(row: &Row) -> impl Iterator<Item = &str> {
    row.iter().filter(|(_, v)| !v.is_null()).map(|(k, _)| k.as_str())
}

fn check_value(column: &str, attr: &EntityAttribute, value: &Value) -> Result<()> {
    if let (Some(max), Some(s)) = (attr.max_length, value.as_str()) {
        if attr.data_type == DataType::String && s.chars().count() as u64 > max {
            return Err(DataverseError::validation(format!(
                "Value for '{}' exceeds max length {}",
                column, max
            )));
        }
    }

    if let Some(choices) = &attr.choices {
        let allowed = value
            .as_i64()
            .is_some_and(|v| choices.values().any(|c| *c == v));
        if !allowed {
            return Err(DataverseError::validation(format!(
                "Value {} for '{}' is not one of the options: {}",
                value,
                column,
                choices
                    .iter()
                    .map(|(label, v)| format!("{}={}", label, v))
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }
        return Ok(());
    }

    match attr.data_type {
        DataType::Integer | DataType::Float => {
            if let Some(n) = value.as_f64() {
                check_range(column, Limit::Number(n), attr)?;
            }
        }
        DataType::DateTime => {
            if let Some(at) = value.as_str().and_then(parse_datetime) {
                check_range(column, Limit::DateTime(at), attr)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn check_range(column: &str, value: Limit, attr: &EntityAttribute) -> Result<()> {
    let below = attr.min_value.is_some_and(|min| less_than(value, min));
    let above = attr.max_value.is_some_and(|max| less_than(max, value));
    if below || above {
        return Err(DataverseError::validation(format!(
            "Value for '{}' is outside the allowed range",
            column
        )));
    }
    Ok(())
}

fn less_than(a: Limit, b: Limit) -> bool {
    match (a, b) {
        (Limit::Number(a), Limit::Number(b)) => a < b,
        (Limit::DateTime(a), Limit::DateTime(b)) => a < b,
        _ => false,
    }
}

fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&Utc))
}

fn picklist_url(logical_name: &str, column: &str) -> String {
    format!(
        "{}/Attributes(LogicalName='{}')/Microsoft.Dynamics.CRM.PicklistAttributeMetadata\
         ?$select=LogicalName&$expand=OptionSet($select=Options),GlobalOptionSet($select=Options)",
        constants::entity_definition_path(logical_name),
        column
    )
}

fn json_bodies(items: &[BatchResponseItem], expected: usize) -> Result<Vec<Value>> {
    let bodies: Vec<Value> = items.iter().filter_map(BatchResponseItem::json).collect();
    if bodies.len() != expected {
        return Err(DataverseError::BatchParse(format!(
            "Expected {} JSON responses, got {}",
            expected,
            bodies.len()
        )));
    }
    Ok(bodies)
}

fn value_array<'a>(body: &'a Value, what: &str) -> Result<&'a Vec<Value>> {
    body.get("value")
        .and_then(Value::as_array)
        .ok_or_else(|| DataverseError::BatchParse(format!("{} response has no 'value' array", what)))
}

fn str_field<'a>(item: &'a Value, field: &str) -> Option<&'a str> {
    item.get(field).and_then(Value::as_str)
}

/// Language code and blocked extensions of the organization
pub fn parse_organization(body: &Value) -> Result<(i64, Vec<String>)> {
    let org = value_array(body, "Organization")?
        .first()
        .ok_or_else(|| DataverseError::BatchParse("No organization returned".to_string()))?;

    let language_code = org
        .get("languagecode")
        .and_then(Value::as_i64)
        .ok_or_else(|| DataverseError::BatchParse("Organization has no languagecode".to_string()))?;

    let blocked = str_field(org, "blockedattachments")
        .unwrap_or_default()
        .split(';')
        .map(|ext| ext.trim().to_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect();

    Ok((language_code, blocked))
}

/// Writable columns of the table
pub fn parse_attributes(body: &Value) -> Result<BTreeMap<String, EntityAttribute>> {
    let mut attributes = BTreeMap::new();

    for col in value_array(body, "Attributes")? {
        let flag = |name: &str| col.get(name).and_then(Value::as_bool).unwrap_or(false);
        let can_create = flag("IsValidForCreate");
        let can_update = flag("IsValidForUpdate");

        if !flag("IsValidODataAttribute") || (!can_create && !can_update) {
            continue;
        }

        let Some(logical_name) = str_field(col, "LogicalName") else {
            continue;
        };

        let type_name = col
            .get("AttributeTypeName")
            .and_then(|t| str_field(t, "Value"))
            .unwrap_or_default();
        let uint = |name: &str| col.get(name).and_then(Value::as_u64);

        attributes.insert(
            logical_name.to_string(),
            EntityAttribute {
                schema_name: str_field(col, "SchemaName").unwrap_or(logical_name).to_string(),
                can_create,
                can_update,
                attribute_type: str_field(col, "AttributeType").unwrap_or_default().to_string(),
                data_type: DataType::from_type_name(type_name),
                max_height: uint("MaxHeight"),
                max_length: uint("MaxLength"),
                max_size_kb: uint("MaxSizeInKB"),
                max_width: uint("MaxWidth"),
                max_value: limit(col, "Max"),
                min_value: limit(col, "Min"),
                choices: None,
            },
        );
    }

    Ok(attributes)
}

/// `MinSupportedValue`/`MaxSupportedValue` for dates, `MinValue`/`MaxValue` otherwise
fn limit(col: &Value, bound: &str) -> Option<Limit> {
    if let Some(at) = str_field(col, &format!("{}SupportedValue", bound)).and_then(parse_datetime) {
        return Some(Limit::DateTime(at));
    }
    col.get(format!("{}Value", bound))
        .and_then(Value::as_f64)
        .map(Limit::Number)
}

pub fn parse_keys(body: &Value) -> Result<Vec<BTreeSet<String>>> {
    Ok(value_array(body, "Keys")?
        .iter()
        .filter_map(|key| key.get("KeyAttributes").and_then(Value::as_array))
        .map(|cols| cols.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .collect())
}

pub fn parse_relationships(one_to_many: &Value, many_to_one: &Value) -> Result<Relationships> {
    let collection_valued = value_array(one_to_many, "OneToManyRelationships")?
        .iter()
        // Expanding into async operations fails server side
        .filter(|rel| str_field(rel, "ReferencingEntity") != Some("asyncoperation"))
        .filter_map(|rel| str_field(rel, "ReferencedEntityNavigationPropertyName"))
        .map(str::to_string)
        .collect();

    let single_valued = value_array(many_to_one, "ManyToOneRelationships")?
        .iter()
        .filter_map(|rel| str_field(rel, "ReferencingEntityNavigationPropertyName"))
        .map(str::to_string)
        .collect();

    Ok(Relationships {
        single_valued,
        collection_valued,
    })
}

/// Column name and label-to-value map of one picklist
pub fn parse_choices(body: &Value, language_code: i64) -> Result<(String, BTreeMap<String, i64>)> {
    let column = str_field(body, "LogicalName")
        .ok_or_else(|| DataverseError::BatchParse("Picklist response has no LogicalName".to_string()))?
        .to_string();

    let option_set = ["OptionSet", "GlobalOptionSet"]
        .iter()
        .filter_map(|name| body.get(*name))
        .find(|set| !set.is_null());

    let mut choices = BTreeMap::new();
    let options = option_set
        .and_then(|set| set.get("Options"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for option in options {
        let Some(value) = option.get("Value").and_then(Value::as_i64) else {
            continue;
        };
        let labels = option
            .get("Label")
            .and_then(|l| l.get("LocalizedLabels"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for label in labels {
            if label.get("LanguageCode").and_then(Value::as_i64) == Some(language_code) {
                if let Some(text) = str_field(label, "Label") {
                    choices.insert(text.to_string(), value);
                }
            }
        }
    }

    Ok((column, choices))
}

/// Lowercased extension of a file name, if any
pub fn file_extension(file_name: &str) -> Option<String> {
    file_name.rsplit_once('.').map(|(_, ext)| ext.to_lowercase())
}

/// Build a schema by hand, e.g. for offline validation
pub fn schema_from_parts(
    entity: EntityDefinition,
    attributes: HashMap<String, EntityAttribute>,
    altkeys: Vec<BTreeSet<String>>,
) -> EntitySchema {
    EntitySchema {
        attributes: attributes.into_iter().collect(),
        altkeys,
        validated: true,
        ..EntitySchema::basic(entity)
    }
}
