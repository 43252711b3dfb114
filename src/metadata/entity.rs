//! Table and alternate key definitions

use super::attributes::AttributeMetadata;
use super::enums::OwnershipType;
use super::labels::{DEFAULT_LANGUAGE_CODE, Label, create_label, display_name_from_schema};
use super::pluralization::pluralize_entity_name;
use super::{MetadataDefinition, ODataType};
use crate::error::{DataverseError, Result};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EntityMetadata {
    #[serde(rename = "@odata.type")]
    odata_type: ODataType,
    pub schema_name: String,
    pub description: Label,
    pub display_name: Label,
    pub display_collection_name: Label,
    pub attributes: Vec<AttributeMetadata>,
    pub ownership_type: OwnershipType,
    pub is_activity: bool,
    pub has_activities: bool,
    pub has_notes: bool,
}

impl EntityMetadata {
    pub fn with_description(mut self, label: impl Into<Label>) -> Self {
        self.description = label.into();
        self
    }

    pub fn with_display_name(mut self, label: impl Into<Label>) -> Self {
        self.display_name = label.into();
        self
    }

    pub fn with_display_collection_name(mut self, label: impl Into<Label>) -> Self {
        self.display_collection_name = label.into();
        self
    }

    pub fn with_ownership_type(mut self, ownership_type: OwnershipType) -> Self {
        self.ownership_type = ownership_type;
        self
    }

    pub fn with_activities(mut self, has_activities: bool) -> Self {
        self.has_activities = has_activities;
        self
    }

    pub fn with_notes(mut self, has_notes: bool) -> Self {
        self.has_notes = has_notes;
        self
    }

    pub fn as_activity(mut self) -> Self {
        self.is_activity = true;
        self
    }

    pub fn primary_name_attribute(&self) -> Option<&AttributeMetadata> {
        self.attributes.iter().find(|a| a.is_primary_name())
    }
}

impl MetadataDefinition for EntityMetadata {}

/// Define a new table.
///
/// Exactly one of `attributes` must be a primary name column (see
/// [`AttributeMetadata::primary_name`]). Display names default to the schema
/// name without its publisher prefix, pluralized for the collection name.
pub fn define_entity(schema_name: &str, attributes: Vec<AttributeMetadata>) -> Result<EntityMetadata> {
    let primary_names: Vec<&str> = attributes
        .iter()
        .filter(|a| a.is_primary_name())
        .map(AttributeMetadata::schema_name)
        .collect();

    if primary_names.len() != 1 {
        return Err(DataverseError::validation(format!(
            "Table {} needs exactly one primary name attribute, found {}{}",
            schema_name,
            primary_names.len(),
            if primary_names.is_empty() {
                String::new()
            } else {
                format!(": {}", primary_names.join(", "))
            }
        )));
    }

    let name = display_name_from_schema(schema_name);

    Ok(EntityMetadata {
        odata_type: ODataType::new("EntityMetadata"),
        schema_name: schema_name.to_string(),
        description: create_label("", DEFAULT_LANGUAGE_CODE),
        display_collection_name: create_label(pluralize_entity_name(&name), DEFAULT_LANGUAGE_CODE),
        display_name: create_label(name, DEFAULT_LANGUAGE_CODE),
        attributes,
        ownership_type: OwnershipType::UserOwned,
        is_activity: false,
        has_activities: false,
        has_notes: false,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AlternateKeyMetadata {
    pub schema_name: String,
    pub display_name: Label,
    pub key_attributes: Vec<String>,
}

impl MetadataDefinition for AlternateKeyMetadata {}

/// Define an alternate key over `key_attributes` (logical names, duplicates dropped)
pub fn define_alternate_key<I, S>(
    schema_name: &str,
    display_name: impl Into<Label>,
    key_attributes: I,
) -> Result<AlternateKeyMetadata>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut unique: Vec<String> = Vec::new();
    for attribute in key_attributes {
        let attribute = attribute.into();
        if !unique.contains(&attribute) {
            unique.push(attribute);
        }
    }

    if unique.is_empty() {
        return Err(DataverseError::validation(format!(
            "Alternate key {} needs at least one attribute",
            schema_name
        )));
    }

    Ok(AlternateKeyMetadata {
        schema_name: schema_name.to_string(),
        display_name: display_name.into(),
        key_attributes: unique,
    })
}
