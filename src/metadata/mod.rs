//! Typed metadata payloads for creating tables, columns, relationships and keys
//!
//! Everything here serializes to the PascalCase JSON the metadata endpoints
//! expect, with `@odata.type` annotations where Dataverse needs them.

pub mod attributes;
pub mod complex;
pub mod entity;
pub mod enums;
pub mod labels;
pub mod pluralization;
pub mod relationships;
pub mod solution;

pub use attributes::{
    AttributeBase, AttributeMetadata, BigIntAttributeMetadata, BooleanAttributeMetadata,
    BooleanOption, BooleanOptionSet, DateTimeAttributeMetadata, DecimalAttributeMetadata,
    IntegerAttributeMetadata, LookupAttributeMetadata, MemoAttributeMetadata, StringAttributeMetadata,
};
pub use complex::{AssociatedMenuConfiguration, CascadeConfiguration, RequiredLevel};
pub use entity::{AlternateKeyMetadata, EntityMetadata, define_alternate_key, define_entity};
pub use enums::{
    AssociatedMenuBehavior, AssociatedMenuGroup, AttributeRequiredLevel, CascadeType, DateTimeFormat,
    IntegerFormat, MemoFormat, OwnershipType, StringFormat,
};
pub use labels::{
    DEFAULT_LANGUAGE_CODE, Label, LocalizedLabel, create_label, create_labels, define_label,
    display_name_from_schema,
};
pub use pluralization::pluralize_entity_name;
pub use relationships::{OneToManyRelationshipMetadata, define_relationship};
pub use solution::{Publisher, Solution};

use crate::api::constants::ODATA_TYPE_PREFIX;
use crate::error::Result;
use serde::Serialize;
use serde_json::Value;

/// A metadata object that can be sent as a request body
pub trait MetadataDefinition: Serialize {
    fn to_payload(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// `@odata.type` annotation, e.g. `Microsoft.Dynamics.CRM.Label`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ODataType(String);

impl ODataType {
    pub fn new(type_name: &str) -> Self {
        Self(format!("{}{}", ODATA_TYPE_PREFIX, type_name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
