//! One-to-many relationship definitions

use super::attributes::{LookupAttributeMetadata, serialize_lookup};
use super::complex::{AssociatedMenuConfiguration, CascadeConfiguration};
use super::labels::{DEFAULT_LANGUAGE_CODE, Label, create_label, display_name_from_schema};
use super::{MetadataDefinition, ODataType};
use serde::Serialize;

/// Relationship between a referenced table (one side) and a referencing
/// table (many side), created together with its lookup column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OneToManyRelationshipMetadata {
    #[serde(rename = "@odata.type")]
    odata_type: ODataType,
    pub schema_name: String,
    pub is_valid_for_advanced_find: bool,
    pub description: Label,
    pub display_name: Label,
    pub referenced_entity: String,
    pub referencing_entity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referenced_attribute: Option<String>,
    #[serde(serialize_with = "serialize_lookup")]
    pub lookup: LookupAttributeMetadata,
    pub cascade_configuration: CascadeConfiguration,
    pub associated_menu_configuration: AssociatedMenuConfiguration,
}

impl OneToManyRelationshipMetadata {
    pub fn with_lookup(mut self, lookup: LookupAttributeMetadata) -> Self {
        self.lookup = lookup;
        self
    }

    /// Primary id column of the referenced table, when it is not inferred
    pub fn with_referenced_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.referenced_attribute = Some(attribute.into());
        self
    }

    pub fn with_description(mut self, label: impl Into<Label>) -> Self {
        self.description = label.into();
        self
    }

    pub fn with_display_name(mut self, label: impl Into<Label>) -> Self {
        self.display_name = label.into();
        self
    }

    pub fn with_cascade(mut self, cascade: CascadeConfiguration) -> Self {
        self.cascade_configuration = cascade;
        self
    }

    pub fn with_menu(mut self, menu: AssociatedMenuConfiguration) -> Self {
        self.associated_menu_configuration = menu;
        self
    }
}

impl MetadataDefinition for OneToManyRelationshipMetadata {}

/// Define a relationship where `referencing_entity` gets a lookup column
/// named `lookup_schema_name` pointing at `referenced_entity`.
pub fn define_relationship(
    schema_name: &str,
    referencing_entity: &str,
    referenced_entity: &str,
    lookup_schema_name: &str,
) -> OneToManyRelationshipMetadata {
    let lookup_label = create_label(
        format!("Relationship between {} and {}.", referencing_entity, referenced_entity),
        DEFAULT_LANGUAGE_CODE,
    );
    let mut lookup = LookupAttributeMetadata::new(lookup_schema_name);
    lookup.base.description = lookup_label.clone();
    lookup.base.display_name = lookup_label;

    OneToManyRelationshipMetadata {
        odata_type: ODataType::new("OneToManyRelationshipMetadata"),
        schema_name: schema_name.to_string(),
        is_valid_for_advanced_find: true,
        description: create_label("", DEFAULT_LANGUAGE_CODE),
        display_name: create_label(display_name_from_schema(schema_name), DEFAULT_LANGUAGE_CODE),
        referenced_entity: referenced_entity.to_string(),
        referencing_entity: referencing_entity.to_string(),
        referenced_attribute: None,
        lookup,
        cascade_configuration: CascadeConfiguration::default(),
        associated_menu_configuration: AssociatedMenuConfiguration::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::enums::CascadeType;

    #[test]
    fn test_relationship_payload() {
        let value = define_relationship("new_account_task", "new_task", "account", "new_AccountId")
            .to_payload()
            .unwrap();

        assert_eq!(value["@odata.type"], "Microsoft.Dynamics.CRM.OneToManyRelationshipMetadata");
        assert_eq!(value["SchemaName"], "new_account_task");
        assert_eq!(value["ReferencedEntity"], "account");
        assert_eq!(value["ReferencingEntity"], "new_task");
        assert_eq!(value["IsValidForAdvancedFind"], true);
        assert!(value.get("ReferencedAttribute").is_none());

        let lookup = &value["Lookup"];
        assert_eq!(lookup["@odata.type"], "Microsoft.Dynamics.CRM.LookupAttributeMetadata");
        assert_eq!(lookup["AttributeType"], "Lookup");
        assert_eq!(lookup["AttributeTypeName"]["Value"], "LookupType");
        assert_eq!(lookup["SchemaName"], "new_AccountId");
        assert_eq!(
            lookup["DisplayName"]["LocalizedLabels"][0]["Label"],
            "Relationship between new_task and account."
        );

        assert_eq!(value["CascadeConfiguration"]["Assign"], "Cascade");
        assert_eq!(value["AssociatedMenuConfiguration"]["Order"], 10000);
    }

    #[test]
    fn test_relationship_overrides() {
        let relationship = define_relationship("new_account_task", "new_task", "account", "new_AccountId")
            .with_referenced_attribute("accountid")
            .with_cascade(CascadeConfiguration::all(CascadeType::RemoveLink))
            .with_lookup(LookupAttributeMetadata::new("new_CustomerId"));

        let value = relationship.to_payload().unwrap();
        assert_eq!(value["ReferencedAttribute"], "accountid");
        assert_eq!(value["CascadeConfiguration"]["Delete"], "RemoveLink");
        assert_eq!(value["Lookup"]["SchemaName"], "new_CustomerId");
    }
}
