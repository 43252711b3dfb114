//! Column definitions
//!
//! [`AttributeMetadata`] wraps one typed definition per supported column
//! type. On serialization it adds the `@odata.type`, `AttributeType` and
//! `AttributeTypeName` properties matching the variant.

use super::MetadataDefinition;
use super::ODataType;
use super::complex::RequiredLevel;
use super::enums::{AttributeRequiredLevel, DateTimeFormat, IntegerFormat, MemoFormat, StringFormat};
use super::labels::{DEFAULT_LANGUAGE_CODE, Label, create_label, display_name_from_schema};
use serde::ser::Error as _;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value, json};

/// Properties common to every column type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttributeBase {
    pub schema_name: String,
    pub description: Label,
    pub display_name: Label,
    pub required_level: RequiredLevel,
}

impl AttributeBase {
    pub fn new(schema_name: impl Into<String>) -> Self {
        let schema_name = schema_name.into();
        let display_name = create_label(display_name_from_schema(&schema_name), DEFAULT_LANGUAGE_CODE);
        Self {
            schema_name,
            description: create_label("", DEFAULT_LANGUAGE_CODE),
            display_name,
            required_level: RequiredLevel::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StringAttributeMetadata {
    #[serde(flatten)]
    pub base: AttributeBase,
    pub is_primary_name: bool,
    pub max_length: u32,
    pub format_name: StringFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_number_format: Option<String>,
}

impl StringAttributeMetadata {
    pub fn new(schema_name: impl Into<String>) -> Self {
        Self {
            base: AttributeBase::new(schema_name),
            is_primary_name: false,
            max_length: 100,
            format_name: StringFormat::Text,
            auto_number_format: None,
        }
    }

    /// Auto-numbered columns are always plain text
    pub fn with_auto_number(mut self, format: impl Into<String>) -> Self {
        self.auto_number_format = Some(format.into());
        self.format_name = StringFormat::Text;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MemoAttributeMetadata {
    #[serde(flatten)]
    pub base: AttributeBase,
    pub format: MemoFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct IntegerAttributeMetadata {
    #[serde(flatten)]
    pub base: AttributeBase,
    pub min_value: i64,
    pub max_value: i64,
    pub format: IntegerFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BigIntAttributeMetadata {
    #[serde(flatten)]
    pub base: AttributeBase,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DecimalAttributeMetadata {
    #[serde(flatten)]
    pub base: AttributeBase,
    pub min_value: f64,
    pub max_value: f64,
    pub precision: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DateTimeAttributeMetadata {
    #[serde(flatten)]
    pub base: AttributeBase,
    pub format: DateTimeFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BooleanOption {
    pub value: i32,
    pub label: Label,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BooleanOptionSet {
    pub true_option: BooleanOption,
    pub false_option: BooleanOption,
    option_set_type: &'static str,
}

impl Default for BooleanOptionSet {
    fn default() -> Self {
        Self {
            true_option: BooleanOption {
                value: 1,
                label: "True".into(),
            },
            false_option: BooleanOption {
                value: 0,
                label: "False".into(),
            },
            option_set_type: "Boolean",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BooleanAttributeMetadata {
    #[serde(flatten)]
    pub base: AttributeBase,
    pub default_value: bool,
    pub option_set: BooleanOptionSet,
}

/// Lookup column; created through a relationship definition
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LookupAttributeMetadata {
    #[serde(flatten)]
    pub base: AttributeBase,
}

impl LookupAttributeMetadata {
    pub fn new(schema_name: impl Into<String>) -> Self {
        Self {
            base: AttributeBase::new(schema_name),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeMetadata {
    String(StringAttributeMetadata),
    Memo(MemoAttributeMetadata),
    Integer(IntegerAttributeMetadata),
    BigInt(BigIntAttributeMetadata),
    Decimal(DecimalAttributeMetadata),
    DateTime(DateTimeAttributeMetadata),
    Boolean(BooleanAttributeMetadata),
    Lookup(LookupAttributeMetadata),
}

impl AttributeMetadata {
    pub fn string(schema_name: impl Into<String>) -> Self {
        Self::String(StringAttributeMetadata::new(schema_name))
    }

    /// The text column naming each row; every table needs exactly one
    pub fn primary_name(schema_name: impl Into<String>) -> Self {
        let mut attribute = StringAttributeMetadata::new(schema_name);
        attribute.is_primary_name = true;
        Self::String(attribute)
    }

    pub fn memo(schema_name: impl Into<String>) -> Self {
        Self::Memo(MemoAttributeMetadata {
            base: AttributeBase::new(schema_name),
            format: MemoFormat::default(),
            max_length: None,
        })
    }

    pub fn integer(schema_name: impl Into<String>, min_value: i64, max_value: i64) -> Self {
        Self::Integer(IntegerAttributeMetadata {
            base: AttributeBase::new(schema_name),
            min_value,
            max_value,
            format: IntegerFormat::default(),
        })
    }

    pub fn big_int(schema_name: impl Into<String>) -> Self {
        Self::BigInt(BigIntAttributeMetadata {
            base: AttributeBase::new(schema_name),
        })
    }

    pub fn decimal(schema_name: impl Into<String>, min_value: f64, max_value: f64) -> Self {
        Self::Decimal(DecimalAttributeMetadata {
            base: AttributeBase::new(schema_name),
            min_value,
            max_value,
            precision: 2,
        })
    }

    pub fn date_time(schema_name: impl Into<String>) -> Self {
        Self::DateTime(DateTimeAttributeMetadata {
            base: AttributeBase::new(schema_name),
            format: DateTimeFormat::default(),
        })
    }

    pub fn boolean(schema_name: impl Into<String>) -> Self {
        Self::Boolean(BooleanAttributeMetadata {
            base: AttributeBase::new(schema_name),
            default_value: false,
            option_set: BooleanOptionSet::default(),
        })
    }

    pub fn lookup(schema_name: impl Into<String>) -> Self {
        Self::Lookup(LookupAttributeMetadata::new(schema_name))
    }

    pub fn with_display_name(mut self, label: impl Into<Label>) -> Self {
        self.base_mut().display_name = label.into();
        self
    }

    pub fn with_description(mut self, label: impl Into<Label>) -> Self {
        self.base_mut().description = label.into();
        self
    }

    pub fn with_required_level(mut self, level: AttributeRequiredLevel) -> Self {
        self.base_mut().required_level = RequiredLevel::new(level);
        self
    }

    pub fn base(&self) -> &AttributeBase {
        match self {
            Self::String(a) => &a.base,
            Self::Memo(a) => &a.base,
            Self::Integer(a) => &a.base,
            Self::BigInt(a) => &a.base,
            Self::Decimal(a) => &a.base,
            Self::DateTime(a) => &a.base,
            Self::Boolean(a) => &a.base,
            Self::Lookup(a) => &a.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut AttributeBase {
        match self {
            Self::String(a) => &mut a.base,
            Self::Memo(a) => &mut a.base,
            Self::Integer(a) => &mut a.base,
            Self::BigInt(a) => &mut a.base,
            Self::Decimal(a) => &mut a.base,
            Self::DateTime(a) => &mut a.base,
            Self::Boolean(a) => &mut a.base,
            Self::Lookup(a) => &mut a.base,
        }
    }

    pub fn schema_name(&self) -> &str {
        &self.base().schema_name
    }

    pub fn is_primary_name(&self) -> bool {
        matches!(self, Self::String(a) if a.is_primary_name)
    }

    /// `AttributeType` value, e.g. `String`
    pub fn attribute_type(&self) -> &'static str {
        match self {
            Self::String(_) => "String",
            Self::Memo(_) => "Memo",
            Self::Integer(_) => "Integer",
            Self::BigInt(_) => "BigInt",
            Self::Decimal(_) => "Decimal",
            Self::DateTime(_) => "DateTime",
            Self::Boolean(_) => "Boolean",
            Self::Lookup(_) => "Lookup",
        }
    }

    fn fields(&self) -> serde_json::Result<Value> {
        match self {
            Self::String(a) => serde_json::to_value(a),
            Self::Memo(a) => serde_json::to_value(a),
            Self::Integer(a) => serde_json::to_value(a),
            Self::BigInt(a) => serde_json::to_value(a),
            Self::Decimal(a) => serde_json::to_value(a),
            Self::DateTime(a) => serde_json::to_value(a),
            Self::Boolean(a) => serde_json::to_value(a),
            Self::Lookup(a) => serde_json::to_value(a),
        }
    }
}

/// Add the type annotations for `attribute_type` to serialized fields
fn with_type_annotations(attribute_type: &str, fields: Value) -> Value {
    let mut map = match fields {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    let odata_type = ODataType::new(&format!("{}AttributeMetadata", attribute_type));
    map.insert("@odata.type".to_string(), Value::String(odata_type.as_str().to_string()));
    map.insert("AttributeType".to_string(), Value::String(attribute_type.to_string()));
    map.insert(
        "AttributeTypeName".to_string(),
        json!({ "Value": format!("{}Type", attribute_type) }),
    );
    Value::Object(map)
}

impl Serialize for AttributeMetadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = self.fields().map_err(S::Error::custom)?;
        with_type_annotations(self.attribute_type(), fields).serialize(serializer)
    }
}

impl MetadataDefinition for AttributeMetadata {}

/// Serialize a bare lookup definition with its type annotations
pub(crate) fn serialize_lookup<S: Serializer>(
    lookup: &LookupAttributeMetadata,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let fields = serde_json::to_value(lookup).map_err(S::Error::custom)?;
    with_type_annotations("Lookup", fields).serialize(serializer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_payload() {
        let value = AttributeMetadata::primary_name("new_Name")
            .with_required_level(AttributeRequiredLevel::ApplicationRequired)
            .to_payload()
            .unwrap();

        assert_eq!(value["@odata.type"], "Microsoft.Dynamics.CRM.StringAttributeMetadata");
        assert_eq!(value["AttributeType"], "String");
        assert_eq!(value["AttributeTypeName"], json!({"Value": "StringType"}));
        assert_eq!(value["SchemaName"], "new_Name");
        assert_eq!(value["IsPrimaryName"], true);
        assert_eq!(value["MaxLength"], 100);
        assert_eq!(value["FormatName"], json!({"Value": "Text"}));
        assert_eq!(value["RequiredLevel"]["Value"], "ApplicationRequired");
        assert_eq!(value["DisplayName"]["LocalizedLabels"][0]["Label"], "Name");
        assert!(value.get("AutoNumberFormat").is_none());
        assert!(value.get("Base").is_none());
    }

    #[test]
    fn test_auto_number() {
        let mut attribute = StringAttributeMetadata::new("new_Code").with_auto_number("PRJ-{SEQNUM:5}");
        attribute.format_name = StringFormat::Email;
        let attribute = attribute.with_auto_number("PRJ-{SEQNUM:6}");
        let value = AttributeMetadata::String(attribute).to_payload().unwrap();
        assert_eq!(value["AutoNumberFormat"], "PRJ-{SEQNUM:6}");
        assert_eq!(value["FormatName"]["Value"], "Text");
    }

    #[test]
    fn test_numeric_payloads() {
        let value = AttributeMetadata::integer("new_Count", 0, 100).to_payload().unwrap();
        assert_eq!(value["@odata.type"], "Microsoft.Dynamics.CRM.IntegerAttributeMetadata");
        assert_eq!(value["MinValue"], 0);
        assert_eq!(value["MaxValue"], 100);
        assert_eq!(value["Format"], "None");

        let value = AttributeMetadata::decimal("new_Rate", 0.0, 1.5).to_payload().unwrap();
        assert_eq!(value["AttributeTypeName"]["Value"], "DecimalType");
        assert_eq!(value["Precision"], 2);

        let value = AttributeMetadata::big_int("new_Big").to_payload().unwrap();
        assert_eq!(value["AttributeType"], "BigInt");
        assert_eq!(value["AttributeTypeName"]["Value"], "BigIntType");
    }

    #[test]
    fn test_boolean_payload() {
        let value = AttributeMetadata::boolean("new_Active").to_payload().unwrap();
        assert_eq!(value["DefaultValue"], false);
        assert_eq!(value["OptionSet"]["OptionSetType"], "Boolean");
        assert_eq!(value["OptionSet"]["TrueOption"]["Value"], 1);
        assert_eq!(value["OptionSet"]["FalseOption"]["Label"]["LocalizedLabels"][0]["Label"], "False");
    }

    #[test]
    fn test_memo_and_datetime() {
        let value = AttributeMetadata::memo("new_Notes").to_payload().unwrap();
        assert_eq!(value["Format"], "TextArea");
        assert!(value.get("MaxLength").is_none());

        let value = AttributeMetadata::date_time("new_Due")
            .with_description("When it is due")
            .to_payload()
            .unwrap();
        assert_eq!(value["Format"], "DateAndTime");
        assert_eq!(value["Description"]["LocalizedLabels"][0]["Label"], "When it is due");
    }

    #[test]
    fn test_accessors() {
        let attribute = AttributeMetadata::lookup("new_ParentId").with_display_name("Parent");
        assert_eq!(attribute.schema_name(), "new_ParentId");
        assert_eq!(attribute.attribute_type(), "Lookup");
        assert!(!attribute.is_primary_name());
        assert_eq!(attribute.base().display_name.text(1033), Some("Parent"));
    }
}
