//! Enumerations used in metadata payloads
//!
//! Dataverse expects the member names, not their integer values.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Serialized as `{"Value": "Text"}`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StringFormat {
    Email,
    #[default]
    Text,
    TextArea,
    Url,
    TickerSymbol,
    PhoneticGuide,
    VersionNumber,
    Json,
    RichText,
}

impl StringFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            StringFormat::Email => "Email",
            StringFormat::Text => "Text",
            StringFormat::TextArea => "TextArea",
            StringFormat::Url => "Url",
            StringFormat::TickerSymbol => "TickerSymbol",
            StringFormat::PhoneticGuide => "PhoneticGuide",
            StringFormat::VersionNumber => "VersionNumber",
            StringFormat::Json => "Json",
            StringFormat::RichText => "RichText",
        }
    }
}

impl Serialize for StringFormat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("Value", self.as_str())?;
        map.end()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum AttributeRequiredLevel {
    #[default]
    None,
    ApplicationRequired,
    Recommended,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum OwnershipType {
    #[default]
    None,
    UserOwned,
    OrganizationOwned,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum CascadeType {
    NoCascade,
    #[default]
    Cascade,
    Active,
    UserOwned,
    RemoveLink,
    Restrict,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum AssociatedMenuBehavior {
    #[default]
    UseCollectionName,
    UseLabel,
    DoNotDisplay,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum AssociatedMenuGroup {
    #[default]
    Details,
    Sales,
    Service,
    Marketing,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum DateTimeFormat {
    DateOnly,
    #[default]
    DateAndTime,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum IntegerFormat {
    #[default]
    None,
    Duration,
    TimeZone,
    Language,
    Locale,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum MemoFormat {
    #[default]
    TextArea,
    RichText,
}
