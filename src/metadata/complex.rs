//! Complex properties shared by attribute and relationship metadata

use super::enums::{AssociatedMenuBehavior, AssociatedMenuGroup, AttributeRequiredLevel, CascadeType};
use super::labels::{DEFAULT_LANGUAGE_CODE, Label, create_label};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RequiredLevel {
    pub value: AttributeRequiredLevel,
    pub can_be_changed: bool,
    managed_property_logical_name: &'static str,
}

impl RequiredLevel {
    pub fn new(value: AttributeRequiredLevel) -> Self {
        Self {
            value,
            can_be_changed: true,
            managed_property_logical_name: "canmodifyrequirementlevelsettings",
        }
    }
}

impl Default for RequiredLevel {
    fn default() -> Self {
        Self::new(AttributeRequiredLevel::None)
    }
}

/// How the related rows appear in the referenced table's navigation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AssociatedMenuConfiguration {
    pub behavior: AssociatedMenuBehavior,
    pub group: AssociatedMenuGroup,
    /// Must be at least 10000
    pub order: i32,
    pub label: Label,
}

impl Default for AssociatedMenuConfiguration {
    fn default() -> Self {
        Self {
            behavior: AssociatedMenuBehavior::default(),
            group: AssociatedMenuGroup::default(),
            order: 10000,
            label: create_label("", DEFAULT_LANGUAGE_CODE),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CascadeConfiguration {
    pub assign: CascadeType,
    pub delete: CascadeType,
    pub merge: CascadeType,
    pub reparent: CascadeType,
    pub share: CascadeType,
    pub unshare: CascadeType,
}

impl CascadeConfiguration {
    /// Same behavior for every action
    pub fn all(cascade: CascadeType) -> Self {
        Self {
            assign: cascade,
            delete: cascade,
            merge: cascade,
            reparent: cascade,
            share: cascade,
            unshare: cascade,
        }
    }
}
