//! Localized labels

use super::ODataType;
use serde::Serialize;

/// English (United States)
pub const DEFAULT_LANGUAGE_CODE: i64 = 1033;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LocalizedLabel {
    #[serde(rename = "@odata.type")]
    odata_type: ODataType,
    pub label: String,
    pub language_code: i64,
    pub is_managed: bool,
}

impl LocalizedLabel {
    pub fn new(label: impl Into<String>, language_code: i64) -> Self {
        Self {
            odata_type: ODataType::new("LocalizedLabel"),
            label: label.into(),
            language_code,
            is_managed: false,
        }
    }
}

/// A text in one or more languages
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Label {
    #[serde(rename = "@odata.type")]
    odata_type: ODataType,
    pub localized_labels: Vec<LocalizedLabel>,
}

impl Label {
    pub fn new(localized_labels: Vec<LocalizedLabel>) -> Self {
        Self {
            odata_type: ODataType::new("Label"),
            localized_labels,
        }
    }

    /// Text for a language, if present
    pub fn text(&self, language_code: i64) -> Option<&str> {
        self.localized_labels
            .iter()
            .find(|l| l.language_code == language_code)
            .map(|l| l.label.as_str())
    }
}

impl Default for Label {
    fn default() -> Self {
        create_label("Label", DEFAULT_LANGUAGE_CODE)
    }
}

impl From<&str> for Label {
    fn from(label: &str) -> Self {
        create_label(label, DEFAULT_LANGUAGE_CODE)
    }
}

impl From<String> for Label {
    fn from(label: String) -> Self {
        create_label(label, DEFAULT_LANGUAGE_CODE)
    }
}

/// Label with a single language
pub fn create_label(label: impl Into<String>, language_code: i64) -> Label {
    Label::new(vec![LocalizedLabel::new(label, language_code)])
}

/// Label with one entry per `(text, language code)` pair
pub fn create_labels(labels: &[(&str, i64)]) -> Label {
    Label::new(
        labels
            .iter()
            .map(|(label, code)| LocalizedLabel::new(*label, *code))
            .collect(),
    )
}

/// Human readable name from a schema name: `new_project_task` becomes `project task`.
///
/// Names without a publisher prefix are returned as they are.
pub fn display_name_from_schema(schema_name: &str) -> String {
    match schema_name.split_once('_') {
        Some((_, rest)) if !rest.is_empty() => rest.split('_').collect::<Vec<_>>().join(" "),
        _ => schema_name.to_string(),
    }
}

/// The given label, or one built from `fallback` in the default language
pub fn define_label(label: Option<Label>, fallback: &str) -> Label {
    label.unwrap_or_else(|| create_label(fallback, DEFAULT_LANGUAGE_CODE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_label_payload() {
        let value = serde_json::to_value(create_label("Project", 1044)).unwrap();
        assert_eq!(
            value,
            json!({
                "@odata.type": "Microsoft.Dynamics.CRM.Label",
                "LocalizedLabels": [{
                    "@odata.type": "Microsoft.Dynamics.CRM.LocalizedLabel",
                    "Label": "Project",
                    "LanguageCode": 1044,
                    "IsManaged": false
                }]
            })
        );
    }

    #[test]
    fn test_create_labels() {
        let label = create_labels(&[("Project", 1033), ("Prosjekt", 1044)]);
        assert_eq!(label.localized_labels.len(), 2);
        assert_eq!(label.text(1044), Some("Prosjekt"));
        assert_eq!(label.text(1031), None);
    }

    #[test]
    fn test_define_label() {
        assert_eq!(define_label(None, "Fallback").text(DEFAULT_LANGUAGE_CODE), Some("Fallback"));
        assert_eq!(define_label(Some("Given".into()), "Fallback").text(1033), Some("Given"));
        assert_eq!(Label::default().text(1033), Some("Label"));
    }

    #[test]
    fn test_display_name_from_schema() {
        assert_eq!(display_name_from_schema("new_project_task"), "project task");
        assert_eq!(display_name_from_schema("new_Project"), "Project");
        assert_eq!(display_name_from_schema("account"), "account");
        assert_eq!(display_name_from_schema("new_"), "new_");
    }
}
