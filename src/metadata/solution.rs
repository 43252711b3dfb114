//! Publisher and solution records

use super::MetadataDefinition;
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Publisher {
    #[serde(rename = "friendlyname")]
    pub name: String,
    #[serde(rename = "uniquename")]
    pub unique_name: String,
    pub description: String,
    /// Prefix of tables and columns created under this publisher, e.g. `new`
    #[serde(rename = "customizationprefix")]
    pub prefix: String,
    /// Prefix of choice option values, 10000..=99999
    #[serde(rename = "customizationoptionvalueprefix")]
    pub option_prefix: u32,
}

impl MetadataDefinition for Publisher {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Solution {
    #[serde(rename = "friendlyname")]
    pub name: String,
    #[serde(rename = "uniquename")]
    pub unique_name: String,
    pub description: String,
    pub version: String,
    #[serde(rename = "publisherid@odata.bind", serialize_with = "bind_publisher")]
    pub publisher_id: String,
}

impl Solution {
    pub fn new(
        name: impl Into<String>,
        unique_name: impl Into<String>,
        description: impl Into<String>,
        publisher_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            unique_name: unique_name.into(),
            description: description.into(),
            version: "1.0.0.0".to_string(),
            publisher_id: publisher_id.into(),
        }
    }
}

impl MetadataDefinition for Solution {}

fn bind_publisher<S: Serializer>(publisher_id: &str, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("/publishers({})", publisher_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_publisher_payload() {
        let publisher = Publisher {
            name: "Contoso".to_string(),
            unique_name: "contoso".to_string(),
            description: "Contoso customizations".to_string(),
            prefix: "con".to_string(),
            option_prefix: 72700,
        };
        assert_eq!(
            publisher.to_payload().unwrap(),
            json!({
                "friendlyname": "Contoso",
                "uniquename": "contoso",
                "description": "Contoso customizations",
                "customizationprefix": "con",
                "customizationoptionvalueprefix": 72700
            })
        );
    }

    #[test]
    fn test_solution_payload() {
        let solution = Solution::new("Core", "core", "Core tables", "d21aab71-79e7-11dd-8874-00188b01e34f");
        assert_eq!(
            solution.to_payload().unwrap(),
            json!({
                "friendlyname": "Core",
                "uniquename": "core",
                "description": "Core tables",
                "version": "1.0.0.0",
                "publisherid@odata.bind": "/publishers(d21aab71-79e7-11dd-8874-00188b01e34f)"
            })
        );
    }
}
