//! Row keys and alternate-key URL handling
//!
//! A row is addressed either by its primary id (`accounts(<guid>)`) or by an
//! alternate key (`accounts(name='Contoso',region=1)`).

use crate::error::{DataverseError, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use uuid::Uuid;

static QUOTED_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"'([^']*)'").expect("valid regex"));

/// Characters Dataverse refuses inside alternate key values
pub const ILLEGAL_KEY_CHARACTERS: [char; 10] = ['/', '<', '>', '*', '%', '&', ':', '\\', '?', '+'];

/// Percent-encode every single-quoted segment of a URL.
///
/// `accounts(name='æ')` becomes `accounts(name='%C3%A6')`; anything outside
/// quotes is left alone.
pub fn encode_altkeys(url: &str) -> String {
    QUOTED_SEGMENT
        .replace_all(url, |caps: &Captures| format!("'{}'", urlencoding::encode(&caps[1])))
        .into_owned()
}

/// Columns identifying a row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyColumns {
    columns: BTreeSet<String>,
    primary_id: bool,
}

impl KeyColumns {
    /// The primary id column; values are rendered as bare GUIDs
    pub fn primary_id(column: impl Into<String>) -> Self {
        Self {
            columns: BTreeSet::from([column.into()]),
            primary_id: true,
        }
    }

    /// One or more columns forming an alternate key
    pub fn alternate<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            primary_id: false,
        }
    }

    pub fn is_primary_id(&self) -> bool {
        self.primary_id
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Treat a single-column key naming the primary id attribute as a primary id key
    pub fn normalize(self, primary_id_attr: &str) -> Self {
        if !self.primary_id && self.columns.len() == 1 && self.columns.contains(primary_id_attr) {
            return Self::primary_id(primary_id_attr);
        }
        self
    }
}

impl From<&str> for KeyColumns {
    fn from(column: &str) -> Self {
        Self::alternate([column])
    }
}

impl From<Vec<&str>> for KeyColumns {
    fn from(columns: Vec<&str>) -> Self {
        Self::alternate(columns)
    }
}

/// Render a value for use inside an alternate key
pub fn format_key_value(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => {
            if let Some(c) = s.chars().find(|c| ILLEGAL_KEY_CHARACTERS.contains(c)) {
                return Err(DataverseError::validation(format!(
                    "Key value '{}' contains '{}', which Dataverse does not allow in alternate keys",
                    s, c
                )));
            }
            Ok(format!("'{}'", s.replace('\'', "''")))
        }
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Err(DataverseError::validation("Key value cannot be null")),
        other => Err(DataverseError::validation(format!(
            "Unsupported key value: {}",
            other
        ))),
    }
}

/// Split the key columns off a row.
///
/// Returns the remaining columns and the row identifier to place between the
/// parentheses of `entityset(...)`.
pub fn extract_key(row: &Map<String, Value>, key: &KeyColumns) -> Result<(Map<String, Value>, String)> {
    if key.is_empty() {
        return Err(DataverseError::validation("Key column(s) must be specified."));
    }

    let mut remaining = row.clone();
    let mut parts = Vec::with_capacity(key.len());

    for column in key.columns() {
        let value = remaining.remove(column).ok_or_else(|| {
            DataverseError::validation(format!("Key column '{}' missing from row", column))
        })?;

        if key.is_primary_id() {
            parts.push(primary_id_value(column, &value)?);
        } else {
            parts.push(format!("{}={}", column, format_key_value(&value)?));
        }
    }

    Ok((remaining, parts.join(",")))
}

fn primary_id_value(column: &str, value: &Value) -> Result<String> {
    let raw = value.as_str().ok_or_else(|| {
        DataverseError::validation(format!("Primary id column '{}' must hold a GUID string", column))
    })?;
    let id = Uuid::parse_str(raw).map_err(|_| {
        DataverseError::validation(format!("'{}' is not a valid GUID for column '{}'", raw, column))
    })?;
    Ok(id.hyphenated().to_string())
}
