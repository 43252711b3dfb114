//! OData `$filter` expressions

use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, FilterValue),
    Ne(String, FilterValue),
    Gt(String, FilterValue),
    Ge(String, FilterValue),
    Lt(String, FilterValue),
    Le(String, FilterValue),

    Contains(String, String),
    StartsWith(String, String),
    EndsWith(String, String),

    /// `Microsoft.Dynamics.CRM.In` query function
    In(String, Vec<FilterValue>),

    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),

    Raw(String),
}

/// Literal on the right-hand side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    String(String),
    Number(f64),
    Integer(i64),
    Boolean(bool),
    /// Rendered without quotes, as Dataverse expects for lookups and ids
    Guid(Uuid),
    DateTime(DateTime<Utc>),
    Null,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::Eq(field.into(), value.into())
    }

    pub fn ne(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::Ne(field.into(), value.into())
    }

    pub fn gt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::Gt(field.into(), value.into())
    }

    pub fn ge(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::Ge(field.into(), value.into())
    }

    pub fn lt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::Lt(field.into(), value.into())
    }

    pub fn le(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::Le(field.into(), value.into())
    }

    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Contains(field.into(), value.into())
    }

    pub fn starts_with(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::StartsWith(field.into(), value.into())
    }

    pub fn ends_with(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::EndsWith(field.into(), value.into())
    }

    pub fn is_in<V: Into<FilterValue>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self::In(field.into(), values.into_iter().map(Into::into).collect())
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Self::And(filters)
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Self::Or(filters)
    }

    pub fn not(filter: Filter) -> Self {
        Self::Not(Box::new(filter))
    }

    pub fn raw(filter: impl Into<String>) -> Self {
        Self::Raw(filter.into())
    }

    pub fn to_odata_string(&self) -> String {
        match self {
            Filter::Eq(field, value) => format!("{} eq {}", field, value),
            Filter::Ne(field, value) => format!("{} ne {}", field, value),
            Filter::Gt(field, value) => format!("{} gt {}", field, value),
            Filter::Ge(field, value) => format!("{} ge {}", field, value),
            Filter::Lt(field, value) => format!("{} lt {}", field, value),
            Filter::Le(field, value) => format!("{} le {}", field, value),

            Filter::Contains(field, value) => format!("contains({},{})", field, quote(value)),
            Filter::StartsWith(field, value) => format!("startswith({},{})", field, quote(value)),
            Filter::EndsWith(field, value) => format!("endswith({},{})", field, quote(value)),

            Filter::In(field, values) => {
                let values: Vec<String> = values
                    .iter()
                    .map(|v| match v {
                        // The In function takes every value as a string
                        FilterValue::String(_) => v.to_string(),
                        other => quote(&other.to_string()),
                    })
                    .collect();
                format!(
                    "Microsoft.Dynamics.CRM.In(PropertyName='{}',PropertyValues=[{}])",
                    field,
                    values.join(",")
                )
            }

            Filter::And(filters) => join(filters, " and "),
            Filter::Or(filters) => join(filters, " or "),
            Filter::Not(filter) => format!("not ({})", filter.to_odata_string()),

            Filter::Raw(raw) => raw.clone(),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_odata_string())
    }
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn join(filters: &[Filter], op: &str) -> String {
    match filters {
        [] => String::new(),
        [single] => single.to_odata_string(),
        _ => {
            let parts: Vec<String> = filters.iter().map(Filter::to_odata_string).collect();
            format!("({})", parts.join(op))
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::String(s) => f.write_str(&quote(s)),
            FilterValue::Number(n) => write!(f, "{}", n),
            FilterValue::Integer(i) => write!(f, "{}", i),
            FilterValue::Boolean(b) => write!(f, "{}", b),
            FilterValue::Guid(id) => write!(f, "{}", id.hyphenated()),
            FilterValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%SZ")),
            FilterValue::Null => f.write_str("null"),
        }
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::String(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::String(value.to_string())
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::Number(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Integer(value)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        FilterValue::Integer(value as i64)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Boolean(value)
    }
}

impl From<Uuid> for FilterValue {
    fn from(value: Uuid) -> Self {
        FilterValue::Guid(value)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(value: DateTime<Utc>) -> Self {
        FilterValue::DateTime(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_comparison_filters() {
        assert_eq!(Filter::eq("statecode", 0).to_odata_string(), "statecode eq 0");
        assert_eq!(Filter::ne("firstname", "John").to_odata_string(), "firstname ne 'John'");
        assert_eq!(Filter::le("revenue", 10.5).to_odata_string(), "revenue le 10.5");
        assert_eq!(Filter::eq("parentaccountid", FilterValue::Null).to_odata_string(), "parentaccountid eq null");
    }

    #[test]
    fn test_guid_and_datetime_are_unquoted() {
        let id = Uuid::parse_str("6F9619FF-8B86-D011-B42D-00C04FC964FF").unwrap();
        assert_eq!(
            Filter::eq("_parentaccountid_value", id).to_odata_string(),
            "_parentaccountid_value eq 6f9619ff-8b86-d011-b42d-00c04fc964ff"
        );

        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(Filter::gt("createdon", at).to_odata_string(), "createdon gt 2024-03-01T12:00:00Z");
    }

    #[test]
    fn test_string_functions() {
        assert_eq!(Filter::contains("name", "Contoso").to_odata_string(), "contains(name,'Contoso')");
        assert_eq!(Filter::starts_with("name", "Co").to_odata_string(), "startswith(name,'Co')");
        assert_eq!(Filter::ends_with("name", "so").to_odata_string(), "endswith(name,'so')");
    }

    #[test]
    fn test_in_function() {
        assert_eq!(
            Filter::is_in("statuscode", [1, 2]).to_odata_string(),
            "Microsoft.Dynamics.CRM.In(PropertyName='statuscode',PropertyValues=['1','2'])"
        );
        assert_eq!(
            Filter::is_in("name", ["a", "b'c"]).to_odata_string(),
            "Microsoft.Dynamics.CRM.In(PropertyName='name',PropertyValues=['a','b''c'])"
        );
    }

    #[test]
    fn test_logical_operators() {
        let filter = Filter::and(vec![
            Filter::eq("statecode", 0),
            Filter::or(vec![Filter::contains("name", "A"), Filter::contains("name", "B")]),
        ]);
        assert_eq!(
            filter.to_odata_string(),
            "(statecode eq 0 and (contains(name,'A') or contains(name,'B')))"
        );
        assert_eq!(Filter::and(vec![Filter::eq("a", 1)]).to_odata_string(), "a eq 1");
        assert_eq!(Filter::not(Filter::eq("a", 1)).to_odata_string(), "not (a eq 1)");
    }

    #[test]
    fn test_quote_escaping() {
        assert_eq!(Filter::eq("lastname", "O'Connor").to_odata_string(), "lastname eq 'O''Connor'");
    }
}
