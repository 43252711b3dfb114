//! Reusable query object for reading table rows

use super::expand::{Expand, expand_string};
use super::filters::Filter;
use super::orderby::{OrderBy, orderby_string};
use crate::api::constants::headers;
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub select: Vec<String>,
    pub filter: Option<Filter>,
    pub expand: Vec<Expand>,
    /// Pre-rendered `$expand` value, appended after the typed expansions
    pub expand_raw: Option<String>,
    pub orderby: Vec<OrderBy>,
    pub top: Option<u32>,
    pub apply: Option<String>,
    pub count: bool,
    /// Sent as `Prefer: odata.maxpagesize=N` rather than a query option
    pub page_size: Option<u32>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn expand(mut self, expand: Expand) -> Self {
        self.expand.push(expand);
        self
    }

    pub fn expand_raw(mut self, expand: impl Into<String>) -> Self {
        self.expand_raw = Some(expand.into());
        self
    }

    pub fn orderby(mut self, order: OrderBy) -> Self {
        self.orderby.push(order);
        self
    }

    pub fn top(mut self, top: u32) -> Self {
        self.top = Some(top);
        self
    }

    pub fn apply(mut self, apply: impl Into<String>) -> Self {
        self.apply = Some(apply.into());
        self
    }

    pub fn count(mut self, count: bool) -> Self {
        self.count = count;
        self
    }

    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Query options in a fixed order; values are not URL-encoded
    pub fn to_query_params(&self) -> Result<Vec<(String, String)>> {
        let mut params = Vec::new();

        if !self.select.is_empty() {
            params.push(("$select".to_string(), self.select.join(",")));
        }
        if let Some(filter) = &self.filter {
            params.push(("$filter".to_string(), filter.to_odata_string()));
        }
        if let Some(expand) = self.expand_value()? {
            params.push(("$expand".to_string(), expand));
        }
        if let Some(orderby) = orderby_string(&self.orderby) {
            params.push(("$orderby".to_string(), orderby));
        }
        if let Some(top) = self.top {
            params.push(("$top".to_string(), top.to_string()));
        }
        if let Some(apply) = &self.apply {
            params.push(("$apply".to_string(), apply.clone()));
        }
        if self.count {
            params.push(("$count".to_string(), "true".to_string()));
        }

        Ok(params)
    }

    /// Extra request headers this query needs
    pub fn headers(&self) -> Vec<(String, String)> {
        self.page_size
            .map(|size| vec![(headers::PREFER.to_string(), headers::prefer_max_page_size(size))])
            .unwrap_or_default()
    }

    fn expand_value(&self) -> Result<Option<String>> {
        let mut parts = Vec::new();
        if !self.expand.is_empty() {
            parts.push(expand_string(&self.expand)?);
        }
        if let Some(raw) = &self.expand_raw {
            parts.push(raw.clone());
        }
        Ok(if parts.is_empty() { None } else { Some(parts.join(",")) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_query() {
        assert!(Query::new().to_query_params().unwrap().is_empty());
        assert!(Query::new().headers().is_empty());
    }

    #[test]
    fn test_query_params_order() {
        let query = Query::new()
            .select(["name", "revenue"])
            .filter(Filter::eq("statecode", 0))
            .expand(Expand::new("primarycontactid").select(["fullname"]))
            .orderby(OrderBy::desc("revenue"))
            .top(10)
            .apply("groupby((statecode))")
            .count(true);

        let params = query.to_query_params().unwrap();
        let names: Vec<&str> = params.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            names,
            vec!["$select", "$filter", "$expand", "$orderby", "$top", "$apply", "$count"]
        );
        assert_eq!(params[0].1, "name,revenue");
        assert_eq!(params[2].1, "primarycontactid($select=fullname)");
        assert_eq!(params[3].1, "revenue desc");
    }

    #[test]
    fn test_raw_expand_is_appended() {
        let query = Query::new()
            .expand(Expand::new("a"))
            .expand_raw("b($select=x)");
        let params = query.to_query_params().unwrap();
        assert_eq!(params, vec![("$expand".to_string(), "a,b($select=x)".to_string())]);
    }

    #[test]
    fn test_page_size_header() {
        let query = Query::new().page_size(250);
        assert_eq!(
            query.headers(),
            vec![("Prefer".to_string(), "odata.maxpagesize=250".to_string())]
        );
        assert!(query.to_query_params().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_expand_propagates() {
        let query = Query::new().expand(
            Expand::new("a").orderby(OrderBy::asc("x")).expand(Expand::new("b")),
        );
        assert!(query.to_query_params().is_err());
    }
}
