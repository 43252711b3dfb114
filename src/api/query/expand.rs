//! `$expand` clauses over navigation properties

use super::orderby::{OrderBy, orderby_string};
use crate::error::{DataverseError, Result};

/// Expansion of one navigation property, optionally with its own query options
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expand {
    pub table: String,
    pub select: Vec<String>,
    pub filter: Option<String>,
    pub orderby: Vec<OrderBy>,
    pub top: Option<u32>,
    pub expand: Vec<Expand>,
}

impl Expand {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn filter(mut self, filter: impl ToString) -> Self {
        self.filter = Some(filter.to_string());
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

    pub fn expand(mut self, nested: Expand) -> Self {
        self.expand.push(nested);
        self
    }

    /// Render as `table($select=..;$filter=..;$orderby=..;$top=..;$expand=..)`.
    ///
    /// Dataverse rejects `$orderby` alongside a nested `$expand`, on either level.
    pub fn to_odata_string(&self) -> Result<String> {
        if !self.expand.is_empty()
            && (!self.orderby.is_empty() || self.expand.iter().any(|e| !e.orderby.is_empty()))
        {
            return Err(DataverseError::validation(format!(
                "Cannot use orderby with nested expand on '{}'",
                self.table
            )));
        }

        let mut options = Vec::new();
        if !self.select.is_empty() {
            options.push(format!("$select={}", self.select.join(",")));
        }
        if let Some(filter) = &self.filter {
            options.push(format!("$filter={}", filter));
        }
        if let Some(orderby) = orderby_string(&self.orderby) {
            options.push(format!("$orderby={}", orderby));
        }
        if let Some(top) = self.top {
            options.push(format!("$top={}", top));
        }
        if !self.expand.is_empty() {
            options.push(format!("$expand={}", expand_string(&self.expand)?));
        }

        if options.is_empty() {
            Ok(self.table.clone())
        } else {
            Ok(format!("{}({})", self.table, options.join(";")))
        }
    }
}

/// Comma-join several expansions
pub fn expand_string(expands: &[Expand]) -> Result<String> {
    let parts = expands
        .iter()
        .map(Expand::to_odata_string)
        .collect::<Result<Vec<_>>>()?;
    Ok(parts.join(","))
}
