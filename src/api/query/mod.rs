//! OData query options for reading table rows
//!
//! [`Query`] carries `$select`, `$filter`, `$expand`, `$orderby`, `$top`,
//! `$apply` and `$count`, plus the page size sent as a `Prefer` header.

pub mod expand;
pub mod filters;
pub mod orderby;
pub mod query;
pub mod result;

pub use expand::Expand;
pub use filters::{Filter, FilterValue};
pub use orderby::{Direction, OrderBy};
pub use query::Query;
pub use result::QueryResponse;
