//! Typed client for the Microsoft Dataverse Web API
//!
//! ```no_run
//! use dataverse_api::{DataverseClient, Filter, Query, StaticToken};
//!
//! # async fn run() -> dataverse_api::Result<()> {
//! let client = DataverseClient::new("https://org.crm4.dynamics.com", StaticToken::new("<token>"))?;
//! let accounts = client.entity("account").await?;
//! let rows = accounts
//!     .read(&Query::new().select(["name"]).filter(Filter::eq("statecode", 0)).top(10))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod entity;
pub mod error;
pub mod metadata;
pub mod schema;

pub use api::{
    BatchCommand, BatchOptions, DataverseClient, Expand, Filter, FilterValue, KeyColumns, OrderBy, Query,
    StaticToken, TokenProvider,
};
pub use config::ClientConfig;
pub use entity::{DataverseEntity, ImageFile, to_rows};
pub use error::{DataverseError, Result};
pub use schema::{EntitySchema, WriteMode};
