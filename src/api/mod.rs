//! Dataverse Web API access
//!
//! [`DataverseClient`] sends requests; the submodules build what goes into
//! them (query options, `$batch` bodies, row keys) and decode what comes back.

pub mod auth;
pub mod batch;
pub mod client;
pub mod constants;
pub mod keys;
pub mod query;
pub mod resilience;

pub use auth::{StaticToken, TokenProvider};
pub use batch::{BatchCommand, BatchOptions, BatchResponseItem, RequestMethod, Row};
pub use client::{DataverseClient, Payload};
pub use keys::KeyColumns;
pub use query::{Direction, Expand, Filter, FilterValue, OrderBy, Query, QueryResponse};
pub use resilience::{RateLimitConfig, RateLimiter, ResilienceConfig, RetryConfig, RetryPolicy};
