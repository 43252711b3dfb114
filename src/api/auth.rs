//! Bearer token plumbing
//!
//! Token acquisition (client credentials, device code, ...) is left to an OAuth
//! library of the caller's choice; the client only asks a [`TokenProvider`] for
//! a token before every request.

use crate::error::{DataverseError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Source of bearer tokens for the Dataverse resource
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// A token that was acquired up front
#[derive(Clone)]
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticToken").field("token", &"<redacted>").finish()
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String> {
        if self.token.is_empty() {
            return Err(DataverseError::Auth("Access token is empty".to_string()));
        }
        Ok(self.token.clone())
    }
}

#[async_trait]
impl<T: TokenProvider + ?Sized> TokenProvider for Arc<T> {
    async fn access_token(&self) -> Result<String> {
        (**self).access_token().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_token() {
        let provider = StaticToken::new("abc123");
        assert_eq!(provider.access_token().await.unwrap(), "abc123");
    }

    #[tokio::test]
    async fn test_empty_token_is_rejected() {
        let provider = StaticToken::new("");
        assert!(matches!(provider.access_token().await, Err(DataverseError::Auth(_))));
    }

    #[test]
    fn test_debug_redacts_token() {
        let provider = StaticToken::new("secret");
        assert!(!format!("{:?}", provider).contains("secret"));
    }
}
