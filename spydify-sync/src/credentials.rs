//! Bearer credentials for Provider A
//!
//! Token acquisition (login, refresh) happens elsewhere; the fetcher only
//! asks for the current token before each attempt.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use std::path::PathBuf;

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Current bearer token
    async fn bearer_token(&self) -> SyncResult<String>;
}

/// Fixed token, mostly for tests and one-off runs
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl CredentialProvider for StaticToken {
    async fn bearer_token(&self) -> SyncResult<String> {
        if self.0.trim().is_empty() {
            return Err(SyncError::Credential("empty static token".to_string()));
        }
        Ok(self.0.clone())
    }
}

/// Token read from a file kept current by the login flow
///
/// Re-read on every call, so a refresh written mid-run is picked up by the
/// next request.
#[derive(Debug, Clone)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl CredentialProvider for TokenFile {
    async fn bearer_token(&self) -> SyncResult<String> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            SyncError::Credential(format!("cannot read {}: {}", self.path.display(), e))
        })?;

        let token = contents.trim();
        if token.is_empty() {
            return Err(SyncError::Credential(format!(
                "token file {} is empty",
                self.path.display()
            )));
        }
        Ok(token.to_string())
    }
}
