//! Credential resolution.

use aicp_core::AccessContext;
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised while resolving a credential. Surfaced before any policy or
/// SQL logic runs.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No active user holds this credential.
    #[error("invalid key or user inactive")]
    InvalidCredential,

    /// The stored role is not one of the supported roles.
    #[error("unsupported role '{0}'")]
    UnsupportedRole(String),

    /// The backing store could not be queried.
    #[error("access lookup failed: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Maps an opaque credential to an access context.
#[async_trait]
pub trait AccessResolver: Send + Sync {
    async fn resolve(&self, credential: &str) -> Result<AccessContext, AuthError>;
}

/// In-memory resolver keyed by credential.
#[derive(Debug, Clone, Default)]
pub struct StaticAccessResolver {
    users: HashMap<String, AccessContext>,
}

impl StaticAccessResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, credential: impl Into<String>, ctx: AccessContext) -> Self {
        self.users.insert(credential.into(), ctx);
        self
    }
}

#[async_trait]
impl AccessResolver for StaticAccessResolver {
    async fn resolve(&self, credential: &str) -> Result<AccessContext, AuthError> {
        self.users
            .get(credential.trim())
            .cloned()
            .ok_or(AuthError::InvalidCredential)
    }
}
