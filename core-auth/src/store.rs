//! Credential Persistence
//!
//! The broker reads and writes credentials through [`CredentialStore`], which
//! the host implements on top of its profile storage. The broker only ever
//! writes after a successful refresh and never deletes a refresh token.

use crate::error::{AuthError, Result};
use crate::types::{Credential, PrincipalId, TokenGrant};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Profile-store collaborator holding one credential per principal.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Loads the credential on file, or `None` if the principal never linked an account.
    async fn load(&self, principal: &PrincipalId) -> Result<Option<Credential>>;

    /// Persists a successful refresh.
    ///
    /// Implementations write the access token, its expiry and
    /// `AuthStatus::Active`, and replace the refresh token only when
    /// `grant.refresh_token` is present.
    async fn save_refreshed(&self, principal: &PrincipalId, grant: &TokenGrant) -> Result<()>;
}

/// Process-local [`CredentialStore`] for tests and single-process hosts.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    credentials: RwLock<HashMap<PrincipalId, Credential>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the credential for a principal.
    pub async fn insert(&self, principal: impl Into<PrincipalId>, credential: Credential) {
        self.credentials
            .write()
            .await
            .insert(principal.into(), credential);
    }

    /// Returns a snapshot of the stored credential.
    pub async fn get(&self, principal: &PrincipalId) -> Option<Credential> {
        self.credentials.read().await.get(principal).cloned()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn load(&self, principal: &PrincipalId) -> Result<Option<Credential>> {
        Ok(self.get(principal).await)
    }

    async fn save_refreshed(&self, principal: &PrincipalId, grant: &TokenGrant) -> Result<()> {
        let mut credentials = self.credentials.write().await;
        let credential = credentials.get_mut(principal).ok_or_else(|| {
            AuthError::Storage(format!("No credential on file for principal {}", principal))
        })?;

        credential.apply_grant(grant);
        debug!(
            principal_id = %principal,
            rotated = grant.refresh_token.is_some(),
            "Stored refreshed credential"
        );
        Ok(())
    }
}
