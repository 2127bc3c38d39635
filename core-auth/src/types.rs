use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Identifier of the account that owns a linked storage folder.
///
/// # Examples
///
/// ```
/// use core_auth::PrincipalId;
///
/// let principal = PrincipalId::new("owner-42");
/// assert_eq!(principal.as_str(), "owner-42");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(String);

impl PrincipalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PrincipalId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PrincipalId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Provider-side state of a credential as last recorded by the profile store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    Active,
    Expired,
    Revoked,
    #[default]
    Unknown,
}

impl AuthStatus {
    /// Statuses for which the broker never attempts a refresh.
    pub fn blocks_refresh(&self) -> bool {
        matches!(self, AuthStatus::Expired | AuthStatus::Revoked)
    }
}

/// Refresh/access token pair associated with a principal.
///
/// The `Debug` implementation redacts both tokens.
///
/// # Examples
///
/// ```
/// use core_auth::{AuthStatus, Credential};
/// use chrono::{Duration, Utc};
///
/// let credential = Credential::with_refresh_token("1//0g...")
///     .with_access_token("ya29.a0...", Utc::now() + Duration::hours(1));
///
/// assert_eq!(credential.auth_status, AuthStatus::Active);
/// assert!(!format!("{:?}", credential).contains("ya29"));
/// ```
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    /// Long-lived provider-issued secret; present only after consent
    pub refresh_token: Option<String>,
    /// Short-lived cached access token
    pub access_token: Option<String>,
    pub access_token_expiry: Option<DateTime<Utc>>,
    pub auth_status: AuthStatus,
}

impl Credential {
    /// A freshly linked credential with no cached access token.
    pub fn with_refresh_token(refresh_token: impl Into<String>) -> Self {
        Self {
            refresh_token: Some(refresh_token.into()),
            access_token: None,
            access_token_expiry: None,
            auth_status: AuthStatus::Active,
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>, expiry: DateTime<Utc>) -> Self {
        self.access_token = Some(token.into());
        self.access_token_expiry = Some(expiry);
        self
    }

    pub fn with_status(mut self, status: AuthStatus) -> Self {
        self.auth_status = status;
        self
    }

    /// Returns the cached access token if more than `margin` remains before expiry.
    pub fn cached_token(&self, now: DateTime<Utc>, margin: Duration) -> Option<&str> {
        let token = self.access_token.as_deref()?;
        let expiry = self.access_token_expiry?;

        match (expiry - now).to_std() {
            Ok(remaining) if remaining > margin => Some(token),
            _ => None,
        }
    }

    /// Writes a successful refresh into the credential.
    ///
    /// The refresh token is only replaced when the provider rotated it.
    pub fn apply_grant(&mut self, grant: &TokenGrant) {
        self.access_token = Some(grant.access_token.clone());
        self.access_token_expiry = Some(grant.expires_at);
        self.auth_status = AuthStatus::Active;
        if let Some(rotated) = &grant.refresh_token {
            self.refresh_token = Some(rotated.clone());
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("access_token_expiry", &self.access_token_expiry)
            .field("auth_status", &self.auth_status)
            .finish()
    }
}

/// Result of a successful refresh grant.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    /// Present only when the provider rotated the refresh token
    pub refresh_token: Option<String>,
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("rotated", &self.refresh_token.is_some())
            .finish()
    }
}
