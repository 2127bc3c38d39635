use bridge_traits::error::BridgeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure while resolving an access token.
///
/// `Clone` is required because every caller joined onto a deduplicated
/// refresh receives its own copy of the same outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("No usable refresh credential: {0}")]
    MissingCredential(String),

    #[error("Token endpoint rejected the grant ({code}): {}", .description.as_deref().unwrap_or("no description"))]
    InvalidGrant {
        code: String,
        description: Option<String>,
    },

    #[error("Token endpoint rate limited the request: {0}")]
    RateLimited(String),

    #[error("Token endpoint call timed out: {0}")]
    Timeout(String),

    #[error("Network failure while refreshing token: {0}")]
    NetworkFailure(String),

    #[error("Credential storage error: {0}")]
    Storage(String),

    #[error("Token refresh failed: {0}")]
    Unknown(String),
}

impl AuthError {
    /// Maps the error onto the access-layer taxonomy.
    pub fn kind(&self) -> AccessErrorKind {
        match self {
            AuthError::MissingCredential(_) => AccessErrorKind::MissingCredential,
            AuthError::InvalidGrant { .. } => AccessErrorKind::InvalidGrant,
            AuthError::RateLimited(_) => AccessErrorKind::RateLimited,
            AuthError::Timeout(_) => AccessErrorKind::Timeout,
            AuthError::NetworkFailure(_) => AccessErrorKind::NetworkFailure,
            AuthError::Storage(_) | AuthError::Unknown(_) => AccessErrorKind::Unknown,
        }
    }

    /// Whether the principal most likely has to grant access again.
    ///
    /// An `invalid_grant` may also be a transient provider glitch, so this is
    /// a hint for the host and never a reason to discard the credential.
    pub fn reconnect_required(&self) -> bool {
        matches!(
            self,
            AuthError::MissingCredential(_) | AuthError::InvalidGrant { .. }
        )
    }
}

impl From<BridgeError> for AuthError {
    fn from(error: BridgeError) -> Self {
        match error {
            BridgeError::Timeout(msg) => AuthError::Timeout(msg),
            BridgeError::Network(msg) => AuthError::NetworkFailure(msg),
            other => AuthError::Unknown(other.to_string()),
        }
    }
}

/// Error taxonomy shared by the token broker and the folder fetcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessErrorKind {
    MissingCredential,
    /// Revoked, or a transient provider glitch; the two are indistinguishable
    InvalidGrant,
    RateLimited,
    Timeout,
    NetworkFailure,
    /// The listing endpoint was reachable but refused access
    PermissionDenied,
    Unknown,
}

impl AccessErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessErrorKind::MissingCredential => "missing_credential",
            AccessErrorKind::InvalidGrant => "invalid_grant",
            AccessErrorKind::RateLimited => "rate_limited",
            AccessErrorKind::Timeout => "timeout",
            AccessErrorKind::NetworkFailure => "network_failure",
            AccessErrorKind::PermissionDenied => "permission_denied",
            AccessErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for AccessErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
