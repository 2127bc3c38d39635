//! Error types for Google Drive provider

use bridge_traits::error::BridgeError;
use core_auth::AccessErrorKind;
use thiserror::Error;

/// Google Drive provider errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GoogleDriveError {
    /// Listing endpoint answered with a non-success status.
    ///
    /// This is the single failure surfaced by the authenticated listing; use
    /// [`GoogleDriveError::kind`] to classify it.
    #[error("Google Drive API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Google Drive request timed out: {0}")]
    Timeout(String),

    /// Drive handed back a page token it had already issued for this listing.
    #[error("Drive repeated page token after {pages} pages")]
    PaginationLoop { pages: usize },

    /// Public listing requested without a configured API key
    #[error("No API key configured for public listing")]
    MissingApiKey,
}

impl GoogleDriveError {
    /// Maps the error onto the access-layer taxonomy.
    pub fn kind(&self) -> AccessErrorKind {
        match self {
            GoogleDriveError::ApiError { status_code, .. } => match status_code {
                401 => AccessErrorKind::InvalidGrant,
                403 | 404 => AccessErrorKind::PermissionDenied,
                429 => AccessErrorKind::RateLimited,
                _ => AccessErrorKind::Unknown,
            },
            GoogleDriveError::NetworkError(_) => AccessErrorKind::NetworkFailure,
            GoogleDriveError::Timeout(_) => AccessErrorKind::Timeout,
            GoogleDriveError::MissingApiKey => AccessErrorKind::MissingCredential,
            GoogleDriveError::ParseError(_) | GoogleDriveError::PaginationLoop { .. } => {
                AccessErrorKind::Unknown
            }
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        self.kind() == AccessErrorKind::PermissionDenied
    }
}

impl From<BridgeError> for GoogleDriveError {
    fn from(error: BridgeError) -> Self {
        match error {
            BridgeError::Timeout(msg) => GoogleDriveError::Timeout(msg),
            other => GoogleDriveError::NetworkError(other.to_string()),
        }
    }
}

/// Result type for Google Drive operations
pub type Result<T> = std::result::Result<T, GoogleDriveError>;
