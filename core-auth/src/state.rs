//! Per-credential refresh state machine.
//!
//! ```text
//!                 ┌──────────┐
//!   evaluate ───▶ │  Cached  │                       (terminal)
//!       │         └──────────┘
//!       │         ┌──────────┐
//!       ├───────▶ │  Failed  │ ◀──────┐              (terminal)
//!       │         └──────────┘        │ complete(Err)
//!       │         ┌────────────┐      │
//!       └───────▶ │ Refreshing │ ─────┤
//!                 └────────────┘      │ complete(Ok)
//!                 ┌──────────┐        │
//!                 │ Resolved │ ◀──────┘              (terminal)
//!                 └──────────┘
//! ```

use crate::error::{AuthError, Result};
use crate::types::{Credential, TokenGrant};
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

#[derive(Clone, PartialEq, Eq)]
pub enum RefreshState {
    /// The stored access token is still valid beyond the expiry margin.
    Cached(String),
    /// A refresh must be performed with this refresh token.
    Refreshing { refresh_token: String },
    /// No token could be obtained.
    Failed(AuthError),
    /// A refresh produced a new access token.
    Resolved(String),
}

impl RefreshState {
    /// Entry transition, computed from the stored credential alone.
    pub fn evaluate(credential: Option<&Credential>, now: DateTime<Utc>, margin: Duration) -> Self {
        let Some(credential) = credential else {
            return Self::missing("no credential on file");
        };

        if let Some(token) = credential.cached_token(now, margin) {
            return Self::Cached(token.to_string());
        }

        if credential.auth_status.blocks_refresh() {
            return Self::missing(&format!(
                "credential marked {:?}",
                credential.auth_status
            ));
        }

        match &credential.refresh_token {
            Some(refresh_token) => Self::Refreshing {
                refresh_token: refresh_token.clone(),
            },
            None => Self::missing("no refresh token on file"),
        }
    }

    /// Applies the outcome of a refresh. Only `Refreshing` moves; terminal
    /// states are returned unchanged.
    pub fn complete(self, outcome: Result<TokenGrant>) -> Self {
        match self {
            Self::Refreshing { .. } => match outcome {
                Ok(grant) => Self::Resolved(grant.access_token),
                Err(error) => Self::Failed(error),
            },
            terminal => terminal,
        }
    }

    pub fn token(&self) -> Option<&str> {
        match self {
            Self::Cached(token) | Self::Resolved(token) => Some(token),
            _ => None,
        }
    }

    pub fn into_token(self) -> Option<String> {
        match self {
            Self::Cached(token) | Self::Resolved(token) => Some(token),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&AuthError> {
        match self {
            Self::Failed(error) => Some(error),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Cached(_) => "cached",
            Self::Refreshing { .. } => "refreshing",
            Self::Failed(_) => "failed",
            Self::Resolved(_) => "resolved",
        }
    }

    fn missing(reason: &str) -> Self {
        Self::Failed(AuthError::MissingCredential(reason.to_string()))
    }
}

impl fmt::Debug for RefreshState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(error) => f.debug_tuple("Failed").field(error).finish(),
            other => write!(f, "{}([REDACTED])", other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AccessErrorKind;
    use crate::types::AuthStatus;
    use chrono::Duration as ChronoDuration;

    const MARGIN: Duration = Duration::from_secs(300);

    #[test]
    fn test_fresh_token_is_cached() {
        let now = Utc::now();
        let credential =
            Credential::with_refresh_token("rt").with_access_token("at", now + ChronoDuration::hours(1));

        let state = RefreshState::evaluate(Some(&credential), now, MARGIN);
        assert_eq!(state, RefreshState::Cached("at".into()));
    }

    #[test]
    fn test_fresh_token_wins_even_without_refresh_token() {
        let now = Utc::now();
        let credential = Credential::default().with_access_token("at", now + ChronoDuration::hours(1));

        assert_eq!(
            RefreshState::evaluate(Some(&credential), now, MARGIN).token(),
            Some("at")
        );
    }

    #[test]
    fn test_expired_token_needs_refresh() {
        let now = Utc::now();
        let credential = Credential::with_refresh_token("rt")
            .with_access_token("at", now - ChronoDuration::minutes(10));

        let state = RefreshState::evaluate(Some(&credential), now, MARGIN);
        assert_eq!(
            state,
            RefreshState::Refreshing {
                refresh_token: "rt".into()
            }
        );
    }

    #[test]
    fn test_missing_or_blocked_credentials_fail() {
        let now = Utc::now();
        let cases = [
            None,
            Some(Credential::default()),
            Some(Credential::with_refresh_token("rt").with_status(AuthStatus::Revoked)),
            Some(Credential::with_refresh_token("rt").with_status(AuthStatus::Expired)),
        ];

        for credential in cases {
            let state = RefreshState::evaluate(credential.as_ref(), now, MARGIN);
            assert_eq!(
                state.error().map(AuthError::kind),
                Some(AccessErrorKind::MissingCredential)
            );
        }
    }

    #[test]
    fn test_complete_transitions() {
        let refreshing = || RefreshState::Refreshing {
            refresh_token: "rt".into(),
        };
        let grant = TokenGrant {
            access_token: "new".into(),
            expires_at: Utc::now(),
            refresh_token: None,
        };

        assert_eq!(
            refreshing().complete(Ok(grant.clone())),
            RefreshState::Resolved("new".into())
        );

        let failed = refreshing().complete(Err(AuthError::Timeout("10s".into())));
        assert_eq!(failed.error().map(AuthError::kind), Some(AccessErrorKind::Timeout));

        // Terminal states ignore further outcomes.
        assert_eq!(
            RefreshState::Cached("old".into()).complete(Ok(grant)),
            RefreshState::Cached("old".into())
        );
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let debug = format!("{:?}", RefreshState::Resolved("ya29.secret".into()));
        assert_eq!(debug, "resolved([REDACTED])");
    }
}
