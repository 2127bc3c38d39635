//! # Authentication Module
//!
//! Resolves short-lived access tokens from long-lived provider credentials.
//!
//! ## Overview
//!
//! - [`TokenBroker`]: cached-or-refreshed access tokens, never failing
//! - [`RefreshGate`]: process-wide [`RateWindow`] plus [`RefreshDeduplicator`]
//! - [`RetryExecutor`]: per-call timeout with exponential backoff
//! - [`TokenEndpoint`]: the OAuth 2.0 refresh grant
//! - [`CredentialStore`]: persistence contract implemented by the host
//! - [`RefreshState`]: the per-credential state machine behind the broker

pub mod broker;
pub mod dedup;
pub mod error;
pub mod gate;
pub mod oauth;
pub mod rate_window;
pub mod retry;
pub mod state;
pub mod store;
pub mod types;

pub use broker::{AccessTokenSource, TokenBroker};
pub use dedup::RefreshDeduplicator;
pub use error::{AccessErrorKind, AuthError, Result};
pub use gate::RefreshGate;
pub use oauth::TokenEndpoint;
pub use rate_window::RateWindow;
pub use retry::RetryExecutor;
pub use state::RefreshState;
pub use store::{CredentialStore, InMemoryCredentialStore};
pub use types::{AuthStatus, Credential, PrincipalId, TokenGrant};
