//! # Token Broker
//!
//! Turns a principal's long-lived refresh credential into a short-lived
//! access token.
//!
//! ## Resolution
//!
//! 1. Load the credential. A cached access token with more than the expiry
//!    margin left is returned without any network call.
//! 2. No refresh token, or status revoked/expired: no token.
//! 3. Otherwise run one deduplicated refresh through the process-wide
//!    [`RefreshGate`]: every attempt takes a rate-window slot, is bounded by
//!    the call timeout and retried with exponential backoff.
//! 4. On success the new token is persisted before any joined caller sees it.
//! 5. On failure nothing is written. The refresh token in particular is
//!    never cleared, because `invalid_grant` cannot be told apart from a
//!    transient provider error.
//!
//! [`TokenBroker::resolve`] never fails; the cause of a missing token is
//! logged, published on the event bus, and available through
//! [`TokenBroker::resolve_state`].
//!
//! ## Usage
//!
//! ```no_run
//! use core_auth::{InMemoryCredentialStore, RefreshGate, TokenBroker, TokenEndpoint};
//! use bridge_traits::{http::HttpClient, time::SystemClock};
//! use core_runtime::config::AccessConfig;
//! use std::sync::Arc;
//!
//! # async fn example(http_client: Arc<dyn HttpClient>) {
//! let config = AccessConfig::builder()
//!     .oauth_client("client-id", "client-secret")
//!     .build()
//!     .unwrap();
//! let clock = Arc::new(SystemClock);
//! let gate = RefreshGate::new(&config.refresh);
//!
//! let broker = TokenBroker::new(
//!     Arc::new(InMemoryCredentialStore::new()),
//!     gate,
//!     &config.refresh,
//!     clock.clone(),
//! )
//! .with_endpoint(TokenEndpoint::new(http_client, config.oauth.unwrap(), clock));
//!
//! let token: Option<String> = broker.resolve(&"owner-1".into()).await;
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::gate::RefreshGate;
use crate::oauth::TokenEndpoint;
use crate::retry::RetryExecutor;
use crate::state::RefreshState;
use crate::store::CredentialStore;
use crate::types::{PrincipalId, TokenGrant};
use async_trait::async_trait;
use bridge_traits::time::Clock;
use core_runtime::config::RefreshPolicy;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Source of bearer tokens for authenticated provider calls.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    /// Returns a valid access token, or `None` when none can be obtained.
    async fn access_token(&self, principal: &PrincipalId) -> Option<String>;
}

pub struct TokenBroker {
    store: Arc<dyn CredentialStore>,
    endpoint: Option<Arc<TokenEndpoint>>,
    gate: Arc<RefreshGate>,
    retry: Arc<RetryExecutor>,
    clock: Arc<dyn Clock>,
    expiry_margin: Duration,
    event_bus: EventBus,
}

impl TokenBroker {
    /// Creates a broker without a token endpoint; attach one with
    /// [`with_endpoint`](Self::with_endpoint) to enable refreshes.
    pub fn new(
        store: Arc<dyn CredentialStore>,
        gate: Arc<RefreshGate>,
        policy: &RefreshPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let retry =
            RetryExecutor::from_policy(policy).with_rate_window(Arc::clone(gate.rate_window()));

        Self {
            store,
            endpoint: None,
            gate,
            retry: Arc::new(retry),
            clock,
            expiry_margin: policy.expiry_margin,
            event_bus: EventBus::default(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: TokenEndpoint) -> Self {
        self.endpoint = Some(Arc::new(endpoint));
        self
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = event_bus;
        self
    }

    /// Resolves an access token for `principal`. Never fails.
    pub async fn resolve(&self, principal: &PrincipalId) -> Option<String> {
        self.resolve_state(principal).await.into_token()
    }

    /// Drives the refresh state machine to a terminal state.
    #[instrument(skip(self, principal), fields(principal_id = %principal))]
    pub async fn resolve_state(&self, principal: &PrincipalId) -> RefreshState {
        let credential = match self.store.load(principal).await {
            Ok(credential) => credential,
            Err(error) => {
                warn!(error = %error, "Failed to load credential");
                return RefreshState::Failed(error);
            }
        };

        let state =
            RefreshState::evaluate(credential.as_ref(), self.clock.now(), self.expiry_margin);

        match &state {
            RefreshState::Cached(_) => debug!("Using cached access token"),
            RefreshState::Failed(error) => {
                info!(reason = %error, "No token available for principal")
            }
            _ => {}
        }

        let refresh_token = match &state {
            RefreshState::Refreshing { refresh_token } => refresh_token.clone(),
            _ => return state,
        };

        let Some(endpoint) = self.endpoint.as_ref() else {
            warn!("Access token needs a refresh but no OAuth client is configured");
            return state.complete(Err(AuthError::MissingCredential(
                "no OAuth client configured".to_string(),
            )));
        };

        let outcome = self
            .refresh_shared(principal, Arc::clone(endpoint), refresh_token)
            .await;

        if let Err(error) = &outcome {
            warn!(
                kind = %error.kind(),
                error = %error,
                "Token refresh failed, credential left untouched"
            );
        }

        state.complete(outcome)
    }

    /// Starts or joins the refresh for `refresh_token`.
    ///
    /// Persistence and event emission happen inside the shared future, so
    /// they run once no matter how many callers joined.
    async fn refresh_shared(
        &self,
        principal: &PrincipalId,
        endpoint: Arc<TokenEndpoint>,
        refresh_token: String,
    ) -> Result<TokenGrant> {
        let retry = Arc::clone(&self.retry);
        let store = Arc::clone(&self.store);
        let event_bus = self.event_bus.clone();
        let principal = principal.clone();
        let key = refresh_token.clone();

        self.gate
            .deduplicator()
            .run(&key, move || async move {
                let outcome = retry
                    .execute(|_| {
                        let endpoint = Arc::clone(&endpoint);
                        let refresh_token = refresh_token.clone();
                        async move { endpoint.refresh(&refresh_token).await }
                    })
                    .await;

                match outcome {
                    Ok(grant) => {
                        if let Err(error) = store.save_refreshed(&principal, &grant).await {
                            warn!(
                                principal_id = %principal,
                                error = %error,
                                "Refreshed token could not be persisted"
                            );
                        }

                        info!(
                            principal_id = %principal,
                            expires_at = %grant.expires_at,
                            "Access token refreshed"
                        );
                        let _ = event_bus.emit(CoreEvent::Auth(AuthEvent::TokenRefreshed {
                            principal_id: principal.to_string(),
                            expires_at: grant.expires_at.timestamp(),
                        }));
                        Ok(grant)
                    }
                    Err(error) => {
                        let _ = event_bus.emit(CoreEvent::Auth(AuthEvent::TokenRefreshFailed {
                            principal_id: principal.to_string(),
                            kind: error.kind().to_string(),
                            reconnect_required: error.reconnect_required(),
                        }));
                        Err(error)
                    }
                }
            })
            .await
    }
}

#[async_trait]
impl AccessTokenSource for TokenBroker {
    async fn access_token(&self, principal: &PrincipalId) -> Option<String> {
        self.resolve(principal).await
    }
}
