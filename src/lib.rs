//! # Gallery Access
//!
//! Entry point for hosts that render photo galleries out of Google Drive
//! folders. [`GalleryAccess`] wires the token broker and the Drive fetcher
//! around one process-wide [`RefreshGate`].
//!
//! The default `desktop-shims` feature supplies a `reqwest` based HTTP client.
//! Without it, the host injects its own through
//! [`GalleryAccessBuilder::http_client`].
//!
//! ```no_run
//! use gallery_access::GalleryAccess;
//! use core_auth::InMemoryCredentialStore;
//! use core_runtime::config::AccessConfig;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let access = GalleryAccess::builder(AccessConfig::from_env()?)
//!     .credential_store(Arc::new(InMemoryCredentialStore::new()))
//!     .build()?;
//!
//! let photos = access.list("1AbCdEfGh", Some(&"owner-1".into())).await?;
//! # Ok(())
//! # }
//! ```

use bridge_traits::http::HttpClient;
use bridge_traits::time::{Clock, SystemClock};
use core_auth::{CredentialStore, PrincipalId, RefreshGate, TokenBroker, TokenEndpoint};
use core_runtime::config::AccessConfig;
use core_runtime::events::EventBus;
use core_runtime::{Error, Result};
use provider_google_drive::{DriveFetcher, FolderListing, Photo};
use std::sync::Arc;
use tracing::info;

pub use bridge_traits;
pub use core_auth;
pub use core_runtime;
pub use provider_google_drive;

/// Process-wide access layer handle. Cheap to clone.
#[derive(Clone)]
pub struct GalleryAccess {
    broker: Arc<TokenBroker>,
    fetcher: Arc<DriveFetcher>,
    event_bus: EventBus,
}

impl GalleryAccess {
    pub fn builder(config: AccessConfig) -> GalleryAccessBuilder {
        GalleryAccessBuilder {
            config,
            store: None,
            http_client: None,
            event_bus: None,
            clock: None,
        }
    }

    /// Lists the photos of a folder, see [`DriveFetcher::list`].
    pub async fn list(
        &self,
        folder_id: &str,
        principal: Option<&PrincipalId>,
    ) -> provider_google_drive::Result<Vec<Photo>> {
        self.fetcher.list(folder_id, principal).await
    }

    pub async fn list_detailed(
        &self,
        folder_id: &str,
        principal: Option<&PrincipalId>,
    ) -> provider_google_drive::Result<FolderListing> {
        self.fetcher.list_detailed(folder_id, principal).await
    }

    /// Resolves an access token for `principal`; `None` when unavailable.
    pub async fn resolve_token(&self, principal: &PrincipalId) -> Option<String> {
        self.broker.resolve(principal).await
    }

    pub fn broker(&self) -> &Arc<TokenBroker> {
        &self.broker
    }

    pub fn fetcher(&self) -> &Arc<DriveFetcher> {
        &self.fetcher
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }
}

pub struct GalleryAccessBuilder {
    config: AccessConfig,
    store: Option<Arc<dyn CredentialStore>>,
    http_client: Option<Arc<dyn HttpClient>>,
    event_bus: Option<EventBus>,
    clock: Option<Arc<dyn Clock>>,
}

impl GalleryAccessBuilder {
    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    pub fn event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<GalleryAccess> {
        self.config.validate()?;

        let store = self.store.ok_or_else(|| {
            Error::capability_missing("CredentialStore", "a credential store is required")
        })?;
        let http_client = match self.http_client {
            Some(http_client) => http_client,
            None => default_http_client()?,
        };
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let event_bus = self.event_bus.unwrap_or_default();

        let gate = RefreshGate::new(&self.config.refresh);
        let mut broker = TokenBroker::new(store, gate, &self.config.refresh, Arc::clone(&clock))
            .with_event_bus(event_bus.clone());
        if let Some(oauth) = self.config.oauth.clone() {
            broker = broker.with_endpoint(
                TokenEndpoint::new(Arc::clone(&http_client), oauth, clock)
                    .with_request_timeout(self.config.refresh.call_timeout),
            );
        }
        let broker = Arc::new(broker);

        let fetcher = DriveFetcher::new(http_client, &self.config, broker.clone())
            .with_event_bus(event_bus.clone());

        info!(
            public_listing = self.config.has_api_key(),
            oauth_refresh = self.config.has_oauth_client(),
            "Gallery access initialized"
        );

        Ok(GalleryAccess {
            broker,
            fetcher: Arc::new(fetcher),
            event_bus,
        })
    }
}

#[cfg(feature = "desktop-shims")]
fn default_http_client() -> Result<Arc<dyn HttpClient>> {
    let client = bridge_desktop::ReqwestHttpClient::new()
        .map_err(|e| Error::capability_missing("HttpClient", e.to_string()))?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(Error::capability_missing(
        "HttpClient",
        "enable the `desktop-shims` feature or inject an HttpClient",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_auth::InMemoryCredentialStore;

    fn config() -> AccessConfig {
        AccessConfig::builder()
            .api_key("public-key")
            .oauth_client("client-id", "client-secret")
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_requires_store() {
        let result = GalleryAccess::builder(config()).build();
        assert!(matches!(result, Err(Error::CapabilityMissing { .. })));
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_desktop_shims_supply_http_client() {
        let access = GalleryAccess::builder(config())
            .credential_store(Arc::new(InMemoryCredentialStore::new()))
            .build();
        assert!(access.is_ok());
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_missing_http_client_without_shims() {
        let result = GalleryAccess::builder(config())
            .credential_store(Arc::new(InMemoryCredentialStore::new()))
            .build();
        assert!(matches!(
            result,
            Err(Error::CapabilityMissing { ref capability, .. }) if capability == "HttpClient"
        ));
    }
}
