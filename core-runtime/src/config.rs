//! # Access Configuration
//!
//! Configuration for the provider access layer.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct an
//! [`AccessConfig`]. The builder enforces fail-fast validation so that a
//! misconfigured process refuses to start instead of failing on the first
//! gallery request.
//!
//! ## Settings
//!
//! - API key for anonymous listing of public folders (optional)
//! - OAuth client id/secret for the refresh grant (optional)
//! - Drive API base URL and page size
//! - [`RefreshPolicy`]: rate window, dedup window, expiry margin, retry budget
//!
//! A missing API key disables the public listing strategy. A missing OAuth
//! client disables token refresh, so only still-valid cached tokens are used.
//!
//! ## Usage
//!
//! ```
//! use core_runtime::config::AccessConfig;
//!
//! let config = AccessConfig::builder()
//!     .api_key("server-api-key")
//!     .oauth_client("client-id", "client-secret")
//!     .build()
//!     .expect("valid config");
//!
//! assert_eq!(config.refresh.rate_ceiling, 10);
//! ```
//!
//! ### From the environment
//!
//! ```no_run
//! use core_runtime::config::AccessConfig;
//!
//! let config = AccessConfig::from_env().expect("valid config");
//! ```

use crate::error::{Error, Result};
use std::fmt;
use std::time::Duration;

/// Default Drive API v3 base URL
pub const DEFAULT_DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Default OAuth token endpoint
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Maximum page size accepted by the Drive listing endpoint
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Environment variable names read by [`AccessConfig::from_env`].
pub mod env {
    pub const API_KEY: &str = "GOOGLE_API_KEY";
    pub const CLIENT_ID: &str = "GOOGLE_CLIENT_ID";
    pub const CLIENT_SECRET: &str = "GOOGLE_CLIENT_SECRET";
    pub const TOKEN_URL: &str = "GOOGLE_TOKEN_URL";
    pub const DRIVE_API_BASE: &str = "GOOGLE_DRIVE_API_BASE";
}

/// OAuth client credentials used for the refresh grant.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Token endpoint URL
    pub token_url: String,
}

impl fmt::Debug for OAuthClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthClientConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("token_url", &self.token_url)
            .finish()
    }
}

/// Timing and budget knobs for the token refresh path.
///
/// The defaults are the provider-facing limits the broker was designed
/// around; tests shrink them to keep virtual-time runs short.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    /// Rolling window over which outbound refresh calls are counted
    pub rate_window: Duration,
    /// Maximum refresh calls allowed inside one window, process-wide
    pub rate_ceiling: usize,
    /// Extra wait after the oldest call leaves the window
    pub rate_margin: Duration,
    /// Age after which a pending refresh is considered lost
    pub dedup_window: Duration,
    /// A cached token is reused only while it has more than this left
    pub expiry_margin: Duration,
    /// Timeout for a single call to the token endpoint
    pub call_timeout: Duration,
    /// Additional attempts after the first one fails
    pub max_retries: u32,
    /// First backoff delay; doubled for every further attempt
    pub base_delay: Duration,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            rate_window: Duration::from_secs(60),
            rate_ceiling: 10,
            rate_margin: Duration::from_millis(100),
            dedup_window: Duration::from_secs(5),
            expiry_margin: Duration::from_secs(5 * 60),
            call_timeout: Duration::from_secs(10),
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RefreshPolicy {
    /// Validates the policy
    pub fn validate(&self) -> Result<()> {
        if self.rate_ceiling == 0 {
            return Err(Error::Config(
                "Refresh rate ceiling must be greater than 0".to_string(),
            ));
        }

        if self.rate_window.is_zero() {
            return Err(Error::Config(
                "Refresh rate window must be longer than 0s".to_string(),
            ));
        }

        if self.dedup_window.is_zero() {
            return Err(Error::Config(
                "Refresh dedup window must be longer than 0s".to_string(),
            ));
        }

        if self.call_timeout.is_zero() {
            return Err(Error::Config(
                "Token endpoint call timeout must be longer than 0s".to_string(),
            ));
        }

        if self.max_retries > 10 {
            return Err(Error::Config(
                "Refresh retry budget exceeds maximum of 10 additional attempts".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration for the access layer.
///
/// Use [`AccessConfigBuilder`] to construct instances.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessConfig {
    /// Server-held API key for anonymous listing of public folders
    pub api_key: Option<String>,

    /// OAuth client used to refresh principal credentials
    pub oauth: Option<OAuthClientConfig>,

    /// Drive API base URL (no trailing slash)
    pub drive_api_base: String,

    /// Page size requested from the listing endpoint
    pub page_size: u32,

    /// Width requested for generated thumbnail URLs
    pub thumbnail_width: u32,

    /// Refresh throttling, dedup and retry settings
    pub refresh: RefreshPolicy,
}

impl fmt::Debug for AccessConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("oauth", &self.oauth)
            .field("drive_api_base", &self.drive_api_base)
            .field("page_size", &self.page_size)
            .field("thumbnail_width", &self.thumbnail_width)
            .field("refresh", &self.refresh)
            .finish()
    }
}

impl AccessConfig {
    /// Creates a new builder for constructing an `AccessConfig`.
    pub fn builder() -> AccessConfigBuilder {
        AccessConfigBuilder::default()
    }

    /// Builds a configuration from process environment variables.
    ///
    /// See [`env`] for the variable names. Unset variables leave the
    /// corresponding capability disabled.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mut builder = Self::builder();

        if let Some(key) = non_empty(env::API_KEY) {
            builder = builder.api_key(key);
        }

        match (non_empty(env::CLIENT_ID), non_empty(env::CLIENT_SECRET)) {
            (Some(id), Some(secret)) => builder = builder.oauth_client(id, secret),
            (Some(_), None) | (None, Some(_)) => {
                return Err(Error::Config(format!(
                    "{} and {} must be set together",
                    env::CLIENT_ID,
                    env::CLIENT_SECRET
                )))
            }
            (None, None) => {}
        }

        if let Some(url) = non_empty(env::TOKEN_URL) {
            builder = builder.token_url(url);
        }

        if let Some(base) = non_empty(env::DRIVE_API_BASE) {
            builder = builder.drive_api_base(base);
        }

        builder.build()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if let Some(key) = &self.api_key {
            if key.trim().is_empty() {
                return Err(Error::Config("API key cannot be empty".to_string()));
            }
        }

        if let Some(oauth) = &self.oauth {
            if oauth.client_id.trim().is_empty() {
                return Err(Error::Config("OAuth client id cannot be empty".to_string()));
            }
            if oauth.client_secret.trim().is_empty() {
                return Err(Error::Config(
                    "OAuth client secret cannot be empty".to_string(),
                ));
            }
            validate_url("Token URL", &oauth.token_url)?;
        }

        validate_url("Drive API base", &self.drive_api_base)?;

        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(Error::Config(format!(
                "Page size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        if self.thumbnail_width == 0 {
            return Err(Error::Config(
                "Thumbnail width must be greater than 0".to_string(),
            ));
        }

        self.refresh.validate()
    }

    /// Whether the public (API key) listing strategy is available
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Whether the broker is able to refresh tokens
    pub fn has_oauth_client(&self) -> bool {
        self.oauth.is_some()
    }
}

fn validate_url(label: &str, url: &str) -> Result<()> {
    if url.starts_with("https://") || url.starts_with("http://") {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "{} must be an http(s) URL, got '{}'",
            label, url
        )))
    }
}

/// Builder for constructing [`AccessConfig`] instances.
#[derive(Default)]
pub struct AccessConfigBuilder {
    api_key: Option<String>,
    client: Option<(String, String)>,
    token_url: Option<String>,
    drive_api_base: Option<String>,
    page_size: Option<u32>,
    thumbnail_width: Option<u32>,
    refresh: Option<RefreshPolicy>,
}

impl AccessConfigBuilder {
    /// Sets the server-held API key used for public folder listing.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the OAuth client used for the refresh grant.
    pub fn oauth_client(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.client = Some((client_id.into(), client_secret.into()));
        self
    }

    /// Overrides the token endpoint URL.
    pub fn token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = Some(url.into());
        self
    }

    /// Overrides the Drive API base URL.
    pub fn drive_api_base(mut self, base: impl Into<String>) -> Self {
        self.drive_api_base = Some(base.into());
        self
    }

    /// Sets the listing page size.
    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Sets the width used for generated thumbnail URLs.
    pub fn thumbnail_width(mut self, width: u32) -> Self {
        self.thumbnail_width = Some(width);
        self
    }

    /// Replaces the refresh policy.
    pub fn refresh_policy(mut self, policy: RefreshPolicy) -> Self {
        self.refresh = Some(policy);
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> Result<AccessConfig> {
        let token_url = self
            .token_url
            .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string());

        let config = AccessConfig {
            api_key: self.api_key,
            oauth: self
                .client
                .map(|(client_id, client_secret)| OAuthClientConfig {
                    client_id,
                    client_secret,
                    token_url,
                }),
            drive_api_base: self
                .drive_api_base
                .unwrap_or_else(|| DEFAULT_DRIVE_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            page_size: self.page_size.unwrap_or(MAX_PAGE_SIZE),
            thumbnail_width: self.thumbnail_width.unwrap_or(400),
            refresh: self.refresh.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AccessConfig::builder().build().unwrap();

        assert_eq!(config.api_key, None);
        assert_eq!(config.oauth, None);
        assert_eq!(config.drive_api_base, DEFAULT_DRIVE_API_BASE);
        assert_eq!(config.page_size, 1000);
        assert_eq!(config.refresh.rate_window, Duration::from_secs(60));
        assert_eq!(config.refresh.rate_ceiling, 10);
        assert_eq!(config.refresh.dedup_window, Duration::from_secs(5));
        assert_eq!(config.refresh.expiry_margin, Duration::from_secs(300));
        assert_eq!(config.refresh.call_timeout, Duration::from_secs(10));
        assert_eq!(config.refresh.max_retries, 3);
        assert_eq!(config.refresh.base_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_oauth_client_uses_default_token_url() {
        let config = AccessConfig::builder()
            .oauth_client("id", "secret")
            .build()
            .unwrap();

        let oauth = config.oauth.unwrap();
        assert_eq!(oauth.client_id, "id");
        assert_eq!(oauth.token_url, DEFAULT_TOKEN_URL);
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let config = AccessConfig::builder()
            .drive_api_base("http://localhost:8080/drive/v3/")
            .build()
            .unwrap();

        assert_eq!(config.drive_api_base, "http://localhost:8080/drive/v3");
    }

    #[test]
    fn test_rejects_invalid_page_size() {
        assert!(AccessConfig::builder().page_size(0).build().is_err());
        assert!(AccessConfig::builder().page_size(1001).build().is_err());
    }

    #[test]
    fn test_rejects_zero_ceiling() {
        let policy = RefreshPolicy {
            rate_ceiling: 0,
            ..RefreshPolicy::default()
        };

        let err = AccessConfig::builder()
            .refresh_policy(policy)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("ceiling")));
    }

    #[test]
    fn test_rejects_non_http_token_url() {
        let result = AccessConfig::builder()
            .oauth_client("id", "secret")
            .token_url("ftp://example.com/token")
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_empty_client_secret() {
        let result = AccessConfig::builder().oauth_client("id", " ").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (env::API_KEY, "key"),
            (env::CLIENT_ID, "id"),
            (env::CLIENT_SECRET, "secret"),
        ]
        .into_iter()
        .collect();

        let config =
            AccessConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap();

        assert!(config.has_api_key());
        assert!(config.has_oauth_client());
    }

    #[test]
    fn test_from_lookup_requires_client_pair() {
        let result = AccessConfig::from_lookup(|name| {
            (name == env::CLIENT_ID).then(|| "id".to_string())
        });

        assert!(result.is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = AccessConfig::builder()
            .api_key("very-secret-key")
            .oauth_client("id", "very-secret-client")
            .build()
            .unwrap();

        let debug = format!("{:?}", config);
        assert!(!debug.contains("very-secret-key"));
        assert!(!debug.contains("very-secret-client"));
        assert!(debug.contains("[REDACTED]"));
    }
}
