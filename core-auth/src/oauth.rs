//! OAuth 2.0 Refresh Grant
//!
//! Performs exactly one `grant_type=refresh_token` call against the
//! provider's token endpoint and classifies the outcome. Throttling,
//! deduplication and retries are layered on top by the broker.

use crate::error::{AuthError, Result};
use crate::types::TokenGrant;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::time::Clock;
use core_runtime::config::OAuthClientConfig;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Fallback lifetime when the endpoint omits `expires_in`
const DEFAULT_EXPIRES_IN: u64 = 3600;

/// Upper bound applied to `expires_in` before date arithmetic
const MAX_EXPIRES_IN: u64 = 365 * 24 * 3600;

/// Grant error codes that point at the credential itself
const GRANT_ERROR_CODES: &[&str] = &["invalid_grant", "invalid_request"];

/// Token endpoint success payload
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
    #[serde(default)]
    refresh_token: Option<String>,
}

fn default_expires_in() -> u64 {
    DEFAULT_EXPIRES_IN
}

/// Token endpoint failure payload
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Client for the provider's token endpoint.
pub struct TokenEndpoint {
    http_client: Arc<dyn HttpClient>,
    client: OAuthClientConfig,
    clock: Arc<dyn Clock>,
    request_timeout: Option<Duration>,
}

impl TokenEndpoint {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        client: OAuthClientConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            http_client,
            client,
            clock,
            request_timeout: None,
        }
    }

    /// Asks the HTTP client to enforce `timeout` on every request as well.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Exchanges a refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidGrant`] for `invalid_grant` / `invalid_request`
    /// - [`AuthError::RateLimited`] for HTTP 429
    /// - [`AuthError::Timeout`] / [`AuthError::NetworkFailure`] for transport failures
    /// - [`AuthError::Unknown`] for anything else
    #[instrument(skip(self, refresh_token), fields(token_url = %self.client.token_url))]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant> {
        let params = [
            ("client_id", self.client.client_id.as_str()),
            ("client_secret", self.client.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let encoded = serde_urlencoded::to_string(&params[..])
            .map_err(|e| AuthError::Unknown(format!("Failed to encode token request: {}", e)))?;

        let mut request = HttpRequest::new(HttpMethod::Post, self.client.token_url.clone())
            .header("Accept", "application/json")
            .form(encoded);
        if let Some(timeout) = self.request_timeout {
            request = request.timeout(timeout);
        }

        let response = self.http_client.execute(request).await.map_err(|e| {
            warn!(error = %e, "Token endpoint unreachable");
            AuthError::from(e)
        })?;

        if response.is_success() {
            return self.parse_grant(&response);
        }

        Err(Self::classify_failure(&response))
    }

    fn parse_grant(&self, response: &HttpResponse) -> Result<TokenGrant> {
        let token_response: TokenResponse = response
            .json()
            .map_err(|e| AuthError::Unknown(format!("Failed to parse token response: {}", e)))?;

        let lifetime = token_response.expires_in.min(MAX_EXPIRES_IN) as i64;
        let expires_at = self.clock.now() + chrono::Duration::seconds(lifetime);

        debug!(
            expires_in = token_response.expires_in,
            rotated = token_response.refresh_token.is_some(),
            "Token endpoint issued access token"
        );

        Ok(TokenGrant {
            access_token: token_response.access_token,
            expires_at,
            refresh_token: token_response.refresh_token,
        })
    }

    fn classify_failure(response: &HttpResponse) -> AuthError {
        let status = response.status;
        let parsed = response.json::<TokenErrorResponse>().ok();

        if status == 429 {
            warn!(status, "Token endpoint rate limited the refresh");
            return AuthError::RateLimited(format!("Token endpoint returned {}", status));
        }

        match parsed {
            Some(body) if GRANT_ERROR_CODES.contains(&body.error.as_str()) => {
                warn!(
                    status,
                    code = %body.error,
                    description = body.error_description.as_deref().unwrap_or(""),
                    "Token endpoint rejected the grant"
                );
                AuthError::InvalidGrant {
                    code: body.error,
                    description: body.error_description,
                }
            }
            Some(body) => {
                warn!(status, code = %body.error, "Token refresh failed");
                AuthError::Unknown(format!(
                    "Token endpoint returned {}: {}",
                    status, body.error
                ))
            }
            None => {
                warn!(status, "Token refresh failed with unreadable body");
                AuthError::Unknown(format!("Token endpoint returned {}", status))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AccessErrorKind;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::time::SystemClock;
    use chrono::Utc;
    use mockall::mock;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    fn client_config() -> OAuthClientConfig {
        OAuthClientConfig {
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            token_url: "https://oauth2.example.test/token".to_string(),
        }
    }

    fn endpoint(mock_http: MockHttpClient) -> TokenEndpoint {
        TokenEndpoint::new(Arc::new(mock_http), client_config(), Arc::new(SystemClock))
    }

    fn respond(status: u16, body: &'static str) -> BridgeResult<HttpResponse> {
        Ok(HttpResponse::new(status, body))
    }

    #[tokio::test]
    async fn test_refresh_request_shape() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .withf(|request| {
                let body = String::from_utf8(request.body.clone().unwrap_or_default().to_vec())
                    .unwrap_or_default();
                request.method == HttpMethod::Post
                    && request.url == "https://oauth2.example.test/token"
                    && request.headers.get("Content-Type").map(String::as_str)
                        == Some("application/x-www-form-urlencoded")
                    && body.contains("grant_type=refresh_token")
                    && body.contains("client_id=client-id")
                    && body.contains("client_secret=client-secret")
                    && body.contains("refresh_token=1%2F%2Frefresh")
            })
            .times(1)
            .returning(|_| respond(200, r#"{"access_token":"ya29.new","expires_in":3600}"#));

        let before = Utc::now();
        let grant = endpoint(mock_http).refresh("1//refresh").await.unwrap();

        assert_eq!(grant.access_token, "ya29.new");
        assert_eq!(grant.refresh_token, None);
        let lifetime = (grant.expires_at - before).num_seconds();
        assert!((3599..=3601).contains(&lifetime));
    }

    #[tokio::test]
    async fn test_refresh_rotated_token() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|_| {
            respond(
                200,
                r#"{"access_token":"ya29.new","expires_in":1800,"refresh_token":"1//rotated","token_type":"Bearer"}"#,
            )
        });

        let grant = endpoint(mock_http).refresh("1//old").await.unwrap();
        assert_eq!(grant.refresh_token.as_deref(), Some("1//rotated"));
    }

    #[tokio::test]
    async fn test_refresh_missing_expires_in_defaults_to_an_hour() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .returning(|_| respond(200, r#"{"access_token":"ya29.new"}"#));

        let before = Utc::now();
        let grant = endpoint(mock_http).refresh("rt").await.unwrap();
        assert!((grant.expires_at - before).num_seconds() >= 3599);
    }

    #[tokio::test]
    async fn test_invalid_grant_classified() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().returning(|_| {
            respond(
                400,
                r#"{"error":"invalid_grant","error_description":"Token has been expired or revoked."}"#,
            )
        });

        let err = endpoint(mock_http).refresh("rt").await.unwrap_err();
        assert_eq!(
            err,
            AuthError::InvalidGrant {
                code: "invalid_grant".to_string(),
                description: Some("Token has been expired or revoked.".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_invalid_request_classified_as_grant_error() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .returning(|_| respond(400, r#"{"error":"invalid_request"}"#));

        let err = endpoint(mock_http).refresh("rt").await.unwrap_err();
        assert_eq!(err.kind(), AccessErrorKind::InvalidGrant);
    }

    #[tokio::test]
    async fn test_rate_limit_classified() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .returning(|_| respond(429, r#"{"error":"rate_limit_exceeded"}"#));

        let err = endpoint(mock_http).refresh("rt").await.unwrap_err();
        assert_eq!(err.kind(), AccessErrorKind::RateLimited);
    }

    #[tokio::test]
    async fn test_server_error_is_unknown() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .returning(|_| respond(503, "Service Unavailable"));

        let err = endpoint(mock_http).refresh("rt").await.unwrap_err();
        assert_eq!(err.kind(), AccessErrorKind::Unknown);
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_transport_errors_classified() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Err(BridgeError::Timeout("deadline elapsed".to_string())));

        let err = endpoint(mock_http).refresh("rt").await.unwrap_err();
        assert_eq!(err.kind(), AccessErrorKind::Timeout);
    }

    #[tokio::test]
    async fn test_request_timeout_forwarded() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .withf(|request| request.timeout == Some(Duration::from_secs(10)))
            .returning(|_| respond(200, r#"{"access_token":"at","expires_in":60}"#));

        let endpoint = endpoint(mock_http).with_request_timeout(Duration::from_secs(10));
        assert!(endpoint.refresh("rt").await.is_ok());
    }
}
