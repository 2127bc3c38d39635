//! Google Drive API listing client
//!
//! Lists the direct children of a folder through Drive API v3 `files.list`,
//! following `nextPageToken` until the listing is exhausted.

use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::{GoogleDriveError, Result};
use crate::types::{DriveFile, FilesListResponse};

/// Fields to request for file resources
const FILE_FIELDS: &str =
    "nextPageToken,incompleteSearch,files(id,name,mimeType,size,thumbnailLink,imageMediaMetadata(width,height))";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How a listing request identifies itself.
#[derive(Clone, PartialEq, Eq)]
pub enum ListingAuth {
    /// Server-held API key; only sees publicly shared folders.
    ApiKey(String),
    /// OAuth access token of a principal.
    Bearer(String),
}

impl ListingAuth {
    pub fn label(&self) -> &'static str {
        match self {
            ListingAuth::ApiKey(_) => "api_key",
            ListingAuth::Bearer(_) => "bearer",
        }
    }
}

impl fmt::Debug for ListingAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ListingAuth::{}([REDACTED])", self.label())
    }
}

/// Google Drive API listing client
///
/// Issues exactly one HTTP request per page and never retries; the caller
/// decides what a failed page means.
///
/// # Example
///
/// ```ignore
/// use provider_google_drive::{DriveListingClient, ListingAuth};
///
/// let client = DriveListingClient::new(http_client, "https://www.googleapis.com/drive/v3", 1000);
/// let files = client.list_folder("1AbCdEf", &ListingAuth::ApiKey(api_key)).await?;
/// ```
pub struct DriveListingClient {
    http_client: Arc<dyn HttpClient>,
    api_base: String,
    page_size: u32,
}

impl DriveListingClient {
    pub fn new(http_client: Arc<dyn HttpClient>, api_base: impl Into<String>, page_size: u32) -> Self {
        Self {
            http_client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            page_size: page_size.clamp(1, 1000),
        }
    }

    /// Lists every non-trashed child of `folder_id`, all pages included.
    #[instrument(skip(self, auth), fields(folder_id = %folder_id, auth = auth.label()))]
    pub async fn list_folder(&self, folder_id: &str, auth: &ListingAuth) -> Result<Vec<DriveFile>> {
        let mut files = Vec::new();
        let mut seen_tokens = HashSet::new();
        let mut page_token: Option<String> = None;
        let mut page = 0usize;

        loop {
            let response = self.fetch_page(folder_id, auth, page_token.as_deref()).await?;
            if response.incomplete_search {
                warn!(page, "Drive reported an incomplete search");
            }

            debug!(page, count = response.files.len(), "Fetched listing page");
            files.extend(response.files);
            page += 1;

            match response.next_page_token {
                Some(token) if !token.is_empty() => {
                    if !seen_tokens.insert(token.clone()) {
                        warn!(pages = page, "Drive repeated a page token");
                        return Err(GoogleDriveError::PaginationLoop { pages: page });
                    }
                    page_token = Some(token);
                }
                _ => {
                    debug!(pages = page, total = files.len(), "Listing exhausted");
                    return Ok(files);
                }
            }
        }
    }

    async fn fetch_page(
        &self,
        folder_id: &str,
        auth: &ListingAuth,
        page_token: Option<&str>,
    ) -> Result<FilesListResponse> {
        let mut request = HttpRequest::new(HttpMethod::Get, self.page_url(folder_id, auth, page_token))
            .header("Accept", "application/json")
            .timeout(REQUEST_TIMEOUT);
        if let ListingAuth::Bearer(token) = auth {
            request = request.bearer_token(token.as_str());
        }

        let response = self.http_client.execute(request).await?;

        if !response.is_success() {
            let message = String::from_utf8_lossy(&response.body).to_string();
            debug!(status = response.status, "Listing request rejected");
            return Err(GoogleDriveError::ApiError {
                status_code: response.status,
                message,
            });
        }

        serde_json::from_slice(&response.body).map_err(|e| {
            GoogleDriveError::ParseError(format!("Failed to parse files list response: {}", e))
        })
    }

    fn page_url(&self, folder_id: &str, auth: &ListingAuth, page_token: Option<&str>) -> String {
        let query = format!(
            "'{}' in parents and trashed = false",
            folder_id.replace('\\', "\\\\").replace('\'', "\\'")
        );

        let mut url = format!(
            "{}/files?q={}&fields={}&pageSize={}&supportsAllDrives=true&includeItemsFromAllDrives=true",
            self.api_base,
            urlencoding::encode(&query),
            urlencoding::encode(FILE_FIELDS),
            self.page_size
        );

        if let ListingAuth::ApiKey(key) = auth {
            url.push_str(&format!("&key={}", urlencoding::encode(key)));
        }
        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
        }

        url
    }
}
