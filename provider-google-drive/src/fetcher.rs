//! # Drive Fetcher
//!
//! Lists the photos of a Drive folder with two strategies:
//!
//! 1. **Public**: the server-held API key. Any non-empty result is returned
//!    straight away and no token is ever requested.
//! 2. **Authenticated**: only when the public listing was empty or failed and
//!    a principal was supplied. A bearer token comes from the
//!    [`AccessTokenSource`] (normally the `TokenBroker`).
//!
//! Public failures are swallowed and only logged. Authenticated failures are
//! returned as [`GoogleDriveError::ApiError`] without classification; callers
//! use [`GoogleDriveError::kind`] to tell a permission problem from the rest.

use core_auth::{AccessTokenSource, PrincipalId};
use core_runtime::config::AccessConfig;
use core_runtime::events::{CoreEvent, EventBus, ListingEvent};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use bridge_traits::http::HttpClient;

use crate::connector::{DriveListingClient, ListingAuth};
use crate::error::{GoogleDriveError, Result};
use crate::sort::sort_photos;
use crate::types::{DriveFile, Photo};

/// Which strategy produced a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingSource {
    Public,
    Authenticated,
    /// The public listing was empty or failed and no token was available.
    /// An empty folder and an inaccessible one look the same here.
    NoAccess,
}

impl ListingSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingSource::Public => "public",
            ListingSource::Authenticated => "authenticated",
            ListingSource::NoAccess => "no_access",
        }
    }
}

impl fmt::Display for ListingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderListing {
    /// Images in natural name order
    pub photos: Vec<Photo>,
    pub source: ListingSource,
}

impl FolderListing {
    fn new(photos: Vec<Photo>, source: ListingSource) -> Self {
        Self { photos, source }
    }
}

pub struct DriveFetcher {
    listing: DriveListingClient,
    api_key: Option<String>,
    tokens: Arc<dyn AccessTokenSource>,
    thumbnail_width: u32,
    event_bus: EventBus,
}

impl DriveFetcher {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        config: &AccessConfig,
        tokens: Arc<dyn AccessTokenSource>,
    ) -> Self {
        Self {
            listing: DriveListingClient::new(http_client, &config.drive_api_base, config.page_size),
            api_key: config.api_key.clone(),
            tokens,
            thumbnail_width: config.thumbnail_width,
            event_bus: EventBus::default(),
        }
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = event_bus;
        self
    }

    /// Lists the photos of `folder_id`, possibly none.
    pub async fn list(&self, folder_id: &str, principal: Option<&PrincipalId>) -> Result<Vec<Photo>> {
        Ok(self.list_detailed(folder_id, principal).await?.photos)
    }

    /// Lists the photos of `folder_id` and reports which strategy answered.
    #[instrument(skip(self, principal), fields(folder_id = %folder_id, principal_id = ?principal.map(PrincipalId::as_str)))]
    pub async fn list_detailed(
        &self,
        folder_id: &str,
        principal: Option<&PrincipalId>,
    ) -> Result<FolderListing> {
        let public_reachable = match self.list_public(folder_id).await {
            Ok(photos) if !photos.is_empty() => {
                return Ok(self.finish(folder_id, FolderListing::new(photos, ListingSource::Public)));
            }
            Ok(_) => true,
            Err(error) => {
                debug!(kind = %error.kind(), error = %error, "Public listing unavailable, trying fallback");
                false
            }
        };

        let Some(principal) = principal else {
            let source = if public_reachable {
                ListingSource::Public
            } else {
                ListingSource::NoAccess
            };
            return Ok(self.finish_empty(folder_id, None, source));
        };

        let Some(token) = self.tokens.access_token(principal).await else {
            info!("No access token available, folder treated as inaccessible");
            return Ok(self.finish_empty(folder_id, Some(principal), ListingSource::NoAccess));
        };

        let files = self
            .listing
            .list_folder(folder_id, &ListingAuth::Bearer(token))
            .await
            .map_err(|error| {
                warn!(kind = %error.kind(), error = %error, "Authenticated listing failed");
                error
            })?;

        let photos = self.to_photos(files);
        Ok(self.finish(folder_id, FolderListing::new(photos, ListingSource::Authenticated)))
    }

    /// Public strategy, listed with the server-held API key.
    async fn list_public(&self, folder_id: &str) -> Result<Vec<Photo>> {
        let api_key = self.api_key.as_ref().ok_or(GoogleDriveError::MissingApiKey)?;
        let files = self
            .listing
            .list_folder(folder_id, &ListingAuth::ApiKey(api_key.clone()))
            .await?;
        Ok(self.to_photos(files))
    }

    fn to_photos(&self, files: Vec<DriveFile>) -> Vec<Photo> {
        let mut photos: Vec<Photo> = files
            .into_iter()
            .filter(DriveFile::is_image)
            .map(|file| Photo::from_drive_file(file, self.thumbnail_width))
            .collect();
        sort_photos(&mut photos);
        photos
    }

    fn finish_empty(
        &self,
        folder_id: &str,
        principal: Option<&PrincipalId>,
        source: ListingSource,
    ) -> FolderListing {
        if source == ListingSource::NoAccess {
            let _ = self.event_bus.emit(CoreEvent::Listing(ListingEvent::NoAccess {
                folder_id: folder_id.to_string(),
                principal_id: principal.map(PrincipalId::to_string),
            }));
            return FolderListing::new(Vec::new(), source);
        }
        self.finish(folder_id, FolderListing::new(Vec::new(), source))
    }

    fn finish(&self, folder_id: &str, listing: FolderListing) -> FolderListing {
        info!(source = %listing.source, count = listing.photos.len(), "Folder listed");
        let _ = self.event_bus.emit(CoreEvent::Listing(ListingEvent::Listed {
            folder_id: folder_id.to_string(),
            source: listing.source.to_string(),
            count: listing.photos.len(),
        }));
        listing
    }
}
