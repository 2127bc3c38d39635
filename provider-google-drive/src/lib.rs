//! # Google Drive Provider
//!
//! Folder listing against Google Drive API v3.
//!
//! ## Overview
//!
//! This crate provides:
//! - Paginated `files.list` of one folder, with an API key or a bearer token
//! - Normalization of image files into [`Photo`] values
//! - Natural, total ordering of photos by name
//! - [`DriveFetcher`], which tries the public listing first and falls back to
//!   the principal's OAuth token

pub mod connector;
pub mod error;
pub mod fetcher;
pub mod sort;
pub mod types;

pub use connector::{DriveListingClient, ListingAuth};
pub use error::{GoogleDriveError, Result};
pub use fetcher::{DriveFetcher, FolderListing, ListingSource};
pub use sort::natural_cmp;
pub use types::{DriveFile, FilesListResponse, ImageMediaMetadata, Photo};
