//! Google Drive API response types
//!
//! Data structures for deserializing Google Drive API v3 listing responses,
//! plus the normalized [`Photo`] handed to callers.

use serde::{Deserialize, Serialize};

/// Google Drive API file resource, restricted to the fields a listing requests.
///
/// See: https://developers.google.com/drive/api/v3/reference/files#resource
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,

    pub name: String,

    pub mime_type: String,

    /// Decimal byte count as a string (omitted for folders and Google Docs)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    /// Short-lived thumbnail URL generated by Drive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_link: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_media_metadata: Option<ImageMediaMetadata>,
}

impl DriveFile {
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// Image dimensions reported by Drive for photo content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMediaMetadata {
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// Google Drive API files.list response
///
/// See: https://developers.google.com/drive/api/v3/reference/files/list
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesListResponse {
    #[serde(default)]
    pub files: Vec<DriveFile>,

    /// Token for next page
    #[serde(default)]
    pub next_page_token: Option<String>,

    /// Whether the search skipped some corpora
    #[serde(default)]
    pub incomplete_search: bool,
}

/// A displayable image from a folder listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: String,
    pub name: String,
    pub byte_size: Option<u64>,
    pub thumbnail_url: String,
    pub view_url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl Photo {
    /// Normalizes a Drive file into a photo.
    ///
    /// `thumbnail_width` sizes the fallback thumbnail URL used when Drive
    /// did not supply a `thumbnailLink`.
    pub fn from_drive_file(file: DriveFile, thumbnail_width: u32) -> Self {
        let byte_size = file.size.as_deref().and_then(|s| s.trim().parse().ok());
        let metadata = file.image_media_metadata.unwrap_or_default();
        let id_param = urlencoding::encode(&file.id);

        let thumbnail_url = file.thumbnail_link.unwrap_or_else(|| {
            format!(
                "https://drive.google.com/thumbnail?id={}&sz=w{}",
                id_param, thumbnail_width
            )
        });
        let view_url = format!("https://drive.google.com/uc?export=view&id={}", id_param);

        Self {
            id: file.id,
            name: file.name,
            byte_size,
            thumbnail_url,
            view_url,
            width: metadata.width,
            height: metadata.height,
        }
    }
}
