//! Media item definitions
//!
//! `MediaItem` is what the gallery renders. `StoredMediaItem` is the shape kept
//! in the key-value store: it carries the encoded bytes instead of the
//! process-local object URL, which would dangle after a restart.

use crate::capture::surface::PHOTO_MIME_TYPE;
use base64::{engine::general_purpose, Engine as _};
use bytes::Bytes;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// MIME type of recorded clips
pub const VIDEO_MIME_TYPE: &str = "video/webm";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
}

/// Human readable capture time, e.g. `3/14/2025, 9:26:53 AM`
pub fn display_timestamp(time: DateTime<Local>) -> String {
    time.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
}

/// One captured artifact shown in the gallery
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    /// Time-ordered unique id, stable across deletes and restarts
    pub id: Uuid,

    #[serde(rename = "type")]
    pub kind: MediaKind,

    /// Data URL for photos, object URL for videos
    pub url: String,

    /// Display-only capture time
    pub timestamp: String,

    pub created_at: DateTime<Utc>,

    pub mime_type: String,

    /// Encoded clip, retained for videos
    #[serde(skip)]
    pub blob: Option<Bytes>,
}

impl MediaItem {
    fn new(kind: MediaKind, url: String, mime_type: &str, blob: Option<Bytes>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            kind,
            url,
            timestamp: display_timestamp(now.with_timezone(&Local)),
            created_at: now,
            mime_type: mime_type.to_string(),
            blob,
        }
    }

    /// A still photo from its PNG data URL
    pub fn photo(data_url: String) -> Self {
        Self::new(MediaKind::Photo, data_url, PHOTO_MIME_TYPE, None)
    }

    /// A recorded clip from its container bytes and object URL
    pub fn video(blob: Bytes, object_url: String, mime_type: &str) -> Self {
        Self::new(MediaKind::Video, object_url, mime_type, Some(blob))
    }

    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video
    }

    /// Size of the retained clip in bytes
    pub fn blob_size(&self) -> usize {
        self.blob.as_ref().map(|b| b.len()).unwrap_or(0)
    }
}

/// Persisted form of a media item
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMediaItem {
    pub id: Uuid,

    #[serde(rename = "type")]
    pub kind: MediaKind,

    pub timestamp: String,

    pub created_at: DateTime<Utc>,

    pub mime_type: String,

    /// Photo data URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Base64 clip bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl StoredMediaItem {
    pub fn from_item(item: &MediaItem) -> Self {
        let (url, data) = match item.kind {
            MediaKind::Photo => (Some(item.url.clone()), None),
            MediaKind::Video => (
                None,
                item.blob
                    .as_ref()
                    .map(|blob| general_purpose::STANDARD.encode(blob)),
            ),
        };

        Self {
            id: item.id,
            kind: item.kind,
            timestamp: item.timestamp.clone(),
            created_at: item.created_at,
            mime_type: item.mime_type.clone(),
            url,
            data,
        }
    }

    /// Decoded clip bytes of a stored video
    pub fn decode_data(&self) -> Option<Bytes> {
        let data = self.data.as_ref()?;
        match general_purpose::STANDARD.decode(data) {
            Ok(bytes) => Some(Bytes::from(bytes)),
            Err(e) => {
                tracing::warn!("Stored clip {} has invalid data: {}", self.id, e);
                None
            }
        }
    }

    /// Rebuild the item. Videos need a freshly minted object URL.
    pub fn into_item(self, object_url: Option<String>, blob: Option<Bytes>) -> Option<MediaItem> {
        let url = match self.kind {
            MediaKind::Photo => self.url.filter(|u| u.starts_with("data:"))?,
            MediaKind::Video => object_url?,
        };

        Some(MediaItem {
            id: self.id,
            kind: self.kind,
            url,
            timestamp: self.timestamp,
            created_at: self.created_at,
            mime_type: self.mime_type,
            blob,
        })
    }
}
