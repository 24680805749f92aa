//! Widget render model
//!
//! A serializable snapshot of everything the frontend draws: mode buttons,
//! the capture control, gallery cells and the preview overlay.

use crate::capture::CaptureMode;
use crate::library::{MediaItem, MediaKind};
use crate::recorder::RecordingState;
use crate::stream::CameraStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeButton {
    pub mode: CaptureMode,
    pub label: String,
    pub active: bool,
}

/// Capture button in photo mode, record button in video mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CaptureControl {
    Capture { label: String },
    Record { label: String, recording: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryCell {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub url: String,
    pub timestamp: String,
    /// Only photos carry alt text
    pub alt: Option<String>,
}

impl GalleryCell {
    fn from_item(item: &MediaItem) -> Self {
        Self {
            id: item.id,
            kind: item.kind,
            url: item.url.clone(),
            timestamp: item.timestamp.clone(),
            alt: match item.kind {
                MediaKind::Photo => Some(format!("Captured {}", item.timestamp)),
                MediaKind::Video => None,
            },
        }
    }
}

/// Full-screen preview of the selected item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewOverlay {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub url: String,
    pub alt: Option<String>,
    pub controls: bool,
    pub autoplay: bool,
}

impl PreviewOverlay {
    fn from_item(item: &MediaItem) -> Self {
        let is_video = item.is_video();
        Self {
            id: item.id,
            kind: item.kind,
            url: item.url.clone(),
            alt: (!is_video).then(|| "Preview".to_string()),
            controls: is_video,
            autoplay: is_video,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetView {
    pub modes: Vec<ModeButton>,
    pub control: CaptureControl,
    pub gallery: Vec<GalleryCell>,
    pub preview: Option<PreviewOverlay>,
    pub status: CameraStatus,
    pub alert: Option<String>,
}

impl WidgetView {
    /// Build the view from widget state.
    ///
    /// A selection that no longer resolves to an item renders no overlay.
    pub fn build(
        mode: CaptureMode,
        recording: RecordingState,
        items: &[MediaItem],
        selected: Option<Uuid>,
        status: CameraStatus,
        alert: Option<String>,
    ) -> Self {
        let modes = [
            (CaptureMode::Photo, "📸 Photo Mode"),
            (CaptureMode::Video, "🎥 Video Mode"),
        ]
        .into_iter()
        .map(|(m, label)| ModeButton {
            mode: m,
            label: label.to_string(),
            active: m == mode,
        })
        .collect();

        let control = match mode {
            CaptureMode::Photo => CaptureControl::Capture {
                label: "📸 Capture".to_string(),
            },
            CaptureMode::Video => {
                let recording = recording == RecordingState::Recording;
                CaptureControl::Record {
                    label: if recording {
                        "⏹️ Stop Recording"
                    } else {
                        "⏺️ Start Recording"
                    }
                    .to_string(),
                    recording,
                }
            }
        };

        let preview = selected
            .and_then(|id| items.iter().find(|item| item.id == id))
            .map(PreviewOverlay::from_item);

        Self {
            modes,
            control,
            gallery: items.iter().map(GalleryCell::from_item).collect(),
            preview,
            status,
            alert,
        }
    }
}
