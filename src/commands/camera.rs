//! Camera widget Tauri commands

use crate::capture::{CaptureMode, FrameSurface};
use crate::gallery::WidgetView;
use crate::library::{MediaItem, ObjectUrlRegistry};
use crate::stream::CameraStatus;
use crate::widget::CameraWidget;
use serde::Serialize;
use std::sync::Arc;
use tauri::http::{header, Response, StatusCode};
use tauri::State;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Application state for the camera widget
pub struct CameraState {
    pub widget: Arc<Mutex<CameraWidget>>,
    /// Shared with the widget's library, read by the `media://` handler
    pub urls: Arc<ObjectUrlRegistry>,
}

impl CameraState {
    pub fn new(widget: CameraWidget) -> Self {
        let urls = widget.library().url_registry().clone();
        Self {
            widget: Arc::new(Mutex::new(widget)),
            urls,
        }
    }
}

/// Latest preview frame as a PNG data URL
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewFrame {
    pub width: u32,
    pub height: u32,
    pub data_url: String,
}

/// Serve an object URL request from the registry
pub fn object_url_response(urls: &ObjectUrlRegistry, path: &str) -> Response<Vec<u8>> {
    let response = match urls.resolve(path) {
        Some((bytes, mime_type)) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, mime_type)
            .header(header::CONTENT_LENGTH, bytes.len())
            .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
            .body(bytes.to_vec()),
        None => {
            tracing::debug!("No object behind {}", path);
            Response::builder()
                .status(StatusCode::NOT_FOUND)
                .body(Vec::new())
        }
    };

    response.unwrap_or_else(|e| {
        tracing::warn!("Failed to build object URL response: {}", e);
        let mut fallback = Response::new(Vec::new());
        *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        fallback
    })
}

/// Everything the frontend renders
#[tauri::command]
pub async fn get_widget_view(state: State<'_, CameraState>) -> Result<WidgetView, String> {
    Ok(state.widget.lock().await.view())
}

/// Switch between photo and video mode
#[tauri::command]
pub async fn set_mode(
    state: State<'_, CameraState>,
    mode: CaptureMode,
) -> Result<WidgetView, String> {
    let mut widget = state.widget.lock().await;
    widget.set_mode(mode).await;
    Ok(widget.view())
}

/// Take a photo from the live preview
#[tauri::command]
pub async fn capture_photo(state: State<'_, CameraState>) -> Result<MediaItem, String> {
    state
        .widget
        .lock()
        .await
        .capture_photo()
        .map_err(String::from)
}

/// Start recording
#[tauri::command]
pub async fn start_recording(state: State<'_, CameraState>) -> Result<(), String> {
    state
        .widget
        .lock()
        .await
        .start_recording()
        .await
        .map_err(String::from)
}

/// Stop recording and return the clip
#[tauri::command]
pub async fn stop_recording(state: State<'_, CameraState>) -> Result<Option<MediaItem>, String> {
    state
        .widget
        .lock()
        .await
        .stop_recording()
        .await
        .map_err(String::from)
}

/// The record button
#[tauri::command]
pub async fn toggle_recording(
    state: State<'_, CameraState>,
) -> Result<Option<MediaItem>, String> {
    state
        .widget
        .lock()
        .await
        .toggle_recording()
        .await
        .map_err(String::from)
}

/// Delete a gallery item; unknown ids are ignored
#[tauri::command]
pub async fn delete_item(
    state: State<'_, CameraState>,
    id: Uuid,
) -> Result<Option<MediaItem>, String> {
    Ok(state.widget.lock().await.delete(id))
}

/// Open the preview overlay
#[tauri::command]
pub async fn select_item(state: State<'_, CameraState>, id: Uuid) -> Result<bool, String> {
    Ok(state.widget.lock().await.select(id))
}

/// Close the preview overlay
#[tauri::command]
pub async fn deselect_item(state: State<'_, CameraState>) -> Result<(), String> {
    state.widget.lock().await.deselect();
    Ok(())
}

/// Clear the pending alert once shown
#[tauri::command]
pub async fn dismiss_alert(state: State<'_, CameraState>) -> Result<Option<String>, String> {
    Ok(state.widget.lock().await.take_alert())
}

/// Current camera frame for the live preview
#[tauri::command]
pub async fn get_preview_frame(
    state: State<'_, CameraState>,
) -> Result<Option<PreviewFrame>, String> {
    let frame = state.widget.lock().await.preview_frame();
    let Some(frame) = frame else {
        return Ok(None);
    };

    let surface = FrameSurface::from_frame(&frame).map_err(String::from)?;
    let data_url = surface.to_data_url().map_err(String::from)?;
    Ok(Some(PreviewFrame {
        width: frame.width,
        height: frame.height,
        data_url,
    }))
}

/// Whether the preview is live and carries audio
#[tauri::command]
pub async fn get_camera_status(state: State<'_, CameraState>) -> Result<CameraStatus, String> {
    Ok(state.widget.lock().await.status())
}
