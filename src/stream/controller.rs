//! Stream controller
//!
//! Owns the live camera stream bound to the preview and swaps it when the
//! capture mode changes, so the microphone track follows the mode.

use crate::capture::{
    CaptureMode, MediaDevices, MediaStream, MediaTrack, StreamConstraints, TrackInfo, VideoFrame,
};
use crate::config::CameraConfig;
use crate::utils::error::AppResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Events emitted when the bound stream changes
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A stream was bound to the preview
    Bound { stream_id: Uuid, has_audio: bool },
    /// The bound stream was stopped and unbound
    Released { stream_id: Uuid },
    /// The devices refused the request
    AcquisitionFailed(String),
}

/// What the preview currently shows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraStatus {
    /// A live stream is bound
    pub streaming: bool,
    /// The bound stream carries a microphone track
    pub has_audio: bool,
    /// Camera label
    pub label: Option<String>,
    /// Tracks of the bound stream, video first
    pub tracks: Vec<TrackInfo>,
}

/// Acquires, binds and releases the camera stream
pub struct StreamController {
    devices: Arc<dyn MediaDevices>,
    config: CameraConfig,
    bound: Option<Arc<MediaStream>>,
    event_tx: broadcast::Sender<StreamEvent>,
}

impl StreamController {
    pub fn new(devices: Arc<dyn MediaDevices>, config: CameraConfig) -> Self {
        let (event_tx, _) = broadcast::channel(32);
        Self {
            devices,
            config,
            bound: None,
            event_tx,
        }
    }

    /// Subscribe to stream events
    pub fn subscribe(&self) -> broadcast::Receiver<StreamEvent> {
        self.event_tx.subscribe()
    }

    /// Request a stream for the mode and bind it to the preview.
    ///
    /// Any stream bound before is released first.
    pub async fn acquire(&mut self, mode: CaptureMode) -> AppResult<Arc<MediaStream>> {
        self.release();

        let constraints = StreamConstraints::for_mode(mode, &self.config);
        let stream = match self.devices.request_stream(&constraints).await {
            Ok(stream) => Arc::new(stream),
            Err(e) => {
                let _ = self.event_tx.send(StreamEvent::AcquisitionFailed(e.to_string()));
                return Err(e);
            }
        };

        tracing::info!(
            "Bound stream {} for {:?} mode (audio={})",
            stream.id(),
            mode,
            stream.has_audio()
        );
        let _ = self.event_tx.send(StreamEvent::Bound {
            stream_id: stream.id(),
            has_audio: stream.has_audio(),
        });

        self.bound = Some(stream.clone());
        Ok(stream)
    }

    /// Stop every track of the bound stream and unbind it
    pub fn release(&mut self) {
        if let Some(stream) = self.bound.take() {
            stream.stop();
            tracing::info!("Released stream {}", stream.id());
            let _ = self.event_tx.send(StreamEvent::Released {
                stream_id: stream.id(),
            });
        }
    }

    /// Release the current stream, then acquire one for the new mode
    pub async fn switch_mode(&mut self, mode: CaptureMode) -> AppResult<Arc<MediaStream>> {
        self.release();
        self.acquire(mode).await
    }

    /// The bound stream, if it is still live
    pub fn stream(&self) -> Option<Arc<MediaStream>> {
        self.bound.as_ref().filter(|s| s.is_live()).cloned()
    }

    pub fn is_bound(&self) -> bool {
        self.stream().is_some()
    }

    /// Latest frame for the preview surface
    pub fn preview_frame(&self) -> Option<VideoFrame> {
        self.stream().and_then(|s| s.current_frame())
    }

    pub fn status(&self) -> CameraStatus {
        match self.stream() {
            Some(stream) => CameraStatus {
                streaming: true,
                has_audio: stream.has_audio(),
                label: Some(stream.video().label()),
                tracks: stream.tracks(),
            },
            None => CameraStatus::default(),
        }
    }
}

impl Drop for StreamController {
    fn drop(&mut self) {
        self.release();
    }
}
