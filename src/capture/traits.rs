//! Capture trait definitions
//!
//! Platform-agnostic traits for camera/microphone sources.

use super::stream::MediaStream;
use crate::config::CameraConfig;
use crate::utils::error::AppResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Current capture mode of the widget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    /// Still photos, camera only
    Photo,
    /// Video clips, camera + microphone
    Video,
}

impl Default for CaptureMode {
    fn default() -> Self {
        Self::Photo
    }
}

impl CaptureMode {
    /// Whether streams acquired for this mode carry a microphone track
    pub fn wants_audio(&self) -> bool {
        matches!(self, CaptureMode::Video)
    }
}

/// Kind of a media track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
}

/// Lifecycle of a media track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackState {
    Live,
    Ended,
}

/// A single decoded video frame in tightly packed RGBA8
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl VideoFrame {
    /// Number of bytes an RGBA frame of these dimensions must hold
    pub fn expected_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 4
    }

    /// Whether the buffer length agrees with the dimensions
    pub fn is_well_formed(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.data.len() == Self::expected_len(self.width, self.height)
    }
}

/// Negotiated format of a live video track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

/// What to request from the media devices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamConstraints {
    /// Camera is always requested
    pub video: bool,

    /// Microphone track
    pub audio: bool,

    /// Preferred capture width
    pub width: u32,

    /// Preferred capture height
    pub height: u32,

    /// Preferred frame rate
    pub fps: u32,

    /// Camera index or name (None = default camera)
    pub device_id: Option<String>,
}

impl StreamConstraints {
    /// Constraints for a capture mode: audio iff the mode records video
    pub fn for_mode(mode: CaptureMode, config: &CameraConfig) -> Self {
        Self {
            video: true,
            audio: mode.wants_audio(),
            width: config.width,
            height: config.height,
            fps: config.fps,
            device_id: config.device_id.clone(),
        }
    }
}

/// A live track of a media stream
pub trait MediaTrack: Send + Sync {
    /// Whether this is a video or audio track
    fn kind(&self) -> TrackKind;

    /// Human readable device label
    fn label(&self) -> String;

    /// Stop the track and release the underlying device. Idempotent.
    fn stop(&self);

    /// Current lifecycle state
    fn state(&self) -> TrackState;
}

/// A camera track
pub trait VideoTrack: MediaTrack {
    /// Latest frame delivered by the camera, if any has arrived yet
    fn current_frame(&self) -> Option<VideoFrame>;

    /// Negotiated format
    fn settings(&self) -> VideoSettings;
}

/// A microphone track
pub trait AudioTrack: MediaTrack {
    fn sample_rate(&self) -> u32;

    fn channels(&self) -> u16;

    /// Drain interleaved f32 samples captured since the previous call
    fn take_samples(&self) -> Vec<f32>;
}

/// Entry point to the platform's camera and microphone
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Request a live stream matching the constraints.
    ///
    /// Fails with `PermissionDenied` or `DeviceNotFound`.
    async fn request_stream(&self, constraints: &StreamConstraints) -> AppResult<MediaStream>;
}
