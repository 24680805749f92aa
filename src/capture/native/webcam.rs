//! Camera track using nokhwa
//!
//! The camera is opened on a dedicated capture thread which keeps the latest
//! decoded RGBA frame around for preview, stills and the recorder. Stopping
//! the track waits until that thread has closed the camera.

use crate::capture::traits::{
    MediaTrack, StreamConstraints, TrackKind, TrackState, VideoFrame, VideoSettings, VideoTrack,
};
use super::worker::DeviceThread;
use crate::utils::error::{AppError, AppResult};
use nokhwa::pixel_format::RgbAFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};
use nokhwa::Camera;
use parking_lot::Mutex;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Map a device id from the config to a nokhwa index
fn camera_index(device_id: Option<&str>) -> CameraIndex {
    match device_id {
        Some(id) => match id.parse::<u32>() {
            Ok(idx) => CameraIndex::Index(idx),
            Err(_) => CameraIndex::String(id.to_string()),
        },
        None => CameraIndex::Index(0),
    }
}

/// Sort an open failure into the acquisition error taxonomy
pub(crate) fn classify_open_error(message: String) -> AppError {
    let lower = message.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("authoriz") {
        AppError::PermissionDenied(message)
    } else if lower.contains("not found") || lower.contains("no device") || lower.contains("index") {
        AppError::DeviceNotFound(message)
    } else {
        AppError::Platform(message)
    }
}

/// Live camera track backed by a nokhwa capture thread
pub struct NokhwaVideoTrack {
    label: String,
    settings: VideoSettings,
    capture: DeviceThread,
    latest: Arc<Mutex<Option<VideoFrame>>>,
}

impl NokhwaVideoTrack {
    /// Open the camera described by the constraints and start capturing
    pub async fn open(constraints: &StreamConstraints) -> AppResult<Self> {
        let index = camera_index(constraints.device_id.as_deref());
        let requested = CameraFormat::new(
            Resolution::new(constraints.width, constraints.height),
            FrameFormat::MJPEG,
            constraints.fps,
        );

        let latest: Arc<Mutex<Option<VideoFrame>>> = Arc::new(Mutex::new(None));
        let (ready_tx, ready_rx) = oneshot::channel::<Result<(String, VideoSettings), String>>();

        let thread_latest = latest.clone();

        let capture = DeviceThread::spawn(move |running| {
            let format =
                RequestedFormat::new::<RgbAFormat>(RequestedFormatType::Closest(requested));

            let mut camera = match Camera::new(index.clone(), format) {
                Ok(c) => c,
                Err(e) => {
                    let _ = ready_tx.send(Err(format!("Failed to open camera {:?}: {}", index, e)));
                    return;
                }
            };

            if let Err(e) = camera.open_stream() {
                let _ = ready_tx.send(Err(format!("Failed to open camera stream: {}", e)));
                return;
            }

            let camera_format = camera.camera_format();
            let settings = VideoSettings {
                width: camera_format.resolution().width(),
                height: camera_format.resolution().height(),
                fps: camera_format.frame_rate(),
            };
            let label = camera.info().human_name().to_string();

            tracing::info!(
                "Camera '{}' opened: {}x{} @ {}fps, format={:?}",
                label,
                settings.width,
                settings.height,
                settings.fps,
                camera_format.format()
            );

            if ready_tx.send(Ok((label, settings))).is_err() {
                // Requester went away before the camera came up
                let _ = camera.stop_stream();
                return;
            }

            let mut frame_count: u64 = 0;
            while running.load(Ordering::SeqCst) {
                // Blocks until the camera delivers the next frame
                let buffer = match camera.frame() {
                    Ok(buffer) => buffer,
                    Err(e) => {
                        tracing::debug!("Failed to capture frame: {:?}", e);
                        std::thread::sleep(std::time::Duration::from_millis(10));
                        continue;
                    }
                };

                match buffer.decode_image::<RgbAFormat>() {
                    Ok(image) => {
                        let frame = VideoFrame {
                            width: image.width(),
                            height: image.height(),
                            data: image.into_raw(),
                        };
                        *thread_latest.lock() = Some(frame);
                        frame_count += 1;
                    }
                    Err(e) => {
                        tracing::debug!("Failed to decode frame: {:?}", e);
                    }
                }
            }

            if let Err(e) = camera.stop_stream() {
                tracing::warn!("Error stopping camera stream: {:?}", e);
            }
            tracing::info!("Camera capture thread stopped after {} frames", frame_count);
        });

        let (label, settings) = ready_rx
            .await
            .map_err(|_| AppError::Platform("Camera thread exited during startup".to_string()))?
            .map_err(classify_open_error)?;

        Ok(Self {
            label,
            settings,
            capture,
            latest,
        })
    }
}

impl MediaTrack for NokhwaVideoTrack {
    fn kind(&self) -> TrackKind {
        TrackKind::Video
    }

    fn label(&self) -> String {
        self.label.clone()
    }

    fn stop(&self) {
        if self.capture.is_running() {
            tracing::debug!("Stopping camera track '{}'", self.label);
        }
        self.capture.stop();
    }

    fn state(&self) -> TrackState {
        if self.capture.is_running() {
            TrackState::Live
        } else {
            TrackState::Ended
        }
    }
}

impl VideoTrack for NokhwaVideoTrack {
    fn current_frame(&self) -> Option<VideoFrame> {
        if !self.capture.is_running() {
            return None;
        }
        self.latest.lock().clone()
    }

    fn settings(&self) -> VideoSettings {
        self.settings
    }
}
