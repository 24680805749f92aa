//! Native camera and microphone devices
//!
//! Camera via nokhwa, microphone via cpal.

pub mod microphone;
pub mod webcam;
mod worker;

use super::stream::MediaStream;
use super::traits::{AudioTrack, MediaDevices, MediaTrack, StreamConstraints};
use crate::utils::error::AppResult;
use async_trait::async_trait;
use microphone::CpalAudioTrack;
use std::sync::Arc;
use webcam::NokhwaVideoTrack;

/// Media devices of the local machine
#[derive(Debug, Default)]
pub struct NativeDevices;

impl NativeDevices {
    pub fn new() -> Self {
        #[cfg(target_os = "macos")]
        nokhwa::nokhwa_initialize(|granted| {
            tracing::info!("Camera access granted: {}", granted);
        });

        Self
    }
}

#[async_trait]
impl MediaDevices for NativeDevices {
    async fn request_stream(&self, constraints: &StreamConstraints) -> AppResult<MediaStream> {
        tracing::info!(
            "Requesting stream: {}x{} @ {}fps, audio={}",
            constraints.width,
            constraints.height,
            constraints.fps,
            constraints.audio
        );

        let video = Arc::new(NokhwaVideoTrack::open(constraints).await?);

        let audio = if constraints.audio {
            match CpalAudioTrack::open().await {
                Ok(track) => Some(Arc::new(track)),
                Err(e) => {
                    // The request fails as a whole, like the browser's getUserMedia
                    video.stop();
                    return Err(e);
                }
            }
        } else {
            None
        };

        Ok(MediaStream::new(video, audio.map(|a| a as Arc<dyn AudioTrack>)))
    }
}
