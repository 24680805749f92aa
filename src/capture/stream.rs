//! Live media stream
//!
//! A stream bundles one camera track and an optional microphone track.

use super::traits::{AudioTrack, MediaTrack, TrackKind, TrackState, VideoFrame, VideoTrack};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Snapshot of a track for status reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    pub kind: TrackKind,
    pub label: String,
    pub state: TrackState,
}

/// A live camera (+ microphone) stream
pub struct MediaStream {
    id: Uuid,
    video: Arc<dyn VideoTrack>,
    audio: Option<Arc<dyn AudioTrack>>,
}

impl MediaStream {
    pub fn new(video: Arc<dyn VideoTrack>, audio: Option<Arc<dyn AudioTrack>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            video,
            audio,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn video(&self) -> &Arc<dyn VideoTrack> {
        &self.video
    }

    pub fn audio(&self) -> Option<&Arc<dyn AudioTrack>> {
        self.audio.as_ref()
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    /// Latest camera frame
    pub fn current_frame(&self) -> Option<VideoFrame> {
        self.video.current_frame()
    }

    /// Every track of the stream, video first
    pub fn tracks(&self) -> Vec<TrackInfo> {
        let mut tracks = vec![TrackInfo {
            kind: self.video.kind(),
            label: self.video.label(),
            state: self.video.state(),
        }];
        if let Some(audio) = &self.audio {
            tracks.push(TrackInfo {
                kind: audio.kind(),
                label: audio.label(),
                state: audio.state(),
            });
        }
        tracks
    }

    /// A stream is live while its camera track is
    pub fn is_live(&self) -> bool {
        self.video.state() == TrackState::Live
    }

    /// Stop every track of the stream
    pub fn stop(&self) {
        self.video.stop();
        if let Some(audio) = &self.audio {
            audio.stop();
        }
        tracing::debug!("Stopped all tracks of stream {}", self.id);
    }
}

impl std::fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaStream")
            .field("id", &self.id)
            .field("video", &self.video.label())
            .field("audio", &self.audio.as_ref().map(|a| a.label()))
            .finish()
    }
}
