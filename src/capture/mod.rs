//! Camera and microphone capture
//!
//! This module provides the platform seams (media devices and tracks), the
//! live stream type and the offscreen surface used to take photos.

pub mod stream;
pub mod surface;
pub mod traits;

#[cfg(feature = "native")]
pub mod native;

// Re-export traits
pub use stream::{MediaStream, TrackInfo};
pub use surface::FrameSurface;
pub use traits::{
    AudioTrack, CaptureMode, MediaDevices, MediaTrack, StreamConstraints, TrackKind, TrackState,
    VideoFrame, VideoSettings, VideoTrack,
};
