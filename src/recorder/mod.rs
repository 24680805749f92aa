//! Recording system module
//!
//! - MediaRecorder/RecorderFactory traits for platform encoders
//! - CaptureEngine for photo capture and the video state machine
//! - FFmpeg-backed recorder for desktop builds

pub mod channel;
pub mod engine;
pub mod ffmpeg;
pub mod state;

pub use channel::{
    MediaRecorder, RecorderEvent, RecorderEventReceiver, RecorderEventSender, RecorderFactory,
};
pub use engine::{CaptureEngine, RecordingEvent};
pub use ffmpeg::FfmpegRecorderFactory;
pub use state::{RecordingSession, RecordingState};
