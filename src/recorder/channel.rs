//! Platform recorder interface
//!
//! A recorder incrementally encodes a live stream. Encoded data is delivered
//! as `RecorderEvent::Chunk` in capture order; `Finalized` follows the last
//! chunk once the recorder has been stopped.

use crate::capture::MediaStream;
use crate::utils::error::AppResult;
use bytes::Bytes;
use tokio::sync::mpsc;

/// Events delivered by a running recorder
#[derive(Debug, Clone, PartialEq)]
pub enum RecorderEvent {
    /// A piece of the encoded container
    Chunk(Bytes),
    /// No more chunks will follow
    Finalized,
    /// Encoding failed; no more chunks will follow
    Error(String),
}

pub type RecorderEventSender = mpsc::UnboundedSender<RecorderEvent>;
pub type RecorderEventReceiver = mpsc::UnboundedReceiver<RecorderEvent>;

/// A recorder bound to one stream
pub trait MediaRecorder: Send {
    /// Begin encoding
    fn start(&mut self) -> AppResult<()>;

    /// Ask the recorder to finish; `Finalized` is delivered when it has
    fn stop(&mut self) -> AppResult<()>;

    /// Container type of the produced chunks
    fn mime_type(&self) -> &str;
}

/// Creates recorders for streams
pub trait RecorderFactory: Send + Sync {
    fn create(
        &self,
        stream: &MediaStream,
        events: RecorderEventSender,
    ) -> AppResult<Box<dyn MediaRecorder>>;
}
