//! Capture engine
//!
//! Takes still photos from the live frame and drives the recorder through
//! the Idle/Recording state machine, accumulating its chunks into a clip.

use super::channel::{MediaRecorder, RecorderEvent, RecorderEventReceiver, RecorderFactory};
use super::state::{RecordingSession, RecordingState};
use crate::capture::{FrameSurface, MediaStream};
use crate::library::{MediaItem, ObjectUrlRegistry};
use crate::utils::error::{AppError, AppResult};
use bytes::{Bytes, BytesMut};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

/// How long `stop` waits for the recorder to finalize
const FINALIZE_TIMEOUT: Duration = Duration::from_secs(30);

/// Events emitted during recording
#[derive(Debug, Clone, PartialEq)]
pub enum RecordingEvent {
    /// Recording started
    Started,
    /// Recording stopped and produced a clip of this many bytes
    Stopped(usize),
    /// Error occurred
    Error(String),
}

struct ActiveRecording {
    session: RecordingSession,
    recorder: Box<dyn MediaRecorder>,
    collector: JoinHandle<Result<Vec<Bytes>, String>>,
}

/// Collect non-empty chunks in arrival order until the recorder finalizes
async fn collect_chunks(mut events: RecorderEventReceiver) -> Result<Vec<Bytes>, String> {
    let mut chunks = Vec::new();
    while let Some(event) = events.recv().await {
        match event {
            RecorderEvent::Chunk(chunk) => {
                if !chunk.is_empty() {
                    chunks.push(chunk);
                }
            }
            RecorderEvent::Finalized => return Ok(chunks),
            RecorderEvent::Error(message) => return Err(message),
        }
    }
    Err("Recorder closed without finalizing".to_string())
}

/// Concatenate chunks into one container
fn concat_chunks(chunks: &[Bytes]) -> Bytes {
    let total = chunks.iter().map(Bytes::len).sum();
    let mut container = BytesMut::with_capacity(total);
    for chunk in chunks {
        container.extend_from_slice(chunk);
    }
    container.freeze()
}

pub struct CaptureEngine {
    factory: Arc<dyn RecorderFactory>,
    urls: Arc<ObjectUrlRegistry>,
    state: RecordingState,
    active: Option<ActiveRecording>,
    event_tx: broadcast::Sender<RecordingEvent>,
}

impl CaptureEngine {
    pub fn new(factory: Arc<dyn RecorderFactory>, urls: Arc<ObjectUrlRegistry>) -> Self {
        let (event_tx, _) = broadcast::channel(32);
        Self {
            factory,
            urls,
            state: RecordingState::Idle,
            active: None,
            event_tx,
        }
    }

    /// Subscribe to recording events
    pub fn subscribe(&self) -> broadcast::Receiver<RecordingEvent> {
        self.event_tx.subscribe()
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecordingState::Recording
    }

    /// The running session, if any
    pub fn session(&self) -> Option<&RecordingSession> {
        self.active.as_ref().map(|a| &a.session)
    }

    /// Rasterize the current frame and encode it as a photo
    pub fn capture_photo(&self, stream: &MediaStream) -> AppResult<MediaItem> {
        let frame = stream
            .current_frame()
            .ok_or_else(|| AppError::Capture("No camera frame available".to_string()))?;

        let surface = FrameSurface::from_frame(&frame)?;
        let item = MediaItem::photo(surface.to_data_url()?);

        tracing::debug!("Captured {}x{} photo {}", frame.width, frame.height, item.id);
        Ok(item)
    }

    /// Idle -> Recording
    pub fn start(&mut self, stream: &MediaStream) -> AppResult<()> {
        if self.state != RecordingState::Idle {
            return Err(AppError::AlreadyRecording);
        }
        if !stream.is_live() {
            return Err(AppError::NoActiveStream);
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let mut recorder = self.factory.create(stream, events_tx)?;
        let collector = tokio::spawn(collect_chunks(events_rx));

        if let Err(e) = recorder.start() {
            collector.abort();
            let _ = self.event_tx.send(RecordingEvent::Error(e.to_string()));
            return Err(e);
        }

        let session = RecordingSession::new(recorder.mime_type());
        tracing::info!(
            "Recording {} started on stream {} ({})",
            session.id,
            stream.id(),
            session.mime_type
        );

        self.active = Some(ActiveRecording {
            session,
            recorder,
            collector,
        });
        self.state = RecordingState::Recording;
        let _ = self.event_tx.send(RecordingEvent::Started);
        Ok(())
    }

    /// Recording -> Idle, returning the finished clip.
    ///
    /// A no-op returning `None` when not recording. The engine is Idle again
    /// when this returns, whether or not the recorder finalized cleanly.
    pub async fn stop(&mut self) -> AppResult<Option<MediaItem>> {
        let Some(mut active) = self.active.take() else {
            tracing::debug!("Stop requested while idle; ignoring");
            return Ok(None);
        };
        self.state = RecordingState::Idle;

        let urls = self.urls.clone();
        let result = Self::finalize(&urls, &mut active).await;
        match &result {
            Ok(item) => {
                tracing::info!(
                    "Recording {} stopped after {}ms: {} bytes",
                    active.session.id,
                    active.session.duration_ms(),
                    item.blob_size()
                );
                let _ = self.event_tx.send(RecordingEvent::Stopped(item.blob_size()));
            }
            Err(e) => {
                tracing::error!("Recording {} failed: {}", active.session.id, e);
                let _ = self.event_tx.send(RecordingEvent::Error(e.to_string()));
            }
        }
        result.map(Some)
    }

    async fn finalize(
        urls: &ObjectUrlRegistry,
        active: &mut ActiveRecording,
    ) -> AppResult<MediaItem> {
        if let Err(e) = active.recorder.stop() {
            active.collector.abort();
            return Err(e);
        }

        let chunks = match tokio::time::timeout(FINALIZE_TIMEOUT, &mut active.collector).await {
            Ok(Ok(Ok(chunks))) => chunks,
            Ok(Ok(Err(message))) => return Err(AppError::RecorderFailure(message)),
            Ok(Err(join_error)) => return Err(AppError::RecorderFailure(join_error.to_string())),
            Err(_) => {
                active.collector.abort();
                return Err(AppError::RecorderFailure(format!(
                    "Recorder did not finalize within {}s",
                    FINALIZE_TIMEOUT.as_secs()
                )));
            }
        };
        active.session.end();

        if chunks.is_empty() {
            return Err(AppError::RecorderFailure(
                "Recorder produced no data".to_string(),
            ));
        }

        let blob = concat_chunks(&chunks);
        let mime_type = active.session.mime_type.clone();
        let url = urls.create(blob.clone(), &mime_type);
        tracing::debug!("Assembled clip from {} chunk(s)", chunks.len());

        Ok(MediaItem::video(blob, url, &mime_type))
    }
}

impl Drop for CaptureEngine {
    fn drop(&mut self) {
        if let Some(mut active) = self.active.take() {
            tracing::warn!("Dropping engine with recording {} in progress", active.session.id);
            let _ = active.recorder.stop();
            active.collector.abort();
        }
    }
}
