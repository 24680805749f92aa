//! Fake devices and recorders for tests

use crate::capture::{
    AudioTrack, MediaDevices, MediaStream, MediaTrack, StreamConstraints, TrackKind, TrackState,
    VideoFrame, VideoSettings, VideoTrack,
};
use crate::recorder::{MediaRecorder, RecorderEvent, RecorderEventSender, RecorderFactory};
use crate::utils::error::{AppError, AppResult};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub struct FakeVideoTrack {
    width: u32,
    height: u32,
    running: AtomicBool,
    frames: AtomicBool,
    stops: AtomicUsize,
}

impl FakeVideoTrack {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            running: AtomicBool::new(true),
            frames: AtomicBool::new(true),
            stops: AtomicUsize::new(0),
        }
    }

    pub fn set_frames_available(&self, available: bool) {
        self.frames.store(available, Ordering::SeqCst);
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl MediaTrack for FakeVideoTrack {
    fn kind(&self) -> TrackKind {
        TrackKind::Video
    }

    fn label(&self) -> String {
        "Fake Camera".to_string()
    }

    fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn state(&self) -> TrackState {
        if self.running.load(Ordering::SeqCst) {
            TrackState::Live
        } else {
            TrackState::Ended
        }
    }
}

impl VideoTrack for FakeVideoTrack {
    fn current_frame(&self) -> Option<VideoFrame> {
        if !self.running.load(Ordering::SeqCst) || !self.frames.load(Ordering::SeqCst) {
            return None;
        }
        Some(VideoFrame {
            width: self.width,
            height: self.height,
            data: [40, 80, 120, 255].repeat((self.width * self.height) as usize),
        })
    }

    fn settings(&self) -> VideoSettings {
        VideoSettings {
            width: self.width,
            height: self.height,
            fps: 30,
        }
    }
}

pub struct FakeAudioTrack {
    running: AtomicBool,
    stops: AtomicUsize,
}

impl FakeAudioTrack {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            stops: AtomicUsize::new(0),
        }
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl MediaTrack for FakeAudioTrack {
    fn kind(&self) -> TrackKind {
        TrackKind::Audio
    }

    fn label(&self) -> String {
        "Fake Microphone".to_string()
    }

    fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn state(&self) -> TrackState {
        if self.running.load(Ordering::SeqCst) {
            TrackState::Live
        } else {
            TrackState::Ended
        }
    }
}

impl AudioTrack for FakeAudioTrack {
    fn sample_rate(&self) -> u32 {
        48_000
    }

    fn channels(&self) -> u16 {
        1
    }

    fn take_samples(&self) -> Vec<f32> {
        vec![0.0; 480]
    }
}

/// A live stream with fake tracks, plus handles to the tracks
pub fn live_stream(
    width: u32,
    height: u32,
    audio: bool,
) -> (MediaStream, Arc<FakeVideoTrack>, Option<Arc<FakeAudioTrack>>) {
    let video = Arc::new(FakeVideoTrack::new(width, height));
    let audio = audio.then(|| Arc::new(FakeAudioTrack::new()));
    let stream = MediaStream::new(
        video.clone(),
        audio.clone().map(|a| a as Arc<dyn AudioTrack>),
    );
    (stream, video, audio)
}

/// Media devices that hand out fake streams and remember every request
pub struct FakeDevices {
    requests: Mutex<Vec<StreamConstraints>>,
    live_at_request: Mutex<Vec<usize>>,
    denial: Mutex<Option<AppError>>,
    deny_all: AtomicBool,
    video_tracks: Mutex<Vec<Arc<FakeVideoTrack>>>,
    audio_tracks: Mutex<Vec<Arc<FakeAudioTrack>>>,
}

impl FakeDevices {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            live_at_request: Mutex::new(Vec::new()),
            denial: Mutex::new(None),
            deny_all: AtomicBool::new(false),
            video_tracks: Mutex::new(Vec::new()),
            audio_tracks: Mutex::new(Vec::new()),
        }
    }

    /// Fail the next request with this error
    pub fn deny_next(&self, error: AppError) {
        *self.denial.lock() = Some(error);
    }

    /// Fail every request with `PermissionDenied`
    pub fn deny_all(&self, deny: bool) {
        self.deny_all.store(deny, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<StreamConstraints> {
        self.requests.lock().clone()
    }

    /// Tracks still live when each request came in
    pub fn live_tracks_at_requests(&self) -> Vec<usize> {
        self.live_at_request.lock().clone()
    }

    pub fn video_tracks(&self) -> Vec<Arc<FakeVideoTrack>> {
        self.video_tracks.lock().clone()
    }

    pub fn audio_tracks(&self) -> Vec<Arc<FakeAudioTrack>> {
        self.audio_tracks.lock().clone()
    }

    /// Tracks that have not been stopped yet
    pub fn live_track_count(&self) -> usize {
        let video = self
            .video_tracks
            .lock()
            .iter()
            .filter(|t| t.state() == TrackState::Live)
            .count();
        let audio = self
            .audio_tracks
            .lock()
            .iter()
            .filter(|t| t.state() == TrackState::Live)
            .count();
        video + audio
    }
}

#[async_trait]
impl MediaDevices for FakeDevices {
    async fn request_stream(&self, constraints: &StreamConstraints) -> AppResult<MediaStream> {
        self.requests.lock().push(constraints.clone());
        let live = self.live_track_count();
        self.live_at_request.lock().push(live);

        if let Some(error) = self.denial.lock().take() {
            return Err(error);
        }
        if self.deny_all.load(Ordering::SeqCst) {
            return Err(AppError::PermissionDenied("camera access blocked".to_string()));
        }

        let video = Arc::new(FakeVideoTrack::new(8, 6));
        self.video_tracks.lock().push(video.clone());

        let audio = if constraints.audio {
            let audio = Arc::new(FakeAudioTrack::new());
            self.audio_tracks.lock().push(audio.clone());
            Some(audio as Arc<dyn AudioTrack>)
        } else {
            None
        };

        Ok(MediaStream::new(video, audio))
    }
}

/// What a fake recorder does when stopped (or started)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeRecorderBehavior {
    /// Deliver `Finalized`
    Finalize,
    /// Deliver `Error`
    ErrorOnStop,
    /// Drop the event channel without finalizing
    CloseOnStop,
    /// Fail `start`
    RefuseStart,
}

/// Recorders that emit scripted chunks on start
pub struct FakeRecorderFactory {
    script: Vec<&'static str>,
    behavior: FakeRecorderBehavior,
    created: AtomicUsize,
    sender: Arc<Mutex<Option<RecorderEventSender>>>,
}

impl FakeRecorderFactory {
    pub fn new(script: &[&'static str]) -> Self {
        Self {
            script: script.to_vec(),
            behavior: FakeRecorderBehavior::Finalize,
            created: AtomicUsize::new(0),
            sender: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_behavior(mut self, behavior: FakeRecorderBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Push a chunk through the most recent recorder
    pub fn emit(&self, chunk: &'static str) {
        if let Some(sender) = self.sender.lock().as_ref() {
            let _ = sender.send(RecorderEvent::Chunk(Bytes::from_static(chunk.as_bytes())));
        }
    }
}

struct FakeRecorder {
    script: Vec<&'static str>,
    behavior: FakeRecorderBehavior,
    sender: Arc<Mutex<Option<RecorderEventSender>>>,
}

impl FakeRecorder {
    fn send(&self, event: RecorderEvent) {
        if let Some(sender) = self.sender.lock().as_ref() {
            let _ = sender.send(event);
        }
    }
}

impl MediaRecorder for FakeRecorder {
    fn start(&mut self) -> AppResult<()> {
        if self.behavior == FakeRecorderBehavior::RefuseStart {
            return Err(AppError::RecorderFailure("encoder unavailable".to_string()));
        }
        for chunk in &self.script {
            self.send(RecorderEvent::Chunk(Bytes::from_static(chunk.as_bytes())));
        }
        Ok(())
    }

    fn stop(&mut self) -> AppResult<()> {
        match self.behavior {
            FakeRecorderBehavior::Finalize | FakeRecorderBehavior::RefuseStart => {
                self.send(RecorderEvent::Finalized)
            }
            FakeRecorderBehavior::ErrorOnStop => {
                self.send(RecorderEvent::Error("encoder crashed".to_string()))
            }
            FakeRecorderBehavior::CloseOnStop => {
                self.sender.lock().take();
            }
        }
        Ok(())
    }

    fn mime_type(&self) -> &str {
        crate::library::VIDEO_MIME_TYPE
    }
}

impl RecorderFactory for FakeRecorderFactory {
    fn create(
        &self,
        _stream: &MediaStream,
        events: RecorderEventSender,
    ) -> AppResult<Box<dyn MediaRecorder>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        *self.sender.lock() = Some(events);
        Ok(Box::new(FakeRecorder {
            script: self.script.clone(),
            behavior: self.behavior,
            sender: self.sender.clone(),
        }))
    }
}
