//! Camera widget
//!
//! Composes the stream controller, capture engine and media library behind
//! the operations the frontend invokes.

use crate::capture::{CaptureMode, MediaDevices, VideoFrame};
use crate::config::{CameraConfig, PersistenceMode};
use crate::gallery::WidgetView;
use crate::library::{JsonFileStore, MediaItem, MediaLibrary, ObjectUrlRegistry};
use crate::recorder::{CaptureEngine, RecorderFactory, RecordingState};
use crate::stream::{CameraStatus, StreamController};
use crate::utils::error::{AppError, AppResult};
use std::sync::Arc;
use uuid::Uuid;

/// Shown when a recording cannot start
pub const START_RECORDING_ALERT: &str =
    "Failed to start recording. Please make sure camera access is granted.";

pub struct CameraWidget {
    mode: CaptureMode,
    controller: StreamController,
    engine: CaptureEngine,
    library: MediaLibrary,
    selected: Option<Uuid>,
    alert: Option<String>,
}

impl CameraWidget {
    /// Assemble a widget around an existing library.
    ///
    /// Recorded clips get their object URLs from the library's registry.
    pub fn new(
        config: CameraConfig,
        devices: Arc<dyn MediaDevices>,
        recorders: Arc<dyn RecorderFactory>,
        library: MediaLibrary,
    ) -> Self {
        let engine = CaptureEngine::new(recorders, library.url_registry().clone());
        Self {
            mode: CaptureMode::default(),
            controller: StreamController::new(devices, config),
            engine,
            library,
            selected: None,
            alert: None,
        }
    }

    /// Build the library the config asks for, then the widget
    pub fn from_config(
        config: CameraConfig,
        devices: Arc<dyn MediaDevices>,
        recorders: Arc<dyn RecorderFactory>,
    ) -> AppResult<Self> {
        config.validate()?;

        let urls = Arc::new(ObjectUrlRegistry::new());
        let library = match config.persistence {
            PersistenceMode::Persistent => {
                let path = config.resolved_store_path()?;
                let store = Arc::new(JsonFileStore::open(&path)?);
                tracing::info!("Media library stored at {}", path.display());
                MediaLibrary::persistent(store, &config.storage_key, urls)
            }
            PersistenceMode::Volatile => MediaLibrary::volatile(urls),
        };

        Ok(Self::new(config, devices, recorders, library))
    }

    /// Acquire a stream for the current mode.
    ///
    /// Failures are logged only; the preview stays empty.
    pub async fn start(&mut self) {
        if let Err(e) = self.controller.acquire(self.mode).await {
            tracing::error!("Error accessing camera: {}", e);
        }
    }

    /// Stop any recording, release the camera and revoke every object URL
    pub async fn shutdown(&mut self) {
        if self.engine.is_recording() {
            if let Err(e) = self.stop_recording().await {
                tracing::warn!("Recording lost during shutdown: {}", e);
            }
        }
        self.controller.release();
        self.selected = None;

        let revoked = self.library.url_registry().revoke_all();
        tracing::info!("Camera widget shut down ({} object URL(s) revoked)", revoked);
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    /// Switch mode and re-acquire so the microphone follows it.
    ///
    /// A recording in progress is finished and kept first.
    pub async fn set_mode(&mut self, mode: CaptureMode) {
        if self.engine.is_recording() {
            if let Err(e) = self.stop_recording().await {
                tracing::warn!("Recording lost on mode switch: {}", e);
            }
        }

        self.mode = mode;
        if let Err(e) = self.controller.switch_mode(mode).await {
            tracing::error!("Error accessing camera: {}", e);
        }
    }

    /// Snapshot the preview and append the photo
    pub fn capture_photo(&mut self) -> AppResult<MediaItem> {
        let stream = self.controller.stream().ok_or(AppError::NoActiveStream)?;
        let item = self.engine.capture_photo(&stream)?;
        self.library.append(item.clone());
        Ok(item)
    }

    /// Start recording, acquiring a stream first if none is bound.
    ///
    /// On failure the alert is set and the engine stays Idle.
    pub async fn start_recording(&mut self) -> AppResult<()> {
        if self.engine.is_recording() {
            return Err(AppError::AlreadyRecording);
        }

        let stream = match self.controller.stream() {
            Some(stream) => Some(stream),
            None => {
                tracing::debug!("No stream bound; acquiring before recording");
                match self.controller.acquire(self.mode).await {
                    Ok(stream) => Some(stream),
                    Err(e) => {
                        tracing::error!("Error accessing camera: {}", e);
                        None
                    }
                }
            }
        };

        let result = match stream {
            Some(stream) => self.engine.start(&stream),
            None => Err(AppError::NoActiveStream),
        };

        if let Err(e) = &result {
            tracing::error!("Error starting recording: {}", e);
            self.alert = Some(START_RECORDING_ALERT.to_string());
        }
        result
    }

    /// Stop recording and append the clip. A no-op when idle.
    pub async fn stop_recording(&mut self) -> AppResult<Option<MediaItem>> {
        let item = self.engine.stop().await?;
        if let Some(item) = &item {
            self.library.append(item.clone());
        }
        Ok(item)
    }

    /// Start when idle, stop when recording
    pub async fn toggle_recording(&mut self) -> AppResult<Option<MediaItem>> {
        if self.engine.is_recording() {
            self.stop_recording().await
        } else {
            self.start_recording().await.map(|_| None)
        }
    }

    pub fn recording_state(&self) -> RecordingState {
        self.engine.state()
    }

    /// Delete by gallery position
    pub fn delete_item(&mut self, index: usize) -> Option<MediaItem> {
        let removed = self.library.remove_at(index)?;
        self.forget_selection(removed.id);
        Some(removed)
    }

    /// Delete by id; a repeated delete of the same id changes nothing
    pub fn delete(&mut self, id: Uuid) -> Option<MediaItem> {
        let removed = self.library.remove(id)?;
        self.forget_selection(removed.id);
        Some(removed)
    }

    fn forget_selection(&mut self, id: Uuid) {
        if self.selected == Some(id) {
            self.selected = None;
        }
    }

    /// Show an item in the preview overlay; unknown ids are ignored
    pub fn select(&mut self, id: Uuid) -> bool {
        if self.library.position(id).is_some() {
            self.selected = Some(id);
            true
        } else {
            false
        }
    }

    pub fn deselect(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<Uuid> {
        self.selected
    }

    pub fn library(&self) -> &MediaLibrary {
        &self.library
    }

    pub fn status(&self) -> CameraStatus {
        self.controller.status()
    }

    pub fn preview_frame(&self) -> Option<VideoFrame> {
        self.controller.preview_frame()
    }

    /// The pending alert, cleared once taken
    pub fn take_alert(&mut self) -> Option<String> {
        self.alert.take()
    }

    pub fn view(&self) -> WidgetView {
        WidgetView::build(
            self.mode,
            self.engine.state(),
            &self.library.items(),
            self.selected,
            self.controller.status(),
            self.alert.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::CaptureControl;
    use crate::library::{KeyValueStore, MediaKind, MemoryStore, DEFAULT_STORAGE_KEY};
    use crate::testing::{FakeDevices, FakeRecorderBehavior, FakeRecorderFactory};

    struct Harness {
        widget: CameraWidget,
        devices: Arc<FakeDevices>,
        recorders: Arc<FakeRecorderFactory>,
    }

    fn harness_with(factory: FakeRecorderFactory, library: MediaLibrary) -> Harness {
        let devices = Arc::new(FakeDevices::new());
        let recorders = Arc::new(factory);
        let widget = CameraWidget::new(
            CameraConfig::default(),
            devices.clone(),
            recorders.clone(),
            library,
        );
        Harness {
            widget,
            devices,
            recorders,
        }
    }

    fn harness() -> Harness {
        harness_with(
            FakeRecorderFactory::new(&["chunk-1", "chunk-2"]),
            MediaLibrary::volatile(Arc::new(ObjectUrlRegistry::new())),
        )
    }

    #[tokio::test]
    async fn test_end_to_end_capture_and_delete() {
        let mut h = harness();
        h.widget.start().await;

        let first = h.widget.capture_photo().unwrap();
        let second = h.widget.capture_photo().unwrap();
        let items = h.widget.library().items();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.kind == MediaKind::Photo));
        assert_eq!(items[0].id, first.id);
        assert_eq!(items[1].id, second.id);

        h.widget.set_mode(CaptureMode::Video).await;
        h.widget.start_recording().await.unwrap();
        let clip = h.widget.stop_recording().await.unwrap().unwrap();
        assert_eq!(clip.blob.as_deref(), Some(&b"chunk-1chunk-2"[..]));

        let items = h.widget.library().items();
        assert_eq!(items.len(), 3);
        assert_eq!(items[2].id, clip.id);
        assert_eq!(items[2].kind, MediaKind::Video);

        let urls = h.widget.library().url_registry().clone();
        assert!(urls.contains(&clip.url));

        let removed = h.widget.delete_item(2).unwrap();
        assert_eq!(removed.id, clip.id);
        let items = h.widget.library().items();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.kind == MediaKind::Photo));
        assert!(!urls.contains(&clip.url));
        assert_eq!(urls.revocations(), 1);
    }

    #[tokio::test]
    async fn test_audio_follows_mode() {
        let mut h = harness();
        h.widget.start().await;
        h.widget.set_mode(CaptureMode::Video).await;
        h.widget.set_mode(CaptureMode::Photo).await;

        let audio: Vec<bool> = h.devices.requests().iter().map(|c| c.audio).collect();
        assert_eq!(audio, vec![false, true, false]);
        assert!(h.devices.requests().iter().all(|c| c.video));

        // Every earlier stream was released before the next one was bound
        assert_eq!(h.devices.live_track_count(), 1);
        let videos = h.devices.video_tracks();
        assert!(videos[..2].iter().all(|t| t.stop_count() == 1));
        assert_eq!(h.devices.audio_tracks()[0].stop_count(), 1);
        assert!(!h.widget.status().has_audio);
    }

    #[tokio::test]
    async fn test_start_recording_acquires_lazily() {
        let mut h = harness();
        h.widget.set_mode(CaptureMode::Video).await;
        h.widget.controller.release();
        assert!(!h.widget.status().streaming);

        h.widget.start_recording().await.unwrap();
        assert_eq!(h.widget.recording_state(), RecordingState::Recording);
        assert_eq!(h.devices.requests().len(), 2);
        assert!(h.widget.take_alert().is_none());
    }

    #[tokio::test]
    async fn test_start_recording_without_camera_alerts() {
        let mut h = harness();
        h.devices.deny_all(true);
        h.widget.start().await;
        h.widget.set_mode(CaptureMode::Video).await;

        let result = h.widget.start_recording().await;
        assert!(matches!(result, Err(AppError::NoActiveStream)));
        assert_eq!(h.widget.recording_state(), RecordingState::Idle);
        assert_eq!(h.recorders.created(), 0);
        assert_eq!(h.widget.view().alert.as_deref(), Some(START_RECORDING_ALERT));
        assert_eq!(h.widget.take_alert().as_deref(), Some(START_RECORDING_ALERT));
        assert!(h.widget.take_alert().is_none());
    }

    #[tokio::test]
    async fn test_start_while_recording_is_rejected() {
        let mut h = harness();
        h.widget.set_mode(CaptureMode::Video).await;
        h.widget.start_recording().await.unwrap();

        let result = h.widget.start_recording().await;
        assert!(matches!(result, Err(AppError::AlreadyRecording)));
        assert_eq!(h.recorders.created(), 1);
        assert_eq!(h.widget.recording_state(), RecordingState::Recording);
    }

    #[tokio::test]
    async fn test_stop_when_idle_is_noop() {
        let mut h = harness();
        h.widget.start().await;
        h.widget.capture_photo().unwrap();

        assert!(h.widget.stop_recording().await.unwrap().is_none());
        assert_eq!(h.widget.recording_state(), RecordingState::Idle);
        assert_eq!(h.widget.library().len(), 1);
    }

    #[tokio::test]
    async fn test_toggle_recording() {
        let mut h = harness();
        h.widget.set_mode(CaptureMode::Video).await;

        assert!(h.widget.toggle_recording().await.unwrap().is_none());
        assert!(matches!(
            h.widget.view().control,
            CaptureControl::Record { recording: true, .. }
        ));

        let clip = h.widget.toggle_recording().await.unwrap();
        assert!(clip.is_some());
        assert_eq!(h.widget.recording_state(), RecordingState::Idle);
        assert_eq!(h.widget.library().len(), 1);
    }

    #[tokio::test]
    async fn test_recorder_failure_leaves_library_unchanged() {
        let mut h = harness_with(
            FakeRecorderFactory::new(&["partial"]).with_behavior(FakeRecorderBehavior::ErrorOnStop),
            MediaLibrary::volatile(Arc::new(ObjectUrlRegistry::new())),
        );
        h.widget.set_mode(CaptureMode::Video).await;
        h.widget.start_recording().await.unwrap();

        let result = h.widget.stop_recording().await;
        assert!(matches!(result, Err(AppError::RecorderFailure(_))));
        assert_eq!(h.widget.recording_state(), RecordingState::Idle);
        assert!(h.widget.library().is_empty());
    }

    #[tokio::test]
    async fn test_deleting_selected_item_clears_selection() {
        let mut h = harness();
        h.widget.start().await;
        let first = h.widget.capture_photo().unwrap();
        let second = h.widget.capture_photo().unwrap();

        assert!(h.widget.select(second.id));
        assert_eq!(h.widget.view().preview.map(|p| p.id), Some(second.id));

        h.widget.delete(first.id).unwrap();
        assert_eq!(h.widget.selected(), Some(second.id));

        h.widget.delete(second.id).unwrap();
        assert!(h.widget.selected().is_none());
        assert!(h.widget.view().preview.is_none());
    }

    #[tokio::test]
    async fn test_repeated_delete_by_id_removes_only_that_item() {
        let mut h = harness();
        h.widget.start().await;
        let a = h.widget.capture_photo().unwrap();
        let b = h.widget.capture_photo().unwrap();
        let c = h.widget.capture_photo().unwrap();

        assert_eq!(h.widget.delete(b.id).map(|item| item.id), Some(b.id));
        assert!(h.widget.delete(b.id).is_none());

        let ids: Vec<Uuid> = h.widget.library().items().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![a.id, c.id]);
        let cells: Vec<Uuid> = h.widget.view().gallery.iter().map(|cell| cell.id).collect();
        assert_eq!(cells, vec![a.id, c.id]);
    }

    #[tokio::test]
    async fn test_select_unknown_and_deselect() {
        let mut h = harness();
        h.widget.start().await;
        let photo = h.widget.capture_photo().unwrap();

        assert!(!h.widget.select(Uuid::now_v7()));
        assert!(h.widget.selected().is_none());

        h.widget.select(photo.id);
        h.widget.deselect();
        assert!(h.widget.selected().is_none());
        assert!(h.widget.delete_item(5).is_none());
    }

    #[tokio::test]
    async fn test_capture_photo_without_stream() {
        let mut h = harness();
        let result = h.widget.capture_photo();
        assert!(matches!(result, Err(AppError::NoActiveStream)));
        assert!(h.widget.library().is_empty());
    }

    #[tokio::test]
    async fn test_mode_switch_finishes_recording() {
        let mut h = harness();
        h.widget.set_mode(CaptureMode::Video).await;
        h.widget.start_recording().await.unwrap();

        h.widget.set_mode(CaptureMode::Photo).await;
        assert_eq!(h.widget.recording_state(), RecordingState::Idle);
        assert_eq!(h.widget.library().items()[0].kind, MediaKind::Video);
    }

    #[tokio::test]
    async fn test_shutdown_keeps_clip_and_revokes_urls() {
        let store = Arc::new(MemoryStore::new());
        let urls = Arc::new(ObjectUrlRegistry::new());
        let library = MediaLibrary::persistent(store.clone(), DEFAULT_STORAGE_KEY, urls.clone());
        let mut h = harness_with(FakeRecorderFactory::new(&["clip"]), library);

        h.widget.set_mode(CaptureMode::Video).await;
        h.widget.start_recording().await.unwrap();
        h.widget.shutdown().await;

        assert_eq!(h.devices.live_track_count(), 0);
        assert!(urls.is_empty());
        assert!(!h.widget.status().streaming);

        let raw = store.get(DEFAULT_STORAGE_KEY).unwrap().unwrap();
        assert!(raw.contains("\"type\":\"video\""));
    }

    #[tokio::test]
    async fn test_reload_restores_library() {
        let store = Arc::new(MemoryStore::new());
        let mut h = harness_with(
            FakeRecorderFactory::new(&["abc"]),
            MediaLibrary::persistent(
                store.clone(),
                DEFAULT_STORAGE_KEY,
                Arc::new(ObjectUrlRegistry::new()),
            ),
        );
        h.widget.start().await;
        let photo = h.widget.capture_photo().unwrap();
        h.widget.set_mode(CaptureMode::Video).await;
        h.widget.start_recording().await.unwrap();
        let clip = h.widget.stop_recording().await.unwrap().unwrap();
        h.widget.shutdown().await;

        let urls = Arc::new(ObjectUrlRegistry::new());
        let reloaded = MediaLibrary::persistent(store, DEFAULT_STORAGE_KEY, urls.clone());
        let items = reloaded.items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, photo.id);
        assert_eq!(items[0].url, photo.url);
        assert_eq!(items[0].timestamp, photo.timestamp);
        assert_eq!(items[1].id, clip.id);
        assert_eq!(items[1].timestamp, clip.timestamp);

        let (bytes, mime) = urls.resolve(&items[1].url).unwrap();
        assert_eq!(&bytes[..], b"abc");
        assert_eq!(mime, "video/webm");
    }

    #[tokio::test]
    async fn test_from_config_volatile() {
        let config = CameraConfig {
            persistence: PersistenceMode::Volatile,
            ..CameraConfig::default()
        };
        let widget = CameraWidget::from_config(
            config,
            Arc::new(FakeDevices::new()),
            Arc::new(FakeRecorderFactory::new(&[])),
        )
        .unwrap();
        assert!(!widget.library().is_persistent());
        assert_eq!(widget.mode(), CaptureMode::Photo);
    }

    #[tokio::test]
    async fn test_from_config_persistent_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = CameraConfig {
            store_path: Some(dir.path().join("store.json")),
            ..CameraConfig::default()
        };

        let mut widget = CameraWidget::from_config(
            config.clone(),
            Arc::new(FakeDevices::new()),
            Arc::new(FakeRecorderFactory::new(&[])),
        )
        .unwrap();
        widget.start().await;
        widget.capture_photo().unwrap();
        widget.shutdown().await;

        let reopened = CameraWidget::from_config(
            config,
            Arc::new(FakeDevices::new()),
            Arc::new(FakeRecorderFactory::new(&[])),
        )
        .unwrap();
        assert!(reopened.library().is_persistent());
        assert_eq!(reopened.library().len(), 1);
    }

    #[tokio::test]
    async fn test_from_config_recovers_from_corrupt_store_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{\"cameraMediaItems\": [trunc").unwrap();
        let config = CameraConfig {
            store_path: Some(path),
            ..CameraConfig::default()
        };

        let mut widget = CameraWidget::from_config(
            config.clone(),
            Arc::new(FakeDevices::new()),
            Arc::new(FakeRecorderFactory::new(&[])),
        )
        .unwrap();
        assert!(widget.library().is_persistent());
        assert!(widget.library().is_empty());

        widget.start().await;
        let photo = widget.capture_photo().unwrap();
        widget.shutdown().await;

        let reopened = CameraWidget::from_config(
            config,
            Arc::new(FakeDevices::new()),
            Arc::new(FakeRecorderFactory::new(&[])),
        )
        .unwrap();
        let ids: Vec<Uuid> = reopened.library().items().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![photo.id]);
    }
}
