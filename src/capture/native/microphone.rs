//! Microphone track using cpal
//!
//! cpal streams are not `Send`, so the input stream lives on its own thread
//! until the track is stopped. Stopping waits for the stream to be dropped.

use super::worker::DeviceThread;
use crate::capture::traits::{AudioTrack, MediaTrack, TrackKind, TrackState};
use crate::utils::error::{AppError, AppResult};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// Seconds of audio kept when nobody drains the track
const MAX_BUFFERED_SECONDS: usize = 10;

/// Append samples, dropping the oldest beyond the cap
fn push_bounded(buffer: &Mutex<Vec<f32>>, samples: impl IntoIterator<Item = f32>, cap: usize) {
    let mut guard = buffer.lock();
    guard.extend(samples);
    if guard.len() > cap {
        let excess = guard.len() - cap;
        guard.drain(..excess);
    }
}

/// Live microphone track backed by a cpal input stream
pub struct CpalAudioTrack {
    label: String,
    sample_rate: u32,
    channels: u16,
    capture: DeviceThread,
    samples: Arc<Mutex<Vec<f32>>>,
}

impl CpalAudioTrack {
    /// Open the default input device
    pub async fn open() -> AppResult<Self> {
        let samples: Arc<Mutex<Vec<f32>>> = Arc::new(Mutex::new(Vec::new()));
        let (ready_tx, ready_rx) = oneshot::channel::<AppResult<(String, u32, u16)>>();

        let thread_samples = samples.clone();

        let capture = DeviceThread::spawn(move |running| {
            let host = cpal::default_host();
            let device = match host.default_input_device() {
                Some(d) => d,
                None => {
                    let _ = ready_tx.send(Err(AppError::DeviceNotFound(
                        "No microphone available".to_string(),
                    )));
                    return;
                }
            };
            let label = device.name().unwrap_or_else(|_| "Microphone".to_string());

            let supported = match device.default_input_config() {
                Ok(c) => c,
                Err(e) => {
                    let _ = ready_tx.send(Err(AppError::PermissionDenied(format!(
                        "Cannot query microphone '{}': {}",
                        label, e
                    ))));
                    return;
                }
            };

            let sample_rate = supported.sample_rate().0;
            let channels = supported.channels();
            let cap = sample_rate as usize * channels as usize * MAX_BUFFERED_SECONDS;
            let config: cpal::StreamConfig = supported.config();
            let err_fn = |e| tracing::warn!("Microphone stream error: {}", e);

            let buffer = thread_samples.clone();
            let stream = match supported.sample_format() {
                cpal::SampleFormat::F32 => device.build_input_stream(
                    &config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        push_bounded(&buffer, data.iter().copied(), cap)
                    },
                    err_fn,
                    None,
                ),
                cpal::SampleFormat::I16 => device.build_input_stream(
                    &config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        push_bounded(
                            &buffer,
                            data.iter().map(|s| *s as f32 / i16::MAX as f32),
                            cap,
                        )
                    },
                    err_fn,
                    None,
                ),
                cpal::SampleFormat::U16 => device.build_input_stream(
                    &config,
                    move |data: &[u16], _: &cpal::InputCallbackInfo| {
                        push_bounded(
                            &buffer,
                            data.iter().map(|s| (*s as f32 - 32768.0) / 32768.0),
                            cap,
                        )
                    },
                    err_fn,
                    None,
                ),
                other => {
                    let _ = ready_tx.send(Err(AppError::Platform(format!(
                        "Unsupported microphone sample format {:?}",
                        other
                    ))));
                    return;
                }
            };

            let stream = match stream {
                Ok(s) => s,
                Err(cpal::BuildStreamError::DeviceNotAvailable) => {
                    let _ = ready_tx.send(Err(AppError::DeviceNotFound(format!(
                        "Microphone '{}' is not available",
                        label
                    ))));
                    return;
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(AppError::PermissionDenied(format!(
                        "Cannot open microphone '{}': {}",
                        label, e
                    ))));
                    return;
                }
            };

            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(AppError::Platform(format!(
                    "Cannot start microphone '{}': {}",
                    label, e
                ))));
                return;
            }

            tracing::info!(
                "Microphone '{}' opened: {}Hz, {} channel(s)",
                label,
                sample_rate,
                channels
            );

            if ready_tx.send(Ok((label, sample_rate, channels))).is_err() {
                return;
            }

            while running.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(20));
            }

            drop(stream);
            tracing::info!("Microphone capture thread stopped");
        });

        let (label, sample_rate, channels) = ready_rx.await.map_err(|_| {
            AppError::Platform("Microphone thread exited during startup".to_string())
        })??;

        Ok(Self {
            label,
            sample_rate,
            channels,
            capture,
            samples,
        })
    }
}

impl MediaTrack for CpalAudioTrack {
    fn kind(&self) -> TrackKind {
        TrackKind::Audio
    }

    fn label(&self) -> String {
        self.label.clone()
    }

    fn stop(&self) {
        if self.capture.is_running() {
            tracing::debug!("Stopping microphone track '{}'", self.label);
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

impl AudioTrack for CpalAudioTrack {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn take_samples(&self) -> Vec<f32> {
        std::mem::take(&mut *self.samples.lock())
    }
}
