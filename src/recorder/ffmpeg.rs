//! FFmpeg-backed recorder
//!
//! Raw RGBA frames are pumped from the camera track into ffmpeg's stdin at the
//! track's frame rate. When the stream carries a microphone, PCM is served to
//! ffmpeg over a loopback TCP input. ffmpeg writes WebM to stdout, which is
//! read back in chunks and delivered as recorder events.

use super::channel::{MediaRecorder, RecorderEvent, RecorderEventSender, RecorderFactory};
use crate::capture::{AudioTrack, MediaStream, MediaTrack, TrackState, VideoTrack};
use crate::library::VIDEO_MIME_TYPE;
use crate::utils::error::{AppError, AppResult};
use bytes::Bytes;
use std::io::{ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Size of the reads from ffmpeg's stdout
const CHUNK_SIZE: usize = 64 * 1024;

/// How often buffered microphone samples are forwarded
const AUDIO_INTERVAL: Duration = Duration::from_millis(20);

/// Audio input parameters for the ffmpeg command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioInput {
    pub sample_rate: u32,
    pub channels: u16,
    pub port: u16,
}

/// Kill ffmpeg and wait for it so no zombie is left behind
fn kill_and_reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        tracing::debug!("FFmpeg already exited: {}", e);
    }
    if let Err(e) = child.wait() {
        tracing::warn!("Failed to reap FFmpeg: {}", e);
    }
}

/// Build the ffmpeg arguments for a WebM recording on stdout
pub fn build_args(width: u32, height: u32, fps: u32, audio: Option<AudioInput>) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        // Input 0: raw frames from stdin
        "-f".into(),
        "rawvideo".into(),
        "-pixel_format".into(),
        "rgba".into(),
        "-video_size".into(),
        format!("{}x{}", width, height),
        "-framerate".into(),
        fps.to_string(),
        "-i".into(),
        "pipe:0".into(),
    ];

    if let Some(audio) = audio {
        // Input 1: interleaved f32 PCM over loopback TCP
        args.extend([
            "-f".into(),
            "f32le".into(),
            "-ar".into(),
            audio.sample_rate.to_string(),
            "-ac".into(),
            audio.channels.to_string(),
            "-i".into(),
            format!("tcp://127.0.0.1:{}", audio.port),
        ]);
    }

    args.extend([
        "-map".into(),
        "0:v".into(),
        "-c:v".into(),
        "libvpx".into(),
        "-deadline".into(),
        "realtime".into(),
        "-cpu-used".into(),
        "8".into(),
        "-b:v".into(),
        "2M".into(),
        "-pix_fmt".into(),
        "yuv420p".into(),
    ]);

    if audio.is_some() {
        args.extend([
            "-map".into(),
            "1:a".into(),
            "-c:a".into(),
            "libopus".into(),
            "-b:a".into(),
            "128k".into(),
        ]);
    }

    args.extend([
        "-f".into(),
        "webm".into(),
        "-cluster_time_limit".into(),
        "1000".into(),
        "pipe:1".into(),
    ]);

    args
}

/// Creates ffmpeg recorders
#[derive(Debug, Clone)]
pub struct FfmpegRecorderFactory {
    ffmpeg_path: String,
}

impl FfmpegRecorderFactory {
    pub fn new(ffmpeg_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }
}

impl Default for FfmpegRecorderFactory {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl RecorderFactory for FfmpegRecorderFactory {
    fn create(
        &self,
        stream: &MediaStream,
        events: RecorderEventSender,
    ) -> AppResult<Box<dyn MediaRecorder>> {
        Ok(Box::new(FfmpegRecorder {
            ffmpeg_path: self.ffmpeg_path.clone(),
            video: stream.video().clone(),
            audio: stream.audio().cloned(),
            events,
            running: Arc::new(AtomicBool::new(false)),
            threads: Vec::new(),
        }))
    }
}

/// One ffmpeg encoding process
pub struct FfmpegRecorder {
    ffmpeg_path: String,
    video: Arc<dyn VideoTrack>,
    audio: Option<Arc<dyn AudioTrack>>,
    events: RecorderEventSender,
    running: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
}

impl FfmpegRecorder {
    fn spawn_frame_pump(&self, mut stdin: ChildStdin, width: u32, height: u32, fps: u32) -> JoinHandle<()> {
        let video = self.video.clone();
        let running = self.running.clone();
        let interval = Duration::from_secs_f64(1.0 / fps.max(1) as f64);

        std::thread::spawn(move || {
            let mut next_tick = Instant::now();
            let mut frames: u64 = 0;

            while running.load(Ordering::SeqCst) && video.state() == TrackState::Live {
                if let Some(frame) = video.current_frame() {
                    if frame.width == width && frame.height == height {
                        if let Err(e) = stdin.write_all(&frame.data) {
                            tracing::warn!("ffmpeg stopped accepting frames: {}", e);
                            break;
                        }
                        frames += 1;
                    } else {
                        tracing::debug!(
                            "Skipping {}x{} frame (recording {}x{})",
                            frame.width,
                            frame.height,
                            width,
                            height
                        );
                    }
                }

                next_tick += interval;
                let now = Instant::now();
                if next_tick > now {
                    std::thread::sleep(next_tick - now);
                } else {
                    next_tick = now;
                }
            }

            // Closing stdin lets ffmpeg flush and finish the container
            drop(stdin);
            tracing::debug!("Frame pump wrote {} frames", frames);
        })
    }

    fn spawn_audio_server(&self, listener: TcpListener, audio: Arc<dyn AudioTrack>) -> JoinHandle<()> {
        let running = self.running.clone();

        std::thread::spawn(move || {
            let mut socket: Option<TcpStream> = None;

            while running.load(Ordering::SeqCst) && audio.state() == TrackState::Live {
                match socket.as_mut() {
                    None => match listener.accept() {
                        Ok((stream, _)) => {
                            let _ = stream.set_nodelay(true);
                            // Drop what queued up while ffmpeg was starting
                            audio.take_samples();
                            socket = Some(stream);
                        }
                        Err(e) if e.kind() == ErrorKind::WouldBlock => {}
                        Err(e) => {
                            tracing::warn!("Audio input accept failed: {}", e);
                            break;
                        }
                    },
                    Some(stream) => {
                        let samples = audio.take_samples();
                        if !samples.is_empty() {
                            let bytes: Vec<u8> =
                                samples.iter().flat_map(|s| s.to_le_bytes()).collect();
                            if let Err(e) = stream.write_all(&bytes) {
                                tracing::warn!("ffmpeg stopped accepting audio: {}", e);
                                break;
                            }
                        }
                    }
                }
                std::thread::sleep(AUDIO_INTERVAL);
            }
            // Dropping the socket ends ffmpeg's audio input
        })
    }
}

impl MediaRecorder for FfmpegRecorder {
    fn start(&mut self) -> AppResult<()> {
        if self.running.load(Ordering::SeqCst) {
            return Err(AppError::AlreadyRecording);
        }

        // Record at the size the camera actually delivers
        let settings = self.video.settings();
        let (width, height) = self
            .video
            .current_frame()
            .map(|f| (f.width, f.height))
            .unwrap_or((settings.width, settings.height));
        let fps = settings.fps.max(1);

        let audio_listener = match &self.audio {
            Some(audio) => {
                let listener = TcpListener::bind("127.0.0.1:0")?;
                listener.set_nonblocking(true)?;
                let port = listener.local_addr()?.port();
                Some((
                    listener,
                    AudioInput {
                        sample_rate: audio.sample_rate(),
                        channels: audio.channels(),
                        port,
                    },
                ))
            }
            None => None,
        };

        let args = build_args(width, height, fps, audio_listener.as_ref().map(|(_, input)| *input));
        let mut child = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                AppError::RecorderFailure(format!(
                    "Failed to start {} ({}). Please install FFmpeg.",
                    self.ffmpeg_path, e
                ))
            })?;

        tracing::info!(
            "Started FFmpeg recorder: {}x{} @ {}fps, audio={}",
            width,
            height,
            fps,
            audio_listener.is_some()
        );

        let (Some(stdin), Some(mut stdout), Some(mut stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            kill_and_reap(&mut child);
            return Err(AppError::RecorderFailure(
                "FFmpeg pipes unavailable".to_string(),
            ));
        };

        self.running.store(true, Ordering::SeqCst);
        let pump = self.spawn_frame_pump(stdin, width, height, fps);
        self.threads.push(pump);

        if let (Some((listener, _)), Some(audio)) = (audio_listener, self.audio.clone()) {
            let server = self.spawn_audio_server(listener, audio);
            self.threads.push(server);
        }

        // stderr is drained so ffmpeg never blocks on a full pipe
        let stderr_thread = std::thread::spawn(move || {
            let mut log = String::new();
            let _ = stderr.read_to_string(&mut log);
            log
        });

        let events = self.events.clone();
        self.threads.push(std::thread::spawn(move || {
            let mut buf = vec![0u8; CHUNK_SIZE];
            let mut total: usize = 0;
            loop {
                match stdout.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        total += n;
                        let _ = events.send(RecorderEvent::Chunk(Bytes::copy_from_slice(&buf[..n])));
                    }
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => {
                        let _ = events.send(RecorderEvent::Error(format!(
                            "Failed to read FFmpeg output: {}",
                            e
                        )));
                        kill_and_reap(&mut child);
                        return;
                    }
                }
            }

            let log = stderr_thread.join().unwrap_or_default();
            match child.wait() {
                Ok(status) if status.success() => {
                    tracing::info!("FFmpeg recorder finished: {} bytes", total);
                    let _ = events.send(RecorderEvent::Finalized);
                }
                Ok(status) => {
                    tracing::warn!("FFmpeg exited with status {}: {}", status, log.trim());
                    let _ = events.send(RecorderEvent::Error(format!(
                        "FFmpeg exited with status {}",
                        status
                    )));
                }
                Err(e) => {
                    let _ = events.send(RecorderEvent::Error(format!(
                        "Failed to wait for FFmpeg: {}",
                        e
                    )));
                }
            }
        }));

        Ok(())
    }

    fn stop(&mut self) -> AppResult<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(AppError::RecorderFailure(
                "FFmpeg recorder is not running".to_string(),
            ));
        }
        tracing::info!("Stopping FFmpeg recorder");
        // The reader thread delivers Finalized once ffmpeg has flushed
        Ok(())
    }

    fn mime_type(&self) -> &str {
        VIDEO_MIME_TYPE
    }
}

impl Drop for FfmpegRecorder {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        // Threads exit on their own once the inputs close
        self.threads.clear();
    }
}
