//! Device threads
//!
//! Camera and microphone handles are not `Send`, so each device lives on its
//! own thread. Stopping a track waits for that thread to close the device so
//! the next acquisition can open it again.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Longest wait for a device thread to wind down
const STOP_TIMEOUT: Duration = Duration::from_secs(2);

struct Joinable {
    handle: JoinHandle<()>,
    done: mpsc::Receiver<()>,
}

/// A device thread that runs until stopped
pub(crate) struct DeviceThread {
    running: Arc<AtomicBool>,
    joinable: Mutex<Option<Joinable>>,
}

impl DeviceThread {
    /// Run `body` on a new thread; it should return once the flag drops
    pub(crate) fn spawn<F>(body: F) -> Self
    where
        F: FnOnce(Arc<AtomicBool>) + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let (done_tx, done) = mpsc::channel();

        let thread_running = running.clone();
        let handle = std::thread::spawn(move || {
            body(thread_running);
            let _ = done_tx.send(());
        });

        Self {
            running,
            joinable: Mutex::new(Some(Joinable { handle, done })),
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Lower the flag and wait until the thread has released its device.
    ///
    /// Returns `false` when the thread was already stopped.
    pub(crate) fn stop(&self) -> bool {
        let was_running = self.running.swap(false, Ordering::SeqCst);

        let Some(joinable) = self.joinable.lock().take() else {
            return was_running;
        };
        if joinable.handle.thread().id() == std::thread::current().id() {
            return was_running;
        }

        match joinable.done.recv_timeout(STOP_TIMEOUT) {
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => {
                let _ = joinable.handle.join();
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    "Device thread still busy after {}s; detaching",
                    STOP_TIMEOUT.as_secs()
                );
            }
        }
        was_running
    }
}

impl Drop for DeviceThread {
    fn drop(&mut self) {
        self.stop();
    }
}
