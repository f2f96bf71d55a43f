//! Background frame-capture loop.
//!
//! While active, the worker repeatedly asks the surface for a snapshot of
//! its current contents and stores successful captures into the
//! [`FrameCache`]. Capture is best-effort and lossy: a failed or timed-out
//! attempt is discarded and the loop moves on. There is no frame-rate
//! guarantee: cadence is capture latency plus a cooperative pause.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};

use crate::cache::FrameCache;
use crate::frame::FrameBuffer;

/// Outcome of one asynchronous capture request.
pub enum CaptureOutcome {
    /// The buffer was filled with the surface contents.
    Completed(FrameBuffer),
    /// The copy could not be performed; the buffer is discarded.
    Failed,
}

/// Single-use completion gate for one capture request.
///
/// Completing consumes the gate, so a request can be answered at most
/// once. Dropping the gate without completing it signals the fault path;
/// the worker treats it as an unexpected cancellation, not a missed frame.
pub struct CaptureGate {
    tx: Sender<CaptureOutcome>,
}

impl CaptureGate {
    fn channel() -> (Self, Receiver<CaptureOutcome>) {
        let (tx, rx) = bounded(1);
        (Self { tx }, rx)
    }

    /// Completes the request with a filled buffer.
    pub fn completed(self, buffer: FrameBuffer) {
        let _ = self.tx.send(CaptureOutcome::Completed(buffer));
    }

    /// Completes the request as failed.
    pub fn failed(self) {
        let _ = self.tx.send(CaptureOutcome::Failed);
    }
}

/// Source of surface snapshots.
///
/// Implementations copy the currently rendered pixels into the buffer and
/// answer through the gate, on whatever thread suits them. The capture
/// path must never block or degrade the live render path.
pub trait SurfaceCapture: Send + Sync {
    /// Current surface dimensions in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// Requests an asynchronous copy of the surface contents into `buffer`.
    fn request_capture(&self, buffer: FrameBuffer, gate: CaptureGate);
}

/// Tuning for the capture loop.
#[derive(Debug, Clone, Copy)]
pub struct CaptureConfig {
    /// Bounded wait for one capture attempt before it is abandoned.
    pub attempt_timeout: Duration,
    /// Pause between iterations. Zero means a bare `thread::yield_now()`.
    pub idle_pause: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_millis(500),
            idle_pause: Duration::ZERO,
        }
    }
}

/// Handle to the dedicated capture thread.
///
/// The owning controller stops the worker cooperatively and joins it to
/// guarantee termination before the surface goes away.
pub struct CaptureWorker {
    handle: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
}

impl CaptureWorker {
    /// Starts the capture loop on a new thread.
    ///
    /// The running flag is set before the thread is spawned, so a `stop`
    /// racing with startup is always observed.
    pub fn spawn(
        capture: Arc<dyn SurfaceCapture>,
        cache: Arc<FrameCache>,
        config: CaptureConfig,
    ) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let handle = thread::spawn(move || capture_loop(capture, cache, flag, config));

        Self {
            handle: Some(handle),
            running,
        }
    }

    /// Signals the loop to exit after its current iteration.
    ///
    /// An in-flight capture is not interrupted; shutdown may therefore
    /// take up to one attempt timeout plus the pause.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Returns true once the worker thread has exited, for any reason.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Blocks until the worker thread has fully terminated.
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("capture thread terminated abnormally");
            }
        }
    }
}

impl Drop for CaptureWorker {
    fn drop(&mut self) {
        self.stop();
        self.join();
    }
}

fn capture_loop(
    capture: Arc<dyn SurfaceCapture>,
    cache: Arc<FrameCache>,
    running: Arc<AtomicBool>,
    config: CaptureConfig,
) {
    tracing::debug!("capture loop started");

    while running.load(Ordering::Acquire) {
        let (width, height) = capture.dimensions();
        if width == 0 || height == 0 {
            pause(config.idle_pause);
            continue;
        }

        let buffer = FrameBuffer::rgba(width, height);
        let (gate, done) = CaptureGate::channel();
        capture.request_capture(buffer, gate);

        match done.recv_timeout(config.attempt_timeout) {
            Ok(CaptureOutcome::Completed(buffer)) => cache.store(buffer.into_frame()),
            Ok(CaptureOutcome::Failed) => {
                tracing::trace!("capture attempt failed, frame dropped");
            }
            Err(RecvTimeoutError::Timeout) => {
                tracing::trace!(
                    timeout_ms = config.attempt_timeout.as_millis() as u64,
                    "capture attempt timed out, frame dropped"
                );
            }
            Err(RecvTimeoutError::Disconnected) => {
                // The gate was dropped without being completed. That is not
                // the cooperative stop flag: treat it as fatal for this thread
                // rather than spinning against a dead capture source.
                tracing::error!("capture gate dropped unanswered, terminating capture thread");
                return;
            }
        }

        pause(config.idle_pause);
    }

    tracing::debug!("capture loop stopped");
}

fn pause(idle_pause: Duration) {
    if idle_pause.is_zero() {
        thread::yield_now();
    } else {
        thread::sleep(idle_pause);
    }
}
