//! Surface lifecycle: when the pipeline is created, rebound, or torn down.
//!
//! The controller owns the drawable surface handle while the view is
//! attached. First creation initializes the pipeline and starts the
//! capture worker; destruction stops the worker and waits for its clean
//! termination. Lifecycle callbacks arrive serialized from one UI-facing
//! thread and must never fail, since the host's windowing layer cannot
//! recover from a failing callback.

use std::sync::Arc;

use crate::cache::FrameCache;
use crate::capture::{CaptureConfig, CaptureWorker, SurfaceCapture};
use crate::pipeline::{PipelineBackend, PipelineConfig};

/// Opaque handle to a platform drawable target.
///
/// Must never be retained beyond the surface-destroyed notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(usize);

impl SurfaceHandle {
    /// Wraps a raw platform handle.
    pub fn new(raw: usize) -> Self {
        Self(raw)
    }

    /// The raw platform handle.
    pub fn raw(self) -> usize {
        self.0
    }
}

/// Whether the native pipeline has been created and attached to a surface.
///
/// Never reverts to `Unbound`: one controller owns exactly one pipeline
/// lifetime. A destroyed surface stops capture but leaves the binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    Unbound,
    Initializing,
    Bound,
}

/// Owns the surface handle and drives pipeline binding and frame capture.
pub struct SurfaceLifecycleController {
    pipeline: Arc<dyn PipelineBackend>,
    capture: Arc<dyn SurfaceCapture>,
    cache: Arc<FrameCache>,
    config: PipelineConfig,
    capture_config: CaptureConfig,
    binding: BindingState,
    surface: Option<SurfaceHandle>,
    worker: Option<CaptureWorker>,
}

impl SurfaceLifecycleController {
    pub fn new(
        pipeline: Arc<dyn PipelineBackend>,
        capture: Arc<dyn SurfaceCapture>,
        cache: Arc<FrameCache>,
        config: PipelineConfig,
        capture_config: CaptureConfig,
    ) -> Self {
        Self {
            pipeline,
            capture,
            cache,
            config,
            capture_config,
            binding: BindingState::Unbound,
            surface: None,
            worker: None,
        }
    }

    /// Current pipeline binding state.
    pub fn binding(&self) -> BindingState {
        self.binding
    }

    /// The surface currently owned by the controller, if attached.
    pub fn surface(&self) -> Option<SurfaceHandle> {
        self.surface
    }

    /// The view's surface came into existence.
    ///
    /// On the first call, records `handle` as the initial render target,
    /// initializes the pipeline and starts the capture worker. Duplicate
    /// creation callbacks are no-ops.
    pub fn surface_created(&mut self, handle: SurfaceHandle) {
        if self.binding != BindingState::Unbound {
            tracing::debug!(?handle, "surface created again, pipeline already bound");
            return;
        }

        self.binding = BindingState::Initializing;
        self.surface = Some(handle);
        self.config.initial_surface = Some(handle);

        // Init failure is absorbed: the controller stays usable, playback
        // does not function, and there is no retry.
        if let Err(err) = self.pipeline.init_and_run(&self.config) {
            tracing::error!("pipeline initialization failed: {err}");
        }
        self.binding = BindingState::Bound;

        self.worker = Some(CaptureWorker::spawn(
            Arc::clone(&self.capture),
            Arc::clone(&self.cache),
            self.capture_config,
        ));
    }

    /// The surface was recreated or resized.
    ///
    /// Always forwards the new handle as the active render target,
    /// regardless of binding state; the capture worker is unaffected.
    /// `format` is the platform pixel-format code, logged for diagnostics.
    pub fn surface_changed(&mut self, handle: SurfaceHandle, width: u32, height: u32, format: u32) {
        tracing::trace!(?handle, width, height, format, "surface changed");
        self.surface = Some(handle);
        self.pipeline.set_drawable_surface(handle);
    }

    /// The surface is going away.
    ///
    /// Stops the capture worker and blocks until its thread has fully
    /// terminated, so no frame store can happen after this returns. Fast
    /// no-op when no worker was ever started.
    pub fn surface_destroyed(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.stop();
            worker.join();
        }
        self.surface = None;
    }
}
