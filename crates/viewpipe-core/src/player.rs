//! Playback-control façade for one view.
//!
//! [`PlayerView`] composes the pipeline handle, the surface lifecycle
//! controller, the frame cache and the event bridge behind the narrow
//! control surface a host embeds.

use std::sync::Arc;

use crate::cache::FrameCache;
use crate::capture::{CaptureConfig, SurfaceCapture};
use crate::events::EventBridge;
use crate::pipeline::{PipelineBackend, PipelineConfig, PipelineState};
use crate::surface::{BindingState, SurfaceHandle, SurfaceLifecycleController};

/// One UI-hosted player view bridged to a native pipeline.
pub struct PlayerView {
    pipeline: Arc<dyn PipelineBackend>,
    controller: SurfaceLifecycleController,
    cache: Arc<FrameCache>,
    bridge: EventBridge,
}

impl PlayerView {
    /// Assembles a view from components built at the composition root.
    ///
    /// The same `bridge` (or a clone) should be handed to the pipeline
    /// backend so its events reach the host tagged with this view.
    pub fn new(
        pipeline: Arc<dyn PipelineBackend>,
        capture: Arc<dyn SurfaceCapture>,
        cache: Arc<FrameCache>,
        bridge: EventBridge,
        config: PipelineConfig,
        capture_config: CaptureConfig,
    ) -> Self {
        tracing::debug!(version = %pipeline.version_info(), "media pipeline backend");

        let controller = SurfaceLifecycleController::new(
            Arc::clone(&pipeline),
            capture,
            Arc::clone(&cache),
            config,
            capture_config,
        );

        Self {
            pipeline,
            controller,
            cache,
            bridge,
        }
    }

    // Surface lifecycle, forwarded from the host's windowing layer.

    pub fn surface_created(&mut self, handle: SurfaceHandle) {
        self.controller.surface_created(handle);
    }

    pub fn surface_changed(&mut self, handle: SurfaceHandle, width: u32, height: u32, format: u32) {
        self.controller.surface_changed(handle, width, height, format);
    }

    pub fn surface_destroyed(&mut self) {
        self.controller.surface_destroyed();
    }

    // Shared properties.

    /// Sets the playback URI.
    pub fn set_uri(&self, uri: &str) {
        self.pipeline.set_uri(uri);
    }

    /// Sets the audio level metering interval in milliseconds.
    pub fn set_audio_level_refresh_rate(&self, interval_ms: u32) {
        self.pipeline.set_audio_level_refresh_rate(interval_ms);
    }

    /// Toggles the debugging render path.
    pub fn set_debugging(&self, debugging: bool) {
        self.pipeline.set_debugging(debugging);
    }

    /// Requests a pipeline state transition.
    pub fn set_state(&self, state: PipelineState) {
        self.pipeline.set_state(state);
    }

    // Accessors.

    /// The cache holding the most recent captured frame, shared with
    /// still-image consumers.
    pub fn frame_cache(&self) -> &Arc<FrameCache> {
        &self.cache
    }

    /// The bridge relaying pipeline events for this view.
    pub fn event_bridge(&self) -> &EventBridge {
        &self.bridge
    }

    /// Current pipeline binding state.
    pub fn binding(&self) -> BindingState {
        self.controller.binding()
    }
}
