//! Playbin-based pipeline behind the core control seam.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_video as gst_video;
use gstreamer_video::prelude::*;

use parking_lot::Mutex;

use viewpipe_core::{
    CaptureGate, EventBridge, FrameBuffer, PipelineBackend, PipelineConfig, PipelineError,
    PipelineState, PlayerEvent, SurfaceCapture, SurfaceHandle,
};

use crate::bus::spawn_relay;

/// GStreamer-backed media pipeline for one view.
///
/// Construction initializes the GStreamer runtime; a failed init is
/// reported once and leaves the pipeline in an unavailable state where
/// every control call is a logged no-op. The component continues to
/// exist, playback will not function, and there is no retry.
pub struct GstPipeline {
    bridge: EventBridge,
    available: bool,
    /// Raw window handle for the overlay sync handler; 0 when unset.
    surface: Arc<AtomicUsize>,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    pending_uri: Option<String>,
    refresh_rate_ms: Option<u32>,
    /// Debug flag set through the control surface; wins over the config
    /// value at the next initialization.
    debug_override: Option<bool>,
    active: Option<Active>,
}

/// The live pipeline, present after `init_and_run`.
struct Active {
    pipeline: gst::Element,
    video_sink: gst::Element,
    /// Audio level element; absent in the debugging pipeline.
    level: Option<gst::Element>,
    is_debug: bool,
    bus: gst::Bus,
    bus_stop: Arc<AtomicBool>,
    bus_thread: Option<JoinHandle<()>>,
}

impl GstPipeline {
    /// Creates the backend, initializing the GStreamer runtime.
    ///
    /// Events raised by the pipeline flow through `bridge`.
    pub fn new(bridge: EventBridge) -> Self {
        let available = match gst::init() {
            Ok(()) => true,
            Err(e) => {
                // One-time, non-fatal notice; the backend stays inert.
                tracing::error!("GStreamer initialization failed: {e}");
                false
            }
        };

        Self {
            bridge,
            available,
            surface: Arc::new(AtomicUsize::new(0)),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Builds the `videotestsrc ! glimagesink` debugging pipeline.
    fn build_debug_pipeline(&self) -> Result<Active, PipelineError> {
        let pipeline = gst::Pipeline::new();
        let src = gst::ElementFactory::make("videotestsrc")
            .build()
            .map_err(|e| PipelineError::Init(format!("failed to create videotestsrc: {e}")))?;
        let video_sink = self.make_video_sink(true)?;

        pipeline
            .add_many([&src, &video_sink])
            .map_err(|e| PipelineError::Init(format!("failed to assemble test pipeline: {e}")))?;
        src.link(&video_sink)
            .map_err(|e| PipelineError::Init(format!("failed to link test pipeline: {e}")))?;

        self.activate(pipeline.upcast(), video_sink, None, true)
    }

    /// Builds the playbin pipeline with a leveled audio sink.
    fn build_playbin(&self, config: &PipelineConfig) -> Result<Active, PipelineError> {
        let playbin = gst::ElementFactory::make("playbin")
            .build()
            .map_err(|e| PipelineError::Init(format!("failed to create playbin: {e}")))?;

        let video_sink = self.make_video_sink(false)?;
        playbin.set_property("video-sink", &video_sink);

        let (audio_sink, level) = build_leveled_audio_sink(config.audio_level_refresh_rate_ms)?;
        playbin.set_property("audio-sink", &audio_sink);

        self.activate(playbin, video_sink, Some(level), false)
    }

    fn make_video_sink(&self, debugging: bool) -> Result<gst::Element, PipelineError> {
        let sink = gst::ElementFactory::make("glimagesink")
            .name("video-sink")
            .build()
            .map_err(|e| PipelineError::Init(format!("failed to create glimagesink: {e}")))?;

        // Low-latency tuning; left at defaults when debugging.
        if !debugging {
            sink.set_property("sync", false);
            sink.set_property("async", false);
            sink.set_property("qos", true);
            sink.set_property("max-lateness", 20_000_000i64);
        }
        Ok(sink)
    }

    /// Wires the bus (overlay sync handler + relay thread) and returns the
    /// running `Active` record.
    fn activate(
        &self,
        pipeline: gst::Element,
        video_sink: gst::Element,
        level: Option<gst::Element>,
        is_debug: bool,
    ) -> Result<Active, PipelineError> {
        let bus = pipeline
            .bus()
            .ok_or_else(|| PipelineError::Init("pipeline has no bus".into()))?;

        // Bind the drawable surface when the sink asks for a window handle.
        let surface = Arc::clone(&self.surface);
        let sink_weak = video_sink.downgrade();
        bus.set_sync_handler(move |_, msg| {
            if gst_video::is_video_overlay_prepare_window_handle_message(msg) {
                if let Some(sink) = sink_weak.upgrade() {
                    apply_window_handle(&sink, surface.load(Ordering::Acquire));
                }
                return gst::BusSyncReply::Drop;
            }
            gst::BusSyncReply::Pass
        });

        let bus_stop = Arc::new(AtomicBool::new(false));
        let bus_thread = spawn_relay(
            bus.clone(),
            pipeline.clone(),
            self.bridge.clone(),
            Arc::clone(&bus_stop),
        );

        Ok(Active {
            pipeline,
            video_sink,
            level,
            is_debug,
            bus,
            bus_stop,
            bus_thread: Some(bus_thread),
        })
    }

    /// Applies a URI to a live playbin: pipeline to Ready, set the
    /// property, announce the change. Called without the inner lock held
    /// so the host may issue control calls from the event callback.
    fn apply_uri(&self, pipeline: &gst::Element, uri: &str) {
        if let Err(e) = pipeline.set_state(gst::State::Ready) {
            tracing::warn!("failed to ready pipeline for new uri: {e}");
        }
        pipeline.set_property("uri", uri);
        self.bridge.dispatch(PlayerEvent::UriChanged {
            new_uri: uri.to_owned(),
        });
    }

    /// Copies the last rendered frame into `buffer` as RGBA.
    fn snapshot_into(&self, buffer: &mut FrameBuffer) -> Result<(), String> {
        let sink = {
            let inner = self.inner.lock();
            let active = inner.active.as_ref().ok_or("pipeline not initialized")?;
            active.video_sink.clone()
        };

        let sample = sink
            .property::<Option<gst::Sample>>("last-sample")
            .ok_or("no frame rendered yet")?;

        let caps = gst_video::VideoCapsBuilder::new()
            .format(gst_video::VideoFormat::Rgba)
            .width(buffer.width() as i32)
            .height(buffer.height() as i32)
            .build();
        let converted = gst_video::convert_sample(&sample, &caps, gst::ClockTime::from_mseconds(450))
            .map_err(|e| format!("sample conversion failed: {e}"))?;

        let gst_buffer = converted.buffer().ok_or("converted sample has no buffer")?;
        let map = gst_buffer
            .map_readable()
            .map_err(|_| "failed to map converted buffer")?;

        let dst = buffer.data_mut();
        let len = dst.len().min(map.len());
        dst[..len].copy_from_slice(&map.as_slice()[..len]);
        Ok(())
    }
}

impl PipelineBackend for GstPipeline {
    fn init_and_run(&self, config: &PipelineConfig) -> Result<(), PipelineError> {
        if !self.available {
            return Err(PipelineError::Unavailable(
                "GStreamer runtime did not initialize".into(),
            ));
        }

        let mut inner = self.inner.lock();
        if inner.active.is_some() {
            tracing::debug!("pipeline already running, init ignored");
            return Ok(());
        }

        if let Some(surface) = config.initial_surface {
            self.surface.store(surface.raw(), Ordering::Release);
        }
        if inner.pending_uri.is_none() {
            inner.pending_uri = config.uri.clone();
        }

        let debugging = inner.debug_override.unwrap_or(config.debugging);
        let active = if debugging {
            self.build_debug_pipeline()?
        } else {
            self.build_playbin(config)?
        };

        if let (Some(ms), Some(level)) = (inner.refresh_rate_ms, active.level.as_ref()) {
            level.set_property("interval", ms as u64 * 1_000_000);
        }

        let pipeline = active.pipeline.clone();
        let is_debug = active.is_debug;
        let pending_uri = inner.pending_uri.clone();
        inner.active = Some(active);
        drop(inner);

        if !is_debug {
            if let Some(uri) = pending_uri {
                self.apply_uri(&pipeline, &uri);
            }
        }
        self.bridge.dispatch(PlayerEvent::Init);
        Ok(())
    }

    fn set_drawable_surface(&self, surface: SurfaceHandle) {
        self.surface.store(surface.raw(), Ordering::Release);

        let inner = self.inner.lock();
        if let Some(active) = inner.active.as_ref() {
            apply_window_handle(&active.video_sink, surface.raw());
        }
    }

    fn set_uri(&self, uri: &str) {
        let target = {
            let mut inner = self.inner.lock();
            inner.pending_uri = Some(uri.to_owned());

            match inner.active.as_ref() {
                Some(active) if !active.is_debug => Some(active.pipeline.clone()),
                Some(_) => {
                    tracing::debug!("debugging pipeline active, uri stored for later");
                    None
                }
                None => {
                    tracing::debug!("pipeline not initialized, uri stored for init");
                    None
                }
            }
        };

        if let Some(pipeline) = target {
            self.apply_uri(&pipeline, uri);
        }
    }

    fn set_audio_level_refresh_rate(&self, interval_ms: u32) {
        let mut inner = self.inner.lock();
        inner.refresh_rate_ms = Some(interval_ms);

        if let Some(level) = inner.active.as_ref().and_then(|a| a.level.as_ref()) {
            level.set_property("interval", interval_ms as u64 * 1_000_000);
        }
    }

    fn set_debugging(&self, debugging: bool) {
        let mut inner = self.inner.lock();
        inner.debug_override = Some(debugging);
        if inner.active.is_some() {
            // Takes effect at the next initialization; the live pipeline is
            // not recreated.
            tracing::debug!(debugging, "debug flag stored, pipeline unchanged");
        }
    }

    fn set_state(&self, state: PipelineState) {
        let inner = self.inner.lock();
        let Some(active) = inner.active.as_ref() else {
            tracing::debug!(?state, "state change requested before pipeline init");
            return;
        };

        let target = to_gst_state(state);
        tracing::debug!(?target, "pipeline state requested");
        match active.pipeline.set_state(target) {
            Ok(change) => tracing::debug!(?change, "state change accepted"),
            Err(e) => tracing::warn!("state change to {target:?} rejected: {e}"),
        }
    }

    fn version_info(&self) -> String {
        if self.available {
            gst::version_string().to_string()
        } else {
            "GStreamer unavailable".to_string()
        }
    }
}

impl SurfaceCapture for GstPipeline {
    fn dimensions(&self) -> (u32, u32) {
        let sink = {
            let inner = self.inner.lock();
            match inner.active.as_ref() {
                Some(active) => active.video_sink.clone(),
                None => return (0, 0),
            }
        };

        sink.static_pad("sink")
            .and_then(|pad| pad.current_caps())
            .and_then(|caps| {
                caps.structure(0).map(|s| {
                    let width = s.get::<i32>("width").unwrap_or(0);
                    let height = s.get::<i32>("height").unwrap_or(0);
                    (width.max(0) as u32, height.max(0) as u32)
                })
            })
            .unwrap_or((0, 0))
    }

    fn request_capture(&self, mut buffer: FrameBuffer, gate: CaptureGate) {
        match self.snapshot_into(&mut buffer) {
            Ok(()) => gate.completed(buffer),
            Err(reason) => {
                // A missed snapshot is not worth reporting.
                tracing::trace!(%reason, "snapshot attempt failed");
                gate.failed();
            }
        }
    }
}

impl Drop for GstPipeline {
    fn drop(&mut self) {
        let mut inner = self.inner.lock();
        if let Some(mut active) = inner.active.take() {
            let _ = active.pipeline.set_state(gst::State::Null);
            active.bus_stop.store(true, Ordering::Release);
            active.bus.set_flushing(true);
            if let Some(handle) = active.bus_thread.take() {
                let _ = handle.join();
            }
        }
    }
}

/// Builds the `level ! autoaudiosink` bin exposed to playbin through a
/// ghost pad, returning the bin and the level element.
fn build_leveled_audio_sink(interval_ms: u32) -> Result<(gst::Bin, gst::Element), PipelineError> {
    let bin = gst::Bin::builder().name("leveled-sink").build();

    let level = gst::ElementFactory::make("level")
        .property("interval", interval_ms as u64 * 1_000_000)
        .build()
        .map_err(|e| PipelineError::Init(format!("failed to create level element: {e}")))?;
    let sink = gst::ElementFactory::make("autoaudiosink")
        .build()
        .map_err(|e| PipelineError::Init(format!("failed to create autoaudiosink: {e}")))?;

    bin.add_many([&level, &sink])
        .map_err(|e| PipelineError::Init(format!("failed to assemble audio sink: {e}")))?;
    level
        .link(&sink)
        .map_err(|e| PipelineError::Init(format!("failed to link level to audio sink: {e}")))?;

    let level_pad = level
        .static_pad("sink")
        .ok_or_else(|| PipelineError::Init("level element has no sink pad".into()))?;
    let ghost = gst::GhostPad::with_target(&level_pad)
        .map_err(|e| PipelineError::Init(format!("failed to ghost level pad: {e}")))?;
    bin.add_pad(&ghost)
        .map_err(|e| PipelineError::Init(format!("failed to expose audio sink pad: {e}")))?;

    Ok((bin, level))
}

fn apply_window_handle(sink: &gst::Element, handle: usize) {
    if handle == 0 {
        return;
    }
    if let Some(overlay) = sink.dynamic_cast_ref::<gst_video::VideoOverlay>() {
        // SAFETY: the handle is the raw drawable the host supplied through
        // the surface lifecycle callbacks and outlives the bound pipeline.
        unsafe { overlay.set_window_handle(handle) };
    } else {
        tracing::warn!("video sink does not support window-handle binding");
    }
}

fn to_gst_state(state: PipelineState) -> gst::State {
    match state {
        PipelineState::Null => gst::State::Null,
        PipelineState::Ready => gst::State::Ready,
        PipelineState::Paused => gst::State::Paused,
        PipelineState::Playing => gst::State::Playing,
    }
}
