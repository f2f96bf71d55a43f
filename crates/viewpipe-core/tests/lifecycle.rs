//! End-to-end lifecycle scenarios against mock collaborators.
//!
//! These exercise the full path a host drives: surface callbacks into the
//! controller, the capture worker filling the cache, and pipeline events
//! flowing out through the bridge. The pipeline, surface and host sink are
//! mocks; no media runtime is required.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use viewpipe_core::{
    CaptureConfig, CaptureGate, EventBridge, EventSink, FrameBuffer, FrameCache, PipelineBackend,
    PipelineConfig, PipelineError, PipelineState, PlayerEvent, PlayerView, SurfaceCapture,
    SurfaceHandle, ViewId,
};

#[derive(Default)]
struct MockPipeline {
    init_calls: AtomicUsize,
    fail_init: bool,
    uris: Mutex<Vec<String>>,
    states: Mutex<Vec<PipelineState>>,
}

impl PipelineBackend for MockPipeline {
    fn init_and_run(&self, _config: &PipelineConfig) -> Result<(), PipelineError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_init {
            Err(PipelineError::Init("runtime missing".into()))
        } else {
            Ok(())
        }
    }

    fn set_drawable_surface(&self, _surface: SurfaceHandle) {}

    fn set_uri(&self, uri: &str) {
        self.uris.lock().push(uri.to_owned());
    }

    fn set_audio_level_refresh_rate(&self, _interval_ms: u32) {}
    fn set_debugging(&self, _debugging: bool) {}

    fn set_state(&self, state: PipelineState) {
        self.states.lock().push(state);
    }

    fn version_info(&self) -> String {
        "mock 0.0".into()
    }
}

/// Completes every capture immediately with the requested dimensions.
struct InstantCapture {
    width: u32,
    height: u32,
}

impl SurfaceCapture for InstantCapture {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn request_capture(&self, buffer: FrameBuffer, gate: CaptureGate) {
        gate.completed(buffer);
    }
}

/// Answers each capture from a helper thread after a fixed delay,
/// simulating an in-flight copy request at destroy time.
struct SlowCapture {
    delay: Duration,
}

impl SurfaceCapture for SlowCapture {
    fn dimensions(&self) -> (u32, u32) {
        (16, 16)
    }

    fn request_capture(&self, buffer: FrameBuffer, gate: CaptureGate) {
        let delay = self.delay;
        thread::spawn(move || {
            thread::sleep(delay);
            gate.completed(buffer);
        });
    }
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<(ViewId, PlayerEvent)>>,
}

impl EventSink for RecordingSink {
    fn emit(&self, view: ViewId, event: &PlayerEvent) {
        self.events.lock().push((view, event.clone()));
    }
}

fn player(
    pipeline: Arc<MockPipeline>,
    capture: Arc<dyn SurfaceCapture>,
    sink: Arc<RecordingSink>,
) -> PlayerView {
    PlayerView::new(
        pipeline,
        capture,
        Arc::new(FrameCache::new()),
        EventBridge::new(ViewId(42), sink),
        PipelineConfig::default(),
        CaptureConfig::default(),
    )
}

#[test]
fn captured_frame_matches_surface_dimensions() {
    let pipeline = Arc::new(MockPipeline::default());
    let sink = Arc::new(RecordingSink::default());
    let mut view = player(
        pipeline,
        Arc::new(InstantCapture {
            width: 100,
            height: 100,
        }),
        sink,
    );

    view.surface_created(SurfaceHandle::new(0x100));

    let deadline = Instant::now() + Duration::from_secs(2);
    while view.frame_cache().peek().is_none() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    view.surface_destroyed();

    let frame = view.frame_cache().peek().expect("capture never landed");
    assert_eq!(frame.dimensions(), (100, 100));
    assert_eq!(frame.data().len(), 100 * 100 * 4);
}

#[test]
fn rapid_double_creation_initializes_once() {
    let pipeline = Arc::new(MockPipeline::default());
    let sink = Arc::new(RecordingSink::default());
    let mut view = player(
        Arc::clone(&pipeline),
        Arc::new(InstantCapture {
            width: 8,
            height: 8,
        }),
        sink,
    );

    view.surface_created(SurfaceHandle::new(0x1));
    view.surface_created(SurfaceHandle::new(0x2));
    view.surface_destroyed();

    assert_eq!(pipeline.init_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn destroy_waits_for_inflight_capture() {
    let pipeline = Arc::new(MockPipeline::default());
    let sink = Arc::new(RecordingSink::default());
    let delay = Duration::from_millis(100);
    let mut view = player(pipeline, Arc::new(SlowCapture { delay }), sink);

    view.surface_created(SurfaceHandle::new(0x1));
    // Let at least one request go in flight.
    thread::sleep(Duration::from_millis(20));

    let start = Instant::now();
    view.surface_destroyed();
    let elapsed = start.elapsed();

    // Blocks until the in-flight iteration drains, but no longer than the
    // bounded wait allows.
    assert!(elapsed < Duration::from_millis(600));

    // No store after destroy returns.
    let snapshot = view.frame_cache().peek().map(|f| f.dimensions());
    thread::sleep(delay + Duration::from_millis(50));
    assert_eq!(view.frame_cache().peek().map(|f| f.dimensions()), snapshot);
}

#[test]
fn element_error_reaches_host_untouched() {
    let pipeline = Arc::new(MockPipeline::default());
    let sink = Arc::new(RecordingSink::default());
    let view = player(
        pipeline,
        Arc::new(InstantCapture {
            width: 8,
            height: 8,
        }),
        Arc::clone(&sink),
    );

    view.event_bridge().dispatch(PlayerEvent::ElementError {
        source: "decoder".into(),
        message: "fatal".into(),
        debug_info: "trace123".into(),
    });

    let events = sink.events.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0, ViewId(42));
    assert_eq!(
        events[0].1,
        PlayerEvent::ElementError {
            source: "decoder".into(),
            message: "fatal".into(),
            debug_info: "trace123".into(),
        }
    );
}

#[test]
fn init_failure_leaves_view_usable() {
    let pipeline = Arc::new(MockPipeline {
        fail_init: true,
        ..MockPipeline::default()
    });
    let sink = Arc::new(RecordingSink::default());
    let mut view = player(
        Arc::clone(&pipeline),
        Arc::new(InstantCapture {
            width: 8,
            height: 8,
        }),
        sink,
    );

    // The lifecycle callback must not fail outward.
    view.surface_created(SurfaceHandle::new(0x1));

    // Control calls still forward; they just won't produce playback.
    view.set_uri("rtsp://example/stream");
    view.set_state(PipelineState::Playing);
    view.surface_destroyed();

    assert_eq!(pipeline.uris.lock().as_slice(), ["rtsp://example/stream"]);
    assert_eq!(pipeline.states.lock().as_slice(), [PipelineState::Playing]);
}

#[test]
fn control_calls_forward_to_pipeline() {
    let pipeline = Arc::new(MockPipeline::default());
    let sink = Arc::new(RecordingSink::default());
    let view = player(
        Arc::clone(&pipeline),
        Arc::new(InstantCapture {
            width: 8,
            height: 8,
        }),
        sink,
    );

    view.set_uri("file:///movie.mp4");
    view.set_state(PipelineState::Paused);
    view.set_state(PipelineState::Playing);

    assert_eq!(pipeline.uris.lock().as_slice(), ["file:///movie.mp4"]);
    assert_eq!(
        pipeline.states.lock().as_slice(),
        [PipelineState::Paused, PipelineState::Playing]
    );
}
