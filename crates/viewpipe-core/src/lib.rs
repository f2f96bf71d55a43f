//! viewpipe-core: surface lifecycle, frame snapshots and event relay.
//!
//! This crate bridges a UI-hosted rendering surface and a native media
//! pipeline without depending on any particular pipeline implementation:
//!
//! - [`SurfaceLifecycleController`] decides when the pipeline is created,
//!   rebound to a new surface, or torn down.
//! - [`CaptureWorker`] snapshots the rendered surface into a [`FrameCache`]
//!   on a dedicated thread, best-effort and lossy, while the pipeline
//!   renders live.
//! - [`FrameCache`] is a single-slot, thread-safe store giving consumers
//!   still-image access to the last rendered frame without touching the
//!   active render path.
//! - [`EventBridge`] relays typed pipeline events to a host [`EventSink`],
//!   fire-and-forget, tagged with the originating view.
//! - [`PlayerView`] composes the above behind the narrow control surface a
//!   host embeds.
//!
//! The pipeline itself lives behind [`PipelineBackend`]; a GStreamer
//! implementation ships in the `viewpipe-gst` crate.

pub mod cache;
pub mod capture;
pub mod events;
pub mod frame;
pub mod pipeline;
pub mod player;
pub mod surface;

pub use cache::FrameCache;
pub use capture::{CaptureConfig, CaptureGate, CaptureOutcome, CaptureWorker, SurfaceCapture};
pub use events::{EventBridge, EventSink, PlayerEvent, ViewId};
pub use frame::{CapturedFrame, FrameBuffer, PixelFormat};
pub use pipeline::{PipelineBackend, PipelineConfig, PipelineError, PipelineState};
pub use player::PlayerView;
pub use surface::{BindingState, SurfaceHandle, SurfaceLifecycleController};
