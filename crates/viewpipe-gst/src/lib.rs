//! GStreamer pipeline backend for viewpipe.
//!
//! [`GstPipeline`] implements the core's
//! [`PipelineBackend`](viewpipe_core::PipelineBackend) seam with a playbin
//! pipeline (or a `videotestsrc` test pipeline in debugging mode), and its
//! [`SurfaceCapture`](viewpipe_core::SurfaceCapture) seam by converting the
//! video sink's last rendered sample to RGBA, so snapshots never touch
//! the live render path.
//!
//! Bus messages are relayed one-to-one to the host through the core's
//! [`EventBridge`](viewpipe_core::EventBridge) on a dedicated bus thread:
//! element errors, EOS, pipeline state changes and `level` audio metering
//! updates.

mod bus;
mod pipeline;

pub use pipeline::GstPipeline;
