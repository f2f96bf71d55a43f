//! Bus-message relay thread.
//!
//! Maps GStreamer bus messages one-to-one onto [`PlayerEvent`]s in arrival
//! order. The relay imposes no buffering and no retry; a host that is not
//! listening simply misses events.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use gstreamer as gst;
use gstreamer::glib;
use gstreamer::prelude::*;

use viewpipe_core::{EventBridge, PlayerEvent};

/// QoS messages tolerated within one window before the stream is restarted.
const QOS_RESTART_THRESHOLD: u32 = 100;
/// The QoS counter resets when a window of this length passes quietly.
const QOS_WINDOW_SECS: u64 = 10;

/// Starts the relay thread. It runs until `stop` is set and the bus is
/// flushed.
pub(crate) fn spawn_relay(
    bus: gst::Bus,
    pipeline: gst::Element,
    bridge: EventBridge,
    stop: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || relay_loop(bus, pipeline, bridge, stop))
}

fn relay_loop(bus: gst::Bus, pipeline: gst::Element, bridge: EventBridge, stop: Arc<AtomicBool>) {
    tracing::debug!("bus relay started");
    let mut qos_count = 0u32;
    let mut qos_window = Instant::now();

    while !stop.load(Ordering::Acquire) {
        // Returns None once the bus is flushed at shutdown.
        let Some(msg) = bus.timed_pop(gst::ClockTime::NONE) else {
            continue;
        };

        match msg.view() {
            gst::MessageView::Error(err) => {
                let source = err
                    .src()
                    .map(|s| s.name().to_string())
                    .unwrap_or_default();
                let message = err.error().to_string();
                let debug_info = err.debug().map(|d| d.to_string()).unwrap_or_default();
                tracing::error!(%source, %message, "error from pipeline element");
                bridge.dispatch(PlayerEvent::ElementError {
                    source,
                    message,
                    debug_info,
                });
                // An erroring pipeline is shut down, not resumed.
                let _ = pipeline.set_state(gst::State::Null);
            }
            gst::MessageView::Eos(_) => {
                bridge.dispatch(PlayerEvent::Eos);
            }
            gst::MessageView::StateChanged(s) => {
                // Only the pipeline's own transitions, not its children's.
                let from_pipeline = s
                    .src()
                    .map(|src| src == pipeline.upcast_ref::<gst::Object>())
                    .unwrap_or(false);
                if from_pipeline {
                    bridge.dispatch(PlayerEvent::StateChanged {
                        old_state: raw_state(s.old()),
                        new_state: raw_state(s.current()),
                    });
                }
            }
            gst::MessageView::Element(_) => {
                if let Some(s) = msg.structure() {
                    if s.name() == "level" {
                        if let Some(event) = level_event(s) {
                            bridge.dispatch(event);
                        }
                    }
                }
            }
            gst::MessageView::Qos(_) => {
                if qos_window.elapsed().as_secs() >= QOS_WINDOW_SECS {
                    qos_count = 0;
                    qos_window = Instant::now();
                }
                qos_count += 1;
                if qos_count >= QOS_RESTART_THRESHOLD {
                    tracing::warn!(qos_count, "QoS threshold reached, restarting stream");
                    qos_count = 0;
                    qos_window = Instant::now();
                    let _ = pipeline.set_state(gst::State::Null);
                    if pipeline.set_state(gst::State::Playing).is_err() {
                        tracing::error!("failed to restart pipeline after QoS storm");
                    }
                }
            }
            _ => {}
        }
    }

    tracing::debug!("bus relay stopped");
}

/// The native integer value carried on the wire for a pipeline state.
fn raw_state(state: gst::State) -> i32 {
    match state {
        gst::State::Null => 1,
        gst::State::Ready => 2,
        gst::State::Paused => 3,
        gst::State::Playing => 4,
        _ => 0,
    }
}

/// Builds a volume event from a `level` element message.
///
/// The level element reports per-channel dB arrays; only the first channel
/// is metered.
fn level_event(s: &gst::StructureRef) -> Option<PlayerEvent> {
    let rms = first_channel_db(s, "rms")?;
    let peak = first_channel_db(s, "peak")?;
    let decay = first_channel_db(s, "decay")?;
    Some(PlayerEvent::VolumeChanged {
        rms: db_to_linear(rms),
        peak: db_to_linear(peak),
        decay: db_to_linear(decay),
    })
}

fn first_channel_db(s: &gst::StructureRef, field: &str) -> Option<f64> {
    let values = s.get::<glib::ValueArray>(field).ok()?;
    values.first()?.get::<f64>().ok()
}

/// Converts a dB level to linear 0.0..=1.0.
fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}
