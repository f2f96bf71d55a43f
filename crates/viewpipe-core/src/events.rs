//! Typed pipeline events and the one-way relay to the host.
//!
//! The native pipeline pushes [`PlayerEvent`] values; the bridge maps each
//! one to an outward notification with a fixed name, tagged with the
//! originating view. Delivery is fire-and-forget: no buffering, no retry,
//! no acknowledgement, and no reordering beyond the caller's own order.

use std::sync::Arc;

/// Identity of the view an event originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewId(pub u64);

/// A typed event raised by the media pipeline.
///
/// Events are transient: constructed, forwarded, dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// Pipeline initialization completed.
    Init,
    /// Pipeline state transition, raw native state values.
    StateChanged { old_state: i32, new_state: i32 },
    /// Audio level update, linear 0.0..=1.0 per field.
    VolumeChanged { rms: f64, peak: f64, decay: f64 },
    /// The playback URI changed.
    UriChanged { new_uri: String },
    /// End of stream reached.
    Eos,
    /// An element reported an error; relayed verbatim, never interpreted.
    ElementError {
        source: String,
        message: String,
        debug_info: String,
    },
}

impl PlayerEvent {
    /// The fixed outward name the host sees for this event.
    pub fn name(&self) -> &'static str {
        match self {
            PlayerEvent::Init => "onPlayerInit",
            PlayerEvent::StateChanged { .. } => "onStateChanged",
            PlayerEvent::VolumeChanged { .. } => "onVolumeChanged",
            PlayerEvent::UriChanged { .. } => "onUriChanged",
            PlayerEvent::Eos => "onEOS",
            PlayerEvent::ElementError { .. } => "onElementError",
        }
    }
}

/// Host-side delivery channel for outward events.
///
/// Implementations must not block; a failed delivery simply loses the
/// event. This is best-effort telemetry, not a guaranteed channel.
pub trait EventSink: Send + Sync {
    /// Delivers one event to the host.
    fn emit(&self, view: ViewId, event: &PlayerEvent);
}

/// One-way relay from pipeline callbacks to the host sink.
///
/// A pure consumer: each dispatched event is forwarded unmodified, on the
/// calling thread, in call order.
#[derive(Clone)]
pub struct EventBridge {
    view: ViewId,
    sink: Arc<dyn EventSink>,
}

impl EventBridge {
    /// Creates a bridge tagging every event with `view`.
    pub fn new(view: ViewId, sink: Arc<dyn EventSink>) -> Self {
        Self { view, sink }
    }

    /// The view identity this bridge tags events with.
    pub fn view(&self) -> ViewId {
        self.view
    }

    /// Forwards one event to the host.
    pub fn dispatch(&self, event: PlayerEvent) {
        tracing::trace!(event = event.name(), view = self.view.0, "pipeline event");
        self.sink.emit(self.view, &event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<(ViewId, &'static str, PlayerEvent)>>,
    }

    impl EventSink for RecordingSink {
        fn emit(&self, view: ViewId, event: &PlayerEvent) {
            self.events.lock().push((view, event.name(), event.clone()));
        }
    }

    #[test]
    fn event_names_are_fixed() {
        assert_eq!(PlayerEvent::Init.name(), "onPlayerInit");
        assert_eq!(
            PlayerEvent::StateChanged {
                old_state: 1,
                new_state: 2
            }
            .name(),
            "onStateChanged"
        );
        assert_eq!(
            PlayerEvent::VolumeChanged {
                rms: 0.0,
                peak: 0.0,
                decay: 0.0
            }
            .name(),
            "onVolumeChanged"
        );
        assert_eq!(
            PlayerEvent::UriChanged {
                new_uri: String::new()
            }
            .name(),
            "onUriChanged"
        );
        assert_eq!(PlayerEvent::Eos.name(), "onEOS");
        assert_eq!(
            PlayerEvent::ElementError {
                source: String::new(),
                message: String::new(),
                debug_info: String::new()
            }
            .name(),
            "onElementError"
        );
    }

    #[test]
    fn element_error_is_relayed_verbatim() {
        let sink = Arc::new(RecordingSink::default());
        let bridge = EventBridge::new(ViewId(7), Arc::clone(&sink) as _);

        bridge.dispatch(PlayerEvent::ElementError {
            source: "decoder".into(),
            message: "fatal".into(),
            debug_info: "trace123".into(),
        });

        let events = sink.events.lock();
        assert_eq!(events.len(), 1);
        let (view, name, event) = &events[0];
        assert_eq!(*view, ViewId(7));
        assert_eq!(*name, "onElementError");
        assert_eq!(
            *event,
            PlayerEvent::ElementError {
                source: "decoder".into(),
                message: "fatal".into(),
                debug_info: "trace123".into(),
            }
        );
    }

    #[test]
    fn dispatch_preserves_call_order() {
        let sink = Arc::new(RecordingSink::default());
        let bridge = EventBridge::new(ViewId(1), Arc::clone(&sink) as _);

        bridge.dispatch(PlayerEvent::Init);
        bridge.dispatch(PlayerEvent::StateChanged {
            old_state: 2,
            new_state: 4,
        });
        bridge.dispatch(PlayerEvent::Eos);

        let names: Vec<_> = sink.events.lock().iter().map(|(_, n, _)| *n).collect();
        assert_eq!(names, ["onPlayerInit", "onStateChanged", "onEOS"]);
    }
}
