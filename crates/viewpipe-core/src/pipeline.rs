//! Control seam to the native media pipeline.
//!
//! The pipeline itself (decoding, rendering, URI handling, audio metering)
//! is an external collaborator. This module defines the narrow set of
//! lifecycle and control calls the core issues to it, and the in-memory
//! configuration carried into initialization.

use crate::surface::SurfaceHandle;

/// Pipeline element states, carrying the native raw values used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Null,
    Ready,
    Paused,
    Playing,
}

impl PipelineState {
    /// The native integer value for this state.
    pub fn as_raw(self) -> i32 {
        match self {
            PipelineState::Null => 1,
            PipelineState::Ready => 2,
            PipelineState::Paused => 3,
            PipelineState::Playing => 4,
        }
    }

    /// Maps a native integer value back to a state.
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            1 => Some(PipelineState::Null),
            2 => Some(PipelineState::Ready),
            3 => Some(PipelineState::Paused),
            4 => Some(PipelineState::Playing),
            _ => None,
        }
    }
}

/// Errors surfaced by pipeline implementations.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Library or runtime setup failed; playback will not function.
    Init(String),
    /// The pipeline backend is not usable on this host.
    Unavailable(String),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Init(msg) => write!(f, "Pipeline initialization failed: {msg}"),
            PipelineError::Unavailable(msg) => write!(f, "Pipeline unavailable: {msg}"),
        }
    }
}

impl std::error::Error for PipelineError {}

/// In-memory configuration for one bound view.
///
/// Lives for the process lifetime of the view; nothing is persisted.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Playback URI, applied at init or via `set_uri`.
    pub uri: Option<String>,
    /// Audio level metering interval in milliseconds.
    pub audio_level_refresh_rate_ms: u32,
    /// When set, the pipeline renders a test source instead of the URI.
    pub debugging: bool,
    /// Surface recorded on first creation; the pipeline's initial render target.
    pub initial_surface: Option<SurfaceHandle>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            uri: None,
            audio_level_refresh_rate_ms: 100,
            debugging: false,
            initial_surface: None,
        }
    }
}

/// Lifecycle and control calls issued to the native pipeline.
///
/// All calls except `init_and_run` are fire-and-forget: the core consumes
/// no return value and expects implementations to absorb their own
/// failures (reporting them through the event channel where relevant).
pub trait PipelineBackend: Send + Sync {
    /// Creates the pipeline around `config` and starts it running.
    ///
    /// Called exactly once per controller lifetime, from the first surface
    /// creation. Completion implies the pipeline exists; a returned error
    /// is reported once by the caller and never retried.
    fn init_and_run(&self, config: &PipelineConfig) -> Result<(), PipelineError>;

    /// Rebinds the active render target.
    fn set_drawable_surface(&self, surface: SurfaceHandle);

    /// Sets the playback URI.
    fn set_uri(&self, uri: &str);

    /// Sets the audio level metering interval in milliseconds.
    fn set_audio_level_refresh_rate(&self, interval_ms: u32);

    /// Toggles the debugging render path. May only take effect at the next
    /// initialization.
    fn set_debugging(&self, debugging: bool);

    /// Requests a pipeline state transition.
    fn set_state(&self, state: PipelineState);

    /// Human-readable backend version, for diagnostics only.
    fn version_info(&self) -> String;
}
