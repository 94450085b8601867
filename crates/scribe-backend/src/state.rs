use std::sync::Arc;

use scribe_audio::device::HostInputDevice;
use scribe_bridge::config::PipelineConfig;

use crate::services::recording_service::RecordingControl;

/// A recording in progress: the live capture stream and the control channel
/// used to signal the worker thread to stop or cancel.
pub struct ActiveRecording {
    /// Keeps the cpal input stream alive; dropping it stops capture.
    pub stream: cpal::Stream,
    /// Signals the decode worker thread to finalize or discard.
    pub control: std::sync::mpsc::Sender<RecordingControl>,
}

/// The core application state that holds configuration, caching, and other
/// shared resources.
///
/// This struct contains all the data that needs to be shared across async
/// tasks in the application. It is designed to be wrapped in thread-safe,
/// async-friendly concurrency primitives (see [`SharedState`]) to allow safe
/// concurrent reads and occasional writes from multiple tasks.
pub struct State {
    /// The loaded pipeline configuration.
    pub config: PipelineConfig,
    /// Path to the directory used for caching data across runs.
    pub cache_path: std::path::PathBuf,
    /// The audio host used to enumerate and open input devices.
    pub active_host: Arc<cpal::Host>,
    /// Currently selected input device, if any.
    pub active_audio_device: Arc<Option<HostInputDevice>>,
    /// The in-progress recording, if any.
    pub active_recording: Option<ActiveRecording>,
}

/// Thread-safe, async-friendly shared reference to the application [`State`].
///
/// This is the recommended way to pass state into async handlers, background
/// tasks, or any context where multiple tasks need read access (and occasional
/// write access).
pub type SharedState = std::sync::Arc<tokio::sync::RwLock<State>>;
