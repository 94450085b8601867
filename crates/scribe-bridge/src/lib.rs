//! Wire-level contracts between the streaming transcription core and its
//! external collaborators.
//!
//! This crate defines the types and protocols that connect the core
//! (audio capture, ring buffer, decoder, stabilizer, scheduler) with
//! everything around it: a GUI/menu-bar surface, settings persistence, model
//! management, and clipboard/paste. None of those collaborators are
//! implemented here — only the contract each one consumes or produces.
//!
//! The design is deliberately lightweight and unidirectional:
//! - External callers send commands (start/stop/cancel a recording, select
//!   an input device).
//! - The core pushes events (committed/speculative text, audio level,
//!   final text, notifications).
//!
//! Communication happens over bounded [`tokio::sync::mpsc`] channels wrapped
//! in [`BridgeChannels`], providing back-pressure, async compatibility, and
//! clean separation of concerns.

pub mod audio;
pub mod config;
pub mod error;
pub mod notification;

use tokio::sync::mpsc::{self, Receiver, Sender};

use config::PipelineConfig;

/// Outbound contract: events emitted by the core to inform external
/// collaborators of state updates.
#[derive(Debug, Clone)]
pub enum CoreEvent {
    /// Generic message for all user-visible notifications.
    Notification(notification::NotificationMessage),
    /// Response to a configuration request.
    ConfigurationResponse(PipelineConfig),
    /// Enumerated input devices, in response to a list request.
    AudioDevicesListResponse(Vec<audio::InputDevice>),
    /// The committed (stable) transcript prefix changed.
    CommittedTextChanged(String),
    /// The speculative (tentative) transcript tail changed.
    SpeculativeTextChanged(String),
    /// Per-tick RMS audio level, for a waveform display.
    AudioLevel(f32),
    /// The final, authoritative transcript for a completed recording.
    /// Emitted exactly once per recording, at the end of finalization.
    FinalText(String),
    /// The accumulator exceeded the configured maximum session length.
    MaxDurationReached,
    /// The OS reported an input-device change mid-recording.
    DeviceChanged,
}

/// Inbound contract: commands external collaborators issue to control or
/// query the core.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Request the current configuration.
    ConfigurationRequest,
    /// Request the list of available audio input devices.
    AudioDevicesListRequest,
    /// Select an audio input device by id.
    SelectAudioDevice(String),
    /// Start a recording session with the given configuration snapshot.
    StartRecording(PipelineConfig),
    /// Stop the current recording and run finalization.
    StopRecording,
    /// Cancel the current recording, discarding all state.
    CancelRecording,
}

/// Paired `tokio::mpsc` channels for bidirectional communication between the
/// core and an external collaborator.
pub struct BridgeChannels {
    /// Receiver used by the external side to get events from the core.
    pub external_rx: Receiver<CoreEvent>,
    /// Sender used by the external side to send commands to the core.
    pub external_tx: Sender<CoreCommand>,

    /// Receiver used by the core to get commands from the external side.
    pub core_rx: Receiver<CoreCommand>,
    /// Sender used by the core to send events to the external side.
    pub core_tx: Sender<CoreEvent>,
}

impl BridgeChannels {
    /// Creates a new pair of bridged channels with the given buffer capacity.
    pub fn new(buffer: usize) -> Self {
        let (to_core_tx, to_core_rx) = mpsc::channel(buffer);
        let (to_external_tx, to_external_rx) = mpsc::channel(buffer);
        Self {
            external_tx: to_core_tx,
            external_rx: to_external_rx,
            core_rx: to_core_rx,
            core_tx: to_external_tx,
        }
    }
}

impl Default for BridgeChannels {
    fn default() -> Self {
        Self::new(64)
    }
}
