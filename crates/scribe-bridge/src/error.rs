/// Categorical error taxonomy for the transcription core.
///
/// Variants never leak backend-specific details to the user-visible surface;
/// each carries a short, categorical message. Only [`CoreError::Device`] and
/// [`CoreError::Model`] terminate a recording — every other variant is
/// recoverable within one tick.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CoreError {
    /// Audio capture init/permission/disconnect. Terminates the recording.
    #[error("audio device error: {0}")]
    Device(String),
    /// Model missing, load failed, or context null. Recording cannot start.
    #[error("model error: {0}")]
    Model(String),
    /// Window or full decode failure, timeout, or stall. Logged and dropped;
    /// the stabilizer is left unchanged and the tick loop continues.
    #[error("decode error: {0}")]
    Decode(String),
}

impl CoreError {
    /// Whether this error should terminate the current recording, per the
    /// propagation policy: only device/model errors are fatal.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CoreError::Device(_) | CoreError::Model(_))
    }
}
