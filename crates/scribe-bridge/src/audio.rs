/// A single enumerated audio input device, as surfaced to external
/// collaborators (e.g. a settings UI).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDevice {
    /// Host-scoped unique identifier.
    pub id: String,
    /// Human-readable device description.
    pub description: String,
    /// Whether this device is the currently configured input.
    pub selected: bool,
}
