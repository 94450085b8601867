//! Backend service handlers for commands from the external collaborator.
//!
//! This module groups async request handlers that operate on the shared
//! `AppContext`, perform side effects (audio capture, decoding,
//! filesystem), and emit events back to the external collaborator.

pub mod audio_service;
pub mod config_service;
pub mod recording_service;

/// Represents a type that is used in all handlers as an application context.
pub(crate) type AppContextHandle = std::sync::Arc<crate::app::AppContext>;
