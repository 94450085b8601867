//! Backend runtime: command dispatcher and service handlers for the
//! streaming transcription core.
//!
//! This crate owns the backend runtime lifecycle, loads configuration/state,
//! and reacts to commands from the external collaborator (see
//! `scribe_bridge::CoreCommand`), driving `scribe-speech`'s scheduler and
//! emitting `scribe_bridge::CoreEvent`s in response.

mod app;
mod config;
mod runtime;
mod services;
mod state;

pub use runtime::run;
