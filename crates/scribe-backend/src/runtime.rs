//! Backend runtime setup and orchestration.
//!
//! This module wires together configuration, shared state, and the command
//! dispatch loop that listens for commands from the external collaborator.

use std::{sync::Arc, thread};

use scribe_bridge::{CoreCommand, CoreEvent};
use tokio::sync::{
    RwLock,
    mpsc::{Receiver, Sender},
};

use crate::app::AppContext;
use crate::state::State;

/// Initialize backend state and start processing commands.
async fn setup_backend(rx: Receiver<CoreCommand>, tx: Sender<CoreEvent>) {
    let (config, cache_path) = crate::config::load_config()
        .await
        .expect("failed to load config");

    let active_host = Arc::new(cpal::default_host());
    let active_audio_device = match config.selected_device_id {
        Some(ref device_id) => scribe_audio::device::list_host_input_devices(&active_host)
            .expect("failed to list host input devices")
            .into_iter()
            .find(|device| &device.id.to_string() == device_id),
        None => None,
    };

    let state = Arc::new(RwLock::new(State {
        config,
        cache_path,
        active_host,
        active_audio_device: Arc::new(active_audio_device),
        active_recording: None,
    }));

    let context = Arc::new(AppContext { state, tx });
    context.consume_bridge_messages(rx).await;
}

/// Spawn the backend runtime and begin processing commands from the
/// external collaborator.
pub fn run(rx: Receiver<CoreCommand>, tx: Sender<CoreEvent>) {
    thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .expect("failed to build tokio runtime");
        runtime.block_on(async { setup_backend(rx, tx).await });
    });
}
