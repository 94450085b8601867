//! Application context and command dispatching utilities.
//!
//! The context contains the shared state and provides helpers for sending
//! events back to the external collaborator.

use std::sync::Arc;

use scribe_bridge::{CoreCommand, CoreEvent, notification::NotificationType};
use tokio::sync::mpsc::{Receiver, Sender};

use crate::services;
use crate::state::SharedState;

/// Shared application context passed to services and command handlers.
pub(crate) struct AppContext {
    /// Mutable runtime application state shared across services.
    pub state: SharedState,
    /// Outbound channel to the external collaborator.
    pub tx: Sender<CoreEvent>,
}

impl AppContext {
    /// Read and dispatch commands from the external collaborator until it
    /// closes.
    pub async fn consume_bridge_messages(self: &Arc<Self>, mut rx: Receiver<CoreCommand>) {
        while let Some(command) = rx.recv().await {
            log::debug!("Got a core command: {command:?}");
            self.dispatch_command(command).await;
        }
    }

    /// Dispatches the received command down to individual service handlers.
    async fn dispatch_command(self: &Arc<Self>, command: CoreCommand) {
        match command {
            CoreCommand::ConfigurationRequest => {
                services::config_service::handle_config_request(self.clone()).await;
            }
            CoreCommand::AudioDevicesListRequest => {
                services::audio_service::handle_audio_devices_list_request(self.clone()).await;
            }
            CoreCommand::SelectAudioDevice(id) => {
                services::audio_service::handle_audio_device_selection(self.clone(), id).await;
            }
            CoreCommand::StartRecording(config) => {
                services::recording_service::handle_start_recording(self.clone(), config).await;
            }
            CoreCommand::StopRecording => {
                services::recording_service::handle_stop_recording(self.clone()).await;
            }
            CoreCommand::CancelRecording => {
                services::recording_service::handle_cancel_recording(self.clone()).await;
            }
        }
    }

    /// Send an event to the external collaborator.
    pub async fn send(&self, event: CoreEvent) {
        self.tx
            .send(event)
            .await
            .expect("failed to send event to external collaborator");
    }

    /// Send an event synchronously (blocking) to the external collaborator.
    /// Used from the non-async decode worker thread.
    pub fn send_blocking(&self, event: CoreEvent) {
        self.tx
            .blocking_send(event)
            .expect("failed to blocking send event to external collaborator");
    }

    /// Send a notification event to the external collaborator.
    pub async fn send_notification(
        &self,
        notification_type: NotificationType,
        content: impl Into<String>,
    ) {
        self.send(CoreEvent::Notification(
            scribe_bridge::notification::NotificationMessage {
                notification_type,
                message: content.into(),
            },
        ))
        .await;
    }
}
