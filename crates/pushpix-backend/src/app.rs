//! Application context and message dispatching utilities.
//!
//! The context contains the shared state and provides helpers for sending
//! responses back to the host bridge.

use std::sync::Arc;

use pushpix_bridge::{MessageFromBackend, MessageToBackend};
use tokio::sync::mpsc::{Receiver, Sender};

use crate::services;
use crate::state::SharedState;

/// Shared application context passed to services and message handlers.
pub(crate) struct AppContext {
    /// Mutable runtime application state shared across services.
    pub state: SharedState,
    /// Outbound channel to the host bridge.
    pub tx: Sender<MessageFromBackend>,
}

impl AppContext {
    /// Read and dispatch messages from the host bridge until it closes.
    pub async fn consume_bridge_messages(self: &Arc<Self>, mut rx: Receiver<MessageToBackend>) {
        while let Some(message) = rx.recv().await {
            log::debug!("Got a host message: {message:?}");
            self.dispatch_message(message).await;
        }
        log::info!("Host bridge closed, stopping backend");
    }

    /// Dispatches the received message from the host down to individual
    /// service handlers.
    async fn dispatch_message(self: &Arc<Self>, message: MessageToBackend) {
        match message {
            MessageToBackend::NotificationReceived(request) => {
                services::enrichment_service::handle_notification_received(self.clone(), request)
                    .await;
            }
            MessageToBackend::ServiceTimeWillExpire(request_id) => {
                services::enrichment_service::handle_time_will_expire(self.clone(), request_id)
                    .await;
            }
            MessageToBackend::ConfigurationRequest => {
                services::config_service::handle_config_request(self.clone()).await;
            }
        }
    }

    /// Send a message to the host bridge.
    pub async fn send(&self, message: MessageFromBackend) {
        if let Err(error) = self.tx.send(message).await {
            log::error!("Failed to send message to host: {error}");
        }
    }
}
