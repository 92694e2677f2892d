//! Communication bridge between the notification host and the backend.
//!
//! This crate defines the types exchanged between whatever receives push
//! notifications (the host) and the asynchronous backend that enriches them
//! before they are displayed.
//!
//! The flow mirrors a notification service extension:
//! - The host forwards each received notification and, when its time budget
//!   runs out, a deadline signal for that notification.
//! - The backend answers with exactly one delivered content per
//!   notification, enriched or not.
//!
//! Communication happens over bounded [`tokio::sync::mpsc`] channels wrapped
//! in [`BridgeChannels`], providing back-pressure, async compatibility, and
//! clean separation of concerns.

pub mod config;
pub mod notification;

use tokio::sync::mpsc::{self, Receiver, Sender};

/// Messages emitted by the backend to inform the host.
#[derive(Debug, Clone)]
pub enum MessageFromBackend {
    /// Final content of a notification. Sent exactly once per request.
    ContentDelivered {
        request_id: notification::RequestId,
        content: notification::EnrichedContent,
    },
    /// Response to the configuration request from the host.
    ConfigurationResponse(config::Config),
}

/// Commands issued by the host to drive the backend.
#[derive(Debug, Clone)]
pub enum MessageToBackend {
    /// A notification arrived and should be enriched.
    NotificationReceived(notification::NotificationRequest),
    /// The time budget of the given request is about to run out.
    ServiceTimeWillExpire(notification::RequestId),
    /// Request for the application configuration.
    ConfigurationRequest,
}

/// Paired `tokio::mpsc` channels for bidirectional communication between
/// host and backend.
pub struct BridgeChannels {
    /// Receiver used by the host to get messages from the backend.
    pub host_rx: Receiver<MessageFromBackend>,
    /// Sender used by the host to send commands to the backend.
    pub host_tx: Sender<MessageToBackend>,

    /// Receiver used by the backend to get commands from the host.
    pub backend_rx: Receiver<MessageToBackend>,
    /// Sender used by the backend to send events/responses to the host.
    pub backend_tx: Sender<MessageFromBackend>,
}

impl BridgeChannels {
    /// Creates a new pair of bridged channels with the given buffer capacity.
    pub fn new(buffer: usize) -> Self {
        let (to_backend_tx, to_backend_rx) = mpsc::channel(buffer);
        let (to_host_tx, to_host_rx) = mpsc::channel(buffer);
        Self {
            host_tx: to_backend_tx,
            host_rx: to_host_rx,
            backend_rx: to_backend_rx,
            backend_tx: to_host_tx,
        }
    }
}

impl Default for BridgeChannels {
    fn default() -> Self {
        Self::new(64)
    }
}
