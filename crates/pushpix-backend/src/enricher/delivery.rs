use std::{
    fmt,
    sync::{Mutex, PoisonError},
};

use pushpix_bridge::notification::EnrichedContent;
use tokio::sync::watch;

/// Receives the final content of a notification.
///
/// Any `FnOnce(EnrichedContent) + Send + 'static` closure is a handler.
pub trait ContentHandler: FnOnce(EnrichedContent) + Send + 'static {}

impl<F> ContentHandler for F where F: FnOnce(EnrichedContent) + Send + 'static {}

/// Which path ended up delivering the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryPath {
    /// The enrichment finished (successfully or not) before the deadline.
    Completed,
    /// The deadline signal fired first.
    Deadline,
}

impl fmt::Display for DeliveryPath {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryPath::Completed => formatter.write_str("completed"),
            DeliveryPath::Deadline => formatter.write_str("deadline"),
        }
    }
}

/// Single-use holder of a [`ContentHandler`].
///
/// The handler is taken out under a mutex, so when several paths race to
/// deliver, exactly one of them gets to call it. The others observe an empty
/// slot and do nothing.
pub struct DeliveryGuard {
    handler: Mutex<Option<Box<dyn FnOnce(EnrichedContent) + Send>>>,
    delivered: watch::Sender<bool>,
}

impl DeliveryGuard {
    pub fn new(handler: impl ContentHandler) -> Self {
        let (delivered, _) = watch::channel(false);
        Self {
            handler: Mutex::new(Some(Box::new(handler))),
            delivered,
        }
    }

    /// Calls the handler with the content produced by `content`, unless some
    /// other caller already did. Returns whether this call delivered.
    ///
    /// `content` is only evaluated by the winning caller. The delivered flag
    /// is raised only after the handler has returned.
    pub fn deliver_with(&self, content: impl FnOnce() -> EnrichedContent) -> bool {
        let handler = self
            .handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(handler) = handler else {
            return false;
        };

        handler(content());
        self.delivered.send_replace(true);
        true
    }

    pub fn is_delivered(&self) -> bool {
        *self.delivered.borrow()
    }

    /// Resolves once the handler has returned.
    pub async fn wait_delivered(&self) {
        let mut delivered = self.delivered.subscribe();
        // The sender lives in `self`, so the channel cannot close while waiting.
        let _ = delivered.wait_for(|delivered| *delivered).await;
    }
}

impl fmt::Debug for DeliveryGuard {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("DeliveryGuard")
            .field("delivered", &self.is_delivered())
            .finish()
    }
}
