use std::collections::{HashMap, VecDeque};

use pushpix_bridge::notification::RequestId;

use crate::enricher::{Enricher, EnrichmentSession};

/// How many delivered request IDs are remembered to reject re-sent
/// notifications.
pub const RECENT_DELIVERIES: usize = 256;

/// The core application state that holds configuration, the enricher, and
/// the enrichments that are still waiting for delivery.
///
/// It is designed to be wrapped in thread-safe, async-friendly concurrency
/// primitives (see [`SharedState`]) so that message handlers running on
/// different tasks can reach it.
#[derive(Debug)]
pub struct State {
    /// The loaded application configuration.
    pub config: pushpix_bridge::config::Config,
    /// Enricher shared by all sessions. Holds the pooled HTTP client.
    pub enricher: std::sync::Arc<Enricher>,
    /// Sessions keyed by request, kept until their content was delivered.
    pub sessions: HashMap<RequestId, EnrichmentSession>,
    /// Most recently delivered requests, oldest first.
    pub recently_delivered: VecDeque<RequestId>,
}

impl State {
    pub fn new(config: pushpix_bridge::config::Config, enricher: std::sync::Arc<Enricher>) -> Self {
        Self {
            config,
            enricher,
            sessions: HashMap::new(),
            recently_delivered: VecDeque::with_capacity(RECENT_DELIVERIES),
        }
    }

    /// Moves sessions whose content has already been delivered out of the
    /// pending table and into the recent deliveries.
    pub fn prune_delivered(&mut self) {
        let delivered: Vec<RequestId> = self
            .sessions
            .iter()
            .filter(|(_, session)| session.is_delivered())
            .map(|(request_id, _)| *request_id)
            .collect();
        for request_id in delivered {
            self.sessions.remove(&request_id);
            self.remember_delivered(request_id);
        }
    }

    pub fn remember_delivered(&mut self, request_id: RequestId) {
        if self.recently_delivered.len() == RECENT_DELIVERIES {
            self.recently_delivered.pop_front();
        }
        self.recently_delivered.push_back(request_id);
    }

    /// Whether `request_id` is pending or was delivered recently.
    pub fn is_known(&self, request_id: &RequestId) -> bool {
        self.sessions.contains_key(request_id) || self.recently_delivered.contains(request_id)
    }
}

/// Thread-safe, async-friendly shared reference to the application [`State`].
pub type SharedState = std::sync::Arc<tokio::sync::RwLock<State>>;
