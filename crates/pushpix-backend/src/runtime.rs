//! Backend runtime setup and orchestration.
//!
//! This module wires together configuration, shared state, and the message
//! dispatch loop that listens to host bridge requests.

use std::{sync::Arc, thread};

use pushpix_bridge::{MessageFromBackend, MessageToBackend, config::Config};
use tokio::sync::{
    RwLock,
    mpsc::{Receiver, Sender},
};

use crate::app::AppContext;
use crate::enricher::Enricher;
use crate::state::State;

/// Initialize backend state and start processing host messages.
async fn setup_backend(
    config: Config,
    rx: Receiver<MessageToBackend>,
    tx: Sender<MessageFromBackend>,
) {
    let enricher = match Enricher::from_config(&config) {
        Ok(enricher) => Arc::new(enricher),
        Err(error) => {
            // Without a backend the host falls back to the original content.
            log::error!("Failed to set up the enricher: {error}");
            return;
        }
    };
    log::info!(
        "Backend ready, storing attachments in {:?}",
        enricher.store().root()
    );

    let state = Arc::new(RwLock::new(State::new(config, enricher)));

    let context = Arc::new(AppContext { state, tx });
    context.consume_bridge_messages(rx).await;
}

/// Spawn the backend runtime and begin processing bridge messages.
///
/// The backend runs on its own thread with a dedicated multi-threaded Tokio
/// runtime and stops once the host side of the bridge is dropped.
pub fn run(
    config: Config,
    rx: Receiver<MessageToBackend>,
    tx: Sender<MessageFromBackend>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(error) => {
                log::error!("Failed to build tokio runtime: {error}");
                return;
            }
        };
        runtime.block_on(async { setup_backend(config, rx, tx).await });
    })
}
