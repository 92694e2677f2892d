use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use clap::Parser;
use pushpix_bridge::{
    BridgeChannels, MessageFromBackend, MessageToBackend,
    notification::{EnrichedContent, NotificationPayload, NotificationRequest, RequestId},
};
use tokio::{
    io::AsyncReadExt,
    sync::mpsc::{Receiver, Sender},
    time::Instant,
};

/// Extra time granted to the backend after the deadline signal was sent.
const DELIVERY_GRACE: Duration = Duration::from_secs(1);

#[derive(Parser)]
#[command(name = "pushpix")]
#[command(about = "Enrich a push notification payload with its picture")]
struct Cli {
    /// JSON payload file. Read from stdin when omitted.
    payload: Option<PathBuf>,
    /// Configuration file to use instead of the user's config.toml
    #[arg(long)]
    config: Option<PathBuf>,
    /// Time budget of the enrichment in milliseconds (overrides the config)
    #[arg(long)]
    deadline_ms: Option<u64>,
}

async fn read_payload(path: Option<&Path>) -> anyhow::Result<NotificationPayload> {
    let raw = match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read payload from {path:?}"))?,
        None => {
            let mut raw = String::new();
            tokio::io::stdin()
                .read_to_string(&mut raw)
                .await
                .context("failed to read payload from stdin")?;
            raw
        }
    };

    let value: serde_json::Value = serde_json::from_str(&raw).context("payload is not valid JSON")?;
    NotificationPayload::from_value(value).context("payload must be a JSON object")
}

/// Waits for the content of `request_id`, firing the deadline signal once
/// `deadline` has passed. Returns `None` if the backend never delivers.
async fn await_delivery(
    rx: &mut Receiver<MessageFromBackend>,
    tx: &Sender<MessageToBackend>,
    request_id: RequestId,
    deadline: Duration,
) -> Option<EnrichedContent> {
    let timer = tokio::time::sleep(deadline);
    tokio::pin!(timer);
    let mut expired = false;

    loop {
        tokio::select! {
            message = rx.recv() => match message {
                Some(MessageFromBackend::ContentDelivered { request_id: delivered, content })
                    if delivered == request_id =>
                {
                    return Some(content);
                }
                Some(other) => log::debug!("Ignoring backend message: {other:?}"),
                None => return None,
            },
            () = &mut timer => {
                if expired {
                    return None;
                }
                expired = true;
                log::info!("Deadline of {deadline:?} reached for {request_id}");
                if tx.send(MessageToBackend::ServiceTimeWillExpire(request_id)).await.is_err() {
                    return None;
                }
                timer.as_mut().reset(Instant::now() + DELIVERY_GRACE);
            }
        }
    }
}

/// Picks the delivered content, or the original one when nothing arrived.
fn content_to_show(
    request_id: RequestId,
    delivered: Option<EnrichedContent>,
    original: EnrichedContent,
) -> EnrichedContent {
    delivered.unwrap_or_else(|| {
        log::warn!("Backend did not deliver {request_id}, showing the original content");
        original
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .env()
        .with_colors(true)
        .with_threads(true)
        .with_local_timestamps()
        .init()
        .context("failed to build logger instance")?;

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => pushpix_backend::config::load_config_from(path).await?,
        None => pushpix_backend::config::load_config().await?,
    };
    let deadline = Duration::from_millis(cli.deadline_ms.unwrap_or(config.host.deadline_ms));

    let request = NotificationRequest::new(read_payload(cli.payload.as_deref()).await?);
    let request_id = request.identifier;
    let original = EnrichedContent::from_payload(&request.payload);

    let mut channels = BridgeChannels::default();
    pushpix_backend::run(config, channels.backend_rx, channels.backend_tx);
    channels
        .host_tx
        .send(MessageToBackend::NotificationReceived(request))
        .await
        .context("backend is not running")?;

    let delivered =
        await_delivery(&mut channels.host_rx, &channels.host_tx, request_id, deadline).await;
    let content = content_to_show(request_id, delivered, original);

    println!("{}", serde_json::to_string_pretty(&content)?);
    Ok(())
}
