//! The notification enricher.
//!
//! An enrichment copies the display fields of an incoming notification,
//! marks the title, and tries to attach the picture referenced by the
//! payload. Whatever happens, the content handler is called exactly once:
//! either when the attach step finishes (with or without a picture) or when
//! the host signals that its time budget is up, whichever comes first.
//!
//! The download is never cancelled. If the deadline wins, the late result is
//! simply dropped by the [`DeliveryGuard`].

pub mod delivery;
pub mod fetch;
pub mod payload;

use std::{
    future::Future,
    sync::{Arc, Mutex, PoisonError},
};

use pushpix_bridge::{
    config::{Config, EnrichmentConfig},
    notification::{Attachment, EnrichedContent, NotificationRequest, RequestId},
};
use pushpix_media::{AttachmentStore, MediaError, StorageError, decode_image_blocking};
use reqwest::Url;
use tokio::task::JoinHandle;

pub use crate::enricher::delivery::{ContentHandler, DeliveryGuard, DeliveryPath};
pub use crate::enricher::fetch::{FetchError, build_client, fetch_picture};
pub use crate::enricher::payload::{PayloadError, parse_picture_url};

/// Any failure of the attach step. None of these reach the content handler;
/// they are logged and the content is delivered without a picture.
#[derive(Debug, thiserror::Error)]
pub enum EnrichmentError {
    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] PayloadError),
    #[error("transport failure: {0}")]
    Transport(#[from] FetchError),
    #[error("decode failure: {0}")]
    Decode(#[from] MediaError),
    #[error("persist failure: {0}")]
    Persist(#[from] StorageError),
}

/// Downloads and attaches pictures to incoming notifications.
///
/// One instance is shared by all enrichments. Per-notification state lives in
/// the [`EnrichmentSession`] returned by [`Enricher::begin`].
#[derive(Debug)]
pub struct Enricher {
    client: reqwest::Client,
    store: AttachmentStore,
    settings: EnrichmentConfig,
    max_body_bytes: u64,
}

impl Enricher {
    pub fn new(
        client: reqwest::Client,
        store: AttachmentStore,
        settings: EnrichmentConfig,
        max_body_bytes: u64,
    ) -> Self {
        Self {
            client,
            store,
            settings,
            max_body_bytes,
        }
    }

    /// Builds an enricher with its own HTTP client from the configuration.
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        Ok(Self::new(
            build_client(&config.fetch)?,
            AttachmentStore::new(config.storage.resolve_attachments_dir()),
            config.enrichment.clone(),
            config.fetch.max_body_bytes,
        ))
    }

    pub fn store(&self) -> &AttachmentStore {
        &self.store
    }

    /// Starts enriching `request`.
    ///
    /// The title is marked and the picture URL extracted before this returns.
    /// If there is no usable URL, `handler` is called right away; otherwise
    /// the download runs on a background task. Must be called from within a
    /// Tokio runtime.
    pub fn begin(
        self: &Arc<Self>,
        request: NotificationRequest,
        handler: impl ContentHandler,
    ) -> EnrichmentSession {
        let NotificationRequest {
            identifier,
            payload,
        } = request;

        let mut content = EnrichedContent::from_payload(&payload);
        content.title = format!("{}{}", self.settings.title_marker, content.title);

        let shared = Arc::new(SessionShared {
            request_id: identifier,
            best_attempt: Mutex::new(content),
            guard: DeliveryGuard::new(handler),
        });

        let task = match parse_picture_url(&payload, &self.settings) {
            Ok(url) => {
                log::info!("Enriching {identifier} with picture from {url}");
                let enricher = Arc::clone(self);
                let shared = Arc::clone(&shared);
                Some(tokio::spawn(async move {
                    match enricher.attach_picture(url).await {
                        Ok(attachment) => {
                            log::info!(
                                "Attached {} to {}",
                                attachment.file_path.display(),
                                shared.request_id
                            );
                            shared.update(|content| content.attachments.push(attachment));
                        }
                        Err(error) => {
                            log::warn!("Skipping attachment for {}: {error}", shared.request_id);
                        }
                    }
                    shared.deliver(DeliveryPath::Completed);
                }))
            }
            Err(error) => {
                let error = EnrichmentError::from(error);
                log::warn!("Not enriching {identifier}: {error}");
                shared.deliver(DeliveryPath::Completed);
                None
            }
        };

        EnrichmentSession { shared, task }
    }

    /// Enriches `request` and returns once its content has been delivered.
    ///
    /// `deadline` is raced against the attach step: if it resolves first, the
    /// best attempt so far is delivered and the download is left to finish on
    /// its own. The returned session can be used to await that download.
    pub async fn enrich(
        self: &Arc<Self>,
        request: NotificationRequest,
        handler: impl ContentHandler,
        deadline: impl Future<Output = ()>,
    ) -> EnrichmentSession {
        let session = self.begin(request, handler);
        tokio::select! {
            () = session.delivered() => {}
            () = deadline => {
                session.time_will_expire();
            }
        }
        // The deadline may lose against a handler that is still running.
        session.delivered().await;
        session
    }

    async fn attach_picture(&self, url: Url) -> Result<Attachment, EnrichmentError> {
        let data = fetch_picture(&self.client, url, self.max_body_bytes).await?;
        let image = decode_image_blocking(data).await?;
        Ok(self.store.persist(None, &image).await?)
    }
}

#[derive(Debug)]
struct SessionShared {
    request_id: RequestId,
    best_attempt: Mutex<EnrichedContent>,
    guard: DeliveryGuard,
}

impl SessionShared {
    fn update(&self, change: impl FnOnce(&mut EnrichedContent)) {
        let mut content = self
            .best_attempt
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        change(&mut *content);
    }

    fn deliver(&self, path: DeliveryPath) -> bool {
        let delivered = self.guard.deliver_with(|| {
            self.best_attempt
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        });
        if delivered {
            log::info!("Delivered content of {} ({path})", self.request_id);
        } else {
            log::debug!("Content of {} was already delivered ({path})", self.request_id);
        }
        delivered
    }
}

/// Handle to one in-flight enrichment.
#[derive(Debug)]
pub struct EnrichmentSession {
    shared: Arc<SessionShared>,
    task: Option<JoinHandle<()>>,
}

impl EnrichmentSession {
    pub fn request_id(&self) -> RequestId {
        self.shared.request_id
    }

    pub fn is_delivered(&self) -> bool {
        self.shared.guard.is_delivered()
    }

    /// Deadline signal: delivers the best attempt so far unless the content
    /// was already delivered. Returns whether this call delivered.
    pub fn time_will_expire(&self) -> bool {
        self.shared.deliver(DeliveryPath::Deadline)
    }

    /// Resolves once the content has been delivered by either path.
    pub async fn delivered(&self) {
        self.shared.guard.wait_delivered().await;
    }

    /// Waits for the background download, if any, to run to completion.
    pub async fn finished(self) {
        let Some(task) = self.task else {
            return;
        };
        if let Err(error) = task.await {
            log::error!("Enrichment task of {} failed: {error}", self.shared.request_id);
        }
    }
}
