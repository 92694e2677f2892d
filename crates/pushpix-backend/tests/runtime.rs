//! End-to-end tests that drive the backend through the bridge channels, the
//! way a notification host does.

use std::{io::Cursor, time::Duration};

use image::{DynamicImage, ImageFormat, RgbImage};
use pushpix_bridge::{
    BridgeChannels, MessageFromBackend, MessageToBackend,
    config::Config,
    notification::{NotificationPayload, NotificationRequest, RequestId},
};
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::mpsc::Receiver;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn png() -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::new(4, 4))
        .write_to(&mut cursor, ImageFormat::Png)
        .unwrap();
    cursor.into_inner()
}

fn config_in(root: &TempDir) -> Config {
    let mut config = Config::default();
    config.storage.attachments_dir = Some(root.path().to_path_buf());
    config
}

fn picture_request(url: String) -> NotificationRequest {
    let payload = NotificationPayload::from_value(json!({
        "aps": {"alert": "New photo", "pictureURL": url}
    }))
    .unwrap();
    NotificationRequest::new(payload)
}

async fn next_message(rx: &mut Receiver<MessageFromBackend>) -> MessageFromBackend {
    tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("backend did not answer in time")
        .expect("backend closed the bridge")
}

async fn assert_silent(rx: &mut Receiver<MessageFromBackend>, duration: Duration) {
    if let Ok(Some(message)) = tokio::time::timeout(duration, rx.recv()).await {
        panic!("unexpected message from backend: {message:?}");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn notification_is_enriched_and_delivered_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pic.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png()))
        .mount(&server)
        .await;
    let root = TempDir::new().unwrap();
    let mut channels = BridgeChannels::default();
    let backend = pushpix_backend::run(config_in(&root), channels.backend_rx, channels.backend_tx);

    let request = picture_request(format!("{}/pic.png", server.uri()));
    let request_id = request.identifier;
    channels
        .host_tx
        .send(MessageToBackend::NotificationReceived(request))
        .await
        .unwrap();

    match next_message(&mut channels.host_rx).await {
        MessageFromBackend::ContentDelivered {
            request_id: delivered_id,
            content,
        } => {
            assert_eq!(delivered_id, request_id);
            assert_eq!(content.body, "New photo");
            assert_eq!(content.attachments.len(), 1);
            assert!(content.attachments[0].file_path.exists());
        }
        other => panic!("unexpected message: {other:?}"),
    }

    // A deadline after delivery must not produce a second delivery.
    channels
        .host_tx
        .send(MessageToBackend::ServiceTimeWillExpire(request_id))
        .await
        .unwrap();
    assert_silent(&mut channels.host_rx, Duration::from_millis(200)).await;

    drop(channels.host_tx);
    tokio::task::spawn_blocking(move || backend.join().unwrap())
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn deadline_signal_forces_best_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(png())
                .set_delay(Duration::from_millis(600)),
        )
        .mount(&server)
        .await;
    let root = TempDir::new().unwrap();
    let mut channels = BridgeChannels::default();
    pushpix_backend::run(config_in(&root), channels.backend_rx, channels.backend_tx);

    let request = picture_request(format!("{}/slow.png", server.uri()));
    let request_id = request.identifier;
    channels
        .host_tx
        .send(MessageToBackend::NotificationReceived(request))
        .await
        .unwrap();
    channels
        .host_tx
        .send(MessageToBackend::ServiceTimeWillExpire(request_id))
        .await
        .unwrap();

    match next_message(&mut channels.host_rx).await {
        MessageFromBackend::ContentDelivered { request_id: delivered_id, content } => {
            assert_eq!(delivered_id, request_id);
            assert!(content.attachments.is_empty());
            assert!(content.title.starts_with("This is a modified notification."));
        }
        other => panic!("unexpected message: {other:?}"),
    }

    // The slow download finishes later without delivering again.
    assert_silent(&mut channels.host_rx, Duration::from_millis(1_000)).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_deadline_and_plain_payload() {
    let root = TempDir::new().unwrap();
    let mut channels = BridgeChannels::default();
    pushpix_backend::run(config_in(&root), channels.backend_rx, channels.backend_tx);

    channels
        .host_tx
        .send(MessageToBackend::ServiceTimeWillExpire(RequestId::new()))
        .await
        .unwrap();

    let request = NotificationRequest::new(
        NotificationPayload::from_value(json!({"aps": {"alert": {"title": "Hello"}}})).unwrap(),
    );
    let request_id = request.identifier;
    channels
        .host_tx
        .send(MessageToBackend::NotificationReceived(request))
        .await
        .unwrap();

    match next_message(&mut channels.host_rx).await {
        MessageFromBackend::ContentDelivered { request_id: delivered_id, content } => {
            assert_eq!(delivered_id, request_id);
            assert_eq!(content.title, "This is a modified notification.Hello");
            assert!(content.attachments.is_empty());
        }
        other => panic!("unexpected message: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn configuration_is_reported() {
    let root = TempDir::new().unwrap();
    let mut channels = BridgeChannels::default();
    pushpix_backend::run(config_in(&root), channels.backend_rx, channels.backend_tx);

    channels
        .host_tx
        .send(MessageToBackend::ConfigurationRequest)
        .await
        .unwrap();

    match next_message(&mut channels.host_rx).await {
        MessageFromBackend::ConfigurationResponse(config) => {
            assert_eq!(
                config.storage.attachments_dir.as_deref(),
                Some(root.path())
            );
        }
        other => panic!("unexpected message: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn resent_notification_is_delivered_only_once() {
    let root = TempDir::new().unwrap();
    let mut channels = BridgeChannels::default();
    pushpix_backend::run(config_in(&root), channels.backend_rx, channels.backend_tx);

    let request = NotificationRequest::new(
        NotificationPayload::from_value(json!({"aps": {"alert": "Once"}})).unwrap(),
    );
    let request_id = request.identifier;
    channels
        .host_tx
        .send(MessageToBackend::NotificationReceived(request.clone()))
        .await
        .unwrap();

    match next_message(&mut channels.host_rx).await {
        MessageFromBackend::ContentDelivered { request_id: delivered_id, .. } => {
            assert_eq!(delivered_id, request_id);
        }
        other => panic!("unexpected message: {other:?}"),
    }

    // Same identifier again, after the first one was delivered.
    channels
        .host_tx
        .send(MessageToBackend::NotificationReceived(request))
        .await
        .unwrap();
    assert_silent(&mut channels.host_rx, Duration::from_millis(300)).await;
}
