use std::time::Duration;

use futures_util::StreamExt;
use pushpix_bridge::config::FetchConfig;
use reqwest::{StatusCode, Url};

/// Errors that can occur while downloading a picture.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    /// Connection, TLS, or body transfer failure.
    #[error("failed to download picture: {0}")]
    Transport(#[source] reqwest::Error),
    /// The server answered with a non-2xx status code.
    #[error("server answered with status {0}")]
    Status(StatusCode),
    /// The server answered successfully but sent no data.
    #[error("response body is empty")]
    EmptyBody,
    /// The response body exceeds the configured limit.
    #[error("response body exceeds {limit} bytes")]
    TooLarge { limit: u64 },
}

/// Builds the HTTP client shared by all enrichments.
pub fn build_client(config: &FetchConfig) -> Result<reqwest::Client, FetchError> {
    let mut builder =
        reqwest::Client::builder().connect_timeout(Duration::from_millis(config.connect_timeout_ms));
    if let Some(user_agent) = &config.user_agent {
        builder = builder.user_agent(user_agent.clone());
    }
    builder.build().map_err(FetchError::Client)
}

/// Downloads the resource at `url` with a single GET request.
///
/// The body is streamed and abandoned as soon as it grows past `max_bytes`.
pub async fn fetch_picture(
    client: &reqwest::Client,
    url: Url,
    max_bytes: u64,
) -> Result<Vec<u8>, FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(FetchError::Transport)?;

    let status = response.status();
    log::debug!("Downloaded picture with response code {status}");
    if !status.is_success() {
        return Err(FetchError::Status(status));
    }

    if response
        .content_length()
        .is_some_and(|length| length > max_bytes)
    {
        return Err(FetchError::TooLarge { limit: max_bytes });
    }

    let mut data = Vec::new();
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(FetchError::Transport)?;
        if (data.len() + chunk.len()) as u64 > max_bytes {
            return Err(FetchError::TooLarge { limit: max_bytes });
        }
        data.extend_from_slice(&chunk);
    }

    if data.is_empty() {
        return Err(FetchError::EmptyBody);
    }
    Ok(data)
}
