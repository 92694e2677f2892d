use pushpix_bridge::{config::EnrichmentConfig, notification::NotificationPayload};
use reqwest::Url;
use serde_json::Value;

/// Reasons why a payload carries no usable picture reference.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PayloadError {
    #[error("payload has no {0:?} entry")]
    MissingPayloadKey(String),
    #[error("payload entry {0:?} is not an object")]
    NotAnObject(String),
    #[error("payload has no {0:?} field")]
    MissingPictureUrl(String),
    #[error("picture reference {0:?} is not a string")]
    NotAString(String),
    #[error("picture reference is not an absolute URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("picture URL uses unsupported scheme {0:?}")]
    UnsupportedScheme(String),
}

/// Extracts the picture URL from `payload[payload_key][picture_url_key]`.
///
/// Only absolute `http` and `https` URLs are accepted.
pub fn parse_picture_url(
    payload: &NotificationPayload,
    settings: &EnrichmentConfig,
) -> Result<Url, PayloadError> {
    let nested = payload
        .get(&settings.payload_key)
        .ok_or_else(|| PayloadError::MissingPayloadKey(settings.payload_key.clone()))?
        .as_object()
        .ok_or_else(|| PayloadError::NotAnObject(settings.payload_key.clone()))?;

    let raw = match nested.get(&settings.picture_url_key) {
        Some(Value::String(raw)) => raw,
        Some(_) => return Err(PayloadError::NotAString(settings.picture_url_key.clone())),
        None => {
            return Err(PayloadError::MissingPictureUrl(
                settings.picture_url_key.clone(),
            ));
        }
    };

    let url = Url::parse(raw.trim())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(PayloadError::UnsupportedScheme(scheme.to_string())),
    }
}
