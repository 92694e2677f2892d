use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Key under which the standard alert fields live in a push payload.
pub const APS_KEY: &str = "aps";

/// Unique identifier of a single notification request received by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a fresh random request identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "req-{}", self.0)
    }
}

/// The raw push payload (`userInfo`) as delivered by the host.
///
/// The payload is an arbitrary JSON object. It is never mutated after it has
/// been received; enrichment works on an [`EnrichedContent`] copy instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationPayload(Map<String, Value>);

impl NotificationPayload {
    /// Wraps a JSON value, returning `None` when it is not an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Reads the user-visible fields from `aps.alert`.
    ///
    /// The alert may either be a plain string, which is used as the body, or
    /// an object with `title`, `subtitle` and `body` keys. Anything missing
    /// is left empty.
    pub fn display_fields(&self) -> DisplayFields {
        let alert = self
            .get(APS_KEY)
            .and_then(Value::as_object)
            .and_then(|aps| aps.get("alert"));

        match alert {
            Some(Value::String(body)) => DisplayFields {
                body: body.clone(),
                ..DisplayFields::default()
            },
            Some(Value::Object(alert)) => {
                let field = |key: &str| {
                    alert
                        .get(key)
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string()
                };
                DisplayFields {
                    title: field("title"),
                    subtitle: field("subtitle"),
                    body: field("body"),
                }
            }
            _ => DisplayFields::default(),
        }
    }
}

/// Title, subtitle and body of a notification as shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayFields {
    pub title: String,
    pub subtitle: String,
    pub body: String,
}

/// A notification handed to the backend for enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRequest {
    /// Identifier used to route the deadline signal and the delivered content.
    pub identifier: RequestId,
    /// Original push payload.
    pub payload: NotificationPayload,
}

impl NotificationRequest {
    /// Creates a request with a freshly generated identifier.
    pub fn new(payload: NotificationPayload) -> Self {
        Self {
            identifier: RequestId::new(),
            payload,
        }
    }
}

/// A locally stored file attached to a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Identifier that is unique within the owning content.
    pub identifier: String,
    /// Path of the stored resource. The extension always matches `format`.
    pub file_path: PathBuf,
    /// Lowercase image format name, e.g. `png` or `jpeg`.
    pub format: String,
}

/// The content that is finally presented to the user.
///
/// Seeded from the display fields of a [`NotificationPayload`] and then
/// modified by the enrichment pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichedContent {
    pub title: String,
    pub subtitle: String,
    pub body: String,
    /// Attachments in the order they were added.
    pub attachments: Vec<Attachment>,
    /// The untouched original payload.
    pub user_info: NotificationPayload,
}

impl EnrichedContent {
    /// Copies the display fields out of `payload`.
    pub fn from_payload(payload: &NotificationPayload) -> Self {
        let DisplayFields {
            title,
            subtitle,
            body,
        } = payload.display_fields();
        Self {
            title,
            subtitle,
            body,
            attachments: Vec::new(),
            user_info: payload.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn payload(value: Value) -> NotificationPayload {
        NotificationPayload::from_value(value).unwrap()
    }

    #[rstest]
    #[case(json!({"aps": {"alert": "Hello"}}), "", "", "Hello")]
    #[case(
        json!({"aps": {"alert": {"title": "T", "subtitle": "S", "body": "B"}}}),
        "T",
        "S",
        "B"
    )]
    #[case(json!({"aps": {"alert": {"title": "Only title"}}}), "Only title", "", "")]
    #[case(json!({"aps": {}}), "", "", "")]
    #[case(json!({"aps": "not an object"}), "", "", "")]
    #[case(json!({}), "", "", "")]
    fn display_fields_are_read_from_alert(
        #[case] value: Value,
        #[case] title: &str,
        #[case] subtitle: &str,
        #[case] body: &str,
    ) {
        let fields = payload(value).display_fields();
        assert_eq!(fields.title, title);
        assert_eq!(fields.subtitle, subtitle);
        assert_eq!(fields.body, body);
    }

    #[test]
    fn payload_must_be_an_object() {
        assert!(NotificationPayload::from_value(json!([1, 2, 3])).is_none());
        assert!(NotificationPayload::from_value(json!("aps")).is_none());
    }

    #[test]
    fn content_is_seeded_without_attachments() {
        let original = payload(json!({
            "aps": {"alert": {"title": "Hi", "body": "there"}, "pictureURL": "https://example.com/a.png"}
        }));
        let content = EnrichedContent::from_payload(&original);

        assert_eq!(content.title, "Hi");
        assert_eq!(content.body, "there");
        assert!(content.attachments.is_empty());
        assert_eq!(content.user_info, original);
    }

    #[test]
    fn request_ids_are_unique() {
        let first = NotificationRequest::new(NotificationPayload::default());
        let second = NotificationRequest::new(NotificationPayload::default());
        assert_ne!(first.identifier, second.identifier);
        assert!(first.identifier.to_string().starts_with("req-"));
    }
}
