use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Controls how the incoming payload is interpreted and how the content is
/// modified.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Text prepended to the original title of every enriched notification.
    pub title_marker: String,
    /// Top-level payload key holding the nested picture reference.
    pub payload_key: String,
    /// Key of the picture URL inside the nested mapping.
    pub picture_url_key: String,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            title_marker: "This is a modified notification.".to_string(),
            payload_key: "aps".to_string(),
            picture_url_key: "pictureURL".to_string(),
        }
    }
}

/// Configuration of the HTTP client used to download pictures.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Time allowed for establishing the connection, in milliseconds.
    pub connect_timeout_ms: u64,
    /// Largest accepted response body. Bigger bodies are discarded.
    pub max_body_bytes: u64,
    /// Optional `User-Agent` override.
    pub user_agent: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5_000,
            max_body_bytes: 10 * 1024 * 1024,
            user_agent: None,
        }
    }
}

/// Where downloaded attachments are written.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory for attachments. Defaults to a folder inside the
    /// system temp directory.
    pub attachments_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolves the root directory, falling back to the system temp dir.
    pub fn resolve_attachments_dir(&self) -> PathBuf {
        self.attachments_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("pushpix-attachments"))
    }
}

/// Settings of the host that drives the backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HostConfig {
    /// Time the host grants to a single enrichment before it fires the
    /// deadline signal, in milliseconds.
    pub deadline_ms: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self { deadline_ms: 30_000 }
    }
}

/// Global application configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub enrichment: EnrichmentConfig,
    pub fetch: FetchConfig,
    pub storage: StorageConfig,
    pub host: HostConfig,
}
