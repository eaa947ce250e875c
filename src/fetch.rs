//! Remote document retrieval.
//!
//! [`RemoteSource`] abstracts the network so caches can be tested without
//! it. [`HttpSource`] is the production implementation over `reqwest`.
//!
//! No timeout is applied to requests; callers that need bounded latency
//! must wrap calls in their own timeout.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::{Result, ServerError};

/// Source of remote JSON documents.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Fetch and parse the JSON document at `url`.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Fetch` on transport failures, non-success
    /// status codes, or bodies that are not valid JSON.
    async fn fetch_json(&self, url: &str) -> Result<Value>;
}

/// HTTP implementation of [`RemoteSource`].
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    /// Create a source with a default client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("opencode-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ServerError::Other(e.into()))?;
        Ok(Self { client })
    }

    /// Create a source around an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RemoteSource for HttpSource {
    async fn fetch_json(&self, url: &str) -> Result<Value> {
        debug!("GET {}", url);
        let resp = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| ServerError::fetch(url, e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ServerError::fetch(url, e.to_string()))?;

        if !status.is_success() {
            return Err(ServerError::fetch(url, format!("HTTP {}", status)));
        }

        serde_json::from_str(&text)
            .map_err(|e| ServerError::fetch(url, format!("invalid JSON body: {}", e)))
    }
}

const TMP_SUFFIX: &str = ".tmp";

/// Write a value as pretty-printed JSON, creating parent directories.
///
/// The file is replaced atomically.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub async fn persist_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string_pretty(value)?;
    write_atomically(path, &json).await?;
    debug!("Persisted {}", path.display());
    Ok(())
}

/// Hidden sibling of `target` with the given suffix: `.<name><suffix>`.
pub(crate) fn hidden_sibling(target: &Path, suffix: &str) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{}{}", name, suffix))
}

/// Write `contents` to a hidden temporary sibling, sync it, and rename it
/// over `target`. The temporary file is removed if any step fails.
pub(crate) async fn write_atomically(target: &Path, contents: &str) -> Result<()> {
    let tmp_path = hidden_sibling(target, TMP_SUFFIX);

    let result = async {
        let mut tmp = tokio::fs::File::create(&tmp_path).await?;
        tmp.write_all(contents.as_bytes()).await?;
        tmp.sync_all().await?;
        drop(tmp);
        tokio::fs::rename(&tmp_path, target).await
    }
    .await;

    if let Err(e) = result {
        if let Err(cleanup) = tokio::fs::remove_file(&tmp_path).await {
            if cleanup.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove {}: {}", tmp_path.display(), cleanup);
            }
        }
        return Err(e.into());
    }
    Ok(())
}
