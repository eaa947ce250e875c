//! Process-wide cache of the configuration JSON Schema.
//!
//! The first [`SchemaCache::get`] loads a persisted copy from the data
//! directory, falling back to a remote fetch (which is then persisted).
//! Later calls are served from memory without touching disk or network
//! until [`SchemaCache::refresh`] is called. There is no TTL on this cache.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::fetch::{persist_json, RemoteSource};

/// Filename of the persisted schema inside the data directory.
pub const SCHEMA_CACHE_FILE: &str = "config-schema.json";

/// Cached configuration schema with explicit refresh.
pub struct SchemaCache {
    source: Arc<dyn RemoteSource>,
    url: String,
    local_path: PathBuf,
    current: RwLock<Option<Arc<Value>>>,
    refresh_guard: Mutex<()>,
}

impl std::fmt::Debug for SchemaCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaCache")
            .field("url", &self.url)
            .field("local_path", &self.local_path)
            .finish_non_exhaustive()
    }
}

impl SchemaCache {
    /// Create a cache that persists under `data_dir`.
    #[must_use]
    pub fn new(source: Arc<dyn RemoteSource>, url: impl Into<String>, data_dir: &Path) -> Self {
        Self {
            source,
            url: url.into(),
            local_path: data_dir.join(SCHEMA_CACHE_FILE),
            current: RwLock::new(None),
            refresh_guard: Mutex::new(()),
        }
    }

    /// URL the schema is fetched from.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Path of the persisted local copy.
    #[must_use]
    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// Check whether a schema is resident in memory.
    pub async fn is_loaded(&self) -> bool {
        self.current.read().await.is_some()
    }

    /// Get the schema, loading it on first use.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Fetch` if there is no local copy and the remote
    /// fetch fails.
    pub async fn get(&self) -> Result<Arc<Value>> {
        self.get_with(false).await
    }

    /// Re-fetch the schema from the remote source and persist it.
    ///
    /// On failure the previously resident schema is kept.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Fetch` if the fetch fails.
    pub async fn refresh(&self) -> Result<Arc<Value>> {
        self.get_with(true).await
    }

    /// Get the schema, forcing a remote fetch when `force_refresh` is set.
    ///
    /// # Errors
    ///
    /// See [`SchemaCache::get`] and [`SchemaCache::refresh`].
    pub async fn get_with(&self, force_refresh: bool) -> Result<Arc<Value>> {
        if !force_refresh {
            if let Some(schema) = self.current.read().await.as_ref() {
                return Ok(Arc::clone(schema));
            }
        }

        let _guard = self.refresh_guard.lock().await;

        if !force_refresh {
            // Another caller may have loaded it while we waited
            if let Some(schema) = self.current.read().await.as_ref() {
                return Ok(Arc::clone(schema));
            }
            if let Some(schema) = self.load_local().await {
                let schema = Arc::new(schema);
                *self.current.write().await = Some(Arc::clone(&schema));
                return Ok(schema);
            }
        }

        info!("Fetching configuration schema from {}", self.url);
        let schema = self.source.fetch_json(&self.url).await?;
        persist_json(&self.local_path, &schema).await?;

        let schema = Arc::new(schema);
        *self.current.write().await = Some(Arc::clone(&schema));
        Ok(schema)
    }

    async fn load_local(&self) -> Option<Value> {
        let text = match tokio::fs::read_to_string(&self.local_path).await {
            Ok(text) => text,
            Err(e) => {
                debug!(
                    "No local schema at {}: {}",
                    self.local_path.display(),
                    e
                );
                return None;
            }
        };
        match serde_json::from_str(&text) {
            Ok(schema) => {
                debug!("Loaded schema from {}", self.local_path.display());
                Some(schema)
            }
            Err(e) => {
                warn!(
                    "Ignoring corrupt schema cache at {}: {}",
                    self.local_path.display(),
                    e
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServerError;
    use crate::testing::fixtures::sample_schema;
    use crate::testing::MockSource;
    use tempfile::TempDir;

    const URL: &str = "https://example.test/config.json";

    #[tokio::test]
    async fn test_first_get_fetches_and_persists() {
        let dir = TempDir::new().unwrap();
        let source = Arc::new(MockSource::new().with_response(URL, sample_schema()));
        let cache = SchemaCache::new(source.clone(), URL, dir.path());

        let schema = cache.get().await.unwrap();
        assert_eq!(*schema, sample_schema());
        assert_eq!(source.call_count(), 1);
        assert!(dir.path().join(SCHEMA_CACHE_FILE).exists());
    }

    #[tokio::test]
    async fn test_subsequent_gets_served_from_memory() {
        let dir = TempDir::new().unwrap();
        let source = Arc::new(MockSource::new().with_response(URL, sample_schema()));
        let cache = SchemaCache::new(source.clone(), URL, dir.path());

        cache.get().await.unwrap();
        std::fs::remove_file(dir.path().join(SCHEMA_CACHE_FILE)).unwrap();
        cache.get().await.unwrap();
        cache.get().await.unwrap();
        assert_eq!(source.call_count(), 1);
    }

    #[tokio::test]
    async fn test_local_copy_preferred_over_fetch() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(SCHEMA_CACHE_FILE),
            r#"{"properties": {"local": {}}}"#,
        )
        .unwrap();
        let source = Arc::new(MockSource::new().with_response(URL, sample_schema()));
        let cache = SchemaCache::new(source.clone(), URL, dir.path());

        let schema = cache.get().await.unwrap();
        assert!(schema["properties"].get("local").is_some());
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_local_copy_triggers_fetch() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SCHEMA_CACHE_FILE), "{ truncated").unwrap();
        let source = Arc::new(MockSource::new().with_response(URL, sample_schema()));
        let cache = SchemaCache::new(source.clone(), URL, dir.path());

        assert_eq!(*cache.get().await.unwrap(), sample_schema());
        assert_eq!(source.call_count(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_without_local_copy_errors() {
        let dir = TempDir::new().unwrap();
        let source = Arc::new(MockSource::new().with_failure(URL, "HTTP 503"));
        let cache = SchemaCache::new(source, URL, dir.path());

        let err = cache.get().await.unwrap_err();
        assert!(matches!(err, ServerError::Fetch { .. }));
        assert!(!cache.is_loaded().await);
    }

    #[tokio::test]
    async fn test_refresh_refetches_even_when_loaded() {
        let dir = TempDir::new().unwrap();
        let source = Arc::new(MockSource::new().with_response(URL, sample_schema()));
        let cache = SchemaCache::new(source.clone(), URL, dir.path());

        cache.get().await.unwrap();
        source.set_response(URL, serde_json::json!({"properties": {"new": {}}}));
        let schema = cache.refresh().await.unwrap();
        assert!(schema["properties"].get("new").is_some());
        assert_eq!(source.call_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_resident_schema() {
        let dir = TempDir::new().unwrap();
        let source = Arc::new(MockSource::new().with_response(URL, sample_schema()));
        let cache = SchemaCache::new(source.clone(), URL, dir.path());

        cache.get().await.unwrap();
        source.set_failure(URL, "connection reset");
        assert!(cache.refresh().await.is_err());
        assert_eq!(*cache.get().await.unwrap(), sample_schema());
    }
}
