//! Read-mostly remote catalogs with time-based expiry.
//!
//! Two catalogs are served: the models/providers catalog
//! ([`models::ModelsCatalog`]) and the MCP server registry
//! ([`registry::McpRegistry`]). Both sit behind a [`CatalogCache`]:
//!
//! 1. a fresh in-memory entry is returned as-is
//! 2. otherwise a persisted copy younger than the TTL is loaded
//! 3. otherwise the catalog is fetched, persisted and timestamped
//!
//! A forced refresh skips steps 1 and 2. A failed fetch is reported to the
//! caller and leaves any resident entry untouched; a stale persisted copy
//! is never used as a fallback.

pub mod models;
pub mod registry;

pub use models::{ModelQuery, ModelSort, ModelSummary, ModelsCatalog, ProviderSummary};
pub use registry::{McpRegistry, RegistryServer};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::fetch::{persist_json, RemoteSource};

/// Default time a catalog stays fresh.
pub const DEFAULT_CATALOG_TTL: Duration = Duration::from_secs(24 * 60 * 60);

// ============================================================================
// Catalog trait
// ============================================================================

/// A dataset that can be fetched from a remote source.
#[async_trait]
pub trait Catalog: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Human-readable name used in logs.
    const NAME: &'static str;

    /// Filename of the persisted copy inside the data directory.
    const CACHE_FILE: &'static str;

    /// Fetch the catalog starting at `url`.
    async fn fetch(source: &dyn RemoteSource, url: &str) -> Result<Self>;
}

// ============================================================================
// Cache Entry
// ============================================================================

/// A cached value and when it was last refreshed.
#[derive(Debug)]
pub struct CacheEntry<T> {
    /// The cached value.
    pub value: Arc<T>,
    /// Time of the last successful refresh.
    pub refreshed_at: SystemTime,
}

impl<T> Clone for CacheEntry<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            refreshed_at: self.refreshed_at,
        }
    }
}

impl<T> CacheEntry<T> {
    /// Create an entry refreshed at `refreshed_at`.
    #[must_use]
    pub fn new(value: T, refreshed_at: SystemTime) -> Self {
        Self {
            value: Arc::new(value),
            refreshed_at,
        }
    }

    /// Check whether the entry is still within `ttl` at `now`.
    ///
    /// Entries timestamped in the future count as fresh.
    #[must_use]
    pub fn is_fresh(&self, ttl: Duration, now: SystemTime) -> bool {
        within_ttl(self.refreshed_at, ttl, now)
    }
}

fn within_ttl(refreshed_at: SystemTime, ttl: Duration, now: SystemTime) -> bool {
    match now.duration_since(refreshed_at) {
        Ok(age) => age < ttl,
        Err(_) => true,
    }
}

// ============================================================================
// Catalog Cache
// ============================================================================

/// TTL cache around a [`Catalog`].
pub struct CatalogCache<T: Catalog> {
    source: Arc<dyn RemoteSource>,
    url: String,
    local_path: PathBuf,
    ttl: Duration,
    entry: RwLock<Option<CacheEntry<T>>>,
    refresh_guard: Mutex<()>,
}

impl<T: Catalog> std::fmt::Debug for CatalogCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogCache")
            .field("name", &T::NAME)
            .field("url", &self.url)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl<T: Catalog> CatalogCache<T> {
    /// Create a cache persisting under `data_dir` with the default TTL.
    #[must_use]
    pub fn new(source: Arc<dyn RemoteSource>, url: impl Into<String>, data_dir: &Path) -> Self {
        Self {
            source,
            url: url.into(),
            local_path: data_dir.join(T::CACHE_FILE),
            ttl: DEFAULT_CATALOG_TTL,
            entry: RwLock::new(None),
            refresh_guard: Mutex::new(()),
        }
    }

    /// Set the freshness window.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Path of the persisted copy.
    #[must_use]
    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// Current resident entry, fresh or not.
    pub async fn peek(&self) -> Option<CacheEntry<T>> {
        self.entry.read().await.clone()
    }

    /// Get the catalog, refreshing it if stale or if `force_refresh` is set.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Fetch` if a fetch is needed and fails.
    pub async fn get(&self, force_refresh: bool) -> Result<Arc<T>> {
        if !force_refresh {
            if let Some(value) = self.fresh_value().await {
                return Ok(value);
            }
        }

        let _guard = self.refresh_guard.lock().await;

        if !force_refresh {
            if let Some(value) = self.fresh_value().await {
                return Ok(value);
            }
            if let Some(entry) = self.load_local().await {
                let value = Arc::clone(&entry.value);
                *self.entry.write().await = Some(entry);
                return Ok(value);
            }
        }

        info!("Fetching {} from {}", T::NAME, self.url);
        let catalog = T::fetch(self.source.as_ref(), &self.url).await?;
        persist_json(&self.local_path, &catalog).await?;

        let entry = CacheEntry::new(catalog, SystemTime::now());
        let value = Arc::clone(&entry.value);
        *self.entry.write().await = Some(entry);
        Ok(value)
    }

    async fn fresh_value(&self) -> Option<Arc<T>> {
        let guard = self.entry.read().await;
        let value = guard
            .as_ref()
            .filter(|entry| entry.is_fresh(self.ttl, SystemTime::now()))
            .map(|entry| Arc::clone(&entry.value));
        value
    }

    /// Load the persisted copy if its modification age is within the TTL.
    async fn load_local(&self) -> Option<CacheEntry<T>> {
        let modified = tokio::fs::metadata(&self.local_path)
            .await
            .and_then(|m| m.modified())
            .ok()?;

        if !within_ttl(modified, self.ttl, SystemTime::now()) {
            debug!("Persisted {} at {} is stale", T::NAME, self.local_path.display());
            return None;
        }

        let text = tokio::fs::read_to_string(&self.local_path).await.ok()?;
        match serde_json::from_str::<T>(&text) {
            Ok(value) => {
                debug!("Loaded {} from {}", T::NAME, self.local_path.display());
                Some(CacheEntry::new(value, modified))
            }
            Err(e) => {
                warn!(
                    "Ignoring corrupt {} cache at {}: {}",
                    T::NAME,
                    self.local_path.display(),
                    e
                );
                None
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
