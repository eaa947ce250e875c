//! Runtime settings for the server.
//!
//! Settings are built once at startup (from CLI flags and environment in
//! `main`) and handed to the components that need them.

use std::path::PathBuf;
use std::time::Duration;

use crate::catalog::DEFAULT_CATALOG_TTL;
use crate::config::{ConfigLocations, DEFAULT_BACKUP_RETENTION};

/// Default location of the configuration JSON Schema.
pub const DEFAULT_SCHEMA_URL: &str = "https://opencode.ai/config.json";

/// Default location of the models catalog.
pub const DEFAULT_MODELS_URL: &str = "https://models.dev/api.json";

/// Default MCP registry listing endpoint.
pub const DEFAULT_REGISTRY_URL: &str = "https://registry.modelcontextprotocol.io/v0/servers";

/// Server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Directory holding the project-scope config.
    pub project_dir: PathBuf,
    /// Directory holding the global-scope config; `None` if unknown.
    pub global_dir: Option<PathBuf>,
    /// Directory for persisted schema and catalog caches.
    pub data_dir: PathBuf,
    pub schema_url: String,
    pub models_url: String,
    pub registry_url: String,
    /// Backups kept per config file.
    pub backup_retention: usize,
    /// Freshness window of the catalog caches.
    pub catalog_ttl: Duration,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            project_dir: PathBuf::from("."),
            global_dir: ConfigLocations::default_global_dir(),
            data_dir: Self::default_data_dir(),
            schema_url: DEFAULT_SCHEMA_URL.to_string(),
            models_url: DEFAULT_MODELS_URL.to_string(),
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            backup_retention: DEFAULT_BACKUP_RETENTION,
            catalog_ttl: DEFAULT_CATALOG_TTL,
        }
    }
}

impl ServerSettings {
    /// Get the default data directory.
    ///
    /// Resolves to `{data_local_dir}/opencode-mcp`, falling back to
    /// `.opencode-mcp` in the working directory.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join("opencode-mcp"))
            .unwrap_or_else(|| PathBuf::from(".opencode-mcp"))
    }

    #[must_use]
    pub fn with_project_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.project_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_global_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.global_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_schema_url(mut self, url: impl Into<String>) -> Self {
        self.schema_url = url.into();
        self
    }

    #[must_use]
    pub fn with_models_url(mut self, url: impl Into<String>) -> Self {
        self.models_url = url.into();
        self
    }

    #[must_use]
    pub fn with_registry_url(mut self, url: impl Into<String>) -> Self {
        self.registry_url = url.into();
        self
    }

    #[must_use]
    pub fn with_backup_retention(mut self, retention: usize) -> Self {
        self.backup_retention = retention;
        self
    }

    #[must_use]
    pub fn with_catalog_ttl(mut self, ttl: Duration) -> Self {
        self.catalog_ttl = ttl;
        self
    }

    /// Config locations for these settings.
    #[must_use]
    pub fn locations(&self) -> ConfigLocations {
        let locations = ConfigLocations::new(&self.project_dir);
        match &self.global_dir {
            Some(dir) => locations.with_global_dir(dir),
            None => locations,
        }
    }
}
