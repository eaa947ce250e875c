//! Tool surface of the server.
//!
//! Every tool takes a JSON object of arguments and returns a JSON payload
//! or a [`ServerError`]. [`ToolRegistry`] owns the shared components
//! (schema cache, catalog caches, config writer) and dispatches by name.
//!
//! - **Config tools**: locate, read, write and validate config files,
//!   navigate the schema, list backups
//! - **Catalog tools**: browse providers and models, search the MCP
//!   registry, build `mcp` config entries

pub mod catalog_tools;
pub mod config_tools;

use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::catalog::{CatalogCache, McpRegistry, ModelsCatalog};
use crate::config::{BackupRotator, ConfigWriter};
use crate::error::{Result, ServerError};
use crate::fetch::RemoteSource;
use crate::schema::SchemaCache;
use crate::settings::ServerSettings;

pub use catalog_tools::CatalogTools;
pub use config_tools::ConfigTools;

// ============================================================================
// Tool Definitions
// ============================================================================

/// Name, description and argument schema of one tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl ToolDefinition {
    pub(crate) fn new(
        name: &'static str,
        description: &'static str,
        properties: Value,
        required: &[&str],
    ) -> Self {
        Self {
            name,
            description,
            input_schema: json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
        }
    }
}

// ============================================================================
// Arguments
// ============================================================================

/// Typed accessors over a tool's argument object.
#[derive(Debug, Clone, Default)]
pub struct Args {
    values: Map<String, Value>,
}

impl Args {
    /// Wrap an argument value. `null` counts as no arguments.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when `value` is not an object or null.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(values) => Ok(Self { values }),
            other => Err(ServerError::invalid_argument(
                "arguments",
                format!("expected an object, got {}", other),
            )),
        }
    }

    fn present(&self, field: &str) -> Option<&Value> {
        self.values.get(field).filter(|v| !v.is_null())
    }

    /// Optional string argument.
    pub fn opt_str(&self, field: &str) -> Result<Option<&str>> {
        match self.present(field) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(ServerError::invalid_argument(field, "must be a string")),
        }
    }

    /// Required string argument.
    pub fn str(&self, field: &str) -> Result<&str> {
        self.opt_str(field)?
            .ok_or_else(|| ServerError::invalid_argument(field, "is required"))
    }

    /// Optional boolean argument.
    pub fn opt_bool(&self, field: &str) -> Result<Option<bool>> {
        match self.present(field) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(_) => Err(ServerError::invalid_argument(field, "must be a boolean")),
        }
    }

    /// Boolean argument with a default.
    pub fn bool_or(&self, field: &str, default: bool) -> Result<bool> {
        Ok(self.opt_bool(field)?.unwrap_or(default))
    }

    /// Optional non-negative integer argument.
    pub fn opt_usize(&self, field: &str) -> Result<Option<usize>> {
        match self.present(field) {
            None => Ok(None),
            Some(v) => v
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .map(Some)
                .ok_or_else(|| {
                    ServerError::invalid_argument(field, "must be a non-negative integer")
                }),
        }
    }

    /// Optional object argument.
    pub fn opt_object(&self, field: &str) -> Result<Option<&Value>> {
        match self.present(field) {
            None => Ok(None),
            Some(v) if v.is_object() => Ok(Some(v)),
            Some(_) => Err(ServerError::invalid_argument(field, "must be an object")),
        }
    }

    /// Required object argument.
    pub fn object(&self, field: &str) -> Result<&Value> {
        self.opt_object(field)?
            .ok_or_else(|| ServerError::invalid_argument(field, "is required"))
    }

    /// String argument parsed into `T`, or `T::default()` when absent.
    pub fn parsed_or_default<T>(&self, field: &str) -> Result<T>
    where
        T: FromStr<Err = ServerError> + Default,
    {
        self.opt_str(field)?
            .map(str::parse::<T>)
            .transpose()
            .map(Option::unwrap_or_default)
    }
}

// ============================================================================
// Registry
// ============================================================================

/// All tools, wired to shared components.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    config: ConfigTools,
    catalog: CatalogTools,
}

impl ToolRegistry {
    /// Build the registry from settings, fetching remote documents through
    /// `source`.
    #[must_use]
    pub fn new(settings: &ServerSettings, source: Arc<dyn RemoteSource>) -> Self {
        let schema = Arc::new(SchemaCache::new(
            Arc::clone(&source),
            settings.schema_url.clone(),
            &settings.data_dir,
        ));
        let writer = ConfigWriter::new(
            settings.locations(),
            Arc::clone(&schema),
            BackupRotator::new(settings.backup_retention),
        );
        let models = Arc::new(
            CatalogCache::<ModelsCatalog>::new(
                Arc::clone(&source),
                settings.models_url.clone(),
                &settings.data_dir,
            )
            .with_ttl(settings.catalog_ttl),
        );
        let registry = Arc::new(
            CatalogCache::<McpRegistry>::new(
                source,
                settings.registry_url.clone(),
                &settings.data_dir,
            )
            .with_ttl(settings.catalog_ttl),
        );

        Self {
            config: ConfigTools::new(settings.locations(), schema, writer),
            catalog: CatalogTools::new(models, registry),
        }
    }

    /// Definitions of every tool, config tools first.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs = config_tools::definitions();
        defs.extend(catalog_tools::definitions());
        defs
    }

    /// Check whether a tool name is registered.
    #[must_use]
    pub fn has_tool(&self, name: &str) -> bool {
        self.definitions().iter().any(|d| d.name == name)
    }

    /// Invoke a tool by name.
    ///
    /// # Errors
    ///
    /// Returns `UnknownTool` for unregistered names, `InvalidArgument` for
    /// malformed arguments, and whatever the tool itself reports.
    pub async fn call(&self, name: &str, arguments: Value) -> Result<Value> {
        debug!("Calling tool {}", name);
        let args = Args::from_value(arguments)?;

        let result = match name {
            "locate_config" => self.config.locate_config(&args).await,
            "read_config" => self.config.read_config(&args).await,
            "write_config" => self.config.write_config(&args).await,
            "validate_config" => self.config.validate_config(&args).await,
            "get_config_schema" => self.config.get_config_schema(&args).await,
            "list_config_backups" => self.config.list_config_backups(&args).await,
            "list_providers" => self.catalog.list_providers(&args).await,
            "get_provider" => self.catalog.get_provider(&args).await,
            "list_models" => self.catalog.list_models(&args).await,
            "get_model" => self.catalog.get_model(&args).await,
            "search_mcp_servers" => self.catalog.search_mcp_servers(&args).await,
            "get_mcp_server" => self.catalog.get_mcp_server(&args).await,
            "mcp_config_snippet" => self.catalog.mcp_config_snippet(&args).await,
            other => Err(ServerError::unknown_tool(other)),
        };

        if let Err(e) = &result {
            warn!("Tool {} failed ({}): {}", name, e.kind(), e);
        }
        result
    }
}
