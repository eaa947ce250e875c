//! Model catalog and MCP registry tools.

use std::sync::Arc;

use serde_json::{json, Value};

use super::{Args, ToolDefinition};
use crate::catalog::{CatalogCache, McpRegistry, ModelQuery, ModelSort, ModelsCatalog};
use crate::config::MCP_SECTION;
use crate::error::{Result, ServerError};

/// Default number of registry search results.
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

/// Definitions of the catalog tools.
#[must_use]
pub fn definitions() -> Vec<ToolDefinition> {
    let refresh = json!({ "type": "boolean", "default": false, "description": "Bypass the cache" });
    let provider = json!({ "type": "string", "description": "Provider id, e.g. 'anthropic'" });

    vec![
        ToolDefinition::new(
            "list_providers",
            "List AI model providers with their model counts and credential variables",
            json!({
                "search": { "type": "string", "description": "Substring of provider id or name" },
                "refresh": refresh
            }),
            &[],
        ),
        ToolDefinition::new(
            "get_provider",
            "Show one provider and the ids of its models",
            json!({ "provider": provider }),
            &["provider"],
        ),
        ToolDefinition::new(
            "list_models",
            "List models, filtered by provider and capabilities and sorted",
            json!({
                "provider": provider,
                "search": { "type": "string", "description": "Substring of model id or name" },
                "tool_call": { "type": "boolean" },
                "reasoning": { "type": "boolean" },
                "attachment": { "type": "boolean" },
                "open_weights": { "type": "boolean" },
                "sort_by": {
                    "type": "string",
                    "enum": ["name", "release_date", "context", "input_cost"],
                    "default": "name"
                },
                "limit": { "type": "integer", "minimum": 0 },
                "refresh": refresh
            }),
            &[],
        ),
        ToolDefinition::new(
            "get_model",
            "Show the full record of one model",
            json!({
                "provider": provider,
                "model": { "type": "string", "description": "Model id" }
            }),
            &["provider", "model"],
        ),
        ToolDefinition::new(
            "search_mcp_servers",
            "Search the MCP server registry by name or description",
            json!({
                "query": { "type": "string" },
                "limit": { "type": "integer", "minimum": 0, "default": DEFAULT_SEARCH_LIMIT },
                "refresh": refresh
            }),
            &[],
        ),
        ToolDefinition::new(
            "get_mcp_server",
            "Show the registry record of one MCP server",
            json!({ "name": { "type": "string", "description": "Registry name, e.g. 'io.github.owner/server'" } }),
            &["name"],
        ),
        ToolDefinition::new(
            "mcp_config_snippet",
            "Build an 'mcp' config fragment for a registry server, ready to pass to write_config",
            json!({
                "name": { "type": "string", "description": "Registry name" },
                "key": { "type": "string", "description": "Entry key in the 'mcp' section; defaults to the last part of the name" }
            }),
            &["name"],
        ),
    ]
}

/// Handlers for the catalog tools.
#[derive(Debug, Clone)]
pub struct CatalogTools {
    models: Arc<CatalogCache<ModelsCatalog>>,
    registry: Arc<CatalogCache<McpRegistry>>,
}

impl CatalogTools {
    #[must_use]
    pub fn new(
        models: Arc<CatalogCache<ModelsCatalog>>,
        registry: Arc<CatalogCache<McpRegistry>>,
    ) -> Self {
        Self { models, registry }
    }

    pub async fn list_providers(&self, args: &Args) -> Result<Value> {
        let catalog = self.models.get(args.bool_or("refresh", false)?).await?;
        let providers = catalog.provider_summaries(args.opt_str("search")?);
        Ok(json!({
            "count": providers.len(),
            "providers": providers,
        }))
    }

    pub async fn get_provider(&self, args: &Args) -> Result<Value> {
        let id = args.str("provider")?;
        let catalog = self.models.get(false).await?;
        let provider = catalog.require_provider(id)?;
        Ok(json!({
            "id": provider.id,
            "name": provider.name,
            "env": provider.env,
            "npm": provider.npm,
            "api": provider.api,
            "doc": provider.doc,
            "models": provider.models.keys().collect::<Vec<_>>(),
        }))
    }

    pub async fn list_models(&self, args: &Args) -> Result<Value> {
        let query = ModelQuery {
            provider: args.opt_str("provider")?.map(str::to_string),
            search: args.opt_str("search")?.map(str::to_string),
            tool_call: args.opt_bool("tool_call")?,
            reasoning: args.opt_bool("reasoning")?,
            attachment: args.opt_bool("attachment")?,
            open_weights: args.opt_bool("open_weights")?,
            sort: args.parsed_or_default::<ModelSort>("sort_by")?,
            limit: args.opt_usize("limit")?,
        };
        let catalog = self.models.get(args.bool_or("refresh", false)?).await?;
        let models = catalog.query(&query)?;
        Ok(json!({
            "count": models.len(),
            "models": models,
        }))
    }

    pub async fn get_model(&self, args: &Args) -> Result<Value> {
        let provider = args.str("provider")?;
        let model_id = args.str("model")?;
        let catalog = self.models.get(false).await?;
        let model = catalog.require_model(provider, model_id)?;

        let mut value = serde_json::to_value(model)?;
        value["provider"] = json!(provider);
        Ok(value)
    }

    pub async fn search_mcp_servers(&self, args: &Args) -> Result<Value> {
        let limit = args.opt_usize("limit")?.unwrap_or(DEFAULT_SEARCH_LIMIT);
        let registry = self.registry.get(args.bool_or("refresh", false)?).await?;
        let servers: Vec<Value> = registry
            .search(args.opt_str("query")?, limit)
            .into_iter()
            .map(|s| s.summary())
            .collect();
        Ok(json!({
            "count": servers.len(),
            "servers": servers,
        }))
    }

    pub async fn get_mcp_server(&self, args: &Args) -> Result<Value> {
        let name = args.str("name")?;
        let registry = self.registry.get(false).await?;
        Ok(serde_json::to_value(registry.require(name)?)?)
    }

    pub async fn mcp_config_snippet(&self, args: &Args) -> Result<Value> {
        let name = args.str("name")?;
        let registry = self.registry.get(false).await?;
        let server = registry.require(name)?;

        let key = match args.opt_str("key")? {
            Some(key) if !key.trim().is_empty() => key.to_string(),
            Some(_) => return Err(ServerError::invalid_argument("key", "must not be empty")),
            None => server.default_key(),
        };
        let entry = server.config_entry().ok_or_else(|| {
            ServerError::invalid_argument(
                "name",
                format!("'{}' publishes no package or remote endpoint", name),
            )
        })?;

        Ok(json!({ MCP_SECTION: { key: entry } }))
    }
}
