//! MCP server registry catalog.
//!
//! The registry lists servers page by page. Each entry is either a bare
//! server record or wrapped as `{"server": {...}, "_meta": {...}}`; both
//! layouts are accepted. Only the first entry seen for a name is kept.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use super::Catalog;
use crate::error::{Result, ServerError};
use crate::fetch::RemoteSource;

/// Upper bound on pages fetched per refresh.
pub const MAX_REGISTRY_PAGES: usize = 10;

/// Page size requested from the registry.
pub const REGISTRY_PAGE_SIZE: usize = 100;

// ============================================================================
// Registry types
// ============================================================================

/// All known registry servers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McpRegistry {
    pub servers: Vec<RegistryServer>,
}

/// A server published to the registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryServer {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<Repository>,
    pub packages: Vec<Package>,
    pub remotes: Vec<Remote>,
}

/// Source repository of a server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Repository {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// An installable package for a server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Package {
    /// Package ecosystem, e.g. `npm`, `pypi`, `oci`.
    #[serde(alias = "registry_type", alias = "registry_name", alias = "registryName")]
    pub registry_type: String,
    /// Package id within the ecosystem.
    #[serde(alias = "name")]
    pub identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(alias = "environment_variables")]
    pub environment_variables: Vec<EnvironmentVariable>,
}

/// Environment variable a package reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnvironmentVariable {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(alias = "is_required")]
    pub is_required: bool,
    #[serde(alias = "is_secret")]
    pub is_secret: bool,
}

/// A hosted endpoint for a server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Remote {
    #[serde(rename = "type", alias = "transport_type")]
    pub transport: String,
    pub url: String,
}

#[async_trait]
impl Catalog for McpRegistry {
    const NAME: &'static str = "MCP registry";
    const CACHE_FILE: &'static str = "mcp-registry.json";

    async fn fetch(source: &dyn RemoteSource, url: &str) -> Result<Self> {
        let mut registry = McpRegistry::default();
        let mut seen = HashSet::new();
        let mut cursor: Option<String> = None;

        for page in 0..MAX_REGISTRY_PAGES {
            let page_url = page_url(url, cursor.as_deref())?;
            let body = source.fetch_json(&page_url).await?;

            let entries = body
                .get("servers")
                .and_then(Value::as_array)
                .ok_or_else(|| ServerError::fetch(&page_url, "response has no 'servers' array"))?;

            for entry in entries {
                let record = entry.get("server").unwrap_or(entry);
                match serde_json::from_value::<RegistryServer>(record.clone()) {
                    Ok(server) if !server.name.is_empty() => {
                        if seen.insert(server.name.clone()) {
                            registry.servers.push(server);
                        }
                    }
                    Ok(_) => debug!("Skipping unnamed registry entry"),
                    Err(e) => debug!("Skipping malformed registry entry: {}", e),
                }
            }

            cursor = next_cursor(&body);
            if cursor.is_none() {
                break;
            }
            debug!("Registry page {} done, continuing", page + 1);
        }

        Ok(registry)
    }
}

fn page_url(base: &str, cursor: Option<&str>) -> Result<String> {
    let mut url = reqwest::Url::parse(base)
        .map_err(|e| ServerError::fetch(base, format!("invalid registry URL: {}", e)))?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("limit", &REGISTRY_PAGE_SIZE.to_string());
        if let Some(cursor) = cursor {
            query.append_pair("cursor", cursor);
        }
    }
    Ok(url.into())
}

fn next_cursor(body: &Value) -> Option<String> {
    let metadata = body.get("metadata")?;
    metadata
        .get("nextCursor")
        .or_else(|| metadata.get("next_cursor"))
        .and_then(Value::as_str)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

// ============================================================================
// Queries
// ============================================================================

impl RegistryServer {
    /// Transport kinds this server can be reached through.
    #[must_use]
    pub fn transports(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.packages
            .iter()
            .map(|p| p.registry_type.clone())
            .chain(self.remotes.iter().map(|r| r.transport.clone()))
            .filter(|k| !k.is_empty() && seen.insert(k.clone()))
            .collect()
    }

    /// Compact listing row.
    #[must_use]
    pub fn summary(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "version": self.version,
            "repository": self.repository.as_ref().map(|r| r.url.clone()),
            "transports": self.transports(),
        })
    }

    /// Build an opencode `mcp` entry for this server.
    ///
    /// Remote endpoints are preferred; otherwise the first package is
    /// launched locally. Returns `None` when the server offers neither.
    #[must_use]
    pub fn config_entry(&self) -> Option<Value> {
        if let Some(remote) = self.remotes.iter().find(|r| !r.url.is_empty()) {
            return Some(json!({
                "type": "remote",
                "url": remote.url,
                "enabled": true,
            }));
        }

        let package = self.packages.first()?;
        let command: Vec<String> = match package.registry_type.to_lowercase().as_str() {
            "npm" => vec!["npx".into(), "-y".into(), package.identifier.clone()],
            "pypi" => vec!["uvx".into(), package.identifier.clone()],
            "oci" | "docker" => vec![
                "docker".into(),
                "run".into(),
                "-i".into(),
                "--rm".into(),
                package.identifier.clone(),
            ],
            _ => vec![package.identifier.clone()],
        };

        let mut entry = json!({
            "type": "local",
            "command": command,
            "enabled": true,
        });

        let environment: Map<String, Value> = package
            .environment_variables
            .iter()
            .filter(|v| v.is_required)
            .map(|v| (v.name.clone(), Value::String(String::new())))
            .collect();
        if !environment.is_empty() {
            entry["environment"] = Value::Object(environment);
        }
        Some(entry)
    }

    /// Default key for this server in the `mcp` section: the last path
    /// component of its registry name.
    #[must_use]
    pub fn default_key(&self) -> String {
        self.name
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.name)
            .to_string()
    }
}

impl McpRegistry {
    /// Servers whose name or description contains `query`, case-insensitively.
    #[must_use]
    pub fn search(&self, query: Option<&str>, limit: usize) -> Vec<&RegistryServer> {
        let needle = query.map(str::to_lowercase).filter(|q| !q.is_empty());
        self.servers
            .iter()
            .filter(|server| {
                needle.as_deref().is_none_or(|n| {
                    server.name.to_lowercase().contains(n)
                        || server
                            .description
                            .as_deref()
                            .is_some_and(|d| d.to_lowercase().contains(n))
                })
            })
            .take(limit)
            .collect()
    }

    /// Look up a server by exact name.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::ServiceNotFound` when absent.
    pub fn require(&self, name: &str) -> Result<&RegistryServer> {
        self.servers
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ServerError::ServiceNotFound {
                name: name.to_string(),
            })
    }
}
