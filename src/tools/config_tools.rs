//! Config file tools.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Value};

use super::{Args, ToolDefinition};
use crate::config::{
    project_section, read_document, BackupRotator, ConfigLocations, ConfigValidator, ConfigWriter,
    Located, Scope, WriteMode, WriteRequest,
};
use crate::error::{Result, ServerError};
use crate::schema::{resolve_node, SchemaCache, SchemaNode};

/// Definitions of the config tools.
#[must_use]
pub fn definitions() -> Vec<ToolDefinition> {
    let scope = json!({
        "type": "string",
        "enum": ["project", "global", "auto"],
        "description": "Which config to use; auto prefers the project file",
        "default": "auto"
    });

    vec![
        ToolDefinition::new(
            "locate_config",
            "Find the active opencode config file and list every path checked",
            json!({ "scope": scope }),
            &[],
        ),
        ToolDefinition::new(
            "read_config",
            "Read the opencode config, optionally a single top-level section",
            json!({
                "scope": scope,
                "section": { "type": "string", "description": "Top-level key such as 'provider' or 'mcp'" }
            }),
            &[],
        ),
        ToolDefinition::new(
            "write_config",
            "Merge or replace the opencode config. The result is validated before anything is written, and the previous file is backed up",
            json!({
                "scope": { "type": "string", "enum": ["project", "global"] },
                "config": { "type": "object", "description": "Config fragment to write" },
                "mode": { "type": "string", "enum": ["merge", "replace"], "default": "merge" },
                "create_backup": { "type": "boolean", "default": true }
            }),
            &["scope", "config"],
        ),
        ToolDefinition::new(
            "validate_config",
            "Validate an inline config or the config file for a scope",
            json!({
                "scope": scope,
                "config": { "type": "object", "description": "Validate this document instead of the file" }
            }),
            &[],
        ),
        ToolDefinition::new(
            "get_config_schema",
            "Look up the config JSON Schema at a dotted path such as 'provider.models' and summarize its keys",
            json!({
                "path": { "type": "string", "description": "Dotted schema path; omit for the top level" },
                "refresh": { "type": "boolean", "default": false }
            }),
            &[],
        ),
        ToolDefinition::new(
            "list_config_backups",
            "List backups of the config file, newest first",
            json!({ "scope": scope }),
            &[],
        ),
    ]
}

/// Handlers for the config tools.
#[derive(Debug, Clone)]
pub struct ConfigTools {
    locations: ConfigLocations,
    schema: Arc<SchemaCache>,
    writer: ConfigWriter,
}

impl ConfigTools {
    #[must_use]
    pub fn new(locations: ConfigLocations, schema: Arc<SchemaCache>, writer: ConfigWriter) -> Self {
        Self {
            locations,
            schema,
            writer,
        }
    }

    /// Locate the file for a scope or fail with every path searched.
    async fn require_file(&self, scope: Scope) -> Result<(PathBuf, Scope)> {
        match self.locations.locate(scope).await {
            Located::Found { path, scope } => Ok((path, scope)),
            Located::NotFound { searched } => Err(ServerError::ConfigNotFound {
                scope: scope.to_string(),
                searched,
            }),
        }
    }

    pub async fn locate_config(&self, args: &Args) -> Result<Value> {
        let scope: Scope = args.parsed_or_default("scope")?;
        let candidates: Vec<PathBuf> = self
            .locations
            .candidates(scope)
            .into_iter()
            .map(|(_, path)| path)
            .collect();

        Ok(match self.locations.locate(scope).await {
            Located::Found { path, scope } => json!({
                "found": true,
                "path": path,
                "scope": scope.as_str(),
                "searched": candidates,
            }),
            Located::NotFound { searched } => json!({
                "found": false,
                "searched": searched,
            }),
        })
    }

    pub async fn read_config(&self, args: &Args) -> Result<Value> {
        let scope: Scope = args.parsed_or_default("scope")?;
        let section = args.opt_str("section")?;

        let (path, found_scope) = self.require_file(scope).await?;
        let document = read_document(&path).await?;

        let mut result = json!({
            "path": path,
            "scope": found_scope.as_str(),
        });
        match section {
            Some(section) => {
                result["section"] = json!(section);
                result["config"] = project_section(&document, section)?;
            }
            None => result["config"] = document,
        }
        Ok(result)
    }

    pub async fn write_config(&self, args: &Args) -> Result<Value> {
        let scope: Scope = args.str("scope")?.parse()?;
        let document = args.object("config")?.clone();
        let mode: WriteMode = args.parsed_or_default("mode")?;
        let create_backup = args.bool_or("create_backup", true)?;

        let result = self
            .writer
            .write(
                WriteRequest::new(scope, document)
                    .with_mode(mode)
                    .with_backup(create_backup),
            )
            .await?;
        Ok(serde_json::to_value(result)?)
    }

    pub async fn validate_config(&self, args: &Args) -> Result<Value> {
        let schema = self.schema.get().await?;
        let validator = ConfigValidator::new(&schema);

        let report = match args.opt_object("config")? {
            Some(inline) => validator.validate(inline),
            None => {
                let scope: Scope = args.parsed_or_default("scope")?;
                let (path, _) = self.require_file(scope).await?;
                let document = read_document(&path).await?;
                validator.validate(&document).with_path(path)
            }
        };
        Ok(serde_json::to_value(report)?)
    }

    pub async fn get_config_schema(&self, args: &Args) -> Result<Value> {
        let schema = if args.bool_or("refresh", false)? {
            self.schema.refresh().await?
        } else {
            self.schema.get().await?
        };

        match args.opt_str("path")?.filter(|p| !p.trim().is_empty()) {
            Some(path) => {
                let node = resolve_node(&schema, path)?;
                Ok(json!({
                    "path": path,
                    "type": node.type_label(),
                    "description": node.description(),
                    "properties": node.summarize(),
                    "schema": node.value(),
                }))
            }
            None => {
                let root = SchemaNode::root(&schema);
                Ok(json!({
                    "url": self.schema.url(),
                    "properties": root.summarize(),
                }))
            }
        }
    }

    pub async fn list_config_backups(&self, args: &Args) -> Result<Value> {
        let scope: Scope = args.parsed_or_default("scope")?;
        let (path, _) = self.require_file(scope).await?;
        let backups = BackupRotator::list(&path).await?;
        Ok(json!({
            "path": path,
            "backup_dir": BackupRotator::backup_dir(&path),
            "count": backups.len(),
            "backups": backups,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::sample_schema;
    use crate::testing::MockSource;
    use tempfile::TempDir;

    const SCHEMA_URL: &str = "https://example.test/config.json";

    struct Env {
        project: TempDir,
        _global: TempDir,
        _data: TempDir,
        tools: ConfigTools,
    }

    fn env() -> Env {
        let project = TempDir::new().unwrap();
        let global = TempDir::new().unwrap();
        let data = TempDir::new().unwrap();
        let source = Arc::new(MockSource::new().with_response(SCHEMA_URL, sample_schema()));
        let schema = Arc::new(SchemaCache::new(source, SCHEMA_URL, data.path()));
        let locations = ConfigLocations::new(project.path()).with_global_dir(global.path());
        let writer = ConfigWriter::new(locations.clone(), Arc::clone(&schema), BackupRotator::new(5));
        Env {
            project,
            _global: global,
            _data: data,
            tools: ConfigTools::new(locations, schema, writer),
        }
    }

    fn args(value: Value) -> Args {
        Args::from_value(value).unwrap()
    }

    #[test]
    fn test_definitions_are_unique() {
        let defs = definitions();
        let mut names: Vec<&str> = defs.iter().map(|d| d.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), defs.len());
    }

    #[tokio::test]
    async fn test_locate_reports_searched_paths_when_absent() {
        let env = env();
        let result = env.tools.locate_config(&args(json!({}))).await.unwrap();
        assert_eq!(result["found"], false);
        assert_eq!(result["searched"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_read_missing_file_is_config_not_found() {
        let env = env();
        let err = env
            .tools
            .read_config(&args(json!({"scope": "project"})))
            .await
            .unwrap_err();
        match err {
            ServerError::ConfigNotFound { searched, .. } => assert_eq!(searched.len(), 2),
            other => panic!("expected ConfigNotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_read_section_and_missing_section() {
        let env = env();
        std::fs::write(
            env.project.path().join("opencode.json"),
            r#"{"theme": "dark", "mcp": {"fs": {"type": "local"}}}"#,
        )
        .unwrap();

        let result = env
            .tools
            .read_config(&args(json!({"section": "mcp"})))
            .await
            .unwrap();
        assert_eq!(result["scope"], "project");
        assert_eq!(result["config"], json!({"fs": {"type": "local"}}));

        let err = env
            .tools
            .read_config(&args(json!({"section": "provider"})))
            .await
            .unwrap_err();
        match err {
            ServerError::SectionNotFound { available, .. } => {
                assert_eq!(available, vec!["mcp", "theme"]);
            }
            other => panic!("expected SectionNotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_write_then_validate_file() {
        let env = env();
        let written = env
            .tools
            .write_config(&args(json!({
                "scope": "project",
                "config": {"mcp": {"fs": {"type": "local"}}}
            })))
            .await
            .unwrap();
        assert_eq!(written["created"], true);
        assert_eq!(written["mode"], "merge");

        let report = env.tools.validate_config(&args(json!({}))).await.unwrap();
        assert_eq!(report["valid"], true);
        assert_eq!(report["warnings"].as_array().unwrap().len(), 1);
        assert!(report["path"].as_str().unwrap().ends_with("opencode.jsonc"));
    }

    #[tokio::test]
    async fn test_write_requires_scope() {
        let env = env();
        let err = env
            .tools
            .write_config(&args(json!({"config": {}})))
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::InvalidArgument { ref field, .. } if field == "scope"));
    }

    #[tokio::test]
    async fn test_validate_inline_config() {
        let env = env();
        let report = env
            .tools
            .validate_config(&args(json!({"config": {"nope": 1, "provider": {"x": 2}}})))
            .await
            .unwrap();
        assert_eq!(report["valid"], false);
        assert_eq!(report["errors"].as_array().unwrap().len(), 2);
        assert!(report.get("path").is_none());
    }

    #[tokio::test]
    async fn test_schema_lookup_with_and_without_path() {
        let env = env();
        let top = env.tools.get_config_schema(&args(json!({}))).await.unwrap();
        let keys: Vec<&str> = top["properties"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["key"].as_str().unwrap())
            .collect();
        assert!(keys.contains(&"provider"));

        let node = env
            .tools
            .get_config_schema(&args(json!({"path": "mcp.fs.command"})))
            .await
            .unwrap();
        assert_eq!(node["type"], "array");

        let err = env
            .tools
            .get_config_schema(&args(json!({"path": "provider.x.modelz.y"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::SchemaPathNotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_backups_after_overwrite() {
        let env = env();
        std::fs::write(env.project.path().join("opencode.json"), "{}").unwrap();
        env.tools
            .write_config(&args(json!({"scope": "project", "config": {"theme": "a"}})))
            .await
            .unwrap();

        let listing = env.tools.list_config_backups(&args(json!({}))).await.unwrap();
        assert_eq!(listing["count"], 1);
        assert!(listing["backups"][0]["name"]
            .as_str()
            .unwrap()
            .starts_with("opencode.json.backup."));
    }
}
