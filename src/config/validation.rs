//! Structural validation of configuration documents.
//!
//! This is not a full JSON Schema conformance check. Three rules are
//! always evaluated, and every violation is reported:
//!
//! 1. every top-level key is a declared property of the schema root
//! 2. every `provider` entry is an object
//! 3. every `mcp` entry is an object with a `type` of `local` or `remote`
//!
//! Non-blocking warnings flag `mcp` entries that will not start, such as a
//! local server without a `command`.
//!
//! # Example
//!
//! ```rust
//! use opencode_mcp::config::ConfigValidator;
//! use serde_json::json;
//!
//! let schema = json!({ "properties": { "theme": {}, "mcp": {} } });
//! let config = json!({ "theme": "dark", "themes": [], "mcp": { "fs": {} } });
//!
//! let report = ConfigValidator::new(&schema).validate(&config);
//! assert!(!report.is_valid());
//! assert_eq!(report.errors.len(), 2);
//! ```

use std::path::PathBuf;

use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::Value;

use super::{MCP_SECTION, MCP_SERVER_TYPES, PROVIDER_SECTION};
use crate::schema::SchemaNode;

/// Result of configuration validation.
///
/// Serializes as `{valid, errors, warnings, path?}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Violations that make the document invalid.
    pub errors: Vec<String>,
    /// Issues that don't affect validity.
    pub warnings: Vec<String>,
    /// File the document was read from, if any.
    pub path: Option<PathBuf>,
}

impl ValidationReport {
    /// Create a new empty validation report.
    ///
    /// An empty report is considered valid.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the path of the validated file.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Returns true if there are no errors. Warnings do not affect validity.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns 0 if valid, 1 if invalid.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.is_valid() {
            0
        } else {
            1
        }
    }

    /// Generate a human-readable summary of the validation result.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.is_valid() {
            if self.warnings.is_empty() {
                "Configuration is valid.".to_string()
            } else {
                format!(
                    "Configuration is valid with {} warning(s).",
                    self.warnings.len()
                )
            }
        } else {
            format!(
                "Configuration is invalid with {} error(s).",
                self.errors.len()
            )
        }
    }

    /// Generate a verbose report including all details.
    #[must_use]
    pub fn verbose_report(&self) -> String {
        let mut lines = vec![
            "Configuration Validation Report".to_string(),
            "\u{2500}".repeat(50),
        ];

        if let Some(path) = &self.path {
            lines.push(String::new());
            lines.push(format!("File: {}", path.display()));
        }

        if !self.errors.is_empty() {
            lines.push(String::new());
            lines.push(format!("Errors ({}):", self.errors.len()));
            for error in &self.errors {
                lines.push(format!("  \u{2717} {}", error));
            }
        }

        if !self.warnings.is_empty() {
            lines.push(String::new());
            lines.push(format!("Warnings ({}):", self.warnings.len()));
            for warning in &self.warnings {
                lines.push(format!("  \u{26a0} {}", warning));
            }
        }

        lines.push(String::new());
        lines.push(format!("Status: {}", self.summary()));

        lines.join("\n")
    }
}

impl Serialize for ValidationReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ValidationReport", 4)?;
        state.serialize_field("valid", &self.is_valid())?;
        state.serialize_field("errors", &self.errors)?;
        state.serialize_field("warnings", &self.warnings)?;
        match &self.path {
            Some(path) => state.serialize_field("path", path)?,
            None => state.skip_field("path")?,
        }
        state.end()
    }
}

/// Validates configuration documents against a schema.
#[derive(Debug, Clone, Copy)]
pub struct ConfigValidator<'a> {
    schema: &'a Value,
}

impl<'a> ConfigValidator<'a> {
    /// Create a validator for `schema`.
    #[must_use]
    pub fn new(schema: &'a Value) -> Self {
        Self { schema }
    }

    /// Run every rule over `config`.
    ///
    /// A non-object document yields a single error.
    #[must_use]
    pub fn validate(&self, config: &Value) -> ValidationReport {
        let mut report = ValidationReport::new();

        let Some(document) = config.as_object() else {
            report.errors.push(format!(
                "Configuration must be a JSON object, found {}",
                kind_of(config)
            ));
            return report;
        };

        self.check_top_level_keys(document.keys(), &mut report);

        if let Some(providers) = document.get(PROVIDER_SECTION) {
            check_providers(providers, &mut report);
        }
        if let Some(servers) = document.get(MCP_SECTION) {
            check_mcp_servers(servers, &mut report);
        }

        report
    }

    fn check_top_level_keys<'k>(
        &self,
        keys: impl Iterator<Item = &'k String>,
        report: &mut ValidationReport,
    ) {
        let declared = SchemaNode::root(self.schema).property_keys();
        for key in keys {
            if declared.binary_search(key).is_err() {
                report.errors.push(format!(
                    "Unknown top-level key '{}'. Valid keys: {}",
                    key,
                    declared.join(", ")
                ));
            }
        }
    }
}

fn check_providers(providers: &Value, report: &mut ValidationReport) {
    let Some(providers) = providers.as_object() else {
        report.errors.push(format!(
            "Section '{}' must be an object, found {}",
            PROVIDER_SECTION,
            kind_of(providers)
        ));
        return;
    };

    for (id, settings) in providers {
        if !settings.is_object() {
            report.errors.push(format!(
                "Provider '{}' must be an object, found {}",
                id,
                kind_of(settings)
            ));
        }
    }
}

fn check_mcp_servers(servers: &Value, report: &mut ValidationReport) {
    let Some(servers) = servers.as_object() else {
        report.errors.push(format!(
            "Section '{}' must be an object, found {}",
            MCP_SECTION,
            kind_of(servers)
        ));
        return;
    };

    let expected = MCP_SERVER_TYPES
        .iter()
        .map(|t| format!("'{}'", t))
        .collect::<Vec<_>>()
        .join(" or ");

    for (name, entry) in servers {
        let Some(entry) = entry.as_object() else {
            report.errors.push(format!(
                "MCP server '{}' must be an object, found {}",
                name,
                kind_of(entry)
            ));
            continue;
        };

        match entry.get("type") {
            None => report.errors.push(format!(
                "MCP server '{}' is missing required field 'type' (expected {})",
                name, expected
            )),
            Some(Value::String(t)) if MCP_SERVER_TYPES.contains(&t.as_str()) => {
                let field = if t == "local" { "command" } else { "url" };
                if !entry.contains_key(field) {
                    report.warnings.push(format!(
                        "MCP server '{}' of type '{}' has no '{}'",
                        name, t, field
                    ));
                }
            }
            Some(other) => report.errors.push(format!(
                "MCP server '{}' has invalid type {} (expected {})",
                name, other, expected
            )),
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
