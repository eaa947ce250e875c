//! Error types for the opencode MCP server.
//!
//! Every tool failure surfaces as a [`ServerError`]. Errors carry enough
//! context (searched paths, available keys, the full violation list) for a
//! caller to correct its input and retry without further discovery.

use std::path::PathBuf;
use thiserror::Error;

/// Broad classification of a [`ServerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A file, section, provider, model, service or schema path does not exist.
    NotFound,
    /// A remote source could not be retrieved and no usable cache exists.
    FetchFailure,
    /// A configuration document failed structural validation.
    ValidationFailure,
    /// The requested tool has no registered handler.
    UnknownOperation,
    /// Tool arguments were missing or malformed.
    InvalidInput,
    /// I/O, serialization or other unexpected failures.
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::FetchFailure => write!(f, "fetch_failure"),
            Self::ValidationFailure => write!(f, "validation_failure"),
            Self::UnknownOperation => write!(f, "unknown_operation"),
            Self::InvalidInput => write!(f, "invalid_input"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// Main error type for server operations
#[derive(Error, Debug)]
pub enum ServerError {
    // =========================================================================
    // Lookup Errors
    // =========================================================================
    /// No configuration file exists for the requested scope
    #[error("No {scope} configuration file found (searched: {})", join_paths(.searched))]
    ConfigNotFound { scope: String, searched: Vec<PathBuf> },

    /// Requested top-level section is absent from the document
    #[error("Section '{section}' not found. Available sections: {}", join_keys(.available))]
    SectionNotFound {
        section: String,
        available: Vec<String>,
    },

    /// A segment of a dotted schema path could not be resolved
    #[error(
        "Schema path '{path}' not found: no key '{segment}'. Available keys: {}",
        join_keys(.available)
    )]
    SchemaPathNotFound {
        segment: String,
        path: String,
        available: Vec<String>,
    },

    /// Provider id is not present in the catalog
    #[error("Provider '{provider}' not found. Available providers: {}", join_keys(.available))]
    ProviderNotFound {
        provider: String,
        available: Vec<String>,
    },

    /// Model id is not present under the given provider
    #[error(
        "Model '{model}' not found for provider '{provider}'. Available models: {}",
        join_keys(.available)
    )]
    ModelNotFound {
        provider: String,
        model: String,
        available: Vec<String>,
    },

    /// MCP server name is not present in the registry
    #[error("MCP server '{name}' not found in registry")]
    ServiceNotFound { name: String },

    // =========================================================================
    // Remote Errors
    // =========================================================================
    /// A remote document could not be retrieved
    #[error("Failed to fetch {source_name}: {message}")]
    Fetch {
        source_name: String,
        message: String,
    },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Document failed structural validation
    #[error("Configuration validation failed with {} error(s): {}", .errors.len(), .errors.join("; "))]
    Validation { errors: Vec<String> },

    /// Configuration file could not be parsed
    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Another writer holds the configuration lock
    #[error("Configuration file is locked by another writer: {path}")]
    Locked { path: PathBuf },

    // =========================================================================
    // Dispatch Errors
    // =========================================================================
    /// Tool name has no handler
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    /// Tool argument missing or malformed
    #[error("Invalid argument '{field}': {reason}")]
    InvalidArgument { field: String, reason: String },

    // =========================================================================
    // Wrapped Errors
    // =========================================================================
    /// IO error wrapper
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON error wrapper
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_keys(keys: &[String]) -> String {
    if keys.is_empty() {
        "(none)".to_string()
    } else {
        keys.join(", ")
    }
}

impl ServerError {
    // =========================================================================
    // Constructor helpers
    // =========================================================================

    /// Create a fetch error
    pub fn fetch(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a parse error for a file
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an unknown tool error
    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::UnknownTool { name: name.into() }
    }

    // =========================================================================
    // Classification helpers
    // =========================================================================

    /// Map this error onto the broad error taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigNotFound { .. }
            | Self::SectionNotFound { .. }
            | Self::SchemaPathNotFound { .. }
            | Self::ProviderNotFound { .. }
            | Self::ModelNotFound { .. }
            | Self::ServiceNotFound { .. } => ErrorKind::NotFound,
            Self::Fetch { .. } => ErrorKind::FetchFailure,
            Self::Validation { .. } => ErrorKind::ValidationFailure,
            Self::UnknownTool { .. } => ErrorKind::UnknownOperation,
            Self::InvalidArgument { .. } | Self::Parse { .. } => ErrorKind::InvalidInput,
            Self::Locked { .. } | Self::Io(_) | Self::Json(_) | Self::Other(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Check if re-invoking the same call unchanged may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Fetch { .. } | Self::Locked { .. })
    }

    /// JSON-RPC error code for protocol-level failures
    pub fn rpc_code(&self) -> i64 {
        match self.kind() {
            ErrorKind::UnknownOperation => -32601,
            ErrorKind::InvalidInput => -32602,
            _ => -32603,
        }
    }
}

/// Type alias for server results
pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_not_found_lists_searched_paths() {
        let err = ServerError::ConfigNotFound {
            scope: "auto".into(),
            searched: vec![
                PathBuf::from("/p/opencode.jsonc"),
                PathBuf::from("/p/opencode.json"),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("/p/opencode.jsonc"));
        assert!(msg.contains("/p/opencode.json"));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_schema_path_error_lists_available_keys() {
        let err = ServerError::SchemaPathNotFound {
            segment: "modles".into(),
            path: "provider.modles".into(),
            available: vec!["models".into(), "options".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("provider.modles"));
        assert!(msg.contains("models, options"));
    }

    #[test]
    fn test_empty_available_keys_display() {
        let err = ServerError::SectionNotFound {
            section: "mcp".into(),
            available: vec![],
        };
        assert!(err.to_string().contains("(none)"));
    }

    #[test]
    fn test_validation_error_counts_all_errors() {
        let err = ServerError::Validation {
            errors: vec!["a".into(), "b".into()],
        };
        assert!(err.to_string().contains("2 error(s)"));
        assert_eq!(err.kind(), ErrorKind::ValidationFailure);
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            ServerError::fetch("schema", "timeout").kind(),
            ErrorKind::FetchFailure
        );
        assert_eq!(
            ServerError::unknown_tool("nope").kind(),
            ErrorKind::UnknownOperation
        );
        assert_eq!(
            ServerError::invalid_argument("scope", "bad").kind(),
            ErrorKind::InvalidInput
        );
    }

    #[test]
    fn test_rpc_codes() {
        assert_eq!(ServerError::unknown_tool("x").rpc_code(), -32601);
        assert_eq!(ServerError::invalid_argument("a", "b").rpc_code(), -32602);
        assert_eq!(ServerError::fetch("a", "b").rpc_code(), -32603);
    }

    #[test]
    fn test_is_retryable() {
        assert!(ServerError::fetch("models", "503").is_retryable());
        assert!(!ServerError::unknown_tool("x").is_retryable());
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: ServerError = io_err.into();
        assert!(matches!(err, ServerError::Io(_)));
        assert!(err.to_string().contains("access denied"));
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}
