//! opencode-mcp - MCP server for opencode configuration
//!
//! Exposes opencode's configuration files, its config JSON Schema, the
//! models catalog and the MCP server registry as tools over a
//! newline-delimited JSON-RPC 2.0 stdio channel.
//!
//! # Architecture
//!
//! - [`config`] - Locating, reading, validating and safely writing config files
//! - [`schema`] - Config schema cache and dotted-path navigation
//! - [`catalog`] - Cached models catalog and MCP registry
//! - [`fetch`] - Remote document retrieval
//! - [`tools`] - Tool definitions and dispatch
//! - [`server`] - JSON-RPC framing over stdio
//! - [`error`] - Error types and classification
//! - [`testing`] - Mock sources and fixtures
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use opencode_mcp::{HttpSource, McpServer, ServerSettings, ToolRegistry};
//!
//! let settings = ServerSettings::default().with_project_dir(".");
//! let tools = ToolRegistry::new(&settings, Arc::new(HttpSource::new()?));
//! McpServer::new(tools).serve_stdio().await?;
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod fetch;
pub mod schema;
pub mod server;
pub mod settings;
pub mod testing;
pub mod tools;

pub use error::{ErrorKind, Result, ServerError};
pub use fetch::{HttpSource, RemoteSource};
pub use server::McpServer;
pub use settings::ServerSettings;
pub use tools::{ToolDefinition, ToolRegistry};

pub use config::{ConfigLocations, Scope, ValidationReport, WriteMode};
