//! Configuration file management for opencode.
//!
//! This module locates, reads, validates, merges and writes the opencode
//! configuration document. The document is JSON that may carry `//` and
//! `/* */` comments and trailing commas.
//!
//! # Scopes
//!
//! 1. **Project** - `opencode.jsonc` then `opencode.json` in the project directory
//! 2. **Global** - the same two names under `~/.config/opencode`
//!
//! The `auto` scope checks every project candidate before any global one.
//!
//! # Example
//!
//! ```rust,ignore
//! use opencode_mcp::config::{ConfigLocations, Located, Scope};
//!
//! let locations = ConfigLocations::new(".");
//! match locations.locate(Scope::Auto).await {
//!     Located::Found { path, .. } => println!("using {}", path.display()),
//!     Located::NotFound { searched } => println!("checked {:?}", searched),
//! }
//! ```
//!
//! # Concurrency
//!
//! A single local process is assumed to be the only writer. [`ConfigWriter`]
//! takes an advisory lock on a hidden `.lock` sibling for the duration of a
//! write, which serializes cooperating writers but does not protect against
//! editors or tools that ignore the lock.

pub mod backup;
pub mod locator;
pub mod merge;
pub mod reader;
pub mod validation;
pub mod writer;

pub use backup::{BackupEntry, BackupRotator, DEFAULT_BACKUP_RETENTION};
pub use locator::{ConfigLocations, Located};
pub use merge::deep_merge;
pub use reader::{parse_document, project_section, read_document, top_level_keys};
pub use validation::{ConfigValidator, ValidationReport};
pub use writer::{ConfigWriter, WriteMode, WriteRequest, WriteResult};

use crate::error::{Result, ServerError};
use std::str::FromStr;

/// Preferred config filename (comment-tolerant).
pub const JSONC_FILENAME: &str = "opencode.jsonc";

/// Plain JSON config filename.
pub const JSON_FILENAME: &str = "opencode.json";

/// Candidate filenames in priority order.
pub const CONFIG_FILENAMES: [&str; 2] = [JSONC_FILENAME, JSON_FILENAME];

/// Name of the provider map section.
pub const PROVIDER_SECTION: &str = "provider";

/// Name of the MCP service registration section.
pub const MCP_SECTION: &str = "mcp";

/// Allowed values of an MCP entry's `type` field.
pub const MCP_SERVER_TYPES: [&str; 2] = ["local", "remote"];

/// Which configuration location an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    /// Config in the project directory.
    Project,
    /// Per-user config under the home directory.
    Global,
    /// Project first, then global.
    #[default]
    Auto,
}

impl Scope {
    /// Check if this scope names a single concrete location.
    ///
    /// Writes require a concrete scope; `auto` is only meaningful for lookups.
    #[must_use]
    pub fn is_concrete(&self) -> bool {
        !matches!(self, Self::Auto)
    }

    /// Returns the scope name as used in tool arguments.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Global => "global",
            Self::Auto => "auto",
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = ServerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "project" => Ok(Self::Project),
            "global" => Ok(Self::Global),
            "auto" => Ok(Self::Auto),
            other => Err(ServerError::invalid_argument(
                "scope",
                format!("expected one of project, global, auto; got '{}'", other),
            )),
        }
    }
}

/// Check whether a path uses the comment-tolerant extension.
#[must_use]
pub fn is_jsonc(path: &std::path::Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("jsonc")
}
