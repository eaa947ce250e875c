//! Config file discovery across project and global scopes.
//!
//! Discovery is a pure existence probe: no file is opened or parsed here.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::{Scope, CONFIG_FILENAMES};

// ============================================================================
// Located
// ============================================================================

/// Outcome of a config lookup.
///
/// Absence is not an error: `NotFound` carries every path that was probed so
/// callers can report where they looked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located {
    /// An existing file was found.
    Found {
        /// Path to the config file.
        path: PathBuf,
        /// The concrete scope the file belongs to.
        scope: Scope,
    },
    /// No candidate exists.
    NotFound {
        /// All candidate paths, in probe order.
        searched: Vec<PathBuf>,
    },
}

impl Located {
    /// Get the found path, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Found { path, .. } => Some(path),
            Self::NotFound { .. } => None,
        }
    }

    /// Check if a file was found.
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }
}

// ============================================================================
// Config Locations
// ============================================================================

/// Project and global directories that hold config files.
///
/// # Candidate order
///
/// - Project: `<project>/opencode.jsonc`, `<project>/opencode.json`
/// - Global: `~/.config/opencode/opencode.jsonc`, `~/.config/opencode/opencode.json`
#[derive(Debug, Clone)]
pub struct ConfigLocations {
    project_dir: PathBuf,
    global_dir: Option<PathBuf>,
}

impl ConfigLocations {
    /// Create locations for the given project directory and the default
    /// global directory.
    #[must_use]
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            global_dir: Self::default_global_dir(),
        }
    }

    /// Get the default global config directory.
    ///
    /// Resolves to `{home}/.config/opencode`, or `None` if the home
    /// directory cannot be determined.
    #[must_use]
    pub fn default_global_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config").join("opencode"))
    }

    /// Set a custom global config directory.
    #[must_use]
    pub fn with_global_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.global_dir = Some(dir.into());
        self
    }

    /// Get the project directory.
    #[must_use]
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Get the global config directory.
    #[must_use]
    pub fn global_dir(&self) -> Option<&Path> {
        self.global_dir.as_deref()
    }

    /// Get the directory for a concrete scope.
    ///
    /// Returns `None` for `auto`, and for `global` when no home directory
    /// is known.
    #[must_use]
    pub fn dir_for(&self, scope: Scope) -> Option<&Path> {
        match scope {
            Scope::Project => Some(&self.project_dir),
            Scope::Global => self.global_dir.as_deref(),
            Scope::Auto => None,
        }
    }

    /// Candidate paths for a scope, in probe order.
    #[must_use]
    pub fn candidates(&self, scope: Scope) -> Vec<(Scope, PathBuf)> {
        let scopes: &[Scope] = match scope {
            Scope::Project => &[Scope::Project],
            Scope::Global => &[Scope::Global],
            Scope::Auto => &[Scope::Project, Scope::Global],
        };

        scopes
            .iter()
            .filter_map(|s| self.dir_for(*s).map(|dir| (*s, dir)))
            .flat_map(|(s, dir)| CONFIG_FILENAMES.iter().map(move |name| (s, dir.join(name))))
            .collect()
    }

    /// Preferred path for a new file in a concrete scope.
    #[must_use]
    pub fn preferred_path(&self, scope: Scope) -> Option<PathBuf> {
        self.dir_for(scope).map(|dir| dir.join(CONFIG_FILENAMES[0]))
    }

    /// Find the first existing config file for a scope.
    pub async fn locate(&self, scope: Scope) -> Located {
        let candidates = self.candidates(scope);
        let mut searched = Vec::with_capacity(candidates.len());

        for (candidate_scope, path) in candidates {
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                debug!("Located {} config at {}", candidate_scope, path.display());
                return Located::Found {
                    path,
                    scope: candidate_scope,
                };
            }
            searched.push(path);
        }

        debug!("No {} config found after {} probes", scope, searched.len());
        Located::NotFound { searched }
    }
}

// ============================================================================
// Tests
// ============================================================================
