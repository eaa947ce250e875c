//! Validated, backed-up config writes.
//!
//! A write runs these steps in order, each gating the next:
//!
//! 1. resolve the target (existing file, or the preferred new path)
//! 2. merge onto the existing document, or take the fragment as-is
//! 3. validate the result; on failure nothing is written
//! 4. back up the existing file when requested
//! 5. write to a temporary sibling and rename it over the target
//!
//! Steps 2 to 5 run under an advisory lock on a hidden `.lock` sibling.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fs2::FileExt;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use super::{
    deep_merge, is_jsonc, read_document, BackupRotator, ConfigLocations, ConfigValidator, Located,
    Scope,
};
use crate::error::{Result, ServerError};
use crate::fetch::{hidden_sibling, write_atomically};
use crate::schema::SchemaCache;

/// Header line written at the top of `.jsonc` files.
pub const JSONC_HEADER: &str = "// opencode configuration (managed by opencode-mcp)";

const LOCK_SUFFIX: &str = ".lock";
const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How an incoming fragment combines with the existing document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Deep-merge onto the existing document.
    #[default]
    Merge,
    /// Replace the document with the fragment.
    Replace,
}

impl WriteMode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Replace => "replace",
        }
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WriteMode {
    type Err = ServerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "merge" => Ok(Self::Merge),
            "replace" => Ok(Self::Replace),
            other => Err(ServerError::invalid_argument(
                "mode",
                format!("expected merge or replace; got '{}'", other),
            )),
        }
    }
}

/// A requested write.
#[derive(Debug, Clone)]
pub struct WriteRequest {
    pub scope: Scope,
    pub document: Value,
    pub mode: WriteMode,
    pub create_backup: bool,
}

impl WriteRequest {
    /// Merge `document` into `scope` with backups enabled.
    #[must_use]
    pub fn new(scope: Scope, document: Value) -> Self {
        Self {
            scope,
            document,
            mode: WriteMode::Merge,
            create_backup: true,
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_backup(mut self, create_backup: bool) -> Self {
        self.create_backup = create_backup;
        self
    }
}

/// Outcome of a successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteResult {
    /// File that was written.
    pub path: PathBuf,
    /// Whether the file did not exist before.
    pub created: bool,
    pub mode: WriteMode,
    pub backup_created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<PathBuf>,
}

/// Writes config documents.
#[derive(Debug, Clone)]
pub struct ConfigWriter {
    locations: ConfigLocations,
    schema: Arc<SchemaCache>,
    rotator: BackupRotator,
    lock_timeout: Duration,
}

impl ConfigWriter {
    #[must_use]
    pub fn new(locations: ConfigLocations, schema: Arc<SchemaCache>, rotator: BackupRotator) -> Self {
        Self {
            locations,
            schema,
            rotator,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Set how long to wait for another writer's lock.
    #[must_use]
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Perform a write.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for `auto` scope, a non-object document, or a
    ///   global write with no known home directory
    /// - `Fetch` when the schema is unavailable
    /// - `Parse` when merging onto an unparsable file
    /// - `Validation` with every violation of the resulting document
    /// - `Locked` when another writer holds the lock past the timeout
    /// - `Io` for filesystem failures
    pub async fn write(&self, request: WriteRequest) -> Result<WriteResult> {
        let WriteRequest {
            scope,
            document,
            mode,
            create_backup,
        } = request;

        if !scope.is_concrete() {
            return Err(ServerError::invalid_argument(
                "scope",
                "writes require 'project' or 'global'",
            ));
        }
        if !document.is_object() {
            return Err(ServerError::invalid_argument(
                "config",
                "must be a JSON object",
            ));
        }

        let schema = self.schema.get().await?;
        let target = self.resolve_target(scope).await?;

        let _lock = acquire_lock(&target, self.lock_timeout).await?;
        let existed = tokio::fs::try_exists(&target).await?;

        let document = match mode {
            WriteMode::Merge if existed => {
                let mut base = read_document(&target).await?;
                deep_merge(&mut base, document);
                base
            }
            _ => document,
        };

        let report = ConfigValidator::new(&schema).validate(&document);
        if !report.is_valid() {
            debug!(
                "Rejected write to {}: {}",
                target.display(),
                report.summary()
            );
            return Err(ServerError::Validation {
                errors: report.errors,
            });
        }

        let backup_path = if existed && create_backup {
            Some(self.rotator.rotate(&target).await?)
        } else {
            None
        };

        write_atomically(&target, &render(&document, is_jsonc(&target))?).await?;
        info!(
            "Wrote {} config ({}) to {}",
            scope,
            mode,
            target.display()
        );

        Ok(WriteResult {
            path: target,
            created: !existed,
            mode,
            backup_created: backup_path.is_some(),
            backup_path,
        })
    }

    async fn resolve_target(&self, scope: Scope) -> Result<PathBuf> {
        if let Located::Found { path, .. } = self.locations.locate(scope).await {
            return Ok(path);
        }

        let path = self.locations.preferred_path(scope).ok_or_else(|| {
            ServerError::invalid_argument("scope", "global config directory is unknown")
        })?;
        if scope == Scope::Global {
            if let Some(dir) = path.parent() {
                tokio::fs::create_dir_all(dir).await?;
            }
        }
        Ok(path)
    }
}

/// Serialize a document for disk.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render(document: &Value, jsonc: bool) -> Result<String> {
    let body = serde_json::to_string_pretty(document)?;
    Ok(if jsonc {
        format!("{}\n{}\n", JSONC_HEADER, body)
    } else {
        format!("{}\n", body)
    })
}

/// Exclusive advisory lock, released on drop.
#[derive(Debug)]
struct WriteLock {
    file: File,
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

async fn acquire_lock(target: &Path, timeout: Duration) -> Result<WriteLock> {
    let lock_path = hidden_sibling(target, LOCK_SUFFIX);
    tokio::task::spawn_blocking(move || -> Result<WriteLock> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;

        let started = Instant::now();
        loop {
            match FileExt::try_lock_exclusive(&file) {
                Ok(()) => return Ok(WriteLock { file }),
                Err(_) if started.elapsed() < timeout => std::thread::sleep(LOCK_POLL_INTERVAL),
                Err(_) => return Err(ServerError::Locked { path: lock_path }),
            }
        }
    })
    .await
    .map_err(|e| ServerError::Other(e.into()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::backup::BACKUP_DIR_NAME;
    use crate::config::{JSONC_FILENAME, JSON_FILENAME};
    use crate::testing::fixtures::sample_schema;
    use crate::testing::MockSource;
    use serde_json::json;
    use tempfile::TempDir;

    const SCHEMA_URL: &str = "https://example.test/config.json";

    struct Env {
        project: TempDir,
        global: TempDir,
        _data: TempDir,
        writer: ConfigWriter,
    }

    fn env_with(source: MockSource) -> Env {
        let project = TempDir::new().unwrap();
        let global = TempDir::new().unwrap();
        let data = TempDir::new().unwrap();
        let schema = Arc::new(SchemaCache::new(Arc::new(source), SCHEMA_URL, data.path()));
        let locations = ConfigLocations::new(project.path())
            .with_global_dir(global.path().join("opencode"));
        let writer = ConfigWriter::new(locations, schema, BackupRotator::new(5));
        Env {
            project,
            global,
            _data: data,
            writer,
        }
    }

    fn env() -> Env {
        env_with(MockSource::new().with_response(SCHEMA_URL, sample_schema()))
    }

    fn read(path: &Path) -> Value {
        crate::config::parse_document(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_write_mode_parse_and_display() {
        assert_eq!("Replace".parse::<WriteMode>().unwrap(), WriteMode::Replace);
        assert_eq!(WriteMode::default().to_string(), "merge");
        assert!("append".parse::<WriteMode>().is_err());
    }

    #[test]
    fn test_render_formats() {
        let doc = json!({"theme": "dark"});
        assert_eq!(render(&doc, false).unwrap(), "{\n  \"theme\": \"dark\"\n}\n");
        let jsonc = render(&doc, true).unwrap();
        assert!(jsonc.starts_with("// "));
        assert_eq!(jsonc.lines().count(), 4);
    }

    #[tokio::test]
    async fn test_new_project_file_uses_jsonc() {
        let env = env();
        let result = env
            .writer
            .write(WriteRequest::new(Scope::Project, json!({"theme": "dark"})))
            .await
            .unwrap();

        assert_eq!(result.path, env.project.path().join(JSONC_FILENAME));
        assert!(result.created);
        assert!(!result.backup_created);
        assert_eq!(read(&result.path), json!({"theme": "dark"}));
        assert!(!hidden_sibling(&result.path, ".tmp").exists());
    }

    #[tokio::test]
    async fn test_new_global_file_creates_directory() {
        let env = env();
        let result = env
            .writer
            .write(WriteRequest::new(Scope::Global, json!({"autoupdate": false})))
            .await
            .unwrap();
        assert_eq!(
            result.path,
            env.global.path().join("opencode").join(JSONC_FILENAME)
        );
        assert!(result.path.exists());
    }

    #[tokio::test]
    async fn test_existing_plain_json_is_reused() {
        let env = env();
        let existing = env.project.path().join(JSON_FILENAME);
        std::fs::write(&existing, r#"{"theme": "light"}"#).unwrap();

        let result = env
            .writer
            .write(WriteRequest::new(Scope::Project, json!({"model": "a/b"})))
            .await
            .unwrap();
        assert_eq!(result.path, existing);
        assert!(!result.created);
        let text = std::fs::read_to_string(&existing).unwrap();
        assert!(!text.starts_with("//"));
    }

    #[tokio::test]
    async fn test_merge_keeps_existing_keys_and_is_idempotent() {
        let env = env();
        let path = env.project.path().join(JSONC_FILENAME);
        std::fs::write(
            &path,
            "{\n  // comment\n  \"theme\": \"dark\",\n  \"provider\": {\"openai\": {\"options\": {\"a\": 1}}},\n}",
        )
        .unwrap();

        let fragment = json!({"provider": {"openai": {"options": {"b": 2}}}});
        env.writer
            .write(WriteRequest::new(Scope::Project, fragment.clone()))
            .await
            .unwrap();
        let first = read(&path);
        env.writer
            .write(WriteRequest::new(Scope::Project, fragment))
            .await
            .unwrap();

        assert_eq!(first, read(&path));
        assert_eq!(
            first,
            json!({
                "theme": "dark",
                "provider": {"openai": {"options": {"a": 1, "b": 2}}}
            })
        );
    }

    #[tokio::test]
    async fn test_replace_ignores_existing_content() {
        let env = env();
        let path = env.project.path().join(JSON_FILENAME);
        std::fs::write(&path, "{ not even parsable").unwrap();

        let result = env
            .writer
            .write(
                WriteRequest::new(Scope::Project, json!({"share": "disabled"}))
                    .with_mode(WriteMode::Replace),
            )
            .await
            .unwrap();
        assert_eq!(result.mode, WriteMode::Replace);
        assert_eq!(read(&path), json!({"share": "disabled"}));
    }

    #[tokio::test]
    async fn test_validation_failure_writes_nothing() {
        let env = env();
        let path = env.project.path().join(JSON_FILENAME);
        std::fs::write(&path, r#"{"theme": "dark"}"#).unwrap();

        let err = env
            .writer
            .write(WriteRequest::new(
                Scope::Project,
                json!({"bogus": 1, "mcp": {"x": {"type": "stdio"}}}),
            ))
            .await
            .unwrap_err();

        match err {
            ServerError::Validation { errors } => assert_eq!(errors.len(), 2),
            other => panic!("expected Validation, got {:?}", other),
        }
        assert_eq!(read(&path), json!({"theme": "dark"}));
        assert!(!env.project.path().join(BACKUP_DIR_NAME).exists());
    }

    #[tokio::test]
    async fn test_overwrite_takes_backup_unless_disabled() {
        let env = env();
        let path = env.project.path().join(JSON_FILENAME);
        std::fs::write(&path, r#"{"theme": "dark"}"#).unwrap();

        let with_backup = env
            .writer
            .write(WriteRequest::new(Scope::Project, json!({"theme": "light"})))
            .await
            .unwrap();
        assert!(with_backup.backup_created);
        let backup = with_backup.backup_path.unwrap();
        assert_eq!(read(&backup), json!({"theme": "dark"}));

        let without = env
            .writer
            .write(WriteRequest::new(Scope::Project, json!({"theme": "x"})).with_backup(false))
            .await
            .unwrap();
        assert!(!without.backup_created);
        assert!(without.backup_path.is_none());
        assert_eq!(BackupRotator::list(&path).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_backup_retention_across_writes() {
        let env = env();
        let path = env.project.path().join(JSON_FILENAME);
        std::fs::write(&path, "{}").unwrap();

        for i in 0..7 {
            env.writer
                .write(WriteRequest::new(Scope::Project, json!({"model": format!("m/{}", i)})))
                .await
                .unwrap();
        }
        assert_eq!(BackupRotator::list(&path).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_rejects_auto_scope_and_non_object() {
        let env = env();
        let err = env
            .writer
            .write(WriteRequest::new(Scope::Auto, json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::InvalidArgument { ref field, .. } if field == "scope"));

        let err = env
            .writer
            .write(WriteRequest::new(Scope::Project, json!([1])))
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::InvalidArgument { ref field, .. } if field == "config"));
    }

    #[tokio::test]
    async fn test_schema_unavailable_aborts_write() {
        let env = env_with(MockSource::new().with_failure(SCHEMA_URL, "HTTP 503"));
        let err = env
            .writer
            .write(WriteRequest::new(Scope::Project, json!({"theme": "dark"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::Fetch { .. }));
        assert!(!env.project.path().join(JSONC_FILENAME).exists());
    }

    #[tokio::test]
    async fn test_held_lock_reports_locked() {
        let env = env();
        let target = env.project.path().join(JSONC_FILENAME);
        let lock_file = File::create(hidden_sibling(&target, LOCK_SUFFIX)).unwrap();
        FileExt::lock_exclusive(&lock_file).unwrap();

        let writer = env.writer.clone().with_lock_timeout(Duration::from_millis(100));
        let err = writer
            .write(WriteRequest::new(Scope::Project, json!({"theme": "dark"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::Locked { .. }));
        assert!(err.is_retryable());

        FileExt::unlock(&lock_file).unwrap();
        assert!(writer
            .write(WriteRequest::new(Scope::Project, json!({"theme": "dark"})))
            .await
            .is_ok());
    }
}
