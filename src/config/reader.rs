//! Loading and parsing of config documents.
//!
//! Config files are parsed with a JSON5 parser, which accepts `//` and
//! `/* */` comments and trailing commas on top of plain JSON.

use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Result, ServerError};

/// Parse config text into a document.
///
/// Whitespace-only input yields an empty object.
///
/// # Errors
///
/// Returns the parser message if the text is not valid JSON5.
pub fn parse_document(text: &str) -> std::result::Result<Value, String> {
    if text.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    json5::from_str::<Value>(text).map_err(|e| e.to_string())
}

/// Read and parse a config file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, fails to parse, or its
/// top-level value is not an object.
pub async fn read_document(path: &Path) -> Result<Value> {
    let text = tokio::fs::read_to_string(path).await?;
    debug!("Read {} bytes from {}", text.len(), path.display());

    let document = parse_document(&text).map_err(|e| ServerError::parse(path, e))?;
    if !document.is_object() {
        return Err(ServerError::parse(
            path,
            "top-level value must be an object",
        ));
    }
    Ok(document)
}

/// Top-level keys of a document.
#[must_use]
pub fn top_level_keys(document: &Value) -> Vec<String> {
    document
        .as_object()
        .map(|map| map.keys().cloned().collect())
        .unwrap_or_default()
}

/// Project a single top-level section out of a document.
///
/// # Errors
///
/// Returns `ServerError::SectionNotFound` listing every top-level key when
/// the section is absent.
pub fn project_section(document: &Value, section: &str) -> Result<Value> {
    document
        .get(section)
        .cloned()
        .ok_or_else(|| ServerError::SectionNotFound {
            section: section.to_string(),
            available: top_level_keys(document),
        })
}
