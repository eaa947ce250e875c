//! JSON Schema navigation for the opencode configuration schema.
//!
//! A [`SchemaNode`] is a borrowed view of one node of the schema tree. Each
//! node can be descended by a path segment through three kinds of child:
//!
//! 1. fixed properties (`properties[segment]`)
//! 2. dynamic map values (`additionalProperties`), for maps keyed by
//!    arbitrary ids such as providers or MCP servers
//! 3. array items (`items`)
//!
//! checked in that order. Local `$ref` pointers are followed transparently,
//! and the properties of `anyOf`/`oneOf`/`allOf` branches count as the
//! node's own fixed properties.
//!
//! # Example
//!
//! ```rust
//! use opencode_mcp::schema::resolve_path;
//! use serde_json::json;
//!
//! let schema = json!({
//!     "properties": {
//!         "provider": {
//!             "additionalProperties": {
//!                 "properties": { "models": { "type": "object" } }
//!             }
//!         }
//!     }
//! });
//!
//! let fragment = resolve_path(&schema, "provider.models").unwrap();
//! assert_eq!(fragment["type"], "object");
//! ```

pub mod cache;

pub use cache::SchemaCache;

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Result, ServerError};

/// Maximum number of chained `$ref` hops followed before giving up.
const MAX_REF_DEPTH: usize = 32;

/// Keywords whose branches contribute properties to a node.
const COMPOSITION_KEYWORDS: [&str; 3] = ["allOf", "anyOf", "oneOf"];

// ============================================================================
// Step
// ============================================================================

/// Which traversal kind a descent used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// `properties[segment]`
    Property,
    /// `additionalProperties.properties[segment]` on the final segment.
    NestedAdditional,
    /// `additionalProperties` (segment is a map key).
    Additional,
    /// `items` (segment addresses array contents).
    Items,
}

// ============================================================================
// Schema Node
// ============================================================================

/// Borrowed view of a schema node with its document root.
#[derive(Debug, Clone, Copy)]
pub struct SchemaNode<'a> {
    root: &'a Value,
    value: &'a Value,
}

impl<'a> SchemaNode<'a> {
    /// View the root of a schema document.
    #[must_use]
    pub fn root(schema: &'a Value) -> Self {
        Self {
            root: schema,
            value: schema,
        }
        .dereferenced()
    }

    fn at(&self, value: &'a Value) -> Self {
        Self {
            root: self.root,
            value,
        }
        .dereferenced()
    }

    /// Follow local `$ref` pointers until reaching a concrete node.
    fn dereferenced(self) -> Self {
        let mut current = self.value;
        for _ in 0..MAX_REF_DEPTH {
            let Some(reference) = current.get("$ref").and_then(Value::as_str) else {
                break;
            };
            let Some(pointer) = reference.strip_prefix('#') else {
                break;
            };
            match self.root.pointer(pointer) {
                Some(target) => current = target,
                None => break,
            }
        }
        Self {
            root: self.root,
            value: current,
        }
    }

    /// The raw schema value of this node.
    #[must_use]
    pub fn value(&self) -> &'a Value {
        self.value
    }

    /// Composition branches (`allOf`/`anyOf`/`oneOf`) of this node.
    fn branches(&self) -> Vec<SchemaNode<'a>> {
        COMPOSITION_KEYWORDS
            .iter()
            .filter_map(|kw| self.value.get(*kw).and_then(Value::as_array))
            .flatten()
            .map(|branch| self.at(branch))
            .collect()
    }

    /// Fixed property maps of this node, own map first, then branch maps.
    ///
    /// Each schema node is visited once, so branches that refer back to an
    /// enclosing node terminate.
    fn property_maps(&self) -> Vec<&'a Map<String, Value>> {
        let mut maps = Vec::new();
        let mut visited = HashSet::new();
        self.collect_property_maps(&mut visited, &mut maps);
        maps
    }

    fn collect_property_maps(
        &self,
        visited: &mut HashSet<*const Value>,
        maps: &mut Vec<&'a Map<String, Value>>,
    ) {
        if !visited.insert(std::ptr::from_ref(self.value)) {
            return;
        }
        if let Some(own) = self.value.get("properties").and_then(Value::as_object) {
            maps.push(own);
        }
        for branch in self.branches() {
            branch.collect_property_maps(visited, maps);
        }
    }

    /// Look up a fixed property.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<SchemaNode<'a>> {
        self.property_maps()
            .into_iter()
            .find_map(|map| map.get(name))
            .map(|value| self.at(value))
    }

    /// The `additionalProperties` schema, when it is a schema object.
    #[must_use]
    pub fn additional(&self) -> Option<SchemaNode<'a>> {
        self.value
            .get("additionalProperties")
            .filter(|v| v.is_object())
            .map(|value| self.at(value))
    }

    /// The `items` schema, when it is a schema object.
    #[must_use]
    pub fn items(&self) -> Option<SchemaNode<'a>> {
        self.value
            .get("items")
            .filter(|v| v.is_object())
            .map(|value| self.at(value))
    }

    /// Descend by one path segment.
    ///
    /// `is_final` enables the lookup of `additionalProperties.properties`,
    /// which addresses a named field of an arbitrary map entry.
    #[must_use]
    pub fn descend(&self, segment: &str, is_final: bool) -> Option<(Step, SchemaNode<'a>)> {
        if let Some(node) = self.property(segment) {
            return Some((Step::Property, node));
        }
        if let Some(additional) = self.additional() {
            if is_final {
                if let Some(node) = additional.property(segment) {
                    return Some((Step::NestedAdditional, node));
                }
            }
            return Some((Step::Additional, additional));
        }
        self.items().map(|node| (Step::Items, node))
    }

    /// Sorted, de-duplicated fixed property keys.
    #[must_use]
    pub fn property_keys(&self) -> Vec<String> {
        let keys: BTreeSet<String> = self
            .property_maps()
            .into_iter()
            .flat_map(|map| map.keys().cloned())
            .collect();
        keys.into_iter().collect()
    }

    /// Keys offered to a caller after a failed descent: fixed properties
    /// plus the properties of `additionalProperties`.
    #[must_use]
    pub fn available_keys(&self) -> Vec<String> {
        let mut keys: BTreeSet<String> = self.property_keys().into_iter().collect();
        if let Some(additional) = self.additional() {
            keys.extend(additional.property_keys());
        }
        keys.into_iter().collect()
    }

    /// Short type label for display.
    #[must_use]
    pub fn type_label(&self) -> String {
        match self.value.get("type") {
            Some(Value::String(t)) => return t.clone(),
            Some(Value::Array(types)) => {
                return types
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join("|")
            }
            _ => {}
        }
        if self.value.get("enum").is_some() {
            "enum".to_string()
        } else if self.value.get("const").is_some() {
            "const".to_string()
        } else if !self.branches().is_empty() {
            "union".to_string()
        } else if self.value.get("properties").is_some()
            || self.value.get("additionalProperties").is_some()
        {
            "object".to_string()
        } else {
            "any".to_string()
        }
    }

    /// The node's `description`, if any.
    #[must_use]
    pub fn description(&self) -> Option<&'a str> {
        self.value.get("description").and_then(Value::as_str)
    }

    /// Summaries of this node's child keys.
    #[must_use]
    pub fn summarize(&self) -> Vec<PropertySummary> {
        let mut summaries: Vec<PropertySummary> = self
            .property_keys()
            .into_iter()
            .filter_map(|key| {
                self.property(&key)
                    .map(|node| PropertySummary::new(key, &node, false))
            })
            .collect();

        if let Some(additional) = self.additional() {
            for key in additional.property_keys() {
                if summaries.iter().any(|s| s.key == key) {
                    continue;
                }
                if let Some(node) = additional.property(&key) {
                    summaries.push(PropertySummary::new(key, &node, true));
                }
            }
        }
        summaries
    }
}

/// Display summary of one child key of a schema node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertySummary {
    /// Property name.
    pub key: String,
    /// Type label, e.g. `string`, `object`, `union`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Description from the schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the key belongs to each entry of a dynamic map.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub per_entry: bool,
}

impl PropertySummary {
    fn new(key: String, node: &SchemaNode<'_>, per_entry: bool) -> Self {
        Self {
            key,
            kind: node.type_label(),
            description: node.description().map(str::to_string),
            per_entry,
        }
    }
}

// ============================================================================
// Path Resolution
// ============================================================================

/// Resolve a dotted path to the schema node it addresses.
///
/// An empty path resolves to the root.
///
/// # Errors
///
/// Returns `ServerError::InvalidArgument` for paths with empty segments, and
/// `ServerError::SchemaPathNotFound` naming the failing segment, the path up
/// to and including it, and the keys available where the walk stalled.
pub fn resolve_node<'a>(schema: &'a Value, path: &str) -> Result<SchemaNode<'a>> {
    let mut node = SchemaNode::root(schema);
    let path = path.trim();
    if path.is_empty() {
        return Ok(node);
    }

    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(ServerError::invalid_argument(
            "path",
            format!("'{}' contains an empty segment", path),
        ));
    }

    let last = segments.len() - 1;
    for (index, segment) in segments.iter().enumerate() {
        match node.descend(segment, index == last) {
            Some((_, next)) => node = next,
            None => {
                return Err(ServerError::SchemaPathNotFound {
                    segment: (*segment).to_string(),
                    path: segments[..=index].join("."),
                    available: node.available_keys(),
                })
            }
        }
    }
    Ok(node)
}

/// Resolve a dotted path and return a copy of the schema fragment.
///
/// # Errors
///
/// See [`resolve_node`].
pub fn resolve_path(schema: &Value, path: &str) -> Result<Value> {
    resolve_node(schema, path).map(|node| node.value().clone())
}

// ============================================================================
// Tests
// ============================================================================
