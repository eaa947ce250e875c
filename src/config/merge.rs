//! Deep merge of config documents.

use serde_json::Value;

/// Deep merge `incoming` onto `base`.
///
/// For every key of `incoming`: when both sides hold an object the two are
/// merged recursively, otherwise the incoming value replaces the base value
/// outright. Arrays are replaced, never concatenated, and a scalar replaces
/// an object wholesale.
pub fn deep_merge(base: &mut Value, incoming: Value) {
    match (base, incoming) {
        (Value::Object(base_map), Value::Object(incoming_map)) => {
            for (key, incoming_value) in incoming_map {
                match base_map.get_mut(&key) {
                    Some(base_value) => deep_merge(base_value, incoming_value),
                    None => {
                        base_map.insert(key, incoming_value);
                    }
                }
            }
        }
        (base, incoming) => {
            *base = incoming;
        }
    }
}

/// Merge `incoming` onto a copy of `base` and return the result.
#[must_use]
pub fn merged(base: &Value, incoming: Value) -> Value {
    let mut result = base.clone();
    deep_merge(&mut result, incoming);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_objects_merge() {
        let mut base = json!({});
        deep_merge(&mut base, json!({"a": {"x": 1}}));
        deep_merge(&mut base, json!({"a": {"y": 2}}));
        assert_eq!(base, json!({"a": {"x": 1, "y": 2}}));
    }

    #[test]
    fn test_scalar_replaces_object() {
        let mut base = json!({});
        deep_merge(&mut base, json!({"a": {"x": 1}}));
        deep_merge(&mut base, json!({"a": 5}));
        assert_eq!(base, json!({"a": 5}));
    }

    #[test]
    fn test_object_replaces_scalar() {
        let mut base = json!({"a": 5});
        deep_merge(&mut base, json!({"a": {"x": 1}}));
        assert_eq!(base, json!({"a": {"x": 1}}));
    }

    #[test]
    fn test_arrays_are_replaced_not_concatenated() {
        let mut base = json!({"instructions": ["a.md", "b.md"]});
        deep_merge(&mut base, json!({"instructions": ["c.md"]}));
        assert_eq!(base, json!({"instructions": ["c.md"]}));
    }

    #[test]
    fn test_null_overrides_value() {
        let mut base = json!({"theme": "dark", "model": "m"});
        deep_merge(&mut base, json!({"theme": null}));
        assert_eq!(base, json!({"theme": null, "model": "m"}));
    }

    #[test]
    fn test_untouched_keys_preserved() {
        let mut base = json!({"provider": {"openai": {"a": 1}}, "theme": "x"});
        deep_merge(&mut base, json!({"provider": {"anthropic": {"b": 2}}}));
        assert_eq!(
            base,
            json!({"provider": {"openai": {"a": 1}, "anthropic": {"b": 2}}, "theme": "x"})
        );
    }

    #[test]
    fn test_merge_is_idempotent() {
        let base = json!({"mcp": {"fs": {"type": "local", "command": ["a"]}}});
        let fragment = json!({"mcp": {"fs": {"enabled": false}}, "theme": "t"});

        let once = merged(&base, fragment.clone());
        let twice = merged(&once, fragment);
        assert_eq!(once, twice);
    }
}
