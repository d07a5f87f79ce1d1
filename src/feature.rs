//! Feature extraction: turns raw event bytes into a temp and a permanent
//! feature map, per a declarative list of [`Feature`] rules.
//!
//! Grounded in `original_source/lib/features.go` (`FeatureList.Use`),
//! generalized to support wildcard list traversal over JSON arrays.

use crate::error::{ViewError, ViewResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A mapping from feature name to extracted JSON value.
pub type Features = serde_json::Map<String, JsonValue>;

/// A single declarative extraction rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub temp: bool,
    #[serde(default)]
    pub omitempty: bool,
    #[serde(default)]
    pub default: Option<JsonValue>,
    #[serde(default)]
    pub default_ref: Option<String>,
}

/// Result of a path lookup against event JSON: distinguishes "the path
/// resolved to a literal JSON null" from "the path does not exist".
enum Lookup {
    Found(JsonValue),
    Missing,
}

/// Evaluate a dotted path (with optional `[*]` wildcard list segments and a
/// leading `!` strictness marker) against `root`.
fn lookup_path(root: &JsonValue, path: &str) -> ViewResult<Lookup> {
    let (strict, path) = match path.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, path),
    };
    let result = lookup_segments(root, path.split('.'))?;
    if strict {
        if matches!(result, Lookup::Missing) {
            return Err(ViewError::InvalidPath(path.to_string()));
        }
    }
    Ok(result)
}

fn lookup_segments<'a>(
    current: &JsonValue,
    mut segments: impl Iterator<Item = &'a str> + Clone,
) -> ViewResult<Lookup> {
    let segment = match segments.next() {
        None => return Ok(Lookup::Found(current.clone())),
        Some(s) => s,
    };

    let (field, wildcard) = match segment.strip_suffix("[*]") {
        Some(field) => (field, true),
        None => (segment, false),
    };

    let next = match current {
        JsonValue::Object(map) => match map.get(field) {
            Some(v) => v,
            None => return Ok(Lookup::Missing),
        },
        _ => return Ok(Lookup::Missing),
    };

    if !wildcard {
        return lookup_segments(next, segments);
    }

    let elements = match next {
        JsonValue::Array(a) => a,
        _ => return Ok(Lookup::Missing),
    };

    let mut collected = Vec::with_capacity(elements.len());
    for element in elements {
        if let Lookup::Found(v) = lookup_segments(element, segments.clone())? {
            collected.push(v);
        }
    }
    Ok(Lookup::Found(JsonValue::Array(collected)))
}

/// `nil`, `""`, and `[]` are "empty" for `Omitempty` purposes. Objects are
/// never considered empty regardless of key count, matching the Go source's
/// `isEmpty`, which only special-cases nil/string/slice.
fn is_empty(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::String(s) => s.is_empty(),
        JsonValue::Array(a) => a.is_empty(),
        _ => false,
    }
}

fn resolve_default_ref(name: &str) -> ViewResult<JsonValue> {
    match name {
        "time.epoch_millis" => Ok(JsonValue::from(Utc::now().timestamp_millis())),
        "time.epoch_second" => Ok(JsonValue::from(Utc::now().timestamp())),
        other => {
            tracing::warn!(default_ref = other, "unknown default_ref generator");
            Ok(JsonValue::Null)
        }
    }
}

fn resolve_default(feature: &Feature) -> ViewResult<JsonValue> {
    if let Some(literal) = &feature.default {
        return Ok(literal.clone());
    }
    if let Some(name) = &feature.default_ref {
        return resolve_default_ref(name);
    }
    Ok(JsonValue::Null)
}

/// Extract `(temp, permanent)` feature maps from raw event bytes.
pub fn extract(features: &[Feature], event_bytes: &[u8]) -> ViewResult<(Features, Features)> {
    let event: JsonValue = serde_json::from_slice(event_bytes)?;
    extract_from_value(features, &event)
}

/// As [`extract`], but against an already-parsed JSON value — used by the
/// Init Cascade to extract from a pre-existing target's `Features` rather
/// than from raw event bytes.
pub fn extract_from_value(features: &[Feature], event: &JsonValue) -> ViewResult<(Features, Features)> {
    let mut temp = Features::new();
    let mut permanent = Features::new();

    for feature in features {
        let value = if feature.path.is_empty() {
            resolve_default(feature)?
        } else {
            match lookup_path(event, &feature.path)? {
                Lookup::Found(v) => v,
                Lookup::Missing => resolve_default(feature)?,
            }
        };

        if feature.omitempty && is_empty(&value) {
            continue;
        }

        temp.insert(feature.name.clone(), value.clone());
        if !feature.temp {
            permanent.insert(feature.name.clone(), value);
        }
    }

    Ok((temp, permanent))
}

/// Dotted lookup into a feature map. Unlike [`lookup_path`], this walks only
/// nested objects — no wildcard segments, no array indexing — matching
/// `original_source/lib/query.go`'s feature-map `Get`.
pub fn get(features: &Features, path: &str) -> Option<JsonValue> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = features.get(first)?.clone();
    for segment in segments {
        match current {
            JsonValue::Object(ref map) => {
                current = map.get(segment)?.clone();
            }
            _ => return None,
        }
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn f(name: &str, path: &str) -> Feature {
        Feature {
            name: name.to_string(),
            path: path.to_string(),
            temp: false,
            omitempty: false,
            default: None,
            default_ref: None,
        }
    }

    #[test]
    fn simple_dotted_path() {
        let event = br#"{"a":{"b":42}}"#;
        let features = vec![f("x", "a.b")];
        let (temp, perm) = extract(&features, event).unwrap();
        assert_eq!(temp.get("x"), Some(&json!(42)));
        assert_eq!(perm.get("x"), Some(&json!(42)));
    }

    #[test]
    fn missing_key_falls_back_to_default() {
        let event = br#"{"a":1}"#;
        let mut feature = f("x", "missing.path");
        feature.default = Some(json!("fallback"));
        let (temp, _) = extract(&[feature], event).unwrap();
        assert_eq!(temp.get("x"), Some(&json!("fallback")));
    }

    #[test]
    fn literal_null_is_not_missing() {
        let event = br#"{"a":null}"#;
        let mut feature = f("x", "a");
        feature.default = Some(json!("should not be used"));
        let (temp, _) = extract(&[feature], event).unwrap();
        assert_eq!(temp.get("x"), Some(&json!(null)));
    }

    #[test]
    fn temp_flag_excludes_from_permanent() {
        let event = br#"{"a":1}"#;
        let mut feature = f("x", "a");
        feature.temp = true;
        let (temp, perm) = extract(&[feature], event).unwrap();
        assert!(temp.contains_key("x"));
        assert!(!perm.contains_key("x"));
    }

    #[test]
    fn omitempty_suppresses_empty_value() {
        let event = br#"{"a":""}"#;
        let mut feature = f("x", "a");
        feature.omitempty = true;
        let (temp, perm) = extract(&[feature], event).unwrap();
        assert!(!temp.contains_key("x"));
        assert!(!perm.contains_key("x"));
    }

    #[test]
    fn wildcard_list_traversal_collects_child_values() {
        let event = br#"{"list":[{"child":1},{"child":2},{"other":3}]}"#;
        let features = vec![f("xs", "list[*].child")];
        let (temp, _) = extract(&features, event).unwrap();
        assert_eq!(temp.get("xs"), Some(&json!([1, 2])));
    }

    #[test]
    fn strict_path_errors_on_missing_key() {
        let event = br#"{"a":1}"#;
        let feature = f("x", "!missing");
        let err = extract(&[feature], event).unwrap_err();
        assert!(matches!(err, ViewError::InvalidPath(_)));
    }

    #[test]
    fn booleans_and_numbers_preserve_type() {
        let event = br#"{"flag":true,"n":3.5}"#;
        let features = vec![f("flag", "flag"), f("n", "n")];
        let (temp, _) = extract(&features, event).unwrap();
        assert_eq!(temp.get("flag"), Some(&json!(true)));
        assert_eq!(temp.get("n"), Some(&json!(3.5)));
    }

    #[test]
    fn malformed_event_json_surfaces_error() {
        let err = extract(&[], b"not json").unwrap_err();
        assert!(matches!(err, ViewError::Serialization(_)));
    }

    #[test]
    fn feature_get_walks_nested_objects_only() {
        let mut features = Features::new();
        features.insert("a".to_string(), json!({"b": {"c": 7}}));
        assert_eq!(get(&features, "a.b.c"), Some(json!(7)));
        assert_eq!(get(&features, "a.missing"), None);
    }

    #[test]
    fn feature_get_does_not_index_arrays() {
        let mut features = Features::new();
        features.insert("a".to_string(), json!([1, 2, 3]));
        assert_eq!(get(&features, "a.0"), None);
    }

    proptest::proptest! {
        #[test]
        fn permanent_is_subset_of_temp_keys(temp_flag in proptest::bool::ANY) {
            let event = br#"{"a":1}"#;
            let mut feature = f("x", "a");
            feature.temp = temp_flag;
            let (temp, perm) = extract(&[feature], event).unwrap();
            for key in perm.keys() {
                proptest::prop_assert!(temp.contains_key(key));
            }
        }
    }
}
