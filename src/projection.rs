//! Projection: whitelist feature keys for an HTTP response.
//!
//! Grounded in `original_source/lib/target.go`'s `Projection.Use` and its
//! documented edge cases in `projection_test.go`.

use crate::feature::Features;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Projection(pub Vec<String>);

/// `use(projection, document) -> mapping`: keeps only the whitelisted keys,
/// or every key when the list is `["*"]`.
pub fn apply(projection: &Projection, document: &Features) -> Features {
    let mut result = Features::new();
    for key in &projection.0 {
        if key == "*" {
            for (k, v) in document.iter() {
                result.insert(k.clone(), v.clone());
            }
        } else {
            result.insert(key.clone(), document.get(key).cloned().unwrap_or(JsonValue::Null));
        }
    }
    result
}
