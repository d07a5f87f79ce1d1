//! The `If` predicate engine: an ordered list of atomic comparisons,
//! interpreted as logical AND, evaluated against a feature map.
//!
//! Grounded in `original_source/lib/if.go`.

use crate::feature::{get, Features};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Closed enumeration of `If` comparison operations, with an explicit
/// `Unknown` arm so a bad configuration value is representable instead of
/// failing deserialization outright.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum IfOperation {
    Eq,
    Ne,
    FeatureStrContainsValue,
    Unknown(String),
}

impl<'de> Deserialize<'de> for IfOperation {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "==" => IfOperation::Eq,
            "!=" => IfOperation::Ne,
            "feature_str_contains_value" => IfOperation::FeatureStrContainsValue,
            _ => IfOperation::Unknown(raw),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IfCondition {
    pub feature: String,
    pub operation: IfOperation,
    pub value: JsonValue,
}

pub type IfConditions = Vec<IfCondition>;

/// Evaluate a single condition against `features`.
fn matches(condition: &IfCondition, features: &Features) -> bool {
    let feature_value = get(features, &condition.feature);

    match &condition.operation {
        IfOperation::Eq => feature_value.unwrap_or(JsonValue::Null) == condition.value,
        IfOperation::Ne => feature_value.unwrap_or(JsonValue::Null) != condition.value,
        IfOperation::FeatureStrContainsValue => {
            match (feature_value, &condition.value) {
                (Some(JsonValue::String(haystack)), JsonValue::String(needle)) => {
                    haystack.contains(needle.as_str())
                }
                _ => false,
            }
        }
        IfOperation::Unknown(op) => {
            tracing::warn!(operation = op.as_str(), "unknown if-operation");
            false
        }
    }
}

/// AND of all conditions; an empty list is vacuously true.
pub fn check(conditions: &IfConditions, features: &Features) -> bool {
    conditions.iter().all(|c| matches(c, features))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn features(pairs: &[(&str, JsonValue)]) -> Features {
        let mut f = Features::new();
        for (k, v) in pairs {
            f.insert(k.to_string(), v.clone());
        }
        f
    }

    #[test]
    fn eq_holds_when_values_match() {
        let f = features(&[("condition", json!("ok"))]);
        let c = IfCondition {
            feature: "condition".into(),
            operation: IfOperation::Eq,
            value: json!("ok"),
        };
        assert!(check(&vec![c], &f));
    }

    #[test]
    fn eq_against_missing_feature_compares_to_null() {
        let f = features(&[]);
        let c = IfCondition {
            feature: "missing".into(),
            operation: IfOperation::Eq,
            value: JsonValue::Null,
        };
        assert!(check(&vec![c], &f));
    }

    #[test]
    fn ne_is_negation_of_eq() {
        let f = features(&[("condition", json!("not-ok"))]);
        let c = IfCondition {
            feature: "condition".into(),
            operation: IfOperation::Ne,
            value: json!("ok"),
        };
        assert!(check(&vec![c], &f));
    }

    #[test]
    fn str_contains_requires_both_sides_strings() {
        let f = features(&[("name", json!("hello world"))]);
        let c = IfCondition {
            feature: "name".into(),
            operation: IfOperation::FeatureStrContainsValue,
            value: json!("world"),
        };
        assert!(check(&vec![c], &f));

        let c2 = IfCondition {
            feature: "name".into(),
            operation: IfOperation::FeatureStrContainsValue,
            value: json!(42),
        };
        assert!(!check(&vec![c2], &f));
    }

    #[test]
    fn unknown_operation_yields_false() {
        let f = features(&[("x", json!(1))]);
        let c = IfCondition {
            feature: "x".into(),
            operation: IfOperation::Unknown("bogus".into()),
            value: json!(1),
        };
        assert!(!check(&vec![c], &f));
    }

    #[test]
    fn empty_conditions_is_vacuously_true() {
        assert!(check(&vec![], &features(&[])));
    }

    #[test]
    fn unknown_operation_deserializes_from_unrecognized_string() {
        let c: IfCondition =
            serde_json::from_str(r#"{"feature":"x","operation":"bogus","value":1}"#).unwrap();
        assert_eq!(c.operation, IfOperation::Unknown("bogus".into()));
    }
}
