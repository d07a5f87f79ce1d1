//! The Where Compiler: translates a declarative filter tree over event
//! features into a [`StoreFilter`], used by child-type groups to locate the
//! target documents an event should mutate.
//!
//! Grounded in `original_source/lib/where.go`.

use crate::error::{ViewError, ViewResult};
use crate::feature::{get, Features};
use crate::store::StoreFilter;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum WhereOperation {
    Eq,
    Ne,
    AnyTargetInEvent,
    AnyTargetInValue,
    Unknown(String),
}

impl<'de> Deserialize<'de> for WhereOperation {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "==" => WhereOperation::Eq,
            "!=" => WhereOperation::Ne,
            "any_target_in_event" => WhereOperation::AnyTargetInEvent,
            "any_target_in_value" => WhereOperation::AnyTargetInValue,
            _ => WhereOperation::Unknown(raw),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhereCondition {
    pub target_feature: String,
    pub operation: WhereOperation,
    #[serde(default)]
    pub event_feature: Option<String>,
    #[serde(default)]
    pub value: Option<JsonValue>,
}

pub type WhereConditions = Vec<WhereCondition>;

fn resolved_value(condition: &WhereCondition, features: &Features) -> Option<JsonValue> {
    match &condition.event_feature {
        Some(name) => get(features, name),
        None => condition.value.clone(),
    }
}

fn compile_one(condition: &WhereCondition, features: &Features) -> ViewResult<StoreFilter> {
    match &condition.operation {
        WhereOperation::Eq => match resolved_value(condition, features) {
            Some(v) => Ok(StoreFilter::term(condition.target_feature.clone(), v)),
            None => Ok(StoreFilter::must_not(StoreFilter::exists(condition.target_feature.clone()))),
        },
        WhereOperation::Ne => match resolved_value(condition, features) {
            Some(v) => Ok(StoreFilter::must_not(StoreFilter::term(condition.target_feature.clone(), v))),
            None => Ok(StoreFilter::exists(condition.target_feature.clone())),
        },
        WhereOperation::AnyTargetInEvent => {
            let list = condition
                .event_feature
                .as_ref()
                .and_then(|name| get(features, name));
            match list {
                Some(JsonValue::Array(values)) if !values.is_empty() => {
                    Ok(StoreFilter::terms(condition.target_feature.clone(), values))
                }
                _ => Ok(StoreFilter::MatchNone),
            }
        }
        WhereOperation::AnyTargetInValue => match &condition.value {
            Some(JsonValue::Array(values)) if !values.is_empty() => {
                Ok(StoreFilter::terms(condition.target_feature.clone(), values.clone()))
            }
            _ => Ok(StoreFilter::MatchNone),
        },
        WhereOperation::Unknown(op) => Err(ViewError::UnknownWhereOperation(op.clone())),
    }
}

/// Compile an AND of conditions; an empty list is match-all.
pub fn compile(conditions: &WhereConditions, features: &Features) -> ViewResult<StoreFilter> {
    if conditions.is_empty() {
        return Ok(StoreFilter::MatchAll);
    }
    let compiled: ViewResult<Vec<StoreFilter>> = conditions.iter().map(|c| compile_one(c, features)).collect();
    Ok(StoreFilter::and_all(compiled?))
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
    fn empty_conditions_compile_to_match_all() {
        assert_eq!(compile(&vec![], &Features::new()).unwrap(), StoreFilter::MatchAll);
    }

    #[test]
    fn eq_against_literal_value() {
        let c = WhereCondition {
            target_feature: "owner".into(),
            operation: WhereOperation::Eq,
            event_feature: None,
            value: Some(json!("u1")),
        };
        let compiled = compile(&vec![c], &Features::new()).unwrap();
        assert_eq!(compiled, StoreFilter::and_all(vec![StoreFilter::term("owner", json!("u1"))]));
    }

    #[test]
    fn eq_against_missing_event_feature_compiles_to_field_missing() {
        let c = WhereCondition {
            target_feature: "owner".into(),
            operation: WhereOperation::Eq,
            event_feature: Some("missing".into()),
            value: None,
        };
        let compiled = compile(&vec![c], &Features::new()).unwrap();
        assert_eq!(
            compiled,
            StoreFilter::and_all(vec![StoreFilter::must_not(StoreFilter::exists("owner"))])
        );
    }

    #[test]
    fn any_target_in_event_with_empty_list_is_match_none() {
        let f = features(&[("ids", json!([]))]);
        let c = WhereCondition {
            target_feature: "id".into(),
            operation: WhereOperation::AnyTargetInEvent,
            event_feature: Some("ids".into()),
            value: None,
        };
        assert_eq!(compile(&vec![c], &f).unwrap(), StoreFilter::and_all(vec![StoreFilter::MatchNone]));
    }

    #[test]
    fn any_target_in_event_with_nonempty_list() {
        let f = features(&[("ids", json!(["a", "b"]))]);
        let c = WhereCondition {
            target_feature: "id".into(),
            operation: WhereOperation::AnyTargetInEvent,
            event_feature: Some("ids".into()),
            value: None,
        };
        let compiled = compile(&vec![c], &f).unwrap();
        assert_eq!(
            compiled,
            StoreFilter::and_all(vec![StoreFilter::terms("id", vec![json!("a"), json!("b")])])
        );
    }

    #[test]
    fn unknown_operation_errors() {
        let c = WhereCondition {
            target_feature: "x".into(),
            operation: WhereOperation::Unknown("bogus".into()),
            event_feature: None,
            value: None,
        };
        let err = compile(&vec![c], &Features::new()).unwrap_err();
        assert!(matches!(err, ViewError::UnknownWhereOperation(_)));
    }
}
