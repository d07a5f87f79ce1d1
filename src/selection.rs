//! The Selection Compiler: translates a declarative query tree — referencing
//! caller identity and request query parameters via `Ref` — into a
//! [`StoreFilter`] used by the Query Surface to restrict which documents a
//! caller sees.
//!
//! Grounded in `original_source/lib/selection.go`.

use crate::auth::CallerIdentity;
use crate::error::{ViewError, ViewResult};
use crate::store::StoreFilter;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SelectionOperation {
    Eq,
    Ne,
    AnyValueInFeature,
    Unknown(String),
}

impl<'de> Deserialize<'de> for SelectionOperation {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "==" => SelectionOperation::Eq,
            "!=" => SelectionOperation::Ne,
            "any_value_in_feature" => SelectionOperation::AnyValueInFeature,
            _ => SelectionOperation::Unknown(raw),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionConfig {
    pub feature: String,
    pub operation: SelectionOperation,
    #[serde(default)]
    pub value: Option<JsonValue>,
    #[serde(default)]
    pub r#ref: Option<String>,
}

/// A selection tree: `{"all": true}`, `{"and": [...]}`, `{"or": [...]}`, or
/// `{"condition": {...}}`, matching the nested-under-`condition` wire shape
/// in `original_source/lib/selection.go`'s `SelectionConfig`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Selection {
    All { all: bool },
    And { and: Vec<Selection> },
    Or { or: Vec<Selection> },
    Condition { condition: ConditionConfig },
}

/// Resolve a `Ref` against caller identity or request query parameters.
fn resolve_ref(name: &str, caller: &CallerIdentity, params: &HashMap<String, String>) -> JsonValue {
    match name {
        "jwt.user" => JsonValue::String(caller.user_id.clone()),
        "jwt.groups" => JsonValue::Array(caller.roles.iter().cloned().map(JsonValue::String).collect()),
        other => params
            .get(other)
            .map(|v| JsonValue::String(v.clone()))
            .unwrap_or_else(|| JsonValue::String(String::new())),
    }
}

fn resolve_value(
    condition: &ConditionConfig,
    caller: &CallerIdentity,
    params: &HashMap<String, String>,
) -> Option<JsonValue> {
    if let Some(v) = &condition.value {
        if !matches!(v, JsonValue::Null) && v != &JsonValue::String(String::new()) {
            return Some(v.clone());
        }
    }
    condition.r#ref.as_ref().map(|r| resolve_ref(r, caller, params))
}

fn compile_condition(
    condition: &ConditionConfig,
    caller: &CallerIdentity,
    params: &HashMap<String, String>,
) -> ViewResult<StoreFilter> {
    let resolved = resolve_value(condition, caller, params);
    let is_empty = matches!(&resolved, None | Some(JsonValue::Null))
        || matches!(&resolved, Some(JsonValue::String(s)) if s.is_empty());

    match &condition.operation {
        SelectionOperation::Eq => {
            if is_empty {
                Ok(StoreFilter::must_not(StoreFilter::exists(condition.feature.clone())))
            } else {
                Ok(StoreFilter::term(condition.feature.clone(), resolved.unwrap()))
            }
        }
        SelectionOperation::Ne => {
            if is_empty {
                Ok(StoreFilter::exists(condition.feature.clone()))
            } else {
                Ok(StoreFilter::must_not(StoreFilter::term(condition.feature.clone(), resolved.unwrap())))
            }
        }
        SelectionOperation::AnyValueInFeature => match resolved {
            Some(JsonValue::String(s)) => {
                let values: Vec<JsonValue> = s.split(',').map(|v| JsonValue::String(v.to_string())).collect();
                Ok(StoreFilter::terms(condition.feature.clone(), values))
            }
            Some(JsonValue::Array(values)) => Ok(StoreFilter::terms(condition.feature.clone(), values)),
            _ => Err(ViewError::UnknownSelectionOperation(
                "any_value_in_feature requires a comma-separated string or list value".to_string(),
            )),
        },
        SelectionOperation::Unknown(op) => Err(ViewError::UnknownSelectionOperation(op.clone())),
    }
}

/// Compile a selection tree against the current caller and request params.
pub fn compile(
    selection: &Selection,
    caller: &CallerIdentity,
    params: &HashMap<String, String>,
) -> ViewResult<StoreFilter> {
    match selection {
        Selection::All { .. } => Ok(StoreFilter::MatchAll),
        Selection::And { and } => {
            let compiled: ViewResult<Vec<StoreFilter>> =
                and.iter().map(|s| compile(s, caller, params)).collect();
            Ok(StoreFilter::and_all(compiled?))
        }
        Selection::Or { or } => {
            let compiled: ViewResult<Vec<StoreFilter>> =
                or.iter().map(|s| compile(s, caller, params)).collect();
            Ok(StoreFilter::or_any(compiled?))
        }
        Selection::Condition { condition } => compile_condition(condition, caller, params),
    }
}
