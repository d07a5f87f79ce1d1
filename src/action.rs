//! The Action Engine: an ordered list of typed mutations applied to a
//! target's feature map.
//!
//! Grounded in `original_source/lib/action.go` (`ActionList.Do`,
//! `setField`, `removeField`, `addToList`, `removeFromList`).

use crate::error::{ViewError, ViewResult};
use crate::feature::Features;
use crate::predicate::{check, IfConditions};
use crate::target::Target;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ActionType {
    Insert,
    Remove,
    RemoveTarget,
    Unknown(String),
}

impl<'de> Deserialize<'de> for ActionType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "insert" => ActionType::Insert,
            "remove" => ActionType::Remove,
            "remove_target" => ActionType::RemoveTarget,
            _ => ActionType::Unknown(raw),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Scale {
    One,
    Many,
    Unknown(String),
}

impl<'de> Deserialize<'de> for Scale {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "one" => Scale::One,
            "many" => Scale::Many,
            _ => Scale::Unknown(raw),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    #[serde(default)]
    pub fields: Vec<String>,
    pub scale: Scale,
    #[serde(default, rename = "if")]
    pub if_: IfConditions,
}

pub type Actions = Vec<Action>;

fn set_field(mut target: Target, field: &str, permanent: &Features) -> Target {
    if field.is_empty() {
        for (k, v) in permanent.iter() {
            target.features.insert(k.clone(), v.clone());
        }
    } else {
        target
            .features
            .insert(field.to_string(), JsonValue::Object(permanent.clone()));
    }
    target
}

fn remove_field(mut target: Target, field: &str, permanent: &Features) -> Target {
    if field.is_empty() {
        for k in permanent.keys() {
            target.features.remove(k);
        }
    } else {
        target.features.remove(field);
    }
    target
}

fn add_to_list(mut target: Target, field: &str, permanent: &Features) -> Target {
    let element = JsonValue::Object(permanent.clone());
    match target.features.get_mut(field) {
        Some(JsonValue::Array(list)) => list.push(element),
        _ => {
            target
                .features
                .insert(field.to_string(), JsonValue::Array(vec![element]));
        }
    }
    target
}

fn remove_from_list(mut target: Target, field: &str, permanent: &Features) -> Target {
    let element = JsonValue::Object(permanent.clone());
    match target.features.get_mut(field) {
        Some(JsonValue::Array(list)) => {
            list.retain(|v| v != &element);
        }
        _ => {
            target
                .features
                .insert(field.to_string(), JsonValue::Array(vec![]));
        }
    }
    target
}

fn apply_one(mut target: Target, action: &Action, permanent: &Features) -> ViewResult<Target> {
    match &action.action_type {
        ActionType::RemoveTarget => {
            target.removed = true;
            Ok(target)
        }
        ActionType::Insert => {
            for field in &action.fields {
                target = match action.scale {
                    Scale::One => set_field(target, field, permanent),
                    Scale::Many => add_to_list(target, field, permanent),
                    Scale::Unknown(ref s) => return Err(ViewError::UnknownScale(s.clone())),
                };
            }
            Ok(target)
        }
        ActionType::Remove => {
            for field in &action.fields {
                target = match action.scale {
                    Scale::One => remove_field(target, field, permanent),
                    Scale::Many => remove_from_list(target, field, permanent),
                    Scale::Unknown(ref s) => return Err(ViewError::UnknownScale(s.clone())),
                };
            }
            Ok(target)
        }
        ActionType::Unknown(s) => Err(ViewError::UnknownActionType(s.clone())),
    }
}

/// Apply an ordered action list to `target`. Returns the target as mutated
/// so far *and* a result: a failing action aborts the remaining actions but
/// earlier mutations are retained — a plain `Result<Target, Error>` can't
/// express "partial success with an error", so callers must inspect both
/// halves.
pub fn apply(actions: &Actions, mut target: Target, temp: &Features, permanent: &Features) -> (Target, ViewResult<()>) {
    for action in actions {
        if !check(&action.if_, temp) {
            continue;
        }
        target.changed = true;
        match apply_one(target, action, permanent) {
            Ok(t) => target = t,
            Err(e) => return (target, Err(e)),
        }
    }
    (target, Ok(()))
}
