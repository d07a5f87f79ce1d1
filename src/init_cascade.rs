//! The Init Cascade: back-populates a newly created root target from
//! pre-existing documents in other indices (or synthesized defaults) the
//! moment it is first materialized.
//!
//! Grounded in `original_source/lib/initdefault.go` and `group.go`'s
//! `handleRootMessage`.

use crate::action::{self, Actions};
use crate::error::ViewResult;
use crate::feature::{self, Features};
use crate::store::DocumentStore;
use crate::target::{Sorting, Target};
use crate::where_compiler::{self, WhereConditions};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// One entry of `Default`: resolves to a literal value, or to the current
/// event's temp feature named by `feature`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InitDefaultValue {
    Feature { feature: String },
    Value { value: JsonValue },
}

/// A synthetic child document's `Features`, as a map of key to resolved
/// default value.
pub type InitDefaultElement = HashMap<String, InitDefaultValue>;
pub type InitDefault = Vec<InitDefaultElement>;

fn resolve_default_element(element: &InitDefaultElement, event_temp: &Features) -> Features {
    let mut features = Features::new();
    for (key, value) in element {
        let resolved = match value {
            InitDefaultValue::Value { value } => value.clone(),
            InitDefaultValue::Feature { feature } => {
                feature::get(event_temp, feature).unwrap_or(JsonValue::Null)
            }
        };
        features.insert(key.clone(), resolved);
    }
    features
}

/// Materialize the synthetic children used when `Where` yields no existing
/// documents.
fn use_defaults(defaults: &InitDefault, event_temp: &Features) -> Vec<Target> {
    defaults
        .iter()
        .map(|element| Target::synthetic(resolve_default_element(element, event_temp)))
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitActionGroup {
    pub target: String,
    #[serde(default, rename = "where")]
    pub where_: WhereConditions,
    #[serde(default)]
    pub sorting: Sorting,
    #[serde(default)]
    pub default: InitDefault,
    #[serde(default)]
    pub transform: Vec<feature::Feature>,
    pub actions: Actions,
}

/// Run every configured `InitActionGroup` against `target`, in declared
/// order, returning the cascaded target.
pub async fn run(
    groups: &[InitActionGroup],
    mut target: Target,
    event_temp: &Features,
    store: &dyn DocumentStore,
) -> ViewResult<Target> {
    for group in groups {
        let filter = where_compiler::compile(&group.where_, event_temp)?;
        let sorting = if group.sorting.by.is_empty() { None } else { Some(&group.sorting) };
        let mut children = store.locate_by_filter(&group.target, &filter, sorting).await?;
        if children.is_empty() {
            children = use_defaults(&group.default, event_temp);
        }

        for child in children {
            let child_json = JsonValue::Object(child.features);
            let (child_temp, child_perm) = feature::extract_from_value(&group.transform, &child_json)?;
            let (t, res) = action::apply(&group.actions, target, &child_temp, &child_perm);
            target = t;
            res?;
        }
    }
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Action, ActionType, Scale};
    use crate::store::InMemoryStore;
    use serde_json::json;

    fn features(pairs: &[(&str, JsonValue)]) -> Features {
        let mut f = Features::new();
        for (k, v) in pairs {
            f.insert(k.to_string(), v.clone());
        }
        f
    }

    #[tokio::test]
    async fn falls_back_to_defaults_when_where_yields_no_children() {
        let store = InMemoryStore::new();
        let group = InitActionGroup {
            target: "permission".to_string(),
            where_: vec![],
            sorting: Sorting::default(),
            default: vec![{
                let mut element = InitDefaultElement::new();
                element.insert("user".to_string(), InitDefaultValue::Feature { feature: "owner".to_string() });
                element
            }],
            transform: vec![feature::Feature {
                name: "user".to_string(),
                path: "user".to_string(),
                temp: false,
                omitempty: false,
                default: None,
                default_ref: None,
            }],
            actions: vec![Action {
                action_type: ActionType::Insert,
                fields: vec!["read".to_string()],
                scale: Scale::Many,
                if_: vec![],
            }],
        };

        let event_temp = features(&[("owner", json!("u1"))]);
        let target = Target::new_root("deviceinstance", "r1");
        let result = run(&[group], target, &event_temp, &store).await.unwrap();
        assert_eq!(result.features.get("read"), Some(&json!([{"user": "u1"}])));
    }

    #[tokio::test]
    async fn root_and_init_cascade_scenario() {
        // first half: the deviceinstance creation. The later-arriving
        // permission delivery is covered in the crate's integration tests.
        let store = InMemoryStore::new();
        let mut permission_doc = Target::new_root("permission", "p1");
        permission_doc.features = features(&[
            ("user", json!("u1")),
            ("right", json!("rw")),
            ("kind", json!("K")),
            ("resource", json!("r1")),
        ]);
        store.save(&permission_doc).await.unwrap();

        let group = InitActionGroup {
            target: "permission".to_string(),
            where_: vec![crate::where_compiler::WhereCondition {
                target_feature: "resource".to_string(),
                operation: crate::where_compiler::WhereOperation::Eq,
                event_feature: Some("id".to_string()),
                value: None,
            }],
            sorting: Sorting::default(),
            default: vec![],
            transform: vec![
                feature::Feature { name: "user".into(), path: "user".into(), temp: false, omitempty: false, default: None, default_ref: None },
                feature::Feature { name: "right".into(), path: "right".into(), temp: true, omitempty: false, default: None, default_ref: None },
            ],
            actions: vec![
                Action {
                    action_type: ActionType::Insert,
                    fields: vec!["read".to_string()],
                    scale: Scale::Many,
                    if_: vec![crate::predicate::IfCondition {
                        feature: "right".into(),
                        operation: crate::predicate::IfOperation::FeatureStrContainsValue,
                        value: json!("r"),
                    }],
                },
                Action {
                    action_type: ActionType::Insert,
                    fields: vec!["write".to_string()],
                    scale: Scale::Many,
                    if_: vec![crate::predicate::IfCondition {
                        feature: "right".into(),
                        operation: crate::predicate::IfOperation::FeatureStrContainsValue,
                        value: json!("w"),
                    }],
                },
            ],
        };

        let event_temp = features(&[("id", json!("r1")), ("name", json!("n")), ("owner", json!("u1"))]);
        let target = Target::new_root("deviceinstance", "r1");
        let result = run(&[group], target, &event_temp, &store).await.unwrap();
        assert_eq!(result.features.get("read"), Some(&json!([{"user": "u1"}])));
        assert_eq!(result.features.get("write"), Some(&json!([{"user": "u1"}])));
    }
}
