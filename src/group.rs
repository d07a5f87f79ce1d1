//! The Group Dispatcher: routes a delivered event to every configured
//! `EventActionGroup` for its topic and orchestrates extraction, predicate,
//! action application, the init cascade, and persistence.
//!
//! Grounded in `original_source/lib/group.go` (`handleRootMessage`,
//! `handleChildMessage`) and `event.go`.

use crate::action::{self, Actions};
use crate::error::ViewResult;
use crate::feature::{self, Features};
use crate::init_cascade::{self, InitActionGroup};
use crate::predicate::{self, IfConditions};
use crate::store::DocumentStore;
use crate::target::Target;
use crate::where_compiler::{self, WhereConditions};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupType {
    Root,
    Child,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventActionGroup {
    #[serde(rename = "type")]
    pub group_type: GroupType,
    pub target: String,
    #[serde(default)]
    pub id_feature: String,
    #[serde(default, rename = "where")]
    pub where_: WhereConditions,
    #[serde(default, rename = "if")]
    pub if_: IfConditions,
    pub features: Vec<feature::Feature>,
    pub actions: Actions,
    #[serde(default)]
    pub init: Vec<InitActionGroup>,
}

/// Routes events through their configured groups against a single
/// `DocumentStore`.
pub struct GroupDispatcher<S: DocumentStore> {
    store: Arc<S>,
}

impl<S: DocumentStore> GroupDispatcher<S> {
    pub fn new(store: Arc<S>) -> Self {
        GroupDispatcher { store }
    }

    pub async fn dispatch(&self, group: &EventActionGroup, payload: &[u8]) -> ViewResult<()> {
        let (temp, perm) = feature::extract(&group.features, payload)?;
        if !predicate::check(&group.if_, &temp) {
            return Ok(());
        }

        match group.group_type {
            GroupType::Root => self.handle_root(group, &temp, &perm).await,
            GroupType::Child => self.handle_child(group, &temp, &perm).await,
        }
    }

    async fn handle_root(&self, group: &EventActionGroup, temp: &Features, perm: &Features) -> ViewResult<()> {
        let id = if group.id_feature.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            match feature::get(temp, &group.id_feature) {
                Some(serde_json::Value::String(s)) => s,
                _ => {
                    tracing::warn!(target = %group.target, feature = %group.id_feature, "invalid event: id feature missing or not a string");
                    return Ok(());
                }
            }
        };

        let existing = self.store.locate_by_id(&group.target, &id).await?;
        let base = existing.unwrap_or_else(|| Target::new_root(&group.target, &id));
        let was_new = base.new;

        let (mut target, res) = action::apply(&group.actions, base, temp, perm);
        res?;

        if was_new && target.changed {
            target = init_cascade::run(&group.init, target, temp, self.store.as_ref()).await?;
        }

        self.persist(target).await
    }

    async fn handle_child(&self, group: &EventActionGroup, temp: &Features, perm: &Features) -> ViewResult<()> {
        let filter = where_compiler::compile(&group.where_, temp)?;
        let children = self.store.locate_by_filter(&group.target, &filter, None).await?;

        for child in children {
            let (target, res) = action::apply(&group.actions, child, temp, perm);
            res?;
            self.persist(target).await?;
        }
        Ok(())
    }

    async fn persist(&self, target: Target) -> ViewResult<()> {
        if target.removed {
            self.store.remove(&target).await
        } else if target.changed {
            self.store.save(&target).await.map(|_| ())
        } else {
            Ok(())
        }
    }
}
