//! The materialized document: `Target`, plus `Sorting` for the store
//! adapter's ordered reads.
//!
//! Grounded in `original_source/lib/target.go`.

use crate::feature::Features;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub id: String,
    pub features: Features,
    pub version: Option<i64>,
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub changed: bool,
    #[serde(default)]
    pub removed: bool,
}

impl Target {
    /// A target read back from the store: carries its assigned version.
    pub fn existing(name: impl Into<String>, id: impl Into<String>, version: i64, features: Features) -> Self {
        Target {
            name: name.into(),
            id: id.into(),
            features,
            version: Some(version),
            new: false,
            changed: false,
            removed: false,
        }
    }

    /// A target materialized for the first time. `Changed` starts `true`:
    /// the target's existence is itself a change worth persisting, even if
    /// no configured action subsequently matches (grounded in
    /// `original_source/lib/target.go`'s `GetTargetById`, which constructs
    /// new targets with `Changed: true` up front).
    pub fn new_root(name: impl Into<String>, id: impl Into<String>) -> Self {
        Target {
            name: name.into(),
            id: id.into(),
            features: Features::new(),
            version: None,
            new: true,
            changed: true,
            removed: false,
        }
    }

    /// A synthetic target (e.g. init-cascade default, or a child built from
    /// an already-materialized document) that is not itself tracked for
    /// persistence — used as the mutation subject only while applying
    /// actions during the init cascade.
    pub fn synthetic(features: Features) -> Self {
        Target {
            name: String::new(),
            id: String::new(),
            features,
            version: None,
            new: false,
            changed: false,
            removed: false,
        }
    }
}

/// Ordering and pagination used by `locate_by_filter` when configured with
/// an `InitActionGroup.Sorting` or a query-surface `sort` variant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sorting {
    #[serde(default)]
    pub by: String,
    #[serde(default)]
    pub asc: bool,
    #[serde(default)]
    pub limit: Option<usize>,
}
