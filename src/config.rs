//! Configuration loading: a single JSON document describing server
//! settings, bus/store coordinates, auth toggles, and the declarative rule
//! sets for events and queries.
//!
//! Grounded in `original_source/lib/api.go`'s top-level config struct.

use crate::error::{ViewError, ViewResult};
use crate::group::EventActionGroup;
use crate::query_surface::QueryConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server_port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub bus_url: Option<String>,
    #[serde(default)]
    pub zookeeper_url: Option<String>,
    #[serde(default = "default_consumer_group")]
    pub consumer_group: String,

    pub store_url: String,
    #[serde(default = "default_store_retry")]
    pub store_retry: u32,

    #[serde(default)]
    pub force_user: Option<String>,
    #[serde(default)]
    pub force_auth: bool,
    #[serde(default)]
    pub jwt_public_key: Option<String>,

    /// topic -> ordered list of groups
    #[serde(default)]
    pub events: HashMap<String, Vec<EventActionGroup>>,

    /// target -> endpoint -> {selection, projection}
    #[serde(default)]
    pub queries: QueryConfig,

    /// target -> property schema, used for index bootstrap
    #[serde(default)]
    pub elastic_mapping: HashMap<String, JsonValue>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_consumer_group() -> String {
    "reflux".to_string()
}

fn default_store_retry() -> u32 {
    5
}

impl Config {
    pub fn load(path: &Path) -> ViewResult<Config> {
        let raw = std::fs::read_to_string(path).map_err(|e| ViewError::Config(e.to_string()))?;
        serde_json::from_str(&raw).map_err(|e| ViewError::Config(e.to_string()))
    }
}
