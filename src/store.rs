//! The Target Store Adapter: `DocumentStore`, its backend-query type
//! `StoreFilter`, an in-memory test double, a real Elasticsearch-shaped
//! HTTP adapter, and the pure retry/backoff policy.
//!
//! Grounded in `original_source/lib/elastic.go` for index bootstrap and
//! query shapes, using `dashmap` for the in-memory store and `reqwest` for
//! the Elasticsearch-backed one.

use crate::error::{ViewError, ViewResult};
use crate::feature::Features;
use crate::target::{Sorting, Target};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use std::time::Duration;

/// A backend filter/query, shared by the Where Compiler (4.6) and the
/// Selection Compiler (4.7), so the Query Surface (4.9) can combine a
/// primary clause (term/match) with a compiled selection using the same
/// bool-query shape.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreFilter {
    MatchAll,
    MatchNone,
    Term { field: String, value: JsonValue },
    Terms { field: String, values: Vec<JsonValue> },
    Match { field: String, text: String },
    Exists { field: String },
    Bool {
        must: Vec<StoreFilter>,
        filter: Vec<StoreFilter>,
        should: Vec<StoreFilter>,
        must_not: Vec<StoreFilter>,
    },
}

impl StoreFilter {
    pub fn term(field: impl Into<String>, value: JsonValue) -> Self {
        StoreFilter::Term { field: field.into(), value }
    }

    pub fn terms(field: impl Into<String>, values: Vec<JsonValue>) -> Self {
        StoreFilter::Terms { field: field.into(), values }
    }

    pub fn exists(field: impl Into<String>) -> Self {
        StoreFilter::Exists { field: field.into() }
    }

    pub fn must_not(inner: StoreFilter) -> Self {
        StoreFilter::Bool {
            must: vec![],
            filter: vec![],
            should: vec![],
            must_not: vec![inner],
        }
    }

    /// Conjunction: every member must match (filter context, no scoring).
    pub fn and_all(members: Vec<StoreFilter>) -> Self {
        if members.is_empty() {
            return StoreFilter::MatchAll;
        }
        StoreFilter::Bool {
            must: vec![],
            filter: members,
            should: vec![],
            must_not: vec![],
        }
    }

    /// Disjunction: at least one member must match.
    pub fn or_any(members: Vec<StoreFilter>) -> Self {
        if members.is_empty() {
            return StoreFilter::MatchNone;
        }
        StoreFilter::Bool {
            must: vec![],
            filter: vec![],
            should: members,
            must_not: vec![],
        }
    }

    /// Combine a primary (must) clause with a filter-context clause, the
    /// pattern the Query Surface uses to add a selection filter on top of a
    /// search/term/terms clause.
    pub fn with_filter(self, filter: StoreFilter) -> Self {
        StoreFilter::Bool {
            must: vec![self],
            filter: vec![filter],
            should: vec![],
            must_not: vec![],
        }
    }

    /// Serialize to an Elasticsearch-shaped query DSL document.
    pub fn to_query_dsl(&self) -> JsonValue {
        match self {
            StoreFilter::MatchAll => json!({"match_all": {}}),
            StoreFilter::MatchNone => json!({"bool": {"must_not": [{"match_all": {}}]}}),
            StoreFilter::Term { field, value } => json!({"term": {field: value}}),
            StoreFilter::Terms { field, values } => json!({"terms": {field: values}}),
            StoreFilter::Match { field, text } => json!({"match": {field: text}}),
            StoreFilter::Exists { field } => json!({"exists": {"field": field}}),
            StoreFilter::Bool { must, filter, should, must_not } => json!({
                "bool": {
                    "must": must.iter().map(Self::to_query_dsl).collect::<Vec<_>>(),
                    "filter": filter.iter().map(Self::to_query_dsl).collect::<Vec<_>>(),
                    "should": should.iter().map(Self::to_query_dsl).collect::<Vec<_>>(),
                    "must_not": must_not.iter().map(Self::to_query_dsl).collect::<Vec<_>>(),
                }
            }),
        }
    }

    /// True on a synthetic literal document, without hitting a backend —
    /// used by the in-memory store, which evaluates filters directly rather
    /// than serializing them to a query DSL first.
    fn matches(&self, features: &Features) -> bool {
        match self {
            StoreFilter::MatchAll => true,
            StoreFilter::MatchNone => false,
            StoreFilter::Term { field, value } => {
                crate::feature::get(features, field).as_ref() == Some(value)
            }
            StoreFilter::Terms { field, values } => {
                match crate::feature::get(features, field) {
                    Some(v) => values.contains(&v),
                    None => false,
                }
            }
            StoreFilter::Match { field, text } => match crate::feature::get(features, field) {
                Some(JsonValue::String(s)) => s.contains(text.as_str()),
                _ => false,
            },
            StoreFilter::Exists { field } => crate::feature::get(features, field).is_some(),
            StoreFilter::Bool { must, filter, should, must_not } => {
                let must_ok = must.iter().all(|f| f.matches(features));
                let filter_ok = filter.iter().all(|f| f.matches(features));
                let should_ok = should.is_empty() || should.iter().any(|f| f.matches(features));
                let must_not_ok = must_not.iter().all(|f| !f.matches(features));
                must_ok && filter_ok && should_ok && must_not_ok
            }
        }
    }
}

/// A single search/locate result.
#[derive(Debug, Clone)]
pub struct Hit {
    pub id: String,
    pub version: i64,
    pub features: Features,
}

/// Request shape for the Query Surface's four operation families.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub query: Option<StoreFilter>,
    pub text_match: Option<(String, String)>,
    pub size: Option<usize>,
    pub from: Option<usize>,
    pub sort: Option<(String, bool)>,
}

#[derive(Debug, Clone, Default)]
pub struct SearchResponse {
    pub hits: Vec<Hit>,
    pub total: u64,
}

/// Everything the Group Dispatcher, Init Cascade, and Query Surface need
/// from a versioned document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// One-time index bootstrap: create `<index>_v1` aliased to `<index>`
    /// with the caller-supplied mapping plus the reserved search fields, if
    /// it does not already exist.
    async fn ensure_index(&self, index: &str, mapping: &JsonValue) -> ViewResult<()>;

    async fn locate_by_id(&self, index: &str, id: &str) -> ViewResult<Option<Target>>;

    async fn locate_by_filter(
        &self,
        index: &str,
        filter: &StoreFilter,
        sorting: Option<&Sorting>,
    ) -> ViewResult<Vec<Target>>;

    async fn search(&self, index: &str, request: &SearchRequest) -> ViewResult<SearchResponse>;

    /// Create (if `target.new`) or version-conditional upsert otherwise.
    /// Returns the version assigned by the store.
    async fn save(&self, target: &Target) -> ViewResult<i64>;

    /// Version-conditional delete. No-op if `target.new` (nothing to delete).
    async fn remove(&self, target: &Target) -> ViewResult<()>;
}

/// The index-bootstrap mapping: caller-provided properties plus a reserved
/// `feature_search` text field backed by an edge-n-gram analyzer, and a
/// `case_insensitive_sort` analyzer for keyword sort stability — reproduced
/// literally from `original_source/lib/elastic.go`'s `createMapping`.
pub fn build_index_settings(mapping: &JsonValue) -> JsonValue {
    let mut props = mapping.as_object().cloned().unwrap_or_default();
    props.insert(
        "feature_search".to_string(),
        json!({
            "type": "text",
            "analyzer": "edge_ngram_analyzer",
            "search_analyzer": "standard"
        }),
    );
    json!({
        "settings": {
            "analysis": {
                "filter": {
                    "edge_ngram_filter": {
                        "type": "edge_ngram",
                        "min_gram": 1,
                        "max_gram": 20
                    }
                },
                "analyzer": {
                    "edge_ngram_analyzer": {
                        "type": "custom",
                        "tokenizer": "standard",
                        "filter": ["lowercase", "edge_ngram_filter"]
                    },
                    "case_insensitive_sort": {
                        "type": "custom",
                        "tokenizer": "keyword",
                        "filter": ["lowercase"]
                    }
                }
            }
        },
        "mappings": {
            "properties": props
        }
    })
}

/// Pure exponential-backoff function: 10 ms doubling up to an 8 s cap.
/// Grounded in `original_source/lib/elastic.go`'s `MyRetrier`.
pub fn backoff(retry_count: u32) -> Duration {
    const MIN: Duration = Duration::from_millis(10);
    const MAX: Duration = Duration::from_secs(8);
    match MIN.checked_mul(1u32 << retry_count.min(16)) {
        Some(d) if d < MAX => d,
        _ => MAX,
    }
}

/// A retryable store error is one that isn't a hard connection refusal.
/// `elastic.go`'s retrier stops immediately on connect-refused regardless
/// of remaining retry budget.
pub fn is_retryable(error: &ViewError, retry_count: u32, max_retries: u32) -> bool {
    if retry_count >= max_retries {
        return false;
    }
    match error {
        ViewError::Transport(e) => !e.is_connect(),
        ViewError::Store(msg) => !msg.to_lowercase().contains("connection refused"),
        _ => false,
    }
}

/// In-memory `DocumentStore`, backed by one `DashMap` per index. The
/// default store for tests and for running the pipeline without a real
/// search backend. One `DashMap` of `DashMap`s, namespaced by index name.
#[derive(Default)]
pub struct InMemoryStore {
    indices: DashMap<String, Arc<DashMap<String, (i64, Features)>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn index(&self, name: &str) -> Arc<DashMap<String, (i64, Features)>> {
        self.indices
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(DashMap::new()))
            .clone()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn ensure_index(&self, index: &str, _mapping: &JsonValue) -> ViewResult<()> {
        self.index(index);
        Ok(())
    }

    async fn locate_by_id(&self, index: &str, id: &str) -> ViewResult<Option<Target>> {
        let docs = self.index(index);
        Ok(docs
            .get(id)
            .map(|entry| Target::existing(index, id, entry.0, entry.1.clone())))
    }

    async fn locate_by_filter(
        &self,
        index: &str,
        filter: &StoreFilter,
        sorting: Option<&Sorting>,
    ) -> ViewResult<Vec<Target>> {
        let docs = self.index(index);
        let mut matched: Vec<Target> = docs
            .iter()
            .filter(|entry| filter.matches(&entry.value().1))
            .map(|entry| Target::existing(index, entry.key(), entry.value().0, entry.value().1.clone()))
            .collect();

        if let Some(sorting) = sorting {
            if !sorting.by.is_empty() {
                matched.sort_by(|a, b| {
                    let av = crate::feature::get(&a.features, &sorting.by);
                    let bv = crate::feature::get(&b.features, &sorting.by);
                    let ordering = compare_json(&av, &bv);
                    if sorting.asc { ordering } else { ordering.reverse() }
                });
            }
            if let Some(limit) = sorting.limit {
                matched.truncate(limit);
            }
        }

        Ok(matched)
    }

    async fn search(&self, index: &str, request: &SearchRequest) -> ViewResult<SearchResponse> {
        let docs = self.index(index);
        let mut hits: Vec<Hit> = docs
            .iter()
            .filter(|entry| {
                let features = entry.value();
                let query_ok = request
                    .query
                    .as_ref()
                    .map(|f| f.matches(&features.1))
                    .unwrap_or(true);
                let text_ok = match &request.text_match {
                    Some((field, text)) => {
                        StoreFilter::Match { field: field.clone(), text: text.clone() }.matches(&features.1)
                    }
                    None => true,
                };
                query_ok && text_ok
            })
            .map(|entry| Hit { id: entry.key().clone(), version: entry.value().0, features: entry.value().1.clone() })
            .collect();

        if let Some((field, asc)) = &request.sort {
            hits.sort_by(|a, b| {
                let av = crate::feature::get(&a.features, field);
                let bv = crate::feature::get(&b.features, field);
                let ordering = compare_json(&av, &bv);
                if *asc { ordering } else { ordering.reverse() }
            });
        }

        let total = hits.len() as u64;
        let from = request.from.unwrap_or(0);
        if from > 0 {
            hits = hits.into_iter().skip(from).collect();
        }
        if let Some(size) = request.size {
            hits.truncate(size);
        }

        Ok(SearchResponse { hits, total })
    }

    async fn save(&self, target: &Target) -> ViewResult<i64> {
        let docs = self.index(&target.name);
        if target.new {
            if docs.contains_key(&target.id) {
                return Err(ViewError::VersionConflict { index: target.name.clone(), id: target.id.clone() });
            }
            docs.insert(target.id.clone(), (1, target.features.clone()));
            return Ok(1);
        }

        let expected = target.version.unwrap_or(0);
        let mut slot = docs
            .get_mut(&target.id)
            .ok_or_else(|| ViewError::VersionConflict { index: target.name.clone(), id: target.id.clone() })?;
        if slot.0 != expected {
            return Err(ViewError::VersionConflict { index: target.name.clone(), id: target.id.clone() });
        }
        let next = slot.0 + 1;
        *slot = (next, target.features.clone());
        Ok(next)
    }

    async fn remove(&self, target: &Target) -> ViewResult<()> {
        if target.new {
            return Ok(());
        }
        let docs = self.index(&target.name);
        let expected = target.version.unwrap_or(0);
        let current = docs.get(&target.id).map(|e| e.0);
        match current {
            Some(v) if v == expected => {
                docs.remove(&target.id);
                Ok(())
            }
            Some(_) => Err(ViewError::VersionConflict { index: target.name.clone(), id: target.id.clone() }),
            None => Ok(()),
        }
    }
}

fn compare_json(a: &Option<JsonValue>, b: &Option<JsonValue>) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(JsonValue::Number(x)), Some(JsonValue::Number(y))) => x
            .as_f64()
            .unwrap_or(0.0)
            .partial_cmp(&y.as_f64().unwrap_or(0.0))
            .unwrap_or(Ordering::Equal),
        (Some(JsonValue::String(x)), Some(JsonValue::String(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// A real, if minimal, `DocumentStore` over an Elasticsearch-compatible
/// document API: `GET <index>/_doc/<id>`, `PUT .../_doc/<id>?version=N`,
/// `POST <index>/_search`. Grounded in `original_source/lib/elastic.go` for
/// the request shapes.
pub struct ElasticStore {
    base_url: String,
    client: reqwest::Client,
    max_retries: u32,
}

impl ElasticStore {
    pub fn new(base_url: impl Into<String>, max_retries: u32) -> Self {
        ElasticStore {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
            max_retries,
        }
    }

    async fn with_retry<T, F, Fut>(&self, mut op: F) -> ViewResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = ViewResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if is_retryable(&e, attempt, self.max_retries) => {
                    tracing::warn!(attempt, error = %e, "retrying store operation");
                    tokio::time::sleep(backoff(attempt)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl DocumentStore for ElasticStore {
    async fn ensure_index(&self, index: &str, mapping: &JsonValue) -> ViewResult<()> {
        let alias = index;
        let versioned = format!("{index}_v1");
        let exists = self
            .client
            .head(format!("{}/{}", self.base_url, alias))
            .send()
            .await?
            .status()
            .is_success();
        if exists {
            return Ok(());
        }
        let body = build_index_settings(mapping);
        self.client
            .put(format!("{}/{}", self.base_url, versioned))
            .json(&body)
            .send()
            .await?
            .error_for_status()
            .map_err(ViewError::Transport)?;
        self.client
            .put(format!("{}/{}/_alias/{}", self.base_url, versioned, alias))
            .send()
            .await?
            .error_for_status()
            .map_err(ViewError::Transport)?;
        Ok(())
    }

    async fn locate_by_id(&self, index: &str, id: &str) -> ViewResult<Option<Target>> {
        self.with_retry(|| async {
            let resp = self
                .client
                .get(format!("{}/{}/_doc/{}", self.base_url, index, id))
                .send()
                .await?;
            if resp.status() == reqwest::StatusCode::NOT_FOUND {
                return Ok(None);
            }
            let body: JsonValue = resp.error_for_status().map_err(ViewError::Transport)?.json().await?;
            let version = body.get("_version").and_then(|v| v.as_i64()).unwrap_or(0);
            let source = body
                .get("_source")
                .and_then(|v| v.as_object())
                .cloned()
                .unwrap_or_default();
            Ok(Some(Target::existing(index, id, version, source)))
        })
        .await
    }

    async fn locate_by_filter(
        &self,
        index: &str,
        filter: &StoreFilter,
        sorting: Option<&Sorting>,
    ) -> ViewResult<Vec<Target>> {
        let mut body = json!({ "query": filter.to_query_dsl() });
        if let Some(sorting) = sorting {
            if !sorting.by.is_empty() {
                body["sort"] = json!([{ &sorting.by: if sorting.asc { "asc" } else { "desc" } }]);
            }
            if let Some(limit) = sorting.limit {
                body["size"] = json!(limit);
            }
        }
        self.with_retry(|| async {
            let resp = self
                .client
                .post(format!("{}/{}/_search", self.base_url, index))
                .json(&body)
                .send()
                .await?
                .error_for_status()
                .map_err(ViewError::Transport)?;
            let parsed: JsonValue = resp.json().await?;
            Ok(parse_hits(index, &parsed))
        })
        .await
    }

    async fn search(&self, index: &str, request: &SearchRequest) -> ViewResult<SearchResponse> {
        let primary = match &request.text_match {
            Some((field, text)) => StoreFilter::Match { field: field.clone(), text: text.clone() },
            None => StoreFilter::MatchAll,
        };
        let query = match &request.query {
            Some(selection) => primary.with_filter(selection.clone()),
            None => primary,
        };
        let mut body = json!({ "query": query.to_query_dsl() });
        if let Some(size) = request.size {
            body["size"] = json!(size);
        }
        if let Some(from) = request.from {
            body["from"] = json!(from);
        }
        if let Some((field, asc)) = &request.sort {
            body["sort"] = json!([{ field: if *asc { "asc" } else { "desc" } }]);
        }
        self.with_retry(|| async {
            let resp = self
                .client
                .post(format!("{}/{}/_search", self.base_url, index))
                .json(&body)
                .send()
                .await?
                .error_for_status()
                .map_err(ViewError::Transport)?;
            let parsed: JsonValue = resp.json().await?;
            let hits = parse_hits(index, &parsed);
            let total = parsed
                .pointer("/hits/total/value")
                .and_then(|v| v.as_u64())
                .unwrap_or(hits.len() as u64);
            Ok(SearchResponse {
                hits: hits
                    .into_iter()
                    .map(|t| Hit { id: t.id, version: t.version.unwrap_or(0), features: t.features })
                    .collect(),
                total,
            })
        })
        .await
    }

    async fn save(&self, target: &Target) -> ViewResult<i64> {
        self.with_retry(|| async {
            let url = format!("{}/{}/_doc/{}", self.base_url, target.name, target.id);
            let request = if target.new {
                self.client.put(format!("{url}?op_type=create"))
            } else {
                let version = target.version.unwrap_or(0);
                self.client.put(format!("{url}?version={version}&version_type=external_gte"))
            };
            let resp = request
                .json(&JsonValue::Object(target.features.clone()))
                .send()
                .await?;
            if resp.status() == reqwest::StatusCode::CONFLICT {
                return Err(ViewError::VersionConflict { index: target.name.clone(), id: target.id.clone() });
            }
            let body: JsonValue = resp.error_for_status().map_err(ViewError::Transport)?.json().await?;
            Ok(body.get("_version").and_then(|v| v.as_i64()).unwrap_or(1))
        })
        .await
    }

    async fn remove(&self, target: &Target) -> ViewResult<()> {
        if target.new {
            return Ok(());
        }
        self.with_retry(|| async {
            let version = target.version.unwrap_or(0);
            let url = format!(
                "{}/{}/_doc/{}?version={}&version_type=external_gte",
                self.base_url, target.name, target.id, version
            );
            let resp = self.client.delete(url).send().await?;
            if resp.status() == reqwest::StatusCode::CONFLICT {
                return Err(ViewError::VersionConflict { index: target.name.clone(), id: target.id.clone() });
            }
            if resp.status() != reqwest::StatusCode::NOT_FOUND {
                resp.error_for_status().map_err(ViewError::Transport)?;
            }
            Ok(())
        })
        .await
    }
}

fn parse_hits(index: &str, response: &JsonValue) -> Vec<Target> {
    response
        .pointer("/hits/hits")
        .and_then(|v| v.as_array())
        .map(|hits| {
            hits.iter()
                .map(|hit| {
                    let id = hit.get("_id").and_then(|v| v.as_str()).unwrap_or_default().to_string();
                    let version = hit.get("_version").and_then(|v| v.as_i64()).unwrap_or(0);
                    let source = hit
                        .get("_source")
                        .and_then(|v| v.as_object())
                        .cloned()
                        .unwrap_or_default();
                    Target::existing(index, id, version, source)
                })
                .collect()
        })
        .unwrap_or_default()
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
    fn build_index_settings_merges_feature_search_as_sibling_property() {
        let mapping = json!({"name": {"type": "keyword"}, "owner": {"type": "keyword"}});
        let settings = build_index_settings(&mapping);
        let props = settings.pointer("/mappings/properties").unwrap().as_object().unwrap();
        assert!(props.contains_key("name"));
        assert!(props.contains_key("owner"));
        assert_eq!(props["feature_search"]["type"], json!("text"));
        assert!(settings.pointer("/mappings/properties/properties").is_none());
    }

    #[test]
    fn build_index_settings_handles_empty_mapping() {
        let settings = build_index_settings(&json!({}));
        let props = settings.pointer("/mappings/properties").unwrap().as_object().unwrap();
        assert_eq!(props.len(), 1);
        assert!(props.contains_key("feature_search"));
    }

    #[tokio::test]
    async fn save_then_locate_by_id_round_trips() {
        let store = InMemoryStore::new();
        let mut target = Target::new_root("widgets", "w1");
        target.features = features(&[("name", json!("widget"))]);
        let version = store.save(&target).await.unwrap();
        assert_eq!(version, 1);

        let found = store.locate_by_id("widgets", "w1").await.unwrap().unwrap();
        assert_eq!(found.version, Some(1));
        assert_eq!(found.features.get("name"), Some(&json!("widget")));
    }

    #[tokio::test]
    async fn save_with_stale_version_conflicts() {
        let store = InMemoryStore::new();
        let mut target = Target::new_root("widgets", "w1");
        store.save(&target).await.unwrap();

        target.new = false;
        target.version = Some(99);
        let err = store.save(&target).await.unwrap_err();
        assert!(matches!(err, ViewError::VersionConflict { .. }));
    }

    #[tokio::test]
    async fn locate_by_filter_applies_sorting_and_limit() {
        let store = InMemoryStore::new();
        for (id, s) in [("1", 1), ("2", 2), ("3", 3)] {
            let mut target = Target::new_root("items", id);
            target.features = features(&[("s", json!(s))]);
            store.save(&target).await.unwrap();
        }

        let sorting = Sorting { by: "s".to_string(), asc: true, limit: Some(2) };
        let results = store
            .locate_by_filter("items", &StoreFilter::MatchAll, Some(&sorting))
            .await
            .unwrap();
        let ids: Vec<&str> = results.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);

        let sorting_desc = Sorting { by: "s".to_string(), asc: false, limit: Some(2) };
        let results = store
            .locate_by_filter("items", &StoreFilter::MatchAll, Some(&sorting_desc))
            .await
            .unwrap();
        let ids: Vec<&str> = results.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "2"]);
    }

    #[tokio::test]
    async fn remove_is_a_no_op_on_new_target() {
        let store = InMemoryStore::new();
        let target = Target::new_root("widgets", "ghost");
        store.remove(&target).await.unwrap();
    }

    #[test]
    fn backoff_doubles_and_caps_at_eight_seconds() {
        assert_eq!(backoff(0), Duration::from_millis(10));
        assert_eq!(backoff(1), Duration::from_millis(20));
        assert_eq!(backoff(10), Duration::from_secs(8));
    }

    #[test]
    fn bool_query_matches_must_filter_should_must_not() {
        let f = features(&[("a", json!(1)), ("b", json!(2))]);
        let query = StoreFilter::Bool {
            must: vec![StoreFilter::term("a", json!(1))],
            filter: vec![StoreFilter::exists("b")],
            should: vec![],
            must_not: vec![StoreFilter::term("a", json!(99))],
        };
        assert!(query.matches(&f));
    }
}
