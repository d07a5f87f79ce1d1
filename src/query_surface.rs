//! The Query Surface: four operation families (search / get /
//! select-field-single / select-field-multi), each available plain, with
//! limit/offset, with sort, and with sort+total. Results are passed through
//! the endpoint's `Projection` before returning.
//!
//! Grounded in `original_source/lib/query.go` and `api.go`'s handler
//! dispatch (consumed one layer up by this crate's `http.rs`).

use crate::auth::CallerIdentity;
use crate::error::{ViewError, ViewResult};
use crate::feature::Features;
use crate::projection::{self, Projection};
use crate::selection::{self, Selection};
use crate::store::{DocumentStore, SearchRequest, StoreFilter};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryEndpoint {
    pub selection: Selection,
    pub projection: Projection,
}

/// `target -> endpoint -> {selection, projection}`.
pub type QueryConfig = HashMap<String, HashMap<String, QueryEndpoint>>;

#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub sort: Option<(String, bool)>,
    pub with_total: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    pub total: Option<u64>,
    pub result: Vec<Features>,
}

pub struct QuerySurface<S: DocumentStore> {
    store: Arc<S>,
    config: QueryConfig,
}

impl<S: DocumentStore> QuerySurface<S> {
    pub fn new(store: Arc<S>, config: QueryConfig) -> Self {
        QuerySurface { store, config }
    }

    fn endpoint(&self, target: &str, endpoint: &str) -> ViewResult<&QueryEndpoint> {
        self.config
            .get(target)
            .ok_or_else(|| ViewError::UnknownTarget(target.to_string()))?
            .get(endpoint)
            .ok_or_else(|| ViewError::UnknownEndpoint { target: target.to_string(), endpoint: endpoint.to_string() })
    }

    fn selection_filter(
        &self,
        target: &str,
        endpoint: &str,
        caller: &CallerIdentity,
        params: &HashMap<String, String>,
    ) -> ViewResult<(StoreFilter, &Projection)> {
        let ep = self.endpoint(target, endpoint)?;
        let filter = selection::compile(&ep.selection, caller, params)?;
        Ok((filter, &ep.projection))
    }

    async fn run(&self, target: &str, primary: Option<StoreFilter>, selection: StoreFilter, projection: &Projection, opts: &QueryOptions) -> ViewResult<QueryOutcome> {
        let query = match primary {
            Some(p) => p.with_filter(selection),
            None => selection,
        };
        let request = SearchRequest {
            query: Some(query),
            text_match: None,
            size: opts.limit,
            from: opts.offset,
            sort: opts.sort.clone(),
        };
        let response = self.store.search(target, &request).await?;
        let result = response.hits.into_iter().map(|hit| projection::apply(projection, &hit.features)).collect();
        Ok(QueryOutcome { total: if opts.with_total { Some(response.total) } else { None }, result })
    }

    /// **search**: full-text match against `feature_search` plus selection.
    pub async fn search(
        &self,
        target: &str,
        endpoint: &str,
        search_text: &str,
        caller: &CallerIdentity,
        params: &HashMap<String, String>,
        opts: &QueryOptions,
    ) -> ViewResult<QueryOutcome> {
        let (selection, projection) = self.selection_filter(target, endpoint, caller, params)?;
        let request = SearchRequest {
            query: Some(selection),
            text_match: Some(("feature_search".to_string(), search_text.to_string())),
            size: opts.limit,
            from: opts.offset,
            sort: opts.sort.clone(),
        };
        let response = self.store.search(target, &request).await?;
        let result = response.hits.into_iter().map(|hit| projection::apply(projection, &hit.features)).collect();
        Ok(QueryOutcome { total: if opts.with_total { Some(response.total) } else { None }, result })
    }

    /// **get**: selection filter only.
    pub async fn get(
        &self,
        target: &str,
        endpoint: &str,
        caller: &CallerIdentity,
        params: &HashMap<String, String>,
        opts: &QueryOptions,
    ) -> ViewResult<QueryOutcome> {
        let (selection, projection) = self.selection_filter(target, endpoint, caller, params)?;
        self.run(target, None, selection, projection, opts).await
    }

    /// **select-field-single-value**: term match on `field` plus selection.
    pub async fn select_field_single(
        &self,
        target: &str,
        endpoint: &str,
        field: &str,
        value: serde_json::Value,
        caller: &CallerIdentity,
        params: &HashMap<String, String>,
        opts: &QueryOptions,
    ) -> ViewResult<QueryOutcome> {
        let (selection, projection) = self.selection_filter(target, endpoint, caller, params)?;
        let primary = StoreFilter::term(field, value);
        self.run(target, Some(primary), selection, projection, opts).await
    }

    /// **select-field-multi-value**: terms match against a client-supplied
    /// list plus selection.
    pub async fn select_field_multi(
        &self,
        target: &str,
        endpoint: &str,
        field: &str,
        values: Vec<serde_json::Value>,
        caller: &CallerIdentity,
        params: &HashMap<String, String>,
        opts: &QueryOptions,
    ) -> ViewResult<QueryOutcome> {
        let (selection, projection) = self.selection_filter(target, endpoint, caller, params)?;
        let primary = StoreFilter::terms(field, values);
        self.run(target, Some(primary), selection, projection, opts).await
    }
}
