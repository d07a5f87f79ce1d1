//! # Reflux — a configurable materialized-view engine
//!
//! Reflux folds a stream of bus events into search-index documents
//! according to a declarative rule configuration, and serves the result
//! over an access-controlled HTTP query surface.
//!
//! ## Pipeline
//!
//! Each configured event group runs an incoming message through:
//! 1. **Feature extraction** ([`feature`]) — dotted-path pulls from the
//!    event payload into a flat feature map.
//! 2. **Predicate gating** ([`predicate`]) — an `If` clause decides whether
//!    the group applies at all.
//! 3. **Action application** ([`action`]) — typed mutations (insert/remove,
//!    scale one/many) against the target document's feature map.
//! 4. **Init cascade** ([`init_cascade`]) — newly created root documents are
//!    back-populated from related pre-existing documents.
//! 5. **Persistence** ([`store`]) — optimistic-concurrency write to the
//!    document store.
//!
//! Queries run through [`query_surface`], compiling declarative selections
//! ([`selection`]) and where-clauses ([`where_compiler`]) into
//! [`store::StoreFilter`] and shaping results with a [`projection`].
//!
//! ## Status
//!
//! - Event-driven projection pipeline (feature extraction, predicate
//!   gating, typed actions, init cascade)
//! - In-memory and Elasticsearch-backed document stores
//! - HTTP query surface with JWT bearer auth

pub mod action;
pub mod auth;
pub mod bus;
pub mod config;
pub mod consumer;
pub mod error;
pub mod feature;
pub mod group;
pub mod http;
pub mod init_cascade;
pub mod predicate;
pub mod projection;
pub mod query_surface;
pub mod selection;
pub mod store;
pub mod target;
pub mod where_compiler;

pub use action::{Action, ActionType, Actions, Scale};
pub use auth::{AuthConfig, CallerIdentity};
pub use bus::{EventBus, InMemoryBus, Message};
pub use config::Config;
pub use error::{ViewError, ViewResult};
pub use feature::{Feature, Features};
pub use group::{EventActionGroup, GroupDispatcher, GroupType};
pub use predicate::{IfCondition, IfConditions, IfOperation};
pub use projection::Projection;
pub use query_surface::{QueryConfig, QueryEndpoint, QueryOptions, QueryOutcome, QuerySurface};
pub use selection::{Selection, SelectionOperation};
pub use store::{DocumentStore, ElasticStore, InMemoryStore, StoreFilter};
pub use target::{Sorting, Target};
pub use where_compiler::{WhereCondition, WhereOperation};

/// Re-export for callers building configs/events by hand.
pub use serde_json::{json, Value as JsonValue};

/// Initialize the logging system with the `REFLUX_LOG` environment
/// variable (falls back to `info`).
pub fn init_logging() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("REFLUX_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

/// Initialize logging with an explicit level, ignoring `REFLUX_LOG`.
pub fn init_logging_with_level(level: &str) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::new(level);

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
