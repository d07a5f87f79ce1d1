/// Error types for the projection pipeline and query surface.
///
/// All fallible operations in this crate return `Result<T, ViewError>`. Kinds
/// are grouped the way the error handling design groups them: bad
/// configuration, invalid events, transient store failures, version
/// conflicts, and malformed requests.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ViewError {
    /// Configuration names a target (index) not known to this process.
    #[error("unknown target '{0}'")]
    UnknownTarget(String),

    /// Configuration names a query endpoint not declared for a target.
    #[error("unknown endpoint '{endpoint}' for target '{target}'")]
    UnknownEndpoint { target: String, endpoint: String },

    /// An `Action.Type` string did not match a known variant.
    #[error("unknown action type '{0}'")]
    UnknownActionType(String),

    /// An `Action.Scale` string did not match `one` or `many`.
    #[error("unknown scale '{0}'")]
    UnknownScale(String),

    /// A `Where` condition's operation string did not match a known variant.
    #[error("unknown where-operation '{0}'")]
    UnknownWhereOperation(String),

    /// A `Selection` condition's operation string did not match a known variant.
    #[error("unknown selection-operation '{0}'")]
    UnknownSelectionOperation(String),

    /// A group's `IdFeature` extraction path was malformed.
    #[error("invalid path expression '{0}'")]
    InvalidPath(String),

    /// A root event's id feature was missing or not a string.
    #[error("invalid event for group on target '{target}': {reason}")]
    InvalidEvent { target: String, reason: String },

    /// JSON (de)serialization failure — malformed event bytes, bad config, etc.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A transient failure talking to the document store, eligible for retry.
    #[error("store error: {0}")]
    Store(String),

    /// Outbound HTTP failure talking to the document store backend.
    #[error("store transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Optimistic-concurrency write/delete lost the race.
    #[error("version conflict saving '{id}' in index '{index}'")]
    VersionConflict { index: String, id: String },

    /// Configuration file could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Caller presented no usable identity and `force_auth` requires one.
    #[error("authentication required")]
    Unauthorized,
}

pub type ViewResult<T> = Result<T, ViewError>;
