//! Error types for nextplot

use thiserror::Error;

/// nextplot error type
///
/// Every fatal condition of the collection engine has its own variant so
/// callers can tell them apart without inspecting messages.
#[derive(Error, Debug)]
pub enum Error {
    /// A source container could not be opened (missing, unreadable or corrupted).
    #[error("cannot open container '{path}': {reason}")]
    Resource {
        /// Container locator.
        path: String,
        /// Underlying failure.
        reason: String,
    },

    /// A named object is absent from an otherwise valid container.
    #[error("object '{object}' does not exist in source '{source_name}'")]
    MissingObject {
        /// Requested object name.
        object: String,
        /// Name of the source that was searched.
        source_name: String,
    },

    /// A derived value violates its required sign or range.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Retrieval attempted on a collection without constituents.
    #[error("collection '{0}' is empty")]
    EmptyCollection(String),

    /// A normalization mode lacks its supporting configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A registry key is already taken.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// A registry key, source name or sample id is not known.
    #[error("unknown key: {0}")]
    UnknownKey(String),

    /// Bin-wise operation on histograms of different shape.
    #[error("incompatible histograms: {0}")]
    IncompatibleHistograms(String),

    /// Malformed value in a text input.
    #[error("parse error: {0}")]
    Parse(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl Error {
    /// Build a [`Error::Resource`] from any displayable reason.
    pub fn resource(path: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Error::Resource { path: path.into(), reason: reason.to_string() }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
