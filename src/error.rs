//! Error types surfaced by the engine.

use thiserror::Error;

/// Errors returned by engine operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The engine was constructed with a config that fails validation.
    #[error("invalid engine config: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// The dataset produced zero nodes after validation. Hosts render an
    /// empty-state placeholder instead of starting the frame loop.
    #[error("dataset contains no nodes")]
    EmptyDataset,

    /// An operation referenced a node id that is not part of the loaded dataset.
    #[error("unknown node id: {0}")]
    UnknownNode(String),

    /// The engine was disposed and no longer accepts work.
    #[error("engine has been disposed")]
    Disposed,
}

/// A config value outside the range the engine can run with.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be finite and positive, got {value}")]
    NotPositive { field: &'static str, value: f32 },

    #[error("{field} must be finite and not negative, got {value}")]
    Negative { field: &'static str, value: f32 },

    #[error("{field} must lie in {min}..={max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("{low_field} ({low}) must be below {high_field} ({high})")]
    Inverted {
        low_field: &'static str,
        low: f32,
        high_field: &'static str,
        high: f32,
    },

    #[error("{field} must be at least 1")]
    Zero { field: &'static str },
}

/// Errors raised while resolving visual assets for a node.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    /// The asset could not be located.
    #[error("asset not found: {0}")]
    NotFound(String),

    /// The asset exists but could not be read or decoded.
    #[error("failed to load asset {key}: {reason}")]
    Load { key: String, reason: String },

    /// The backend has no asset source configured.
    #[error("no asset source configured for {0}")]
    Unavailable(String),
}
