use std::path::PathBuf;

use thiserror::Error;

/// Failure to load or validate a model bundle.
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("failed to read model bundle {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse model bundle {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown feature name '{0}'")]
    UnknownFeature(String),

    #[error("feature '{0}' listed more than once")]
    DuplicateFeature(String),

    #[error("encoder for '{column}' lists class '{class}' more than once")]
    DuplicateClass { column: String, class: String },

    #[error("invalid regressor: {0}")]
    InvalidModel(String),
}

/// Failure while turning one request into a price.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("model is not loaded: {0}")]
    ModelUnavailable(String),

    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("could not convert string to float: '{0}'")]
    NotNumeric(String),

    #[error("cannot use a JSON {kind} as the value of '{column}'")]
    NonScalar { column: &'static str, kind: &'static str },

    #[error("no encoder for categorical column '{0}'")]
    MissingEncoder(&'static str),

    #[error("feature row has {actual} columns, model expects {expected}")]
    Shape { expected: usize, actual: usize },

    #[error("model produced no output")]
    EmptyOutput,

    #[error("model produced a non-finite prediction ({0}); input contains NaN or infinity")]
    NonFinite(f64),
}
