//! Error types shared by the training, validation and prediction pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by the library.
#[derive(Debug, Error)]
pub enum Error {
    /// A matrix or artifact file holds no usable rows.
    #[error("empty input")]
    EmptyInput,

    /// A required input file does not exist.
    #[error("required file not found: {}", path.display())]
    MissingFile {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// A token in a flat numeric file could not be interpreted.
    #[error("{}:{line}: {message}", path.display())]
    Parse {
        /// File being read.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// Human-readable explanation.
        message: String,
    },

    /// Requested cluster count is incompatible with the training matrix.
    #[error("invalid cluster count: requested {requested}, but training matrix has {n_rows} rows")]
    InvalidClusterCount {
        /// Requested number of clusters.
        requested: usize,
        /// Number of training rows.
        n_rows: usize,
    },

    /// Rows, centroids or query vectors disagree on feature count.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimensionality.
        expected: usize,
        /// Found dimensionality.
        found: usize,
    },

    /// Lloyd iterations hit the configured cap before centroids settled.
    #[error("k-means did not converge after {iterations} iterations (last max delta {max_delta:e})")]
    DidNotConverge {
        /// Iterations performed.
        iterations: usize,
        /// Largest coordinate movement in the final iteration.
        max_delta: f64,
    },

    /// A player record is missing a schema feature, or it is not numeric.
    #[error("the player's data is insufficient for prediction: feature '{feature}' is missing or non-numeric")]
    InsufficientData {
        /// Offending feature column.
        feature: String,
    },

    /// The nearest cluster was empty at training time.
    #[error("cluster {cluster} has no majority label and cannot classify a player")]
    Unclassifiable {
        /// 0-based cluster index.
        cluster: usize,
    },

    /// No price bucket contains the cluster label.
    #[error("label {label} is outside known ranges")]
    LabelOutsideRanges {
        /// Raw cluster label.
        label: i64,
    },

    /// Currency string not understood by the price codec.
    #[error("invalid price string '{raw}'")]
    InvalidPrice {
        /// Input as given.
        raw: String,
    },

    /// Range boundary token not understood by the decoder.
    #[error("invalid range boundary token '{raw}'")]
    InvalidBoundary {
        /// Input as given.
        raw: String,
    },

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Human-readable explanation.
        message: String,
    },

    /// Filesystem failure while reading or writing.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Malformed player database CSV.
    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// Malformed JSON training config.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Rows could not be shaped into a matrix.
    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;
