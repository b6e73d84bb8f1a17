//! Error type shared by every learner in this crate.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while configuring, training, or querying an ensemble.
#[derive(Error, Debug)]
pub enum EnsembleError {
    /// A configuration value is out of its valid range,
    /// or two options contradict each other.
    #[error("invalid parameter: {parameter} = {value}, {reason}")]
    InvalidParameter {
        /// Name of the offending option.
        parameter: String,
        /// The rejected value.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The training set has no instances
    /// (after removing instances with a missing class).
    #[error("training dataset has zero instances")]
    EmptyDataset,

    /// The learner or rule cannot handle the data it was given,
    /// e.g., a numeric class for `AdaBoostM1`.
    #[error("{learner} cannot handle this data: {reason}")]
    IncompatibleData {
        /// Name of the learner that rejected the data.
        learner: String,
        /// Human-readable reason.
        reason: String,
    },

    /// Two schemas that must agree do not.
    #[error("schema mismatch: {reason}")]
    SchemaMismatch {
        /// Human-readable reason.
        reason: String,
    },

    /// A base model returned a missing value where the combination
    /// needs a definite number.
    #[error("{learner}: base learner predicted missing value")]
    UnassignedClass {
        /// Name of the ensemble that needed the prediction.
        learner: String,
    },

    /// Weighted sampling could not be set up.
    #[error("sampling failed: {reason}")]
    Sampling {
        /// Human-readable reason.
        reason: String,
    },

    /// A cost matrix could not be parsed or applied.
    #[error("cost matrix error: {reason}")]
    CostMatrix {
        /// Human-readable reason.
        reason: String,
    },

    /// The on-demand cost file does not exist.
    #[error("on-demand cost file doesn't exist: {}", path.display())]
    MissingCostFile {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// Two partial ensembles cannot be merged.
    #[error("can't aggregate because base learners differ: {ours} vs {theirs}")]
    Aggregation {
        /// Base learner of the receiving ensemble.
        ours: String,
        /// Base learner of the ensemble being merged in.
        theirs: String,
    },

    /// The registry has no entry for a learner identifier.
    #[error("unknown learner `{id}`")]
    UnknownLearner {
        /// The unknown identifier.
        id: String,
    },

    /// The base learner failed while training round `round`.
    #[error("base learner failed in round {round}")]
    Round {
        /// One-based round number.
        round: usize,
        /// The error raised by the base learner.
        #[source]
        source: Box<EnsembleError>,
    },

    /// A worker of a parallel batch failed.
    #[error("worker {worker} failed while scoring rounds [{lo}, {hi})")]
    Worker {
        /// Index of the failing worker.
        worker: usize,
        /// First round of the worker's slice.
        lo: usize,
        /// One past the last round of the worker's slice.
        hi: usize,
        /// The error raised by the worker.
        #[source]
        source: Box<EnsembleError>,
    },

    /// A driver method was called in the wrong state.
    #[error("{learner}: {reason}")]
    State {
        /// Name of the driver.
        learner: String,
        /// Human-readable reason.
        reason: String,
    },

    /// A requested optional capability is not supported.
    #[error("{learner} does not support {capability}")]
    Unsupported {
        /// Name of the learner or model.
        learner: String,
        /// The missing capability.
        capability: String,
    },

    /// A saved model could not be decoded.
    #[error("failed to decode {learner} model: {reason}")]
    Decode {
        /// Learner identifier written in the file.
        learner: String,
        /// Human-readable reason.
        reason: String,
    },

    /// A saved model file could not be read.
    #[error("\"{}\" does not seem to be a valid model file", path.display())]
    ModelFile {
        /// Path to the file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// File I/O errors.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: io::Error,
    },

    /// JSON (de)serialization errors.
    #[error("JSON error: {source}")]
    Json {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// TOML parsing errors.
    #[error("TOML error: {source}")]
    Toml {
        /// The underlying TOML error.
        #[from]
        source: toml::de::Error,
    },
}

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, EnsembleError>;

impl EnsembleError {
    /// Shorthand for [`EnsembleError::InvalidParameter`].
    pub fn invalid_parameter<V>(parameter: &str, value: V, reason: &str) -> Self
        where V: ToString,
    {
        Self::InvalidParameter {
            parameter: parameter.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Shorthand for [`EnsembleError::IncompatibleData`].
    pub fn incompatible<R: ToString>(learner: &str, reason: R) -> Self {
        Self::IncompatibleData {
            learner: learner.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Shorthand for [`EnsembleError::UnassignedClass`].
    pub fn unassigned(learner: &str) -> Self {
        Self::UnassignedClass { learner: learner.to_string() }
    }

    /// Wraps `self` as the failure of round `round`.
    pub fn in_round(self, round: usize) -> Self {
        Self::Round { round, source: Box::new(self) }
    }
}
