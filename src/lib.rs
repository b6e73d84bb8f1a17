#![warn(missing_docs)]

//!
//! A crate that provides ensemble meta-learners.
//! Every ensemble wraps an arbitrary base learner
//! and combines several trained copies of it into one model.
//!
//! This crate includes three families of ensembles.
//!
//! - Iterative boosting drivers
//!     Each round depends on the state left by the previous one
//!     (instance weights, class scores, residuals).
//!     The drivers implement the [`Booster`] protocol
//!     `initialize`, `step`, `finalize`.
//!     In this crate,
//!     [`AdaBoostM1`], [`LogitBoost`], and [`AdditiveRegression`]
//!     correspond to this type.
//!
//! - Independent ensembles
//!     The members are trained independently of each other.
//!     In this crate,
//!     [`Bagging`] (with out-of-bag estimation)
//!     and [`Vote`] (six combination rules)
//!     correspond to this type.
//!
//! - Wrappers
//!     [`CostSensitiveClassifier`] reweights the training data
//!     by a [`CostMatrix`],
//!     or predicts the class of minimum expected cost.
//!
//! Learners can be configured in code with builder methods,
//! or from TOML / JSON through [`LearnerSpec`] and [`LearnerRegistry`].
//! Trained models are saved and loaded with [`persist`].

pub mod error;
pub mod constants;
pub mod common;
pub mod sample;
pub mod base_learner;
pub mod booster;
pub mod bagging;
pub mod hypothesis;
pub mod cost_sensitive;
pub mod config;
pub mod persist;
pub mod research;
pub mod prelude;


pub use error::{EnsembleError, Result};

pub use sample::{Attribute, AttributeKind, Dataset, Instance, Schema};

pub use base_learner::{
    BaseLearner,
    Capabilities,
    Model,

    DecisionStump,
    DecisionStumpModel,
    Split,
    ZeroR,
    ZeroRModel,

    LearnerRegistry,
};

pub use config::LearnerSpec;

pub use booster::{
    Booster,
    DriverState,

    AdaBoostM1,
    AdaBoostM1Options,
    AdaBoostM1Model,

    LogitBoost,
    LogitBoostOptions,
    LogitBoostModel,

    AdditiveRegression,
    AdditiveRegressionOptions,
    AdditiveRegressionModel,
};

pub use bagging::{Bagging, BaggingOptions, BaggingModel, OutOfBag};

pub use hypothesis::{
    CombinationRule,
    Vote,
    VoteOptions,
    VoteModel,
    WeightedMajority,
};

pub use cost_sensitive::{
    CostMatrix,
    CostSensitiveClassifier,
    CostSensitiveOptions,
    CostSensitiveModel,
    MatrixSource,
};

pub use persist::{SavedModel, save_model, load_model};
