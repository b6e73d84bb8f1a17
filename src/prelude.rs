//! Exports the standard ensembles and traits.
//!
pub use crate::error::{EnsembleError, Result};

pub use crate::sample::{
    Attribute,
    Dataset,
    Instance,
    Schema,
};

pub use crate::base_learner::{
    // Base learner traits
    BaseLearner,
    Model,
    Capabilities,

    // Base learners shipped with this crate
    DecisionStump,
    ZeroR,

    LearnerRegistry,
};

pub use crate::booster::{
    // Booster trait
    Booster,

    // Classification ---------------------------
    AdaBoostM1,
    LogitBoost,

    // Regression -------------------------------
    AdditiveRegression,
};

pub use crate::bagging::Bagging;

pub use crate::hypothesis::{
    CombinationRule,
    Vote,
};

pub use crate::cost_sensitive::{
    CostMatrix,
    CostSensitiveClassifier,
    MatrixSource,
};

pub use crate::config::LearnerSpec;
pub use crate::persist::{save_model, load_model};
