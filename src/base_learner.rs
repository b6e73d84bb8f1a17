//! Provides the base learner interface
//! and the two learners shipped with this crate.
mod core;
mod zero_r;
mod decision_stump;
mod registry;


/// Base learner and trained model traits.
pub use self::core::{BaseLearner, Model, Capabilities};

/// The constant predictor.
pub use zero_r::{ZeroR, ZeroRModel};

/// Decision stump.
pub use decision_stump::{DecisionStump, DecisionStumpModel, Split};

/// String-keyed factory of learners and saved models.
pub use registry::{LearnerRegistry, LearnerConstructor, ModelDecoder};
