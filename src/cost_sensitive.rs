//! Defines `CostSensitiveClassifier`
//! and the [`CostMatrix`] it is driven by.
mod cost_matrix;
mod cost_sensitive_algorithm;
mod cost_sensitive_model;

pub use cost_matrix::CostMatrix;
pub use cost_sensitive_algorithm::{
    CostSensitiveClassifier,
    CostSensitiveOptions,
    MatrixSource,
};
pub use cost_sensitive_model::CostSensitiveModel;
