//! Defines `AdditiveRegression`,
//! stagewise additive modeling of Friedman, 2002.
mod additive_regression_algorithm;
mod additive_regression_model;

pub use additive_regression_algorithm::{
    AdditiveRegression,
    AdditiveRegressionOptions,
    AdditiveRegressionDriver,
};
pub use additive_regression_model::AdditiveRegressionModel;
