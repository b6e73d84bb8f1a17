//! Provides the iterative ensembles.

pub(crate) mod core;

// ------------------------------------------------
// Classification
mod adaboost_m1;
mod logit_boost;

// ------------------------------------------------
// Regression
mod additive_regression;


/// Booster trait
pub use self::core::{Booster, DriverState};

// ------------------------------------------------
// Classification
pub use self::adaboost_m1::{
    AdaBoostM1,
    AdaBoostM1Options,
    AdaBoostM1Driver,
    AdaBoostM1Model,
};
pub use self::logit_boost::{
    LogitBoost,
    LogitBoostOptions,
    LogitBoostDriver,
    LogitBoostModel,
};

// ------------------------------------------------
// Regression
pub use self::additive_regression::{
    AdditiveRegression,
    AdditiveRegressionOptions,
    AdditiveRegressionDriver,
    AdditiveRegressionModel,
};
