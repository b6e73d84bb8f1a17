//! Defines `AdaBoostM1`,
//! the multi-class AdaBoost of Freund & Schapire, 1996.
mod adaboost_m1_algorithm;
mod adaboost_m1_model;

pub use adaboost_m1_algorithm::{AdaBoostM1, AdaBoostM1Options, AdaBoostM1Driver};
pub use adaboost_m1_model::AdaBoostM1Model;
