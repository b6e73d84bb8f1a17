//! Defines `LogitBoost`,
//! the additive logistic regression of Friedman, Hastie & Tibshirani, 2000.
mod logit_boost_algorithm;
mod logit_boost_model;

pub use logit_boost_algorithm::{LogitBoost, LogitBoostOptions, LogitBoostDriver};
pub use logit_boost_model::LogitBoostModel;
