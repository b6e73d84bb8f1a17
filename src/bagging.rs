//! Defines `Bagging`, bootstrap aggregation of Breiman, 1996,
//! with out-of-bag error estimation.
mod bagging_algorithm;
mod bagging_model;
mod out_of_bag;

pub use bagging_algorithm::{Bagging, BaggingOptions};
pub use bagging_model::BaggingModel;
pub use out_of_bag::{OutOfBag, OutOfBagPrediction};
