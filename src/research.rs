//! This directory provides some features for research.
//! Measure the followings of a boosting algorithm per round:
//! - Running time
//! - Objective value (weighted error, negative log-likelihood,
//!   residual error)

/// Defines the logger that drives a booster round by round.
pub mod logger;

/// Builder of [`Logger`].
pub mod logger_builder;

pub use logger::{Logger, RoundRecord};
pub use logger_builder::LoggerBuilder;
