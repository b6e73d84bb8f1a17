//! Combined hypotheses:
//! the weighted majority vote of the boosting drivers,
//! the combination rules, and the [`Vote`] ensemble built on them.

mod weighted_majority;
pub mod combiner;
mod vote;


pub use weighted_majority::WeightedMajority;
pub(crate) use weighted_majority::WeightedMajorityRepr;

pub use combiner::CombinationRule;

pub use vote::{Vote, VoteOptions, VoteModel};
