//! Defines some common functions used in this library.

/// Defines numeric helpers such as normalization and `logs2probs`.
pub mod utils;

/// Defines some checker functions that validate options and data.
pub(crate) mod checker;
