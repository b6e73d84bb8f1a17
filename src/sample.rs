//! Provides the weighted dataset every learner in this crate trains on.
//!
//! A [`Dataset`] is an ordered collection of [`Instance`]s sharing one
//! [`Schema`].
//! Instances own their feature vector through an `Arc`,
//! so a dataset that only differs in weights or class values
//! is cheap to build.
//! Every round of an ensemble works on its own snapshot
//! instead of mutating the caller's data.

mod attribute;
mod instance;
mod dataset;

pub use attribute::{Attribute, AttributeKind, Schema};
pub use instance::Instance;
pub use dataset::Dataset;
