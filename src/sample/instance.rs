use serde::{Serialize, Deserialize};
use std::sync::Arc;


/// A single training or test instance.
///
/// Feature values are shared through an `Arc`.
/// Missing values are represented by `NaN`,
/// both for features and for the class value.
/// A nominal value is stored as the index of its label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    values: Arc<[f64]>,
    class_value: f64,
    weight: f64,
}


impl Instance {
    /// Construct a new instance with unit weight.
    pub fn new(values: Vec<f64>, class_value: f64) -> Self {
        Self { values: values.into(), class_value, weight: 1f64 }
    }


    /// Construct an instance whose class value is missing.
    /// Used for prediction.
    pub fn unlabeled(values: Vec<f64>) -> Self {
        Self::new(values, f64::NAN)
    }


    /// Set the weight of `self`.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }


    /// Returns a copy of `self` with class value `class_value`.
    /// The feature vector is shared with `self`.
    pub fn with_class_value(&self, class_value: f64) -> Self {
        Self {
            values: Arc::clone(&self.values),
            class_value,
            weight: self.weight,
        }
    }


    /// The feature vector.
    #[inline(always)]
    pub fn values(&self) -> &[f64] {
        &self.values[..]
    }


    /// The `index`-th feature value.
    #[inline(always)]
    pub fn value(&self, index: usize) -> f64 {
        self.values[index]
    }


    /// Returns `true` if the `index`-th feature is missing.
    #[inline(always)]
    pub fn is_missing(&self, index: usize) -> bool {
        self.values[index].is_nan()
    }


    /// The class value.
    #[inline(always)]
    pub fn class_value(&self) -> f64 {
        self.class_value
    }


    /// Returns `true` if the class value is missing.
    #[inline(always)]
    pub fn class_is_missing(&self) -> bool {
        self.class_value.is_nan()
    }


    /// The instance weight.
    #[inline(always)]
    pub fn weight(&self) -> f64 {
        self.weight
    }


    /// Overwrite the instance weight.
    #[inline(always)]
    pub fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
    }
}
