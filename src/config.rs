//! Learner specifications.
//!
//! A [`LearnerSpec`] names a learner by its registry identifier,
//! carries its options, and nests the specifications
//! of its base learner (`base`) or members (`members`).
//! It is resolved into a [`BaseLearner`] by a [`LearnerRegistry`]
//! when the configuration is loaded.
//!
//! ```toml
//! learner = "adaboost_m1"
//!
//! [options]
//! num_iterations = 20
//! weight_threshold = 90
//!
//! [base]
//! learner = "decision_stump"
//! ```
use serde::{Serialize, Deserialize};
use serde::de::DeserializeOwned;

use std::fs;
use std::path::Path;

use crate::{
    BaseLearner,
    LearnerRegistry,
    error::{EnsembleError, Result},
};


/// Specification of a learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerSpec {
    /// Registry identifier, e.g., `"bagging"`.
    pub learner: String,

    /// Options of the learner.
    /// Missing options take their documented defaults.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub options: serde_json::Value,

    /// The base learner of a meta learner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<Box<LearnerSpec>>,

    /// The members of an ensemble such as `vote`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<LearnerSpec>,
}


impl LearnerSpec {
    /// A specification of `learner` with default options.
    pub fn new<S: Into<String>>(learner: S) -> Self {
        Self {
            learner: learner.into(),
            options: serde_json::Value::Null,
            base: None,
            members: Vec::new(),
        }
    }


    /// Set the options.
    pub fn options(mut self, options: serde_json::Value) -> Self {
        self.options = options;
        self
    }


    /// Set the base learner.
    pub fn base(mut self, base: LearnerSpec) -> Self {
        self.base = Some(Box::new(base));
        self
    }


    /// Append a member.
    pub fn member(mut self, member: LearnerSpec) -> Self {
        self.members.push(member);
        self
    }


    /// Parses a TOML specification.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }


    /// Parses a JSON specification.
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }


    /// Reads a specification from `path`.
    /// Files ending in `.json` are parsed as JSON, anything else as TOML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let is_json = path.extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_toml_str(&text)
        }
    }


    /// Decodes the options into `T`.
    /// Absent options give `T::default()`.
    pub fn parse_options<T>(&self) -> Result<T>
        where T: DeserializeOwned + Default,
    {
        if self.options.is_null() {
            return Ok(T::default());
        }
        serde_json::from_value(self.options.clone())
            .map_err(|e| EnsembleError::invalid_parameter(
                "options",
                &self.learner,
                &e.to_string(),
            ))
    }


    /// Resolves `self` through `registry`.
    pub fn build(&self, registry: &LearnerRegistry)
        -> Result<Box<dyn BaseLearner>>
    {
        registry.build(self)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_nested_toml() {
        let text = r#"
            learner = "vote"

            [options]
            combination_rule = "majority_voting"

            [[members]]
            learner = "decision_stump"

            [[members]]
            learner = "adaboost_m1"
            options = { num_iterations = 5 }
            base = { learner = "decision_stump" }
        "#;
        let spec = LearnerSpec::from_toml_str(text).unwrap();
        assert_eq!(spec.learner, "vote");
        assert_eq!(spec.members.len(), 2);
        assert_eq!(spec.members[1].options["num_iterations"], 5);
        assert_eq!(
            spec.members[1].base.as_ref().map(|b| b.learner.as_str()),
            Some("decision_stump"),
        );
    }

    #[test]
    fn unknown_option_is_rejected() {
        #[derive(Debug, Default, Deserialize)]
        #[serde(default, deny_unknown_fields)]
        struct Options { num_iterations: usize }

        let spec = LearnerSpec::new("x")
            .options(serde_json::json!({ "num_iteration": 3 }));
        assert!(spec.parse_options::<Options>().is_err());

        let spec = LearnerSpec::new("x");
        assert_eq!(spec.parse_options::<Options>().unwrap().num_iterations, 0);
    }
}
