//! Saved-model files.
//!
//! A trained model is written as JSON:
//!
//! ```json
//! {
//!   "schema": { ... },
//!   "learner": "adaboost_m1",
//!   "model": { ... }
//! }
//! ```
//!
//! `schema` is optional and records the data the model was trained on.
//! `model` is whatever [`Model::to_value`] returns;
//! it is decoded by the [`LearnerRegistry`] entry for `learner`.
use serde::{Serialize, Deserialize};
use serde::de::DeserializeOwned;

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::{
    Model,
    Schema,
    LearnerRegistry,
    error::{EnsembleError, Result},
};


/// A model tagged with the identifier of its learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    /// Registry identifier of the learner that produced the model.
    pub learner: String,
    /// The encoded model.
    pub model: serde_json::Value,
}


impl ModelRecord {
    /// Encodes `model`.
    pub fn encode(model: &dyn Model) -> Result<Self> {
        Ok(Self {
            learner: model.learner().to_string(),
            model: model.to_value()?,
        })
    }


    /// Decodes `self` through `registry`.
    pub fn decode(self, registry: &LearnerRegistry) -> Result<Box<dyn Model>> {
        registry.decode_model(&self.learner, self.model)
    }
}


/// The content of a saved-model file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedModel {
    /// The schema of the training data, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
    /// The model.
    #[serde(flatten)]
    pub record: ModelRecord,
}


impl SavedModel {
    /// Encodes `model`, optionally with the schema it was trained on.
    pub fn new(model: &dyn Model, schema: Option<&Schema>) -> Result<Self> {
        Ok(Self {
            schema: schema.cloned(),
            record: ModelRecord::encode(model)?,
        })
    }


    /// Writes `self` to `path` as JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }


    /// Reads a saved model from `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|source| EnsembleError::ModelFile {
                path: path.to_path_buf(),
                source,
            })?;
        let saved = serde_json::from_reader(BufReader::new(file))?;
        Ok(saved)
    }


    /// Decodes the model through `registry`.
    pub fn into_model(self, registry: &LearnerRegistry)
        -> Result<(Box<dyn Model>, Option<Schema>)>
    {
        let model = self.record.decode(registry)?;
        Ok((model, self.schema))
    }
}


/// Writes `model` (and optionally its training schema) to `path`.
pub fn save_model<P: AsRef<Path>>(
    path: P,
    model: &dyn Model,
    schema: Option<&Schema>,
) -> Result<()>
{
    SavedModel::new(model, schema)?.save(path)
}


/// Reads a model written by [`save_model`].
pub fn load_model<P: AsRef<Path>>(path: P, registry: &LearnerRegistry)
    -> Result<(Box<dyn Model>, Option<Schema>)>
{
    SavedModel::load(path)?.into_model(registry)
}


/// Decodes the JSON value of a `learner` model into `T`.
pub(crate) fn decode_value<T>(learner: &str, value: serde_json::Value)
    -> Result<T>
    where T: DeserializeOwned,
{
    serde_json::from_value(value)
        .map_err(|e| EnsembleError::Decode {
            learner: learner.to_string(),
            reason: e.to_string(),
        })
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Attribute, DecisionStump, Dataset, Instance};

    #[test]
    fn stump_survives_a_file_round_trip() {
        let schema = Schema::new(
            "toy",
            vec![Attribute::numeric("x")],
            Attribute::nominal("y", ["a", "b"]),
        ).unwrap();
        let instances = vec![
            Instance::new(vec![1.0], 0.0),
            Instance::new(vec![2.0], 1.0),
        ];
        let data = Dataset::from_instances(schema, instances).unwrap();
        let model = DecisionStump::init().train(&data);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stump.json");
        save_model(&path, &model, Some(data.schema())).unwrap();

        let registry = LearnerRegistry::default();
        let (loaded, schema) = load_model(&path, &registry).unwrap();
        assert_eq!(schema.as_ref(), Some(data.schema()));
        for instance in data.iter() {
            assert_eq!(
                loaded.distribution(instance).unwrap(),
                model.distribution(instance).unwrap(),
            );
        }
    }

    #[test]
    fn missing_file_is_reported() {
        let registry = LearnerRegistry::default();
        let result = load_model("/nonexistent/model.json", &registry);
        assert!(matches!(result, Err(EnsembleError::ModelFile { .. })));
    }
}
