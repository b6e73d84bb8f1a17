use serde::{Serialize, Deserialize};

use std::fmt;

use crate::{
    CostSensitiveClassifier,
    Dataset,
    Instance,
    LearnerRegistry,
    Model,
    common::utils,
    error::Result,
    persist::{self, ModelRecord},
};
use super::CostMatrix;


/// The model trained by [`CostSensitiveClassifier`].
#[derive(Debug)]
pub struct CostSensitiveModel {
    inner: Box<dyn Model>,
    matrix: CostMatrix,
    minimize_expected_cost: bool,
}


impl CostSensitiveModel {
    pub(super) fn new(
        inner: Box<dyn Model>,
        matrix: CostMatrix,
        minimize_expected_cost: bool,
    ) -> Self
    {
        Self { inner, matrix, minimize_expected_cost }
    }


    /// The model of the base learner.
    pub fn inner(&self) -> &dyn Model {
        self.inner.as_ref()
    }


    /// The cost matrix used for training or prediction.
    pub fn cost_matrix(&self) -> &CostMatrix {
        &self.matrix
    }


    /// Replaces `dist` by the one-hot vector
    /// at the class of minimum expected cost.
    fn convert(&self, dist: Vec<f64>) -> Result<Vec<f64>> {
        let costs = self.matrix.expected_costs(&dist)?;
        let best = utils::min_index(&costs);
        let one_hot = (0..dist.len())
            .map(|c| if c == best { 1f64 } else { 0f64 })
            .collect();
        Ok(one_hot)
    }


    pub(crate) fn decode(value: serde_json::Value, registry: &LearnerRegistry)
        -> Result<Box<dyn Model>>
    {
        let repr: CostSensitiveModelRepr
            = persist::decode_value(CostSensitiveClassifier::NAME, value)?;
        let model = Self::new(
            repr.inner.decode(registry)?,
            repr.matrix,
            repr.minimize_expected_cost,
        );
        Ok(Box::new(model))
    }
}


impl Model for CostSensitiveModel {
    fn learner(&self) -> &str {
        CostSensitiveClassifier::NAME
    }


    fn distribution(&self, instance: &Instance) -> Result<Vec<f64>> {
        let dist = self.inner.distribution(instance)?;
        if self.minimize_expected_cost {
            self.convert(dist)
        } else {
            Ok(dist)
        }
    }


    fn distributions(&self, data: &Dataset) -> Result<Vec<Vec<f64>>> {
        let dists = self.inner.distributions(data)?;
        if !self.minimize_expected_cost {
            return Ok(dists);
        }
        dists.into_iter()
            .map(|dist| self.convert(dist))
            .collect()
    }


    fn to_value(&self) -> Result<serde_json::Value> {
        let repr = CostSensitiveModelRepr {
            inner: ModelRecord::encode(self.inner.as_ref())?,
            matrix: self.matrix.clone(),
            minimize_expected_cost: self.minimize_expected_cost,
        };
        Ok(serde_json::to_value(repr)?)
    }
}


impl fmt::Display for CostSensitiveModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mode = if self.minimize_expected_cost {
            "Minimizing expected cost"
        } else {
            "Reweighted training data"
        };
        writeln!(f, "CostSensitiveClassifier using {mode}")?;
        writeln!(f)?;
        writeln!(f, "Cost matrix:")?;
        write!(f, "{}", self.matrix)?;
        writeln!(f)?;
        writeln!(f, "Base model: {}", self.inner.learner())
    }
}


#[derive(Debug, Serialize, Deserialize)]
struct CostSensitiveModelRepr {
    inner: ModelRecord,
    matrix: CostMatrix,
    minimize_expected_cost: bool,
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Attribute, Schema, ZeroRModel};

    fn undecided() -> Box<dyn Model> {
        Box::new(ZeroRModel::Nominal { counts: vec![1.0, 1.0] })
    }

    fn matrix() -> CostMatrix {
        CostMatrix::parse_matlab("[0 1; 5 0]").unwrap()
    }

    #[test]
    fn minimum_expected_cost_is_one_hot() {
        let model = CostSensitiveModel::new(undecided(), matrix(), true);
        let dist = model.distribution(&Instance::unlabeled(vec![])).unwrap();
        // Expected costs are [2.5, 0.5].
        assert_eq!(dist, vec![0.0, 1.0]);
        assert_eq!(model.classify(&Instance::unlabeled(vec![])).unwrap(), 1.0);
    }

    #[test]
    fn reweighting_mode_passes_distributions_through() {
        let model = CostSensitiveModel::new(undecided(), matrix(), false);
        let dist = model.distribution(&Instance::unlabeled(vec![])).unwrap();
        assert_eq!(dist, vec![0.5, 0.5]);
    }

    #[test]
    fn batch_rows_are_converted() {
        let schema = Schema::new(
            "toy", vec![], Attribute::nominal("y", ["a", "b"]),
        ).unwrap();
        let instances = vec![Instance::unlabeled(vec![]); 3];
        let data = Dataset::from_instances(schema, instances).unwrap();
        let model = CostSensitiveModel::new(undecided(), matrix(), true);
        let dists = model.distributions(&data).unwrap();
        assert!(dists.iter().all(|dist| dist == &vec![0.0, 1.0]));
    }
}
