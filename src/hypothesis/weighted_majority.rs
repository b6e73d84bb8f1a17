use serde::{Serialize, Deserialize};
use crate::{
    Instance,
    Model,
    LearnerRegistry,
    common::utils,
    error::Result,
    persist::ModelRecord,
};


/// A weighted vote over trained models.
///
/// Each hypothesis casts its weight for the class it predicts.
/// The vote totals are then mapped to a probability vector
/// by `logs2probs`, i.e., they act as log-odds.
#[derive(Debug, Default)]
pub struct WeightedMajority {
    /// Weights on each hypothesis in `self.hypotheses`.
    pub weights: Vec<f64>,
    /// Set of hypotheses.
    pub hypotheses: Vec<Box<dyn Model>>,
}


impl WeightedMajority {
    /// Construct an empty `WeightedMajority`.
    pub fn new() -> Self {
        Self::default()
    }


    /// Append a pair `(weight, hypothesis)` to the current vote.
    #[inline]
    pub fn push(&mut self, weight: f64, hypothesis: Box<dyn Model>) {
        self.weights.push(weight);
        self.hypotheses.push(hypothesis);
    }


    /// Number of hypotheses.
    pub fn len(&self) -> usize {
        self.hypotheses.len()
    }


    /// Returns `true` if `self` holds no hypothesis.
    pub fn is_empty(&self) -> bool {
        self.hypotheses.is_empty()
    }


    /// Keeps the first `len` hypotheses.
    pub fn truncate(&mut self, len: usize) {
        self.weights.truncate(len);
        self.hypotheses.truncate(len);
    }


    /// Decompose the vote
    /// into the two vectors `Vec<f64>` and `Vec<Box<dyn Model>>`
    #[inline]
    pub fn decompose(self) -> (Vec<f64>, Vec<Box<dyn Model>>) {
        (self.weights, self.hypotheses)
    }


    /// Returns `logs2probs(sums)`, where `sums[c]` is the total weight
    /// of the hypotheses predicting class `c` for `instance`.
    /// A hypothesis that predicts a missing class casts no vote.
    pub fn vote(&self, instance: &Instance, num_classes: usize)
        -> Result<Vec<f64>>
    {
        let mut sums = vec![0f64; num_classes];
        for (w, h) in self.weights.iter().zip(&self.hypotheses[..]) {
            let c = h.classify(instance)?;
            if c.is_nan() {
                continue;
            }
            if let Some(s) = sums.get_mut(c as usize) {
                *s += *w;
            }
        }
        Ok(utils::logs2probs(&sums))
    }


    pub(crate) fn to_repr(&self) -> Result<WeightedMajorityRepr> {
        let hypotheses = self.hypotheses.iter()
            .map(|h| ModelRecord::encode(h.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(WeightedMajorityRepr { weights: self.weights.clone(), hypotheses })
    }


    pub(crate) fn from_repr(
        repr: WeightedMajorityRepr,
        registry: &LearnerRegistry,
    ) -> Result<Self>
    {
        let hypotheses = repr.hypotheses.into_iter()
            .map(|record| record.decode(registry))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { weights: repr.weights, hypotheses })
    }
}


#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WeightedMajorityRepr {
    weights: Vec<f64>,
    hypotheses: Vec<ModelRecord>,
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::ZeroRModel;
    use approx::assert_abs_diff_eq;

    fn constant(counts: Vec<f64>) -> Box<dyn Model> {
        Box::new(ZeroRModel::Nominal { counts })
    }

    #[test]
    fn vote_uses_logs2probs() {
        let mut f = WeightedMajority::new();
        f.push(1.0, constant(vec![3.0, 1.0]));
        f.push(2f64.ln() + 1.0, constant(vec![1.0, 3.0]));

        let x = Instance::unlabeled(vec![]);
        let dist = f.vote(&x, 2).unwrap();
        // exp(1) : exp(1 + ln 2) = 1 : 2
        assert_abs_diff_eq!(dist[0], 1.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(dist[1], 2.0 / 3.0, epsilon = 1e-12);
    }
}
