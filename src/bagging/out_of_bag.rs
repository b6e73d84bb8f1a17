use serde::{Serialize, Deserialize};
use fixedbitset::FixedBitSet;
use rayon::prelude::*;

use crate::{
    Dataset,
    Instance,
    Model,
    common::utils,
    error::Result,
};


/// The out-of-bag prediction for one training instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutOfBagPrediction {
    /// Index of the instance in the training data
    /// (after instances with a missing class were removed).
    pub index: usize,
    /// Averaged prediction of the models
    /// that did not see the instance.
    pub distribution: Vec<f64>,
}


/// Out-of-bag estimate of a bagged ensemble.
///
/// An instance is evaluated only by the models whose bag did not contain it.
/// Instances that were in every bag are not evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutOfBag {
    /// Weighted error rate for a nominal class,
    /// weighted mean absolute error for a numeric class.
    /// `NaN` if no instance was evaluated.
    pub error: f64,
    /// Number of evaluated instances.
    pub num_evaluated: usize,
    /// Per-instance predictions, if they were requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predictions: Option<Vec<OutOfBagPrediction>>,
}


impl OutOfBag {
    /// Evaluates `models` on the instances of `data` they did not see.
    /// `in_bag[j]` marks the instances in the bag of `models[j]`.
    pub(super) fn evaluate(
        data: &Dataset,
        models: &[Box<dyn Model>],
        in_bag: &[FixedBitSet],
        store_predictions: bool,
    ) -> Result<Self>
    {
        let numeric = data.schema().class_is_numeric();
        let num_classes = data.num_classes();

        let votes = data.instances()
            .par_iter()
            .enumerate()
            .map(|(i, instance)| {
                let voters = models.iter()
                    .zip(in_bag)
                    .filter(|(_, bag)| !bag.contains(i))
                    .map(|(model, _)| model.as_ref());
                if numeric {
                    numeric_vote(voters, instance)
                } else {
                    nominal_vote(voters, instance, num_classes)
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let mut loss = 0f64;
        let mut total = 0f64;
        let mut predictions = Vec::new();
        for (i, (instance, vote)) in data.iter().zip(votes).enumerate() {
            let Some(dist) = vote else { continue; };

            let w = instance.weight();
            total += w;
            loss += if numeric {
                w * (dist[0] - instance.class_value()).abs()
            } else if utils::max_index(&dist) as f64 != instance.class_value() {
                w
            } else {
                0f64
            };
            predictions.push(OutOfBagPrediction { index: i, distribution: dist });
        }

        let error = if total > 0f64 { loss / total } else { f64::NAN };
        Ok(Self {
            error,
            num_evaluated: predictions.len(),
            predictions: store_predictions.then_some(predictions),
        })
    }
}


// Mean of the non-missing predictions, if any.
fn numeric_vote<'a, I>(voters: I, instance: &Instance)
    -> Result<Option<Vec<f64>>>
    where I: Iterator<Item = &'a dyn Model>,
{
    let mut sum = 0f64;
    let mut count = 0usize;
    for model in voters {
        let p = model.classify(instance)?;
        if !p.is_nan() {
            sum += p;
            count += 1;
        }
    }
    if count == 0 {
        return Ok(None);
    }
    Ok(Some(vec![sum / count as f64]))
}


// Normalized sum of the distributions, if it is positive.
fn nominal_vote<'a, I>(voters: I, instance: &Instance, num_classes: usize)
    -> Result<Option<Vec<f64>>>
    where I: Iterator<Item = &'a dyn Model>,
{
    let mut votes = vec![0f64; num_classes];
    for model in voters {
        let dist = model.distribution(instance)?;
        votes.iter_mut()
            .zip(dist)
            .for_each(|(v, p)| { *v += p; });
    }
    let total = utils::sum(&votes);
    if total <= 0f64 {
        return Ok(None);
    }
    utils::normalize_by(&mut votes, total);
    Ok(Some(votes))
}
