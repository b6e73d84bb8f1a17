use serde::{Serialize, Deserialize};
use rayon::prelude::*;
use log::debug;

use crate::{
    Dataset,
    Instance,
    LearnerRegistry,
    LogitBoost,
    Model,
    ZeroRModel,
    common::utils,
    constants::*,
    error::{EnsembleError, Result},
    persist::{self, ModelRecord},
};


/// The model trained by [`LogitBoost`].
///
/// Round `t` holds one regression model per class,
/// or a single model for two classes.
/// The class scores are the shrunk, centered sums
/// of the model predictions, mapped to probabilities by a softmax.
///
/// [`Model::distributions`] splits the rounds into
/// `num_threads` contiguous slices scored on a pool of `pool_size` threads.
/// The partial scores are summed afterwards,
/// so the result may differ from [`Model::distribution`]
/// in the last bits.
#[derive(Debug)]
pub struct LogitBoostModel {
    num_classes: usize,
    shrinkage: f64,
    rounds: Vec<Vec<Box<dyn Model>>>,
    fallback: Option<ZeroRModel>,
    pool_size: usize,
    num_threads: usize,
}


impl LogitBoostModel {
    pub(crate) fn new(
        num_classes: usize,
        shrinkage: f64,
        rounds: Vec<Vec<Box<dyn Model>>>,
        fallback: Option<ZeroRModel>,
    ) -> Self
    {
        Self {
            num_classes,
            shrinkage,
            rounds,
            fallback,
            pool_size: DEFAULT_POOL_SIZE,
            num_threads: DEFAULT_NUM_THREADS,
        }
    }


    /// Set the number of threads of the batch scorer.
    pub fn pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size.max(1);
        self
    }


    /// Set the number of round slices of the batch scorer.
    pub fn num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads.max(1);
        self
    }


    /// The models of each round.
    pub fn models(&self) -> &[Vec<Box<dyn Model>>] {
        &self.rounds[..]
    }


    /// Number of rounds.
    pub fn num_iterations_performed(&self) -> usize {
        self.rounds.len()
    }


    // Adds the scores of rounds `lo..hi` for every instance of `data`.
    fn slice_scores(&self, data: &Dataset, lo: usize, hi: usize)
        -> Result<Vec<Vec<f64>>>
    {
        let k = self.num_classes;
        let mut fs = vec![vec![0f64; k]; data.len()];
        for (instance, f) in data.iter().zip(fs.iter_mut()) {
            for models in &self.rounds[lo..hi] {
                add_round_scores(models, self.shrinkage, k, instance, f)?;
            }
        }
        Ok(fs)
    }


    pub(crate) fn decode(value: serde_json::Value, registry: &LearnerRegistry)
        -> Result<Box<dyn Model>>
    {
        let repr: LogitBoostModelRepr
            = persist::decode_value(LogitBoost::NAME, value)?;
        let rounds = repr.rounds.into_iter()
            .map(|models| {
                models.into_iter()
                    .map(|record| record.decode(registry))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        let model = Self::new(repr.num_classes, repr.shrinkage, rounds, repr.fallback)
            .pool_size(repr.pool_size)
            .num_threads(repr.num_threads);
        Ok(Box::new(model))
    }
}


/// Adds the centered scores of one round to `fs`.
/// A missing prediction is an error.
pub(super) fn add_round_scores(
    models: &[Box<dyn Model>],
    shrinkage: f64,
    num_classes: usize,
    instance: &Instance,
    fs: &mut [f64],
) -> Result<()>
{
    let k = num_classes as f64;
    let mut pred = vec![0f64; num_classes];
    let mut pred_sum = 0f64;
    for (j, model) in models.iter().enumerate() {
        let p = shrinkage * model.classify(instance)?;
        if p.is_nan() {
            return Err(EnsembleError::unassigned(LogitBoost::NAME));
        }
        pred[j] = p;
        if num_classes == 2 {
            pred[1] = -p;
            break;
        }
        pred_sum += p;
    }
    pred_sum /= k;

    fs.iter_mut()
        .zip(pred)
        .for_each(|(f, p)| { *f += (p - pred_sum) * (k - 1f64) / k; });
    Ok(())
}


impl Model for LogitBoostModel {
    fn learner(&self) -> &str {
        LogitBoost::NAME
    }


    fn distribution(&self, instance: &Instance) -> Result<Vec<f64>> {
        if let Some(fallback) = self.fallback.as_ref() {
            return fallback.distribution(instance);
        }
        let mut fs = vec![0f64; self.num_classes];
        for models in self.rounds.iter() {
            add_round_scores(models, self.shrinkage, self.num_classes, instance, &mut fs)?;
        }
        Ok(utils::logs2probs(&fs))
    }


    fn distributions(&self, data: &Dataset) -> Result<Vec<Vec<f64>>> {
        if let Some(fallback) = self.fallback.as_ref() {
            return data.iter()
                .map(|instance| fallback.distribution(instance))
                .collect();
        }

        let n_rounds = self.rounds.len();
        let n_workers = self.num_threads;
        let chunk_size = n_rounds / n_workers;
        let slices = (0..n_workers)
            .map(|j| {
                let lo = j * chunk_size;
                let hi = if j + 1 < n_workers { lo + chunk_size } else { n_rounds };
                (lo, hi)
            })
            .collect::<Vec<_>>();
        debug!(
            "{}: scoring {} instances with {n_workers} slices on {} threads",
            LogitBoost::NAME, data.len(), self.pool_size,
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.pool_size)
            .build()
            .map_err(|e| EnsembleError::invalid_parameter(
                "pool_size", self.pool_size, &e.to_string()
            ))?;

        let partials = pool.install(|| {
            slices.par_iter()
                .enumerate()
                .map(|(worker, &(lo, hi))| {
                    self.slice_scores(data, lo, hi)
                        .map_err(|e| EnsembleError::Worker {
                            worker,
                            lo,
                            hi,
                            source: Box::new(e),
                        })
                })
                .collect::<Result<Vec<_>>>()
        })?;

        let mut fs = vec![vec![0f64; self.num_classes]; data.len()];
        for partial in partials {
            fs.iter_mut()
                .zip(partial)
                .for_each(|(f, g)| {
                    f.iter_mut().zip(g).for_each(|(a, b)| { *a += b; });
                });
        }
        Ok(fs.iter().map(|f| utils::logs2probs(f)).collect())
    }


    fn to_value(&self) -> Result<serde_json::Value> {
        let rounds = self.rounds.iter()
            .map(|models| {
                models.iter()
                    .map(|model| ModelRecord::encode(model.as_ref()))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        let repr = LogitBoostModelRepr {
            num_classes: self.num_classes,
            shrinkage: self.shrinkage,
            pool_size: self.pool_size,
            num_threads: self.num_threads,
            rounds,
            fallback: self.fallback.clone(),
        };
        Ok(serde_json::to_value(repr)?)
    }
}


#[derive(Debug, Serialize, Deserialize)]
struct LogitBoostModelRepr {
    num_classes: usize,
    shrinkage: f64,
    pool_size: usize,
    num_threads: usize,
    rounds: Vec<Vec<ModelRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fallback: Option<ZeroRModel>,
}
