use rand::Rng;
use rand::seq::SliceRandom;
use rand_distr::{Distribution, WeightedAliasIndex};
use fixedbitset::FixedBitSet;

use std::ops::{Index, Range};
use std::sync::Arc;

use crate::error::{EnsembleError, Result};
use crate::common::utils;
use super::{Instance, Schema};


/// Struct `Dataset` holds an ordered sequence of instances
/// sharing one schema.
///
/// All the transformations below return a new `Dataset`
/// and leave `self` untouched.
#[derive(Debug, Clone)]
pub struct Dataset {
    schema: Arc<Schema>,
    instances: Vec<Instance>,
}


impl Dataset {
    /// Construct an empty dataset over `schema`.
    pub fn new(schema: Schema) -> Self {
        Self { schema: Arc::new(schema), instances: Vec::new() }
    }


    /// Construct an empty dataset sharing `schema`.
    pub fn with_schema(schema: Arc<Schema>) -> Self {
        Self { schema, instances: Vec::new() }
    }


    /// Construct a dataset from `instances`.
    /// Every instance is checked against `schema`.
    pub fn from_instances(schema: Schema, instances: Vec<Instance>)
        -> Result<Self>
    {
        let mut dataset = Self::new(schema);
        dataset.instances.reserve(instances.len());
        for instance in instances {
            dataset.push(instance)?;
        }
        Ok(dataset)
    }


    // Construct a dataset without checking the instances.
    // Only used for instances that come from a dataset over `schema`.
    pub(crate) fn from_parts(schema: Arc<Schema>, instances: Vec<Instance>)
        -> Self
    {
        Self { schema, instances }
    }


    /// Append `instance` to `self`.
    pub fn push(&mut self, instance: Instance) -> Result<()> {
        self.check_instance(&instance)?;
        self.instances.push(instance);
        Ok(())
    }


    fn check_instance(&self, instance: &Instance) -> Result<()> {
        let n_attributes = self.schema.num_attributes();
        if instance.values().len() != n_attributes {
            return Err(EnsembleError::SchemaMismatch {
                reason: format!(
                    "instance has {} values, schema has {} attributes",
                    instance.values().len(),
                    n_attributes,
                ),
            });
        }

        let w = instance.weight();
        if !w.is_finite() || w < 0f64 {
            return Err(EnsembleError::invalid_parameter(
                "weight", w, "instance weights must be finite and non-negative"
            ));
        }

        let y = instance.class_value();
        if self.schema.class_is_nominal() && !y.is_nan() {
            let k = self.schema.num_classes();
            if y < 0f64 || y.fract() != 0f64 || y as usize >= k {
                return Err(EnsembleError::SchemaMismatch {
                    reason: format!(
                        "class value {y} is not an index into {k} labels"
                    ),
                });
            }
        }
        Ok(())
    }


    /// The schema of `self`.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }


    /// A shared handle to the schema of `self`.
    pub fn schema_arc(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }


    /// Number of instances.
    pub fn len(&self) -> usize {
        self.instances.len()
    }


    /// Returns `true` if `self` has no instances.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }


    /// Number of classes of the class attribute.
    /// See [`Schema::num_classes`].
    pub fn num_classes(&self) -> usize {
        self.schema.num_classes()
    }


    /// Number of predictor attributes.
    pub fn num_attributes(&self) -> usize {
        self.schema.num_attributes()
    }


    /// The instances as a slice.
    pub fn instances(&self) -> &[Instance] {
        &self.instances[..]
    }


    /// Iterator over the instances.
    pub fn iter(&self) -> std::slice::Iter<'_, Instance> {
        self.instances.iter()
    }


    /// Weights of the instances, in order.
    pub fn weights(&self) -> Vec<f64> {
        self.instances.iter()
            .map(Instance::weight)
            .collect()
    }


    /// Class values of the instances, in order.
    pub fn class_values(&self) -> Vec<f64> {
        self.instances.iter()
            .map(Instance::class_value)
            .collect()
    }


    /// Sum of the instance weights.
    pub fn sum_of_weights(&self) -> f64 {
        self.instances.iter()
            .map(Instance::weight)
            .sum::<f64>()
    }


    /// Returns a dataset without the instances whose class is missing.
    pub fn delete_missing_class(&self) -> Self {
        let instances = self.instances.iter()
            .filter(|instance| !instance.class_is_missing())
            .cloned()
            .collect::<Vec<_>>();
        Self::from_parts(self.schema_arc(), instances)
    }


    /// Returns a copy of `self` whose `i`-th weight is `weights[i]`.
    pub fn with_weights(&self, weights: &[f64]) -> Result<Self> {
        self.check_length("weights", weights.len())?;
        let instances = self.instances.iter()
            .zip(weights)
            .map(|(instance, &w)| instance.clone().with_weight(w))
            .collect::<Vec<_>>();
        Ok(Self::from_parts(self.schema_arc(), instances))
    }


    /// Returns a copy of `self` whose `i`-th class value is `targets[i]`.
    /// The schema is kept, so this is meant for numeric classes,
    /// e.g., residuals of an additive model.
    pub fn with_class_values(&self, targets: &[f64]) -> Result<Self> {
        self.check_length("targets", targets.len())?;
        let instances = self.instances.iter()
            .zip(targets)
            .map(|(instance, &y)| instance.with_class_value(y))
            .collect::<Vec<_>>();
        Ok(Self::from_parts(self.schema_arc(), instances))
    }


    /// Returns a copy of `self` over a numeric class named `name`,
    /// with class values `targets` and weights `weights`.
    pub fn with_numeric_class(
        &self,
        name: &str,
        targets: &[f64],
        weights: &[f64],
    ) -> Result<Self>
    {
        self.check_length("targets", targets.len())?;
        self.check_length("weights", weights.len())?;
        let schema = Arc::new(self.schema.with_numeric_class(name));
        let instances = self.instances.iter()
            .zip(targets.iter().zip(weights))
            .map(|(instance, (&y, &w))| {
                instance.with_class_value(y).with_weight(w)
            })
            .collect::<Vec<_>>();
        Ok(Self::from_parts(schema, instances))
    }


    fn check_length(&self, name: &str, len: usize) -> Result<()> {
        if len != self.len() {
            return Err(EnsembleError::invalid_parameter(
                name,
                len,
                &format!("expected {} entries", self.len()),
            ));
        }
        Ok(())
    }


    /// Returns the instances in `range` as a new dataset.
    pub fn subset(&self, range: Range<usize>) -> Self {
        let instances = self.instances[range].to_vec();
        Self::from_parts(self.schema_arc(), instances)
    }


    /// Shuffles the instances of `self` in place.
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.instances.shuffle(rng);
    }


    /// Creates a new dataset of the same size
    /// by sampling with replacement,
    /// where each draw picks instance `i`
    /// with probability proportional to `weights[i]`.
    /// The instances of the new dataset have unit weight.
    ///
    /// Calling this twice with identically seeded generators
    /// yields identical datasets.
    pub fn resample_with_weights<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        weights: &[f64],
    ) -> Result<Self>
    {
        self.resample(rng, weights, None, false)
    }


    /// General form of [`Dataset::resample_with_weights`].
    ///
    /// - `sampled` (if given) marks every instance drawn at least once.
    ///   It is grown to `self.len()` if needed.
    /// - If `represent_copies_using_weights` is `true`,
    ///   each distinct drawn instance appears once,
    ///   with weight equal to the number of times it was drawn.
    pub fn resample<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        weights: &[f64],
        mut sampled: Option<&mut FixedBitSet>,
        represent_copies_using_weights: bool,
    ) -> Result<Self>
    {
        self.check_length("weights", weights.len())?;
        let n_sample = self.len();
        if n_sample == 0 {
            return Ok(Self::with_schema(self.schema_arc()));
        }

        let alias = WeightedAliasIndex::new(weights.to_vec())
            .map_err(|e| EnsembleError::Sampling {
                reason: format!("cannot sample from weights: {e}"),
            })?;

        if let Some(bits) = sampled.as_deref_mut() {
            bits.grow(n_sample);
        }

        let mut counts = vec![0_usize; n_sample];
        for _ in 0..n_sample {
            let i = alias.sample(rng);
            counts[i] += 1;
            if let Some(bits) = sampled.as_deref_mut() {
                bits.insert(i);
            }
        }

        let instances = if represent_copies_using_weights {
            self.instances.iter()
                .zip(counts)
                .filter(|(_, c)| *c > 0)
                .map(|(instance, c)| instance.clone().with_weight(c as f64))
                .collect::<Vec<_>>()
        } else {
            let mut instances = Vec::with_capacity(n_sample);
            for (instance, c) in self.instances.iter().zip(counts) {
                let copy = instance.clone().with_weight(1f64);
                instances.extend(std::iter::repeat(copy).take(c));
            }
            instances
        };
        Ok(Self::from_parts(self.schema_arc(), instances))
    }


    /// Returns the highest-weighted instances
    /// whose total weight exceeds `quantile` times the total weight.
    ///
    /// Instances are taken in descending order of weight.
    /// The boundary weight group is never split:
    /// every instance sharing the weight of the last selected one
    /// is selected as well.
    pub fn select_weight_quantile(&self, quantile: f64) -> Self {
        let weights = self.weights();
        let mass_to_select = utils::sum(&weights) * quantile;
        let sorted = utils::sort_indices(&weights);

        let mut selected = Vec::new();
        let mut mass = 0f64;
        for pos in (0..sorted.len()).rev() {
            let i = sorted[pos];
            selected.push(self.instances[i].clone());
            mass += weights[i];
            if mass > mass_to_select
                && pos > 0
                && weights[i] != weights[sorted[pos - 1]]
            {
                break;
            }
        }
        Self::from_parts(self.schema_arc(), selected)
    }


    /// Weighted mean of the non-missing class values.
    /// Returns `NaN` if there is no such value.
    pub fn mean_of_class(&self) -> f64 {
        let (sum, total) = self.instances.iter()
            .filter(|instance| !instance.class_is_missing())
            .fold((0f64, 0f64), |(s, t), instance| {
                let w = instance.weight();
                (s + w * instance.class_value(), t + w)
            });
        if total > 0f64 { sum / total } else { f64::NAN }
    }


    /// The `k`-th smallest (zero-based) non-missing class value.
    /// Instance weights are ignored.
    pub fn kth_smallest_class_value(&self, k: usize) -> Option<f64> {
        let values = self.instances.iter()
            .map(Instance::class_value)
            .filter(|y| !y.is_nan())
            .collect::<Vec<_>>();
        utils::kth_smallest(&values, k)
    }


    /// Sum of weights per class of a nominal class.
    /// Instances with a missing class are skipped.
    pub fn class_counts(&self) -> Vec<f64> {
        let mut counts = vec![0f64; self.num_classes()];
        for instance in self.instances.iter() {
            if instance.class_is_missing() {
                continue;
            }
            let y = instance.class_value() as usize;
            if let Some(c) = counts.get_mut(y) {
                *c += instance.weight();
            }
        }
        counts
    }
}


impl Index<usize> for Dataset {
    type Output = Instance;
    fn index(&self, index: usize) -> &Self::Output {
        &self.instances[index]
    }
}


impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Instance;
    type IntoIter = std::slice::Iter<'a, Instance>;
    fn into_iter(self) -> Self::IntoIter {
        self.instances.iter()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::Attribute;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn dataset(weights: &[f64]) -> Dataset {
        let schema = Schema::new(
            "toy",
            vec![Attribute::numeric("x")],
            Attribute::nominal("y", ["a", "b"]),
        ).unwrap();
        let instances = weights.iter()
            .enumerate()
            .map(|(i, &w)| {
                Instance::new(vec![i as f64], (i % 2) as f64).with_weight(w)
            })
            .collect();
        Dataset::from_instances(schema, instances).unwrap()
    }

    #[test]
    fn weight_quantile_keeps_heaviest() {
        let data = dataset(&[1.0, 1.0, 1.0, 1.0, 6.0]);
        let selected = data.select_weight_quantile(0.5);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].weight(), 6.0);
    }

    #[test]
    fn weight_quantile_never_splits_ties() {
        let data = dataset(&[2.0, 2.0, 2.0, 2.0, 2.0]);
        let selected = data.select_weight_quantile(0.3);
        assert_eq!(selected.len(), 5);
    }

    #[test]
    fn resample_is_reproducible() {
        let data = dataset(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
        let weights = data.weights();

        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let a = data.resample_with_weights(&mut rng, &weights).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let b = data.resample_with_weights(&mut rng, &weights).unwrap();

        assert_eq!(a.len(), data.len());
        assert_eq!(a.instances(), b.instances());
        assert!(a.iter().all(|instance| instance.weight() == 1.0));
    }

    #[test]
    fn resample_counts_as_weights() {
        let data = dataset(&[1.0; 8]);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut bits = FixedBitSet::new();
        let bag = data.resample(
            &mut rng, &data.weights(), Some(&mut bits), true
        ).unwrap();

        assert_eq!(bag.sum_of_weights(), 8.0);
        assert_eq!(bag.len(), bits.count_ones(..));
    }

    #[test]
    fn resample_rejects_zero_weights() {
        let data = dataset(&[0.0, 0.0, 0.0]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let result = data.resample_with_weights(&mut rng, &data.weights());
        assert!(matches!(result, Err(EnsembleError::Sampling { .. })));
    }

    #[test]
    fn delete_missing_class() {
        let mut data = dataset(&[1.0, 1.0]);
        data.push(Instance::new(vec![3.0], f64::NAN)).unwrap();
        assert_eq!(data.len(), 3);
        assert_eq!(data.delete_missing_class().len(), 2);
    }

    #[test]
    fn class_value_out_of_range() {
        let mut data = dataset(&[1.0]);
        let result = data.push(Instance::new(vec![1.0], 2.0));
        assert!(result.is_err());
    }
}
