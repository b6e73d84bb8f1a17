use meta_ensembles::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;


fn weighted(weights: &[f64]) -> Dataset {
    let schema = Schema::new(
        "weighted",
        vec![Attribute::numeric("x")],
        Attribute::nominal("class", ["a", "b"]),
    ).unwrap();
    let instances = weights.iter()
        .enumerate()
        .map(|(i, w)| Instance::new(vec![i as f64], (i % 2) as f64).with_weight(*w))
        .collect();
    Dataset::from_instances(schema, instances).unwrap()
}


/// Tests for `Dataset`.
#[cfg(test)]
pub mod dataset_tests {
    use super::*;

    #[test]
    fn resampling_is_deterministic() {
        let data = weighted(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let weights = data.weights();

        let mut rng = ChaCha8Rng::seed_from_u64(1234);
        let a = data.resample_with_weights(&mut rng, &weights).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1234);
        let b = data.resample_with_weights(&mut rng, &weights).unwrap();

        assert_eq!(a.len(), data.len());
        let values = |d: &Dataset| d.iter()
            .map(|x| x.value(0))
            .collect::<Vec<_>>();
        assert_eq!(values(&a), values(&b));
        assert!(a.iter().all(|x| x.weight() == 1.0));
    }

    #[test]
    fn weight_quantile_keeps_the_heavy_instances() {
        let data = weighted(&[1.0, 1.0, 1.0, 1.0, 6.0]);
        let kept = data.select_weight_quantile(0.5);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].weight(), 6.0);
    }

    #[test]
    fn weight_quantile_keeps_ties() {
        let data = weighted(&[2.0; 5]);
        let kept = data.select_weight_quantile(0.5);
        assert_eq!(kept.len(), 5);
    }

    #[test]
    fn missing_classes_are_deleted() {
        let mut data = weighted(&[1.0, 1.0, 1.0]);
        data.push(Instance::new(vec![9.0], f64::NAN)).unwrap();
        assert_eq!(data.len(), 4);
        assert_eq!(data.delete_missing_class().len(), 3);
    }
}
