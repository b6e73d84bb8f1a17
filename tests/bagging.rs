use meta_ensembles::prelude::*;
use meta_ensembles::EnsembleError;


fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}


fn threshold_data() -> Dataset {
    let schema = Schema::new(
        "threshold",
        vec![Attribute::numeric("x")],
        Attribute::nominal("class", ["no", "yes"]),
    ).unwrap();
    let instances = (0..40)
        .map(|i| Instance::new(vec![i as f64], if i >= 20 { 1.0 } else { 0.0 }))
        .collect();
    Dataset::from_instances(schema, instances).unwrap()
}


/// Tests for `Bagging`.
#[cfg(test)]
pub mod bagging_tests {
    use super::*;

    #[test]
    fn out_of_bag_needs_full_bags() {
        init_logger();
        let data = threshold_data();
        let result = Bagging::default()
            .bag_size_percent(60)
            .calc_out_of_bag(true)
            .train(&data);
        assert!(matches!(result, Err(EnsembleError::InvalidParameter { .. })));
    }

    #[test]
    fn out_of_bag_error_is_a_rate() {
        init_logger();
        let data = threshold_data();
        let f = Bagging::default()
            .num_iterations(10)
            .calc_out_of_bag(true)
            .train(&data)
            .unwrap();
        assert_eq!(f.num_iterations(), 10);
        let error = f.measure_out_of_bag_error();
        assert!((0.0..=1.0).contains(&error), "error = {error}");
        assert!(error < 0.25);
    }

    #[test]
    fn same_seed_same_ensemble() {
        init_logger();
        let data = threshold_data();
        let bagging = Bagging::default()
            .num_iterations(5)
            .seed(7)
            .bag_size_percent(50);
        let f = bagging.train(&data).unwrap();
        let g = bagging.train(&data).unwrap();
        assert_eq!(
            f.distributions(&data).unwrap(),
            g.distributions(&data).unwrap(),
        );
    }
}
