use meta_ensembles::prelude::*;


fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}


fn balanced() -> Dataset {
    let schema = Schema::new(
        "balanced",
        vec![Attribute::numeric("x")],
        Attribute::nominal("class", ["cheap", "costly"]),
    ).unwrap();
    let instances = (0..10)
        .map(|i| Instance::new(vec![(i % 2) as f64], (i / 5) as f64))
        .collect();
    Dataset::from_instances(schema, instances).unwrap()
}


fn matrix() -> CostMatrix {
    CostMatrix::from_rows(vec![vec![0.0, 1.0], vec![5.0, 0.0]]).unwrap()
}


/// Tests for `CostSensitiveClassifier`.
#[cfg(test)]
pub mod cost_sensitive_tests {
    use super::*;

    #[test]
    fn minimum_expected_cost_is_predicted() {
        init_logger();
        let data = balanced();
        let f = CostSensitiveClassifier::init(Box::new(ZeroR::init()))
            .cost_matrix(matrix())
            .minimize_expected_cost(true)
            .train(&data)
            .unwrap();
        let dist = f.distribution(&data[0]).unwrap();
        assert_eq!(dist, vec![0.0, 1.0]);
    }

    #[test]
    fn reweighting_favours_the_costly_class() {
        init_logger();
        let data = balanced();
        let f = CostSensitiveClassifier::init(Box::new(ZeroR::init()))
            .cost_matrix(matrix())
            .train(&data)
            .unwrap();
        let dist = f.distribution(&data[0]).unwrap();
        assert!(dist[1] > dist[0], "dist = {dist:?}");
    }

    #[test]
    fn matrix_size_must_match_classes() {
        init_logger();
        let data = balanced();
        let result = CostSensitiveClassifier::default()
            .cost_matrix(CostMatrix::new(3))
            .train(&data);
        assert!(result.is_err());
    }
}
