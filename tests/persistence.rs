use meta_ensembles::prelude::*;
use approx::assert_abs_diff_eq;


fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}


fn data() -> Dataset {
    let schema = Schema::new(
        "persist",
        vec![Attribute::numeric("x"), Attribute::numeric("z")],
        Attribute::nominal("class", ["a", "b"]),
    ).unwrap();
    let instances = (0..16)
        .map(|i| {
            let z = ((i * 5) % 7) as f64;
            Instance::new(vec![i as f64, z], if i % 4 < 2 { 0.0 } else { 1.0 })
        })
        .collect();
    Dataset::from_instances(schema, instances).unwrap()
}


/// Tests for model persistence and TOML configuration.
#[cfg(test)]
pub mod persistence_tests {
    use super::*;

    #[test]
    fn saved_model_predicts_the_same() {
        init_logger();
        let data = data();
        let model = Bagging::init(Box::new(AdaBoostM1::default().num_iterations(3)))
            .num_iterations(4)
            .train(&data)
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bagging.json");
        save_model(&path, &model, Some(data.schema())).unwrap();

        let registry = LearnerRegistry::default();
        let (loaded, schema) = load_model(&path, &registry).unwrap();
        assert_eq!(loaded.learner(), "bagging");
        assert_eq!(schema.as_ref(), Some(data.schema()));
        let before = model.distributions(&data).unwrap();
        let after = loaded.distributions(&data).unwrap();
        for (a, b) in before.iter().flatten().zip(after.iter().flatten()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-9);
        }
    }

    #[test]
    fn toml_configuration_builds_a_nested_learner() {
        init_logger();
        let text = r#"
            learner = "cost_sensitive"

            [options]
            minimize_expected_cost = true
            matrix_source = { kind = "supplied", matrix = [[0.0, 1.0], [5.0, 0.0]] }

            [base]
            learner = "logit_boost"

            [base.options]
            num_iterations = 5

            [base.base]
            learner = "decision_stump"
        "#;
        let spec = LearnerSpec::from_toml_str(text).unwrap();
        let registry = LearnerRegistry::default();
        let learner = spec.build(&registry).unwrap();
        assert_eq!(learner.name(), "cost_sensitive");

        let data = data();
        let model = learner.fit(&data).unwrap();
        for instance in data.iter() {
            let dist = model.distribution(instance).unwrap();
            assert_eq!(dist.iter().filter(|p| **p == 1.0).count(), 1);
        }
    }

    #[test]
    fn unknown_learner_is_an_error() {
        let spec = LearnerSpec::new("random_forest");
        let registry = LearnerRegistry::default();
        assert!(spec.build(&registry).is_err());
    }
}
