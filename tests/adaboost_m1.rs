use meta_ensembles::prelude::*;
use meta_ensembles::AdaBoostM1Model;

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};


fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}


// Class `pos` on the middle half of the line,
// so that no single stump separates the classes.
fn interleaved() -> Dataset {
    let schema = Schema::new(
        "interleaved",
        vec![Attribute::numeric("x")],
        Attribute::nominal("class", ["neg", "pos"]),
    ).unwrap();
    let instances = (0..20)
        .map(|i| {
            let y = if (5..15).contains(&i) { 1.0 } else { 0.0 };
            Instance::new(vec![i as f64], y)
        })
        .collect();
    Dataset::from_instances(schema, instances).unwrap()
}


// Labels `x >= 5` as class 1 on `x = 0, ..., 9`.
// Instance `i` has weight `i + 1`; `flip` relabels `x = 0`.
fn threshold(flip: bool) -> Dataset {
    let schema = Schema::new(
        "threshold",
        vec![Attribute::numeric("x")],
        Attribute::nominal("class", ["low", "high"]),
    ).unwrap();
    let instances = (0..10)
        .map(|i| {
            let y = if i >= 5 || (flip && i == 0) { 1.0 } else { 0.0 };
            Instance::new(vec![i as f64], y).with_weight((i + 1) as f64)
        })
        .collect();
    Dataset::from_instances(schema, instances).unwrap()
}


#[derive(Debug)]
struct ThresholdModel;


impl Model for ThresholdModel {
    fn learner(&self) -> &str {
        "threshold"
    }

    fn distribution(&self, instance: &Instance) -> Result<Vec<f64>> {
        if instance.value(0) >= 5.0 {
            Ok(vec![0.0, 1.0])
        } else {
            Ok(vec![1.0, 0.0])
        }
    }

    fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::Value::Null)
    }
}


// Always returns `ThresholdModel`, recording the size of every
// training set. Fails on fit number `fail_on` (one-based).
#[derive(Debug, Clone, Default)]
struct Recorder {
    weighted: bool,
    fail_on: Option<usize>,
    fits: Arc<AtomicUsize>,
    sizes: Arc<Mutex<Vec<usize>>>,
}


impl BaseLearner for Recorder {
    fn name(&self) -> &str {
        "threshold"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            weighted_instances: self.weighted,
            nominal_class: true,
            ..Capabilities::default()
        }
    }

    fn fit(&self, data: &Dataset) -> Result<Box<dyn Model>> {
        let n = self.fits.fetch_add(1, Ordering::SeqCst) + 1;
        self.sizes.lock().unwrap().push(data.len());
        if self.fail_on == Some(n) {
            return Err(EnsembleError::EmptyDataset);
        }
        Ok(Box::new(ThresholdModel))
    }

    fn fresh(&self) -> Box<dyn BaseLearner> {
        Box::new(self.clone())
    }
}


/// Tests for `AdaBoostM1`.
#[cfg(test)]
pub mod adaboost_m1_tests {
    use super::*;

    fn train(data: &Dataset) -> AdaBoostM1Model {
        AdaBoostM1::default()
            .num_iterations(10)
            .train(data)
            .unwrap()
    }

    #[test]
    fn betas_are_nonnegative() {
        init_logger();
        let data = interleaved();
        let f = train(&data);
        assert!(f.num_iterations_performed() >= 1);
        assert!(f.betas().iter().all(|beta| *beta >= 0.0));
    }

    #[test]
    fn last_round_matters() {
        init_logger();
        let data = interleaved();
        let mut f = train(&data);
        let n = f.num_iterations_performed();
        assert!(n >= 2, "expected several rounds, got {n}");

        let before = f.distributions(&data).unwrap();
        f.truncate(n - 1);
        let after = f.distributions(&data).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn training_error_decreases_with_rounds() {
        init_logger();
        let data = interleaved();
        let error = |f: &AdaBoostM1Model| {
            data.iter()
                .filter(|x| f.classify(x).unwrap() != x.class_value())
                .count()
        };
        let one = AdaBoostM1::default().num_iterations(1).train(&data).unwrap();
        let many = train(&data);
        assert!(error(&many) < error(&one));
    }

    #[test]
    fn resampling_is_reproducible() {
        init_logger();
        let data = interleaved();
        let booster = AdaBoostM1::default()
            .use_resampling(true)
            .seed(42);
        let f = booster.train(&data).unwrap();
        let g = booster.train(&data).unwrap();
        assert_eq!(f.betas(), g.betas());
    }

    #[test]
    fn weight_threshold_trains_on_the_heaviest_instances() {
        init_logger();
        let data = threshold(false);
        let learner = Recorder { weighted: true, ..Recorder::default() };
        let sizes = Arc::clone(&learner.sizes);
        AdaBoostM1::init(Box::new(learner))
            .weight_threshold(50)
            .num_iterations(1)
            .train(&data)
            .unwrap();
        // Weights 10, 9, 8 sum to 27 out of 55; weight 7 crosses half.
        assert_eq!(*sizes.lock().unwrap(), vec![4]);
    }

    #[test]
    fn failed_fit_aborts_training() {
        init_logger();
        let data = threshold(true);
        let learner = Recorder {
            weighted: true,
            fail_on: Some(2),
            ..Recorder::default()
        };
        let fits = Arc::clone(&learner.fits);
        let result = AdaBoostM1::init(Box::new(learner))
            .num_iterations(10)
            .train(&data);
        assert!(matches!(result, Err(EnsembleError::Round { round: 2, .. })));
        assert_eq!(fits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn perfect_resampled_rounds_are_retried_ten_times() {
        init_logger();
        let data = threshold(false);
        let learner = Recorder::default();
        let fits = Arc::clone(&learner.fits);
        let f = AdaBoostM1::init(Box::new(learner))
            .num_iterations(10)
            .train(&data)
            .unwrap();
        assert_eq!(fits.load(Ordering::SeqCst), 10);
        assert_eq!(f.num_iterations_performed(), 1);
    }
}
