//! Numeric constants and option defaults.

/// Two doubles closer than this are considered equal.
pub const SMALL: f64 = 1e-6;

/// Maximal number of resampling attempts AdaBoostM1 makes
/// when a resampled round fits the training data perfectly.
pub const MAX_NUM_RESAMPLING_ITERATIONS: usize = 10;

/// Default number of rounds.
pub const DEFAULT_NUM_ITERATIONS: usize = 10;
/// Default random seed.
pub const DEFAULT_SEED: u64 = 1;
/// Default weight-mass percentage trained on per round.
pub const DEFAULT_WEIGHT_THRESHOLD: u32 = 100;
/// Default learning rate.
pub const DEFAULT_SHRINKAGE: f64 = 1.0;
/// Default bound on the LogitBoost working response.
pub const DEFAULT_Z_MAX: f64 = 3.0;
/// Default number of worker threads.
pub const DEFAULT_POOL_SIZE: usize = 1;
/// Default number of round slices of the LogitBoost batch scorer.
pub const DEFAULT_NUM_THREADS: usize = 1;
/// Default minimal log-likelihood improvement of LogitBoost.
pub const DEFAULT_LIKELIHOOD_THRESHOLD: f64 = -f64::MAX;
/// Default bag size as a percentage of the training data.
pub const DEFAULT_BAG_SIZE_PERCENT: u32 = 100;

/// Extension of on-demand cost matrix files.
pub const COST_FILE_EXTENSION: &str = "cost";
