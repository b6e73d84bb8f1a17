//! Checkers shared by the learners in this crate.
//! Each returns a setup error instead of panicking.
use crate::{
    Dataset,
    error::{EnsembleError, Result},
};


/// Checks that `data` has at least one instance.
pub(crate) fn check_nonempty(data: &Dataset) -> Result<()> {
    if data.is_empty() {
        return Err(EnsembleError::EmptyDataset);
    }
    Ok(())
}


/// Checks that the class of `data` is nominal.
pub(crate) fn check_nominal_class(learner: &str, data: &Dataset)
    -> Result<()>
{
    if !data.schema().class_is_nominal() {
        return Err(EnsembleError::incompatible(
            learner, "a nominal class is required"
        ));
    }
    Ok(())
}


/// Checks that the class of `data` is numeric.
pub(crate) fn check_numeric_class(learner: &str, data: &Dataset)
    -> Result<()>
{
    if !data.schema().class_is_numeric() {
        return Err(EnsembleError::incompatible(
            learner, "a numeric class is required"
        ));
    }
    Ok(())
}


/// Checks that `value` is a percentage in `[1, 100]`.
pub(crate) fn check_percentage(parameter: &str, value: u32) -> Result<()> {
    if !(1..=100).contains(&value) {
        return Err(EnsembleError::invalid_parameter(
            parameter, value, "must be in [1, 100]"
        ));
    }
    Ok(())
}


/// Checks that `value` is at least one.
pub(crate) fn check_at_least_one(parameter: &str, value: usize)
    -> Result<()>
{
    if value == 0 {
        return Err(EnsembleError::invalid_parameter(
            parameter, value, "must be at least 1"
        ));
    }
    Ok(())
}


/// Checks that `value` is finite and strictly positive.
pub(crate) fn check_positive(parameter: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0f64 {
        return Err(EnsembleError::invalid_parameter(
            parameter, value, "must be finite and positive"
        ));
    }
    Ok(())
}
