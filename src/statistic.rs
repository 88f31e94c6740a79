//! The statistic-function seam.
//!
//! A statistic maps a dataset and an index multiset to a fixed-length
//! vector of numbers. Everything it depends on is either the resampled data
//! it is handed or a field of the implementing value; there is no captured
//! mutable context, so the engine can call it from any thread.

use crate::error::{BootstrapError, Stage, StatisticError};

/// A pure function of a resample.
///
/// Implemented for every `Fn(&D, &[usize]) -> Result<Vec<f64>, StatisticError>`
/// closure that is `Sync`, and for the estimators in [`crate::estimators`].
///
/// Must be deterministic: the same data and indices give the same vector.
pub trait Statistic<D: ?Sized>: Sync {
    /// Evaluate on the rows of `data` named by `indices`.
    fn evaluate(&self, data: &D, indices: &[usize]) -> Result<Vec<f64>, StatisticError>;

    /// Component labels for reports. Defaults to `theta[k]`.
    fn labels(&self, dim: usize) -> Vec<String> {
        (0..dim).map(|k| format!("theta[{}]", k)).collect()
    }
}

impl<D: ?Sized, F> Statistic<D> for F
where
    F: Fn(&D, &[usize]) -> Result<Vec<f64>, StatisticError> + Sync,
{
    fn evaluate(&self, data: &D, indices: &[usize]) -> Result<Vec<f64>, StatisticError> {
        self(data, indices)
    }
}

/// Evaluate and check the output shape and finiteness.
///
/// `expected` is the component count K fixed by the original sample; pass
/// `None` when evaluating the original sample itself.
pub(crate) fn evaluate_checked<D: ?Sized, S: Statistic<D> + ?Sized>(
    statistic: &S,
    data: &D,
    indices: &[usize],
    stage: Stage,
    expected: Option<usize>,
) -> Result<Vec<f64>, BootstrapError> {
    let values = statistic
        .evaluate(data, indices)
        .map_err(|source| BootstrapError::ReplicationFailure { stage, source })?;

    match expected {
        Some(k) if values.len() != k => {
            return Err(BootstrapError::invalid(
                stage,
                format!("statistic returned {} components, expected {}", values.len(), k),
            ));
        }
        None if values.is_empty() => {
            return Err(BootstrapError::invalid(stage, "statistic returned no components"));
        }
        _ => {}
    }

    if let Some((component, &value)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(BootstrapError::ReplicationFailure {
            stage,
            source: StatisticError::NonFinite { component, value },
        });
    }

    Ok(values)
}
