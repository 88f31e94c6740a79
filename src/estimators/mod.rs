//! Ready-made statistics for causal effect estimation.
//!
//! Each estimator is a plain value holding its column names and model
//! choices, and implements [`Statistic<Dataset>`](crate::Statistic), so it
//! can be handed straight to [`BootstrapEngine`](crate::BootstrapEngine).

mod ipw;
mod mean_difference;
mod standardization;

pub use ipw::InverseProbabilityWeighting;
pub use mean_difference::MeanDifference;
pub use standardization::{LeastSquares, ModelFitter, Standardization};

use crate::error::StatisticError;

/// Read a 0/1 treatment indicator.
pub(crate) fn binary(column: &str, row: usize, value: f64) -> Result<bool, StatisticError> {
    if value == 1.0 {
        Ok(true)
    } else if value == 0.0 {
        Ok(false)
    } else {
        Err(StatisticError::Custom(format!(
            "column '{}' must be 0 or 1, found {} at row {}",
            column, value, row
        )))
    }
}
