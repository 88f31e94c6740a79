//! Bootstrap run results and interval estimates.

use std::time::Duration;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::StatisticError;
use crate::statistics::{mean, sample_std_dev, WelfordCovariance};

/// A replication dropped from the distribution under a lenient failure
/// policy.
#[derive(Debug, Clone, PartialEq)]
pub struct ExcludedReplication {
    /// Replication ordinal.
    pub replication: usize,
    /// Resamples tried, including redraws.
    pub attempts: usize,
    /// Failure from the last attempt.
    pub error: StatisticError,
}

/// Empirical bootstrap distribution of a statistic.
#[derive(Debug, Clone)]
pub struct BootstrapResult {
    /// Statistic on the unresampled dataset (the point estimates).
    pub original: Vec<f64>,

    /// Replicate matrix, one row per usable replication (R' x K), in
    /// replication order.
    pub replicates: DMatrix<f64>,

    /// Replications requested, R.
    pub requested: usize,

    /// Base seed of the run.
    pub seed: u64,

    /// Replications dropped from `replicates`.
    pub excluded: Vec<ExcludedReplication>,

    /// Replications that needed at least one redraw.
    pub redrawn: usize,

    /// Wall-clock time of the run.
    pub elapsed: Duration,
}

impl BootstrapResult {
    /// Number of replicate rows.
    pub fn replications_used(&self) -> usize {
        self.replicates.nrows()
    }

    /// Number of statistic components, K.
    pub fn dimension(&self) -> usize {
        self.original.len()
    }

    /// Replicate values of component `k`, in replication order.
    ///
    /// # Panics
    ///
    /// Panics if `k >= self.dimension()`.
    pub fn component(&self, k: usize) -> Vec<f64> {
        self.replicates.column(k).iter().copied().collect()
    }

    /// Per-component bootstrap standard errors (sample std. dev., n-1).
    pub fn standard_errors(&self) -> Vec<f64> {
        (0..self.dimension())
            .map(|k| sample_std_dev(&self.component(k)))
            .collect()
    }

    /// Per-component replicate means.
    pub fn means(&self) -> Vec<f64> {
        (0..self.dimension()).map(|k| mean(&self.component(k))).collect()
    }

    /// Bootstrap bias estimate, replicate mean minus point estimate.
    pub fn bias(&self) -> Vec<f64> {
        self.means()
            .iter()
            .zip(&self.original)
            .map(|(m, theta)| m - theta)
            .collect()
    }

    /// K x K covariance of the replicate vectors.
    ///
    /// Useful for contrasts between components, e.g. the variance of
    /// `E[Y^1] - E[Y^0]` from the joint distribution of both means.
    pub fn covariance(&self) -> DMatrix<f64> {
        let mut acc = WelfordCovariance::new(self.dimension());
        for row in self.replicates.row_iter() {
            let row: Vec<f64> = row.iter().copied().collect();
            acc.update(&row);
        }
        acc.finalize()
    }
}

/// Interval estimate for one statistic component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalEstimate {
    /// Component label.
    pub label: String,
    /// Statistic on the original sample.
    pub point_estimate: f64,
    /// Sample standard deviation of the replicates.
    pub standard_error: f64,
    /// Lower bound.
    pub conf_low: f64,
    /// Upper bound.
    pub conf_high: f64,
    /// Nominal coverage, e.g. 0.95.
    pub confidence_level: f64,
    /// Replicates the bounds were computed from.
    pub replications_used: usize,
    /// Bias-correction z0 (0 for percentile intervals).
    pub bias_correction: f64,
    /// Acceleration a (0 for percentile intervals).
    pub acceleration: f64,
    /// How the bounds were obtained.
    pub method: IntervalMethod,
}

impl IntervalEstimate {
    /// Interval width.
    pub fn width(&self) -> f64 {
        self.conf_high - self.conf_low
    }

    /// Whether `value` lies within the bounds (inclusive).
    pub fn contains(&self, value: f64) -> bool {
        self.conf_low <= value && value <= self.conf_high
    }
}

/// Interval construction method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntervalMethod {
    /// Bias-corrected and accelerated.
    Bca,
    /// Plain percentile.
    Percentile,
}

/// Everything one estimator invocation produced: the distribution and its
/// intervals.
#[derive(Debug, Clone)]
pub struct Estimate {
    /// The bootstrap distribution.
    pub bootstrap: BootstrapResult,
    /// One interval per component.
    pub intervals: Vec<IntervalEstimate>,
}
