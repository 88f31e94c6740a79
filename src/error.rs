//! Error types for bootstrap runs and statistic evaluation.
//!
//! Every failure carries the [`Stage`] it came from, so a caller can tell a
//! rejected input apart from a replication whose refit blew up or an
//! interval that could not be built.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Where in a bootstrap run a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Building a [`Dataset`](crate::Dataset) from columns or rows.
    Dataset,
    /// Input validation before any resampling.
    Resampling,
    /// The statistic evaluated on the unresampled dataset.
    Original,
    /// A bootstrap replication, by ordinal.
    Replication(usize),
    /// A leave-one-out evaluation, by the index of the omitted row.
    Jackknife(usize),
    /// Confidence-interval construction.
    Interval,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Dataset => write!(f, "dataset construction"),
            Stage::Resampling => write!(f, "resampling"),
            Stage::Original => write!(f, "original sample"),
            Stage::Replication(i) => write!(f, "replication {}", i),
            Stage::Jackknife(i) => write!(f, "jackknife (row {} omitted)", i),
            Stage::Interval => write!(f, "interval construction"),
        }
    }
}

/// Why an empirical distribution cannot support a BCa interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degeneracy {
    /// Every replicate has the same value.
    AllIdentical,
    /// No replicate falls strictly below the point estimate, or all do,
    /// so the bias correction is infinite.
    OneSided,
}

impl fmt::Display for Degeneracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Degeneracy::AllIdentical => write!(f, "all replicate values are identical"),
            Degeneracy::OneSided => {
                write!(f, "all replicate values lie on one side of the point estimate")
            }
        }
    }
}

/// Failure of a single statistic evaluation.
///
/// Statistic functions return this; the engine wraps it in
/// [`BootstrapError::ReplicationFailure`] together with the stage.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatisticError {
    /// A referenced column does not exist.
    #[error("unknown column '{0}'")]
    MissingColumn(String),

    /// A used cell holds no value.
    #[error("missing value in column '{column}' at row {row}")]
    Missing { column: String, row: usize },

    /// A used cell holds NaN or an infinity.
    #[error("non-finite value {value} in column '{column}' at row {row}")]
    NotFinite { column: String, row: usize, value: f64 },

    /// A used cell is categorical where a number was expected.
    #[error("column '{column}' is not numeric at row {row}")]
    NotNumeric { column: String, row: usize },

    /// A group needed for a contrast has no rows in this resample.
    #[error("group {group} of column '{column}' is empty")]
    EmptyGroup { column: String, group: String },

    /// The design matrix is rank deficient.
    #[error("design matrix is singular (rank {rank} < {columns} columns)")]
    Singular { rank: usize, columns: usize },

    /// A stratum has every row treated or every row untreated.
    #[error("positivity violated in stratum '{stratum}' (propensity {propensity})")]
    Positivity { stratum: String, propensity: f64 },

    /// The statistic produced NaN or infinity.
    #[error("statistic component {component} is not finite ({value})")]
    NonFinite { component: usize, value: f64 },

    /// Anything else a caller-supplied statistic wants to report.
    #[error("{0}")]
    Custom(String),
}

/// Errors from the bootstrap engine and interval estimator.
#[derive(Debug, Clone, Error)]
pub enum BootstrapError {
    /// Rejected input; never retried.
    #[error("invalid input during {stage}: {reason}")]
    InvalidInput { stage: Stage, reason: String },

    /// A statistic evaluation failed.
    #[error("statistic failed during {stage}: {source}")]
    ReplicationFailure {
        stage: Stage,
        #[source]
        source: StatisticError,
    },

    /// Too many replications were excluded.
    #[error("only {valid} valid replications, {required} required")]
    InsufficientValidReplications { valid: usize, required: usize },

    /// The replicate distribution of a component is degenerate.
    #[error("degenerate bootstrap distribution for component {component}: {kind}")]
    DegenerateDistribution { component: usize, kind: Degeneracy },

    /// Too few replications for a BCa interval.
    #[error("{replications} replications is below the minimum of {minimum}")]
    InsufficientReplications { replications: usize, minimum: usize },

    /// The run was cancelled before it finished.
    #[error("bootstrap cancelled after {completed} replications")]
    Cancelled { completed: usize },

    /// The wall-clock budget ran out.
    #[error("bootstrap exceeded its budget of {budget:?} (elapsed {elapsed:?})")]
    Timeout { budget: Duration, elapsed: Duration },

    /// A dedicated worker pool could not be built.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
}

impl BootstrapError {
    /// The stage this error belongs to, when it has one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            BootstrapError::InvalidInput { stage, .. }
            | BootstrapError::ReplicationFailure { stage, .. } => Some(*stage),
            BootstrapError::DegenerateDistribution { .. }
            | BootstrapError::InsufficientReplications { .. } => Some(Stage::Interval),
            _ => None,
        }
    }

    pub(crate) fn invalid(stage: Stage, reason: impl Into<String>) -> Self {
        BootstrapError::InvalidInput {
            stage,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_stage() {
        let err = BootstrapError::ReplicationFailure {
            stage: Stage::Replication(17),
            source: StatisticError::Singular { rank: 2, columns: 3 },
        };
        let msg = err.to_string();
        assert!(msg.contains("replication 17"), "{}", msg);
        assert!(msg.contains("singular"), "{}", msg);
        assert_eq!(err.stage(), Some(Stage::Replication(17)));
    }

    #[test]
    fn test_interval_errors_report_interval_stage() {
        let err = BootstrapError::DegenerateDistribution {
            component: 0,
            kind: Degeneracy::AllIdentical,
        };
        assert_eq!(err.stage(), Some(Stage::Interval));
        assert_eq!(BootstrapError::Cancelled { completed: 3 }.stage(), None);
    }
}
