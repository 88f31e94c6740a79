//! JSON serialization for bootstrap estimates.

use serde::{Deserialize, Serialize};

use crate::result::{Estimate, IntervalEstimate};

/// Serializable summary of an [`Estimate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// One record per statistic component.
    pub intervals: Vec<IntervalEstimate>,
    /// Replications requested.
    pub replications_requested: usize,
    /// Replications in the distribution.
    pub replications_used: usize,
    /// Base seed of the run.
    pub seed: u64,
    /// Replications dropped under the exclusion policy.
    pub excluded: Vec<ExcludedSummary>,
    /// Replications that needed a redraw.
    pub redrawn: usize,
    /// Wall-clock seconds spent resampling.
    pub runtime_secs: f64,
}

/// One excluded replication, with its failure rendered as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcludedSummary {
    /// Replication ordinal.
    pub replication: usize,
    /// Resamples tried.
    pub attempts: usize,
    /// Failure message.
    pub error: String,
}

impl From<&Estimate> for Report {
    fn from(estimate: &Estimate) -> Self {
        let run = &estimate.bootstrap;
        Self {
            intervals: estimate.intervals.clone(),
            replications_requested: run.requested,
            replications_used: run.replications_used(),
            seed: run.seed,
            excluded: run
                .excluded
                .iter()
                .map(|e| ExcludedSummary {
                    replication: e.replication,
                    attempts: e.attempts,
                    error: e.error.to_string(),
                })
                .collect(),
            redrawn: run.redrawn,
            runtime_secs: run.elapsed.as_secs_f64(),
        }
    }
}

/// Serialize an estimate to a compact JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails (should not happen for a
/// [`Report`]).
pub fn to_json(estimate: &Estimate) -> Result<String, serde_json::Error> {
    serde_json::to_string(&Report::from(estimate))
}

/// Serialize an estimate to a pretty-printed JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails (should not happen for a
/// [`Report`]).
pub fn to_json_pretty(estimate: &Estimate) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&Report::from(estimate))
}

#[cfg(test)]
pub(crate) mod tests {
    use std::time::Duration;

    use nalgebra::DMatrix;

    use super::*;
    use crate::error::StatisticError;
    use crate::result::{BootstrapResult, ExcludedReplication, IntervalMethod};

    pub(crate) fn make_estimate() -> Estimate {
        Estimate {
            bootstrap: BootstrapResult {
                original: vec![78.75],
                replicates: DMatrix::from_column_slice(3, 1, &[70.0, 80.0, 90.0]),
                requested: 4,
                seed: 42,
                excluded: vec![ExcludedReplication {
                    replication: 2,
                    attempts: 1,
                    error: StatisticError::Custom("boom".into()),
                }],
                redrawn: 0,
                elapsed: Duration::from_millis(1500),
            },
            intervals: vec![IntervalEstimate {
                label: "difference".into(),
                point_estimate: 78.75,
                standard_error: 10.0,
                conf_low: 70.5,
                conf_high: 89.5,
                confidence_level: 0.95,
                replications_used: 3,
                bias_correction: 0.0,
                acceleration: 0.0,
                method: IntervalMethod::Percentile,
            }],
        }
    }

    #[test]
    fn test_to_json() {
        let json = to_json(&make_estimate()).unwrap();
        assert!(json.contains("\"point_estimate\":78.75"));
        assert!(json.contains("\"method\":\"Percentile\""));
        assert!(json.contains("\"error\":\"boom\""));
        assert!(json.contains("\"runtime_secs\":1.5"));
    }

    #[test]
    fn test_to_json_pretty_parses_back() {
        let json = to_json_pretty(&make_estimate()).unwrap();
        assert!(json.contains('\n'));
        let report: Report = serde_json::from_str(&json).unwrap();
        assert_eq!(report, Report::from(&make_estimate()));
        assert_eq!(report.replications_used, 3);
    }
}
