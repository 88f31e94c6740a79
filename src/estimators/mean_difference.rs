//! Difference in group means.

use crate::dataset::Dataset;
use crate::error::StatisticError;
use crate::statistic::Statistic;

/// Mean of `outcome` where `group == 1` minus the mean where `group == 0`.
///
/// Rows with any other group value are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeanDifference {
    /// Outcome column.
    pub outcome: String,
    /// Group indicator column.
    pub group: String,
}

impl MeanDifference {
    /// Contrast `outcome` across the two levels of `group`.
    pub fn new(outcome: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            outcome: outcome.into(),
            group: group.into(),
        }
    }
}

impl Statistic<Dataset> for MeanDifference {
    fn evaluate(&self, data: &Dataset, indices: &[usize]) -> Result<Vec<f64>, StatisticError> {
        let view = data.view(indices);
        let outcome = view.numeric_column(&self.outcome)?;
        let group = view.numeric_column(&self.group)?;

        let mut sums = [0.0_f64; 2];
        let mut counts = [0_usize; 2];
        for (&y, &g) in outcome.iter().zip(&group) {
            let level = if g == 1.0 {
                1
            } else if g == 0.0 {
                0
            } else {
                continue;
            };
            sums[level] += y;
            counts[level] += 1;
        }

        for level in [1, 0] {
            if counts[level] == 0 {
                return Err(StatisticError::EmptyGroup {
                    column: self.group.clone(),
                    group: level.to_string(),
                });
            }
        }

        Ok(vec![sums[1] / counts[1] as f64 - sums[0] / counts[0] as f64])
    }

    fn labels(&self, _dim: usize) -> Vec<String> {
        vec![format!("{} difference", self.outcome)]
    }
}
