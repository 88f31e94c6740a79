//! Inverse probability weighting with a saturated propensity model.

use std::collections::BTreeMap;

use super::binary;
use crate::dataset::Dataset;
use crate::error::StatisticError;
use crate::statistic::Statistic;

/// Hajek-weighted outcome means under treatment and no treatment.
///
/// The propensity `P(A = 1 | L)` is the treated fraction of each stratum
/// of the `strata` columns within the resample; with no strata columns it
/// is the marginal treated fraction. Evaluates to
/// `[E[Y^0], E[Y^1], E[Y^1] - E[Y^0]]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InverseProbabilityWeighting {
    /// Outcome column.
    pub outcome: String,
    /// 0/1 treatment column.
    pub treatment: String,
    /// Columns whose joint levels define the propensity strata.
    pub strata: Vec<String>,
    /// Multiply weights by the marginal probability of the observed arm.
    ///
    /// Hajek means do not change; only [`weights`](Self::weights) does.
    pub stabilized: bool,
}

struct Arm {
    treated: bool,
    stratum: String,
}

impl InverseProbabilityWeighting {
    /// Weight `outcome` by the inverse propensity of `treatment` given `strata`.
    pub fn new(outcome: impl Into<String>, treatment: impl Into<String>, strata: &[&str]) -> Self {
        Self {
            outcome: outcome.into(),
            treatment: treatment.into(),
            strata: strata.iter().map(|s| s.to_string()).collect(),
            stabilized: false,
        }
    }

    /// Use stabilized weights.
    pub fn stabilized(mut self) -> Self {
        self.stabilized = true;
        self
    }

    /// Per-row weights for the resample, in index order.
    pub fn weights(&self, data: &Dataset, indices: &[usize]) -> Result<Vec<f64>, StatisticError> {
        let arms = self.arms(data, indices)?;
        let n = arms.len() as f64;

        let mut counts: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        for arm in &arms {
            let entry = counts.entry(arm.stratum.as_str()).or_default();
            entry.0 += 1;
            if arm.treated {
                entry.1 += 1;
            }
        }

        let mut propensity = BTreeMap::new();
        for (stratum, (total, treated)) in &counts {
            let p = *treated as f64 / *total as f64;
            if p <= 0.0 || p >= 1.0 {
                return Err(StatisticError::Positivity {
                    stratum: stratum.to_string(),
                    propensity: p,
                });
            }
            propensity.insert(*stratum, p);
        }

        let marginal = arms.iter().filter(|arm| arm.treated).count() as f64 / n;
        Ok(arms
            .iter()
            .map(|arm| {
                let p = propensity[arm.stratum.as_str()];
                let (w, numerator) = if arm.treated {
                    (1.0 / p, marginal)
                } else {
                    (1.0 / (1.0 - p), 1.0 - marginal)
                };
                if self.stabilized {
                    w * numerator
                } else {
                    w
                }
            })
            .collect())
    }

    fn arms(&self, data: &Dataset, indices: &[usize]) -> Result<Vec<Arm>, StatisticError> {
        let view = data.view(indices);
        let treatment = view.numeric_column(&self.treatment)?;
        let keys = self
            .strata
            .iter()
            .map(|column| view.key_column(column))
            .collect::<Result<Vec<_>, _>>()?;

        treatment
            .iter()
            .enumerate()
            .map(|(i, &a)| {
                let stratum = keys
                    .iter()
                    .map(|column| column[i].as_str())
                    .collect::<Vec<_>>()
                    .join("|");
                Ok(Arm {
                    treated: binary(&self.treatment, view.source_row(i), a)?,
                    stratum,
                })
            })
            .collect()
    }
}

impl Statistic<Dataset> for InverseProbabilityWeighting {
    fn evaluate(&self, data: &Dataset, indices: &[usize]) -> Result<Vec<f64>, StatisticError> {
        let outcome = data.view(indices).numeric_column(&self.outcome)?;
        let treatment = data.view(indices).numeric_column(&self.treatment)?;
        let weights = self.weights(data, indices)?;

        // [untreated, treated] sums of w and w*y
        let mut total = [0.0_f64; 2];
        let mut weighted = [0.0_f64; 2];
        for ((&y, &a), &w) in outcome.iter().zip(&treatment).zip(&weights) {
            let arm = usize::from(a == 1.0);
            total[arm] += w;
            weighted[arm] += w * y;
        }

        let y0 = weighted[0] / total[0];
        let y1 = weighted[1] / total[1];
        Ok(vec![y0, y1, y1 - y0])
    }

    fn labels(&self, _dim: usize) -> Vec<String> {
        vec![
            "E[Y^0]".to_string(),
            "E[Y^1]".to_string(),
            "E[Y^1] - E[Y^0]".to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Value;

    /// Stratum 0 has one of four rows treated, stratum 1 three of four.
    /// Outcomes are `10 + 2L + 3A`, so the true effect is 3 while the crude
    /// contrast is 4.
    fn confounded() -> Dataset {
        let l = vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        let a = vec![1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.0];
        let y = l
            .iter()
            .zip(&a)
            .map(|(l, a)| 10.0 + 2.0 * l + 3.0 * a)
            .collect();
        Dataset::from_numeric_columns(&[("y", y), ("a", a), ("l", l)]).unwrap()
    }

    fn all() -> Vec<usize> {
        (0..8).collect()
    }

    #[test]
    fn test_recovers_effect_in_strata() {
        let value = InverseProbabilityWeighting::new("y", "a", &["l"])
            .evaluate(&confounded(), &all())
            .unwrap();
        assert!((value[0] - 11.0).abs() < 1e-12);
        assert!((value[1] - 14.0).abs() < 1e-12);
        assert!((value[2] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_without_strata_is_crude_contrast() {
        let value = InverseProbabilityWeighting::new("y", "a", &[])
            .evaluate(&confounded(), &all())
            .unwrap();
        assert!((value[2] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_stabilized_weights() {
        let ipw = InverseProbabilityWeighting::new("y", "a", &["l"]);
        let raw = ipw.weights(&confounded(), &all()).unwrap();
        let stable = ipw.clone().stabilized().weights(&confounded(), &all()).unwrap();
        assert!((raw[0] - 4.0).abs() < 1e-12);
        assert!((raw[1] - 4.0 / 3.0).abs() < 1e-12);
        // Half the rows are treated.
        assert!((stable[0] - 2.0).abs() < 1e-12);
        assert_eq!(
            ipw.evaluate(&confounded(), &all()).unwrap(),
            ipw.stabilized().evaluate(&confounded(), &all()).unwrap()
        );
    }

    #[test]
    fn test_positivity_violation() {
        // Rows 4..7 alone: stratum 1 with rows 4, 5, 6 treated only.
        let err = InverseProbabilityWeighting::new("y", "a", &["l"])
            .evaluate(&confounded(), &[4, 5, 6, 0, 1])
            .unwrap_err();
        assert_eq!(
            err,
            StatisticError::Positivity {
                stratum: "1".into(),
                propensity: 1.0
            }
        );
    }

    #[test]
    fn test_categorical_strata_and_missing() {
        let data = Dataset::new(
            vec!["y".into(), "a".into(), "site".into()],
            vec![
                vec![Value::Numeric(1.0), Value::Numeric(0.0), "north".into()],
                vec![Value::Numeric(2.0), Value::Numeric(1.0), "north".into()],
                vec![Value::Numeric(3.0), Value::Numeric(0.0), Value::Missing],
            ],
        )
        .unwrap();
        let ipw = InverseProbabilityWeighting::new("y", "a", &["site"]);
        assert_eq!(ipw.evaluate(&data, &[0, 1]).unwrap(), vec![1.0, 2.0, 1.0]);
        assert_eq!(
            ipw.evaluate(&data, &[0, 1, 2]).unwrap_err(),
            StatisticError::Missing {
                column: "site".into(),
                row: 2
            }
        );
    }
}
