//! Standardization (parametric g-formula) with a linear outcome model.

use nalgebra::{DMatrix, DVector};

use super::binary;
use crate::dataset::Dataset;
use crate::error::StatisticError;
use crate::statistic::Statistic;

/// Fits regression coefficients for a design matrix.
pub trait ModelFitter: Sync {
    /// Coefficients `beta` minimizing `|design * beta - response|`.
    fn fit(
        &self,
        design: &DMatrix<f64>,
        response: &DVector<f64>,
    ) -> Result<DVector<f64>, StatisticError>;
}

/// Ordinary least squares through a singular value decomposition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeastSquares {
    /// Singular values below `tolerance * max singular value` count as zero.
    pub tolerance: f64,
    /// Iteration cap for the SVD; a design that does not converge within it
    /// is an error.
    pub max_iterations: usize,
}

impl Default for LeastSquares {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 1_000,
        }
    }
}

impl ModelFitter for LeastSquares {
    fn fit(
        &self,
        design: &DMatrix<f64>,
        response: &DVector<f64>,
    ) -> Result<DVector<f64>, StatisticError> {
        let columns = design.ncols();
        if design.nrows() < columns {
            return Err(StatisticError::Singular {
                rank: design.nrows(),
                columns,
            });
        }

        if design.iter().chain(response.iter()).any(|v| !v.is_finite()) {
            return Err(StatisticError::Custom(
                "design matrix or response has non-finite entries".to_string(),
            ));
        }

        let svd = design
            .clone()
            .try_svd(true, true, f64::EPSILON, self.max_iterations)
            .ok_or_else(|| {
                StatisticError::Custom(format!(
                    "SVD did not converge in {} iterations",
                    self.max_iterations
                ))
            })?;
        let eps = self.tolerance * svd.singular_values.max();
        let rank = svd.rank(eps);
        if rank < columns {
            return Err(StatisticError::Singular { rank, columns });
        }

        svd.solve(response, eps)
            .map_err(|msg| StatisticError::Custom(msg.to_string()))
    }
}

/// Average predicted outcome with treatment set to 0 and to 1 for every
/// resampled row.
///
/// The outcome model is `outcome ~ 1 + treatment + covariates`, plus
/// `treatment x covariate` terms when interactions are enabled. Evaluates
/// to `[E[Y^0], E[Y^1], E[Y^1] - E[Y^0]]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Standardization<F = LeastSquares> {
    /// Outcome column.
    pub outcome: String,
    /// 0/1 treatment column.
    pub treatment: String,
    /// Numeric covariate columns.
    pub covariates: Vec<String>,
    /// Include treatment-covariate interactions.
    pub interactions: bool,
    /// Coefficient estimator.
    pub fitter: F,
}

impl Standardization<LeastSquares> {
    /// Standardize `outcome` over `covariates` with an OLS outcome model.
    pub fn new(
        outcome: impl Into<String>,
        treatment: impl Into<String>,
        covariates: &[&str],
    ) -> Self {
        Self {
            outcome: outcome.into(),
            treatment: treatment.into(),
            covariates: covariates.iter().map(|c| c.to_string()).collect(),
            interactions: false,
            fitter: LeastSquares::default(),
        }
    }
}

impl<F: ModelFitter> Standardization<F> {
    /// Add `treatment x covariate` terms to the outcome model.
    pub fn with_interactions(mut self) -> Self {
        self.interactions = true;
        self
    }

    /// Swap the coefficient estimator.
    pub fn with_fitter<G: ModelFitter>(self, fitter: G) -> Standardization<G> {
        Standardization {
            outcome: self.outcome,
            treatment: self.treatment,
            covariates: self.covariates,
            interactions: self.interactions,
            fitter,
        }
    }

    fn width(&self) -> usize {
        let p = self.covariates.len();
        if self.interactions {
            2 + 2 * p
        } else {
            2 + p
        }
    }

    fn fill_row(&self, row: &mut [f64], treated: f64, covariates: &[f64]) {
        let p = covariates.len();
        row[0] = 1.0;
        row[1] = treated;
        row[2..2 + p].copy_from_slice(covariates);
        if self.interactions {
            for (slot, x) in row[2 + p..].iter_mut().zip(covariates) {
                *slot = treated * x;
            }
        }
    }
}

impl<F: ModelFitter> Statistic<Dataset> for Standardization<F> {
    fn evaluate(&self, data: &Dataset, indices: &[usize]) -> Result<Vec<f64>, StatisticError> {
        let view = data.view(indices);
        let n = view.len();
        let y = view.finite_column(&self.outcome)?;
        let a = view.finite_column(&self.treatment)?;
        let xs = self
            .covariates
            .iter()
            .map(|c| view.finite_column(c))
            .collect::<Result<Vec<_>, _>>()?;

        let width = self.width();
        let mut design = DMatrix::zeros(n, width);
        let mut x_i = vec![0.0; xs.len()];
        let mut row = vec![0.0; width];
        for i in 0..n {
            binary(&self.treatment, view.source_row(i), a[i])?;
            for (slot, column) in x_i.iter_mut().zip(&xs) {
                *slot = column[i];
            }
            self.fill_row(&mut row, a[i], &x_i);
            design.row_mut(i).copy_from_slice(&row);
        }

        let beta = self.fitter.fit(&design, &DVector::from_vec(y))?;
        if beta.len() != width {
            return Err(StatisticError::Custom(format!(
                "fitter returned {} coefficients for {} columns",
                beta.len(),
                width
            )));
        }

        let mut means = [0.0_f64; 2];
        for i in 0..n {
            for (slot, column) in x_i.iter_mut().zip(&xs) {
                *slot = column[i];
            }
            for (level, mean) in means.iter_mut().enumerate() {
                self.fill_row(&mut row, level as f64, &x_i);
                *mean += row.iter().zip(beta.iter()).map(|(x, b)| x * b).sum::<f64>();
            }
        }
        let [y0, y1] = means.map(|total| total / n as f64);

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
