//! Means, standard deviations and covariance of replicate vectors.

use nalgebra::{DMatrix, DVector};

/// Arithmetic mean. NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation with the n-1 denominator.
///
/// Returns 0.0 for fewer than two values.
pub fn sample_std_dev(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|x| (x - m).powi(2)).sum();
    (ss / (n - 1) as f64).sqrt()
}

/// Online covariance accumulator using Welford's algorithm.
///
/// Accumulates the mean and M2 (sum of outer products of deviations) of
/// K-dimensional vectors in a single pass; covariance is M2/(n-1).
#[derive(Debug, Clone)]
pub struct WelfordCovariance {
    n: usize,
    mean: DVector<f64>,
    m2: DMatrix<f64>,
}

impl WelfordCovariance {
    /// Create an accumulator for `dim`-dimensional vectors.
    pub fn new(dim: usize) -> Self {
        Self {
            n: 0,
            mean: DVector::zeros(dim),
            m2: DMatrix::zeros(dim, dim),
        }
    }

    /// Update the accumulator with a new vector.
    ///
    /// ```text
    /// δ = x - μₙ₋₁
    /// μₙ = μₙ₋₁ + δ/n
    /// δ' = x - μₙ
    /// M2ₙ = M2ₙ₋₁ + δ·δ'^T
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `x.len()` differs from the accumulator dimension.
    pub fn update(&mut self, x: &[f64]) {
        assert_eq!(x.len(), self.mean.len(), "dimension mismatch");
        self.n += 1;
        let n = self.n as f64;

        let x = DVector::from_column_slice(x);
        let delta = &x - &self.mean;
        self.mean += &delta / n;
        let delta2 = &x - &self.mean;
        self.m2 += delta * delta2.transpose();
    }

    /// Number of vectors seen.
    pub fn count(&self) -> usize {
        self.n
    }

    /// Running mean.
    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    /// Unbiased covariance M2/(n-1); all zeros for fewer than two vectors.
    pub fn finalize(&self) -> DMatrix<f64> {
        let dim = self.mean.len();
        if self.n < 2 {
            return DMatrix::zeros(dim, dim);
        }
        &self.m2 / (self.n - 1) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_std_dev_uses_n_minus_one() {
        // Deviations from 5: -3, -1, -1, -1, 0, 0, 2, 4 -> ss = 32, var = 32/7
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&values) - 5.0).abs() < 1e-12);
        assert!((sample_std_dev(&values) - (32.0_f64 / 7.0).sqrt()).abs() < 1e-12);
        assert_eq!(sample_std_dev(&[3.0]), 0.0);
    }

    #[test]
    fn test_welford_matches_two_pass() {
        let rows = [[1.0, 2.0], [2.0, 1.0], [4.0, 5.0], [3.0, 3.0], [0.5, -1.0]];
        let mut acc = WelfordCovariance::new(2);
        for row in &rows {
            acc.update(row);
        }
        let cov = acc.finalize();

        let xs: Vec<f64> = rows.iter().map(|r| r[0]).collect();
        let ys: Vec<f64> = rows.iter().map(|r| r[1]).collect();
        let (mx, my) = (mean(&xs), mean(&ys));
        let cxy: f64 =
            xs.iter().zip(&ys).map(|(x, y)| (x - mx) * (y - my)).sum::<f64>() / 4.0;

        assert_eq!(acc.count(), 5);
        assert!((cov[(0, 0)] - sample_std_dev(&xs).powi(2)).abs() < 1e-12);
        assert!((cov[(1, 1)] - sample_std_dev(&ys).powi(2)).abs() < 1e-12);
        assert!((cov[(0, 1)] - cxy).abs() < 1e-12);
        assert!((cov[(0, 1)] - cov[(1, 0)]).abs() < 1e-12);
    }

    #[test]
    fn test_welford_degenerate_counts() {
        let mut acc = WelfordCovariance::new(3);
        assert_eq!(acc.finalize(), DMatrix::zeros(3, 3));
        acc.update(&[1.0, 2.0, 3.0]);
        assert_eq!(acc.finalize(), DMatrix::zeros(3, 3));
    }
}
