//! Leave-one-out jackknife for the BCa acceleration constant.
//!
//! For N rows the statistic is evaluated N times, each time on the original
//! rows with row i omitted. The skewness of those values estimates how the
//! standard error of the statistic changes with its true value.

use nalgebra::DMatrix;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::dataset::RowSource;
use crate::error::{BootstrapError, Stage};
use crate::statistic::{evaluate_checked, Statistic};
use crate::thread_pool;

/// Leave-one-out statistic values, one row per omitted row (N x K).
///
/// Evaluations run on the same worker pool as bootstrap replications:
/// the shared pool for `threads: None`, a dedicated one otherwise.
///
/// # Errors
///
/// `ReplicationFailure` at stage `Jackknife(i)` if the statistic fails with
/// row i omitted; `InvalidInput` if it returns a vector of the wrong length;
/// `ThreadPool` if a dedicated pool cannot be built.
pub fn leave_one_out<D, S>(
    data: &D,
    statistic: &S,
    dim: usize,
    threads: Option<usize>,
) -> Result<DMatrix<f64>, BootstrapError>
where
    D: RowSource + Sync + ?Sized,
    S: Statistic<D> + ?Sized,
{
    let n = data.n_rows();

    let evaluate = |omit: usize| -> Result<Vec<f64>, BootstrapError> {
        let indices: Vec<usize> = (0..n).filter(|&j| j != omit).collect();
        evaluate_checked(statistic, data, &indices, Stage::Jackknife(omit), Some(dim))
    };

    #[cfg(feature = "parallel")]
    let rows: Vec<Vec<f64>> = thread_pool::install(threads, || {
        (0..n)
            .into_par_iter()
            .map(evaluate)
            .collect::<Result<_, _>>()
    })??;

    #[cfg(not(feature = "parallel"))]
    let rows: Vec<Vec<f64>> =
        thread_pool::install(threads, || (0..n).map(evaluate).collect::<Result<_, _>>())??;

    Ok(DMatrix::from_fn(n, dim, |i, k| rows[i][k]))
}

/// Acceleration constant from leave-one-out values.
///
/// ```text
/// a = Σ(θ̄ − θ₍₋ᵢ₎)³ / (6 · (Σ(θ̄ − θ₍₋ᵢ₎)²)^1.5)
/// ```
///
/// When every leave-one-out value is the same the denominator is zero and
/// the acceleration is defined as 0 (no skewness correction). Fewer than two
/// values also give 0.
pub fn acceleration(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }

    let n = values.len() as f64;
    let theta_bar = values.iter().sum::<f64>() / n;

    let (num, den) = values.iter().fold((0.0_f64, 0.0_f64), |(num, den), &v| {
        let d = theta_bar - v;
        (num + d * d * d, den + d * d)
    });

    if den == 0.0 {
        return 0.0;
    }

    num / (6.0 * den.powf(1.5))
}

/// Per-component acceleration constants for a statistic.
///
/// Datasets with fewer than two rows have no leave-one-out spread and get
/// zero acceleration without evaluating the statistic.
pub fn jackknife_acceleration<D, S>(
    data: &D,
    statistic: &S,
    dim: usize,
    threads: Option<usize>,
) -> Result<Vec<f64>, BootstrapError>
where
    D: RowSource + Sync + ?Sized,
    S: Statistic<D> + ?Sized,
{
    if data.n_rows() < 2 {
        return Ok(vec![0.0; dim]);
    }

    let values = leave_one_out(data, statistic, dim, threads)?;
    Ok(values
        .column_iter()
        .map(|column| {
            let column: Vec<f64> = column.iter().copied().collect();
            acceleration(&column)
        })
        .collect())
}
