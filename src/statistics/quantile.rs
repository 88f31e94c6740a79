//! Empirical quantiles of bootstrap replicates.
//!
//! All quantiles in the crate use the "R-7" (Hyndman & Fan type 7)
//! definition: for probability `p` over `n` sorted values, the position is
//! `h = (n - 1) p` and the result interpolates linearly between the order
//! statistics `floor(h)` and `floor(h) + 1`. Interval bounds are therefore
//! reproducible bit for bit for a given replicate vector.

/// Compute a quantile from pre-sorted values.
///
/// `sorted` must be in ascending order; this is not checked, and unsorted
/// input gives a meaningless result.
///
/// # Arguments
///
/// * `sorted` - Values in ascending order
/// * `p` - Quantile probability in [0, 1]
///
/// # Panics
///
/// Panics if `sorted` is empty or if `p` is outside [0, 1].
pub fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    assert!(!sorted.is_empty(), "Cannot compute quantile of empty slice");
    assert!(
        (0.0..=1.0).contains(&p),
        "Quantile probability must be in [0, 1]"
    );

    let n = sorted.len();
    let h = (n - 1) as f64 * p;
    let h_floor = h.floor() as usize;
    let h_frac = h - h.floor();

    if h_floor >= n - 1 {
        sorted[n - 1]
    } else if h_frac == 0.0 {
        sorted[h_floor]
    } else {
        sorted[h_floor] + h_frac * (sorted[h_floor + 1] - sorted[h_floor])
    }
}

/// Sort a copy of `data` with a total order on floats.
pub fn sorted_copy(data: &[f64]) -> Vec<f64> {
    let mut sorted = data.to_vec();
    sorted.sort_unstable_by(|a, b| a.total_cmp(b));
    sorted
}
