//! Standard normal CDF and quantile function.
//!
//! Thin wrappers over `statrs` error functions:
//! Φ(x) = erfc(-x / √2) / 2 and Φ⁻¹(p) = -√2 · erfc⁻¹(2p).

use statrs::function::erf::{erfc, erfc_inv};

/// Standard normal CDF, Φ(x).
pub fn normal_cdf(x: f64) -> f64 {
    if x == f64::INFINITY {
        return 1.0;
    }
    if x == f64::NEG_INFINITY {
        return 0.0;
    }
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

/// Standard normal quantile, Φ⁻¹(p).
///
/// Returns -∞ for `p <= 0`, +∞ for `p >= 1`, and NaN for NaN.
pub fn normal_quantile(p: f64) -> f64 {
    if p.is_nan() {
        return f64::NAN;
    }
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    -std::f64::consts::SQRT_2 * erfc_inv(2.0 * p)
}
