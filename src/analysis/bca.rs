//! Bias-corrected and accelerated (BCa) bootstrap intervals (Efron, 1987).
//!
//! For a component with point estimate θ̂ and replicates θ*₁..θ*_R:
//!
//! ```text
//! z0 = Φ⁻¹( #{θ*_r < θ̂} / R )
//! a  = Σ(θ̄ − θ₍₋ᵢ₎)³ / (6 (Σ(θ̄ − θ₍₋ᵢ₎)²)^1.5)        (jackknife)
//! α1 = Φ(z0 + (z0 + z_{α/2})   / (1 − a (z0 + z_{α/2})))
//! α2 = Φ(z0 + (z0 + z_{1−α/2}) / (1 − a (z0 + z_{1−α/2})))
//! ```
//!
//! and the bounds are the type-7 quantiles of the sorted replicates at α1
//! and α2. Replicates exactly equal to θ̂ do not count toward z0.

use crate::config::Config;
use crate::dataset::RowSource;
use crate::error::{BootstrapError, Degeneracy, Stage};
use crate::result::{BootstrapResult, IntervalEstimate, IntervalMethod};
use crate::statistic::Statistic;
use crate::statistics::{
    jackknife_acceleration, normal_cdf, normal_quantile, quantile_sorted, sample_std_dev,
    sorted_copy,
};

/// Options for interval construction.
#[derive(Debug, Clone, PartialEq)]
pub struct BcaOptions {
    /// Nominal coverage in (0, 1).
    pub confidence_level: f64,
    /// Fewer replicates than this is an `InsufficientReplications` error.
    pub min_replications: usize,
    /// Fewer replicates than this logs a warning.
    pub warn_below: usize,
    /// Worker threads for the jackknife; `None` uses the shared pool.
    pub threads: Option<usize>,
}

impl Default for BcaOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for BcaOptions {
    fn from(config: &Config) -> Self {
        Self {
            confidence_level: config.confidence_level,
            min_replications: config.min_replications,
            warn_below: config.warn_below,
            threads: config.threads,
        }
    }
}

impl BcaOptions {
    /// Same options at a different confidence level.
    pub fn with_confidence_level(&self, confidence_level: f64) -> Self {
        Self {
            confidence_level,
            ..self.clone()
        }
    }

    fn check(&self, replications: usize) -> Result<(), BootstrapError> {
        let c = self.confidence_level;
        if !(c > 0.0 && c < 1.0) {
            return Err(BootstrapError::invalid(
                Stage::Interval,
                format!("confidence level must be in (0, 1), got {}", c),
            ));
        }
        if replications < self.min_replications.max(1) {
            return Err(BootstrapError::InsufficientReplications {
                replications,
                minimum: self.min_replications.max(1),
            });
        }
        if replications < self.warn_below {
            log::warn!(
                "BCa interval from {} replications; at least {} are recommended",
                replications,
                self.warn_below
            );
        }
        Ok(())
    }
}

/// Bias-correction constant z0 for one component.
///
/// Counts replicates strictly below `original`; replicates equal to it are
/// left out of the count but stay in the denominator R.
///
/// # Errors
///
/// - `AllIdentical` if every replicate has the same value
/// - `OneSided` if the count is 0 or R, where Φ⁻¹ is infinite
pub fn bias_correction(replicates: &[f64], original: f64) -> Result<f64, Degeneracy> {
    let first = replicates.first().copied().unwrap_or(original);
    if replicates.iter().all(|&v| v == first) {
        return Err(Degeneracy::AllIdentical);
    }

    let below = replicates.iter().filter(|&&v| v < original).count();
    if below == 0 || below == replicates.len() {
        return Err(Degeneracy::OneSided);
    }

    Ok(normal_quantile(below as f64 / replicates.len() as f64))
}

/// Adjusted percentile levels (α1, α2) for given z0, acceleration and
/// confidence level.
///
/// When `1 − a (z0 + z)` is not positive the adjusted level is taken as its
/// limit, 0 or 1 depending on the sign of `z0 + z`.
pub fn adjusted_levels(z0: f64, acceleration: f64, confidence_level: f64) -> (f64, f64) {
    let alpha = 1.0 - confidence_level;
    let adjust = |z: f64| -> f64 {
        let shifted = z0 + z;
        let denom = 1.0 - acceleration * shifted;
        if denom <= 0.0 {
            return if shifted > 0.0 { 1.0 } else { 0.0 };
        }
        normal_cdf(z0 + shifted / denom).clamp(0.0, 1.0)
    };

    (
        adjust(normal_quantile(alpha / 2.0)),
        adjust(normal_quantile(1.0 - alpha / 2.0)),
    )
}

/// BCa interval for one component from its replicates, point estimate and
/// acceleration.
///
/// `component` is only used to label errors.
pub fn bca_from_replicates(
    replicates: &[f64],
    original: f64,
    acceleration: f64,
    options: &BcaOptions,
    label: &str,
    component: usize,
) -> Result<IntervalEstimate, BootstrapError> {
    options.check(replicates.len())?;
    interval_for_component(replicates, original, acceleration, options, label, component)
}

fn interval_for_component(
    replicates: &[f64],
    original: f64,
    acceleration: f64,
    options: &BcaOptions,
    label: &str,
    component: usize,
) -> Result<IntervalEstimate, BootstrapError> {
    let z0 = bias_correction(replicates, original)
        .map_err(|kind| BootstrapError::DegenerateDistribution { component, kind })?;
    let (alpha1, alpha2) = adjusted_levels(z0, acceleration, options.confidence_level);

    let sorted = sorted_copy(replicates);
    Ok(IntervalEstimate {
        label: label.to_string(),
        point_estimate: original,
        standard_error: sample_std_dev(replicates),
        conf_low: quantile_sorted(&sorted, alpha1),
        conf_high: quantile_sorted(&sorted, alpha2),
        confidence_level: options.confidence_level,
        replications_used: replicates.len(),
        bias_correction: z0,
        acceleration,
        method: IntervalMethod::Bca,
    })
}

/// BCa intervals for every component of a bootstrap result.
///
/// Runs the jackknife over the original rows of `data` (N more statistic
/// evaluations) to estimate the per-component acceleration.
///
/// # Errors
///
/// - `InvalidInput` for a confidence level outside (0, 1)
/// - `InsufficientReplications` below `options.min_replications`
/// - `ReplicationFailure` at stage `Jackknife(i)`
/// - `DegenerateDistribution` for a constant or one-sided component
pub fn bca_intervals<D, S>(
    result: &BootstrapResult,
    data: &D,
    statistic: &S,
    options: &BcaOptions,
) -> Result<Vec<IntervalEstimate>, BootstrapError>
where
    D: RowSource + Sync + ?Sized,
    S: Statistic<D> + ?Sized,
{
    let dim = result.dimension();
    options.check(result.replications_used())?;

    let accelerations = jackknife_acceleration(data, statistic, dim, options.threads)?;
    let labels = statistic.labels(dim);
    log::debug!("BCa: acceleration {:?}", accelerations);

    (0..dim)
        .map(|k| {
            interval_for_component(
                &result.component(k),
                result.original[k],
                accelerations[k],
                options,
                &label_for(&labels, k),
                k,
            )
        })
        .collect()
}

/// BCa interval for a single component.
///
/// # Errors
///
/// As [`bca_intervals`], plus `InvalidInput` if `component` is out of range.
pub fn bca_interval<D, S>(
    result: &BootstrapResult,
    data: &D,
    statistic: &S,
    options: &BcaOptions,
    component: usize,
) -> Result<IntervalEstimate, BootstrapError>
where
    D: RowSource + Sync + ?Sized,
    S: Statistic<D> + ?Sized,
{
    if component >= result.dimension() {
        return Err(BootstrapError::invalid(
            Stage::Interval,
            format!(
                "component {} out of range for a {}-component statistic",
                component,
                result.dimension()
            ),
        ));
    }
    let mut intervals = bca_intervals(result, data, statistic, options)?;
    Ok(intervals.swap_remove(component))
}

/// Percentile intervals: the α/2 and 1 − α/2 type-7 quantiles.
///
/// Needs no jackknife. Constant components give a zero-width interval
/// here; only BCa treats them as degenerate.
pub fn percentile_intervals(
    result: &BootstrapResult,
    labels: &[String],
    options: &BcaOptions,
) -> Result<Vec<IntervalEstimate>, BootstrapError> {
    options.check(result.replications_used())?;
    let alpha = 1.0 - options.confidence_level;

    Ok((0..result.dimension())
        .map(|k| {
            let replicates = result.component(k);
            let sorted = sorted_copy(&replicates);
            IntervalEstimate {
                label: label_for(labels, k),
                point_estimate: result.original[k],
                standard_error: sample_std_dev(&replicates),
                conf_low: quantile_sorted(&sorted, alpha / 2.0),
                conf_high: quantile_sorted(&sorted, 1.0 - alpha / 2.0),
                confidence_level: options.confidence_level,
                replications_used: replicates.len(),
                bias_correction: 0.0,
                acceleration: 0.0,
                method: IntervalMethod::Percentile,
            }
        })
        .collect())
}

fn label_for(labels: &[String], k: usize) -> String {
    labels
        .get(k)
        .cloned()
        .unwrap_or_else(|| format!("theta[{}]", k))
}
