//! Main [`BootstrapEngine`] entry point and builder.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use nalgebra::DMatrix;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::analysis::{bca_intervals, percentile_intervals, BcaOptions};
use crate::config::Config;
use crate::dataset::RowSource;
use crate::error::{BootstrapError, Stage};
use crate::result::{BootstrapResult, Estimate, ExcludedReplication};
use crate::statistic::{evaluate_checked, Statistic};
use crate::statistics::{counter_rng_seed, Resampler, SeedStream};
use crate::thread_pool;

/// Cooperative cancellation for a running bootstrap.
///
/// Cloning shares the flag. Once cancelled, the engine starts no new
/// replications; those already running finish and the run fails with
/// [`BootstrapError::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// A token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Resample-and-refit bootstrap runner.
///
/// # Example
///
/// ```ignore
/// use refit_bootstrap::{BootstrapEngine, estimators::MeanDifference};
///
/// let estimate = BootstrapEngine::new()
///     .replications(2_000)
///     .seed(1234)
///     .estimate(&dataset, &MeanDifference::new("wt82_71", "qsmk"))?;
///
/// for interval in &estimate.intervals {
///     println!("{}: [{:.2}, {:.2}]", interval.label, interval.conf_low, interval.conf_high);
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct BootstrapEngine {
    config: Config,
    cancellation: Option<CancellationToken>,
}

/// What became of one replication.
enum Slot {
    Done { values: Vec<f64>, attempts: usize },
    Failed(ExcludedReplication),
    Invalid(BootstrapError),
    Skipped,
}

impl BootstrapEngine {
    /// Create with default configuration (2,000 replications, 95% level).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from an existing configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            cancellation: None,
        }
    }

    /// Fast configuration for exploration and tests.
    ///
    /// Settings:
    /// - 200 replications (vs 2,000 default)
    /// - BCa small-R warning disabled
    pub fn quick() -> Self {
        Self::with_config(Config {
            replications: 200,
            warn_below: 0,
            ..Config::default()
        })
    }

    /// Configuration for final reporting.
    ///
    /// Settings:
    /// - 10,000 replications
    pub fn thorough() -> Self {
        Self::with_config(Config {
            replications: 10_000,
            ..Config::default()
        })
    }

    /// Current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Set the number of replications R.
    pub fn replications(mut self, replications: usize) -> Self {
        self.config.replications = replications;
        self
    }

    /// Set the confidence level for intervals.
    pub fn confidence_level(mut self, level: f64) -> Self {
        self.config.confidence_level = level;
        self
    }

    /// Set the base seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Allow failed replications to be excluded as long as `min` remain.
    pub fn min_valid_replications(mut self, min: usize) -> Self {
        self.config.min_valid_replications = Some(min);
        self
    }

    /// Retry a failed replication on up to `attempts` fresh resamples.
    pub fn redraw_attempts(mut self, attempts: usize) -> Self {
        self.config.redraw_attempts = attempts;
        self
    }

    /// Set the hard floor on R for BCa intervals.
    pub fn min_replications(mut self, min: usize) -> Self {
        self.config.min_replications = min;
        self
    }

    /// Set the R below which a warning is logged.
    pub fn warn_below(mut self, r: usize) -> Self {
        self.config.warn_below = r;
        self
    }

    /// Fail the run with `Timeout` once `budget` has elapsed.
    pub fn max_duration(mut self, budget: Duration) -> Self {
        self.config.max_duration = Some(budget);
        self
    }

    /// Run on a dedicated pool of `threads` workers.
    pub fn threads(mut self, threads: usize) -> Self {
        self.config.threads = Some(threads);
        self
    }

    /// Attach a cancellation token.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Run the bootstrap and return the empirical distribution.
    ///
    /// Evaluates `statistic` on the identity resample for the point
    /// estimate, then on R resamples drawn with seeds pre-generated from the
    /// base seed, so results do not depend on thread scheduling.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for an empty dataset, R == 0, an impossible
    ///   minimum, or a statistic whose output length changes
    /// - `ReplicationFailure` for the first failing replication under the
    ///   default fail-fast policy, or a failure on the original sample
    /// - `InsufficientValidReplications` when exclusions leave too few
    /// - `Cancelled` / `Timeout`
    pub fn run<D, S>(&self, data: &D, statistic: &S) -> Result<BootstrapResult, BootstrapError>
    where
        D: RowSource + Sync + ?Sized,
        S: Statistic<D> + ?Sized,
    {
        let start = Instant::now();
        let n = data.n_rows();
        let r = self.config.replications;
        let required = self.config.required_valid();
        self.validate(n)?;

        let seed = self.config.seed_or_default();
        log::debug!(
            "bootstrap: rows={} replications={} seed={} required_valid={} redraws={}",
            n,
            r,
            seed,
            required,
            self.config.redraw_attempts
        );

        let identity: Vec<usize> = (0..n).collect();
        let original = evaluate_checked(statistic, data, &identity, Stage::Original, None)?;
        let dim = original.len();

        // All seeds are drawn up front, in replication order.
        let seeds = SeedStream::new(seed).take(r);
        let fail_fast = required == r;
        let deadline = self.config.max_duration.map(|budget| start + budget);
        // Lowest replication that hit a fatal error. Replications above it
        // are skipped; those below still run so the reported failure does
        // not depend on scheduling.
        let first_fatal = AtomicUsize::new(usize::MAX);
        let timed_out = AtomicBool::new(false);
        let completed = AtomicUsize::new(0);

        let replicate = |i: usize| -> Slot {
            if i > first_fatal.load(Ordering::Relaxed)
                || timed_out.load(Ordering::Relaxed)
                || self.is_cancelled()
            {
                return Slot::Skipped;
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                timed_out.store(true, Ordering::Relaxed);
                return Slot::Skipped;
            }

            let slot = self.replicate(data, statistic, n, dim, i, seeds[i]);
            match slot {
                Slot::Failed(_) if fail_fast => {
                    first_fatal.fetch_min(i, Ordering::Relaxed);
                }
                Slot::Invalid(_) => {
                    first_fatal.fetch_min(i, Ordering::Relaxed);
                }
                _ => {}
            }
            completed.fetch_add(1, Ordering::Relaxed);
            slot
        };

        #[cfg(feature = "parallel")]
        let slots: Vec<Slot> = thread_pool::install(self.config.threads, || {
            (0..r).into_par_iter().map(replicate).collect()
        })?;

        #[cfg(not(feature = "parallel"))]
        let slots: Vec<Slot> =
            thread_pool::install(self.config.threads, || (0..r).map(replicate).collect())?;

        let elapsed = start.elapsed();
        self.collect(slots, original, seed, required, completed.into_inner(), elapsed)
    }

    /// Run the bootstrap and build BCa intervals for every component.
    ///
    /// # Errors
    ///
    /// Everything [`run`](Self::run) returns, plus the interval errors of
    /// [`bca_intervals`](crate::analysis::bca_intervals).
    pub fn estimate<D, S>(&self, data: &D, statistic: &S) -> Result<Estimate, BootstrapError>
    where
        D: RowSource + Sync + ?Sized,
        S: Statistic<D> + ?Sized,
    {
        let bootstrap = self.run(data, statistic)?;
        let intervals = bca_intervals(&bootstrap, data, statistic, &self.bca_options())?;
        Ok(Estimate {
            bootstrap,
            intervals,
        })
    }

    /// Run the bootstrap and build plain percentile intervals.
    ///
    /// Skips the jackknife, so it costs R refits instead of R + N.
    pub fn estimate_percentile<D, S>(
        &self,
        data: &D,
        statistic: &S,
    ) -> Result<Estimate, BootstrapError>
    where
        D: RowSource + Sync + ?Sized,
        S: Statistic<D> + ?Sized,
    {
        let bootstrap = self.run(data, statistic)?;
        let labels = statistic.labels(bootstrap.dimension());
        let intervals = percentile_intervals(&bootstrap, &labels, &self.bca_options())?;
        Ok(Estimate {
            bootstrap,
            intervals,
        })
    }

    /// Interval options derived from the configuration.
    pub fn bca_options(&self) -> BcaOptions {
        BcaOptions::from(&self.config)
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    fn validate(&self, n: usize) -> Result<(), BootstrapError> {
        let r = self.config.replications;
        if n == 0 {
            return Err(BootstrapError::invalid(Stage::Resampling, "dataset has no rows"));
        }
        if r == 0 {
            return Err(BootstrapError::invalid(
                Stage::Resampling,
                "replications must be greater than zero",
            ));
        }
        let required = self.config.required_valid();
        if required == 0 || required > r {
            return Err(BootstrapError::invalid(
                Stage::Resampling,
                format!(
                    "min_valid_replications must be in 1..={}, got {}",
                    r, required
                ),
            ));
        }
        let c = self.config.confidence_level;
        if !(c > 0.0 && c < 1.0) {
            return Err(BootstrapError::invalid(
                Stage::Resampling,
                format!("confidence level must be in (0, 1), got {}", c),
            ));
        }
        Ok(())
    }

    /// One replication, with redraws on statistic failure.
    ///
    /// The first attempt uses the replication's seed; redraw k uses
    /// `counter_rng_seed(seed, k)`.
    fn replicate<D, S>(
        &self,
        data: &D,
        statistic: &S,
        n: usize,
        dim: usize,
        replication: usize,
        seed: u64,
    ) -> Slot
    where
        D: RowSource + Sync + ?Sized,
        S: Statistic<D> + ?Sized,
    {
        let mut indices = vec![0; n];
        let mut attempt = 0;

        loop {
            let draw_seed = if attempt == 0 {
                seed
            } else {
                counter_rng_seed(seed, attempt as u64)
            };
            if let Err(err) = Resampler::new(draw_seed).resample_into(&mut indices) {
                return Slot::Invalid(err);
            }

            match evaluate_checked(
                statistic,
                data,
                &indices,
                Stage::Replication(replication),
                Some(dim),
            ) {
                Ok(values) => {
                    return Slot::Done {
                        values,
                        attempts: attempt + 1,
                    }
                }
                Err(BootstrapError::ReplicationFailure { source, .. })
                    if attempt < self.config.redraw_attempts =>
                {
                    log::debug!(
                        "replication {} attempt {} failed ({}), redrawing",
                        replication,
                        attempt,
                        source
                    );
                    attempt += 1;
                }
                Err(BootstrapError::ReplicationFailure { source, .. }) => {
                    return Slot::Failed(ExcludedReplication {
                        replication,
                        attempts: attempt + 1,
                        error: source,
                    })
                }
                Err(other) => return Slot::Invalid(other),
            }
        }
    }

    /// Turn per-replication slots into a result, applying the failure policy.
    fn collect(
        &self,
        slots: Vec<Slot>,
        original: Vec<f64>,
        seed: u64,
        required: usize,
        completed: usize,
        elapsed: Duration,
    ) -> Result<BootstrapResult, BootstrapError> {
        let r = slots.len();
        let fail_fast = required == r;
        let dim = original.len();

        let mut values = Vec::with_capacity(r * dim);
        let mut excluded = Vec::new();
        let mut redrawn = 0;
        let mut skipped = 0;

        // Slots are in replication order, so the lowest failing index wins.
        for slot in slots {
            match slot {
                Slot::Done {
                    values: row,
                    attempts,
                } => {
                    if attempts > 1 {
                        redrawn += 1;
                    }
                    values.extend(row);
                }
                Slot::Invalid(err) => return Err(err),
                Slot::Failed(failure) if fail_fast => {
                    return Err(BootstrapError::ReplicationFailure {
                        stage: Stage::Replication(failure.replication),
                        source: failure.error,
                    })
                }
                Slot::Failed(failure) => excluded.push(failure),
                Slot::Skipped => skipped += 1,
            }
        }

        if self.is_cancelled() {
            return Err(BootstrapError::Cancelled { completed });
        }
        if let Some(budget) = self.config.max_duration {
            if skipped > 0 || elapsed > budget {
                return Err(BootstrapError::Timeout { budget, elapsed });
            }
        }

        let used = values.len() / dim;
        if !excluded.is_empty() {
            log::warn!(
                "bootstrap: excluded {} of {} replications (first: replication {}: {})",
                excluded.len(),
                r,
                excluded[0].replication,
                excluded[0].error
            );
        }
        if used < required {
            return Err(BootstrapError::InsufficientValidReplications {
                valid: used,
                required,
            });
        }

        log::info!(
            "bootstrap: {} replications in {:.3}s ({} redrawn, {} excluded)",
            used,
            elapsed.as_secs_f64(),
            redrawn,
            excluded.len()
        );

        Ok(BootstrapResult {
            original,
            replicates: DMatrix::from_row_slice(used, dim, &values),
            requested: r,
            seed,
            excluded,
            redrawn,
            elapsed,
        })
    }
}

/// Convenience function: BCa intervals with default configuration and a
/// given seed.
pub fn bootstrap<D, S>(data: &D, statistic: &S, seed: u64) -> Result<Estimate, BootstrapError>
where
    D: RowSource + Sync + ?Sized,
    S: Statistic<D> + ?Sized,
{
    BootstrapEngine::new().seed(seed).estimate(data, statistic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StatisticError;

    fn failing(_: &[f64], _: &[usize]) -> Result<Vec<f64>, StatisticError> {
        Err(StatisticError::Custom("no fit".into()))
    }

    fn mean(data: &[f64], idx: &[usize]) -> Result<Vec<f64>, StatisticError> {
        Ok(vec![idx.iter().map(|&i| data[i]).sum::<f64>() / idx.len() as f64])
    }

    fn data() -> Vec<f64> {
        (0..40).map(|i| ((i * 37) % 23) as f64).collect()
    }

    #[test]
    fn test_shape_and_point_estimate() {
        let data = data();
        let result = BootstrapEngine::quick().seed(1).run(&data[..], &mean).unwrap();
        assert_eq!(result.replicates.shape(), (200, 1));
        assert_eq!(result.requested, 200);
        let expected = data.iter().sum::<f64>() / data.len() as f64;
        assert_eq!(result.original, vec![expected]);
    }

    #[test]
    fn test_default_shape_is_2000_by_1() {
        let data = data();
        let result = BootstrapEngine::new().seed(9).run(&data[..], &mean).unwrap();
        assert_eq!(result.replicates.shape(), (2000, 1));
    }

    #[test]
    fn test_same_seed_same_matrix() {
        let data = data();
        let a = BootstrapEngine::quick().seed(5).run(&data[..], &mean).unwrap();
        let b = BootstrapEngine::quick().seed(5).run(&data[..], &mean).unwrap();
        let c = BootstrapEngine::quick().seed(6).run(&data[..], &mean).unwrap();
        assert_eq!(a.replicates, b.replicates);
        assert_ne!(a.replicates, c.replicates);
    }

    #[test]
    #[cfg(feature = "parallel")]
    fn test_thread_count_does_not_change_results() {
        let data = data();
        let one = BootstrapEngine::quick().seed(5).threads(1).run(&data[..], &mean).unwrap();
        let four = BootstrapEngine::quick().seed(5).threads(4).run(&data[..], &mean).unwrap();
        assert_eq!(one.replicates, four.replicates);
    }

    #[test]
    fn test_rejects_bad_input() {
        let empty: Vec<f64> = vec![];
        let err = BootstrapEngine::quick().run(&empty[..], &mean).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Resampling));

        let data = data();
        let err = BootstrapEngine::new().replications(0).run(&data[..], &mean).unwrap_err();
        assert!(matches!(err, BootstrapError::InvalidInput { .. }));

        let err = BootstrapEngine::quick()
            .min_valid_replications(201)
            .run(&data[..], &mean)
            .unwrap_err();
        assert!(matches!(err, BootstrapError::InvalidInput { .. }));

        let err = BootstrapEngine::quick()
            .confidence_level(1.0)
            .run(&data[..], &mean)
            .unwrap_err();
        assert!(matches!(err, BootstrapError::InvalidInput { .. }));
    }

    #[test]
    fn test_original_failure_is_reported() {
        let data = data();
        let err = BootstrapEngine::quick().run(&data[..], &failing).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Original));
    }

    #[test]
    fn test_changing_output_length_is_invalid() {
        let data = data();
        let ragged = |d: &[f64], idx: &[usize]| -> Result<Vec<f64>, StatisticError> {
            if idx.iter().copied().eq(0..d.len()) {
                Ok(vec![1.0])
            } else {
                Ok(vec![1.0, 2.0])
            }
        };
        let err = BootstrapEngine::quick().run(&data[..], &ragged).unwrap_err();
        assert!(matches!(
            err,
            BootstrapError::InvalidInput {
                stage: Stage::Replication(0),
                ..
            }
        ));
    }

    #[test]
    fn test_fail_fast_reports_lowest_failing_replication() {
        let data = data();
        // Fails whenever row 0 is drawn; most resamples of 40 rows include it.
        let picky = |d: &[f64], idx: &[usize]| -> Result<Vec<f64>, StatisticError> {
            if idx.len() < d.len() || !idx.contains(&0) || idx.iter().copied().eq(0..d.len()) {
                Ok(vec![idx.len() as f64])
            } else {
                Err(StatisticError::Custom("row 0 drawn".into()))
            }
        };
        let engine = BootstrapEngine::quick().seed(3);
        let first_bad = {
            let seeds = SeedStream::new(3).take(200);
            (0..200)
                .find(|&i| Resampler::new(seeds[i]).resample(40).unwrap().contains(&0))
                .unwrap()
        };
        match engine.run(&data[..], &picky).unwrap_err() {
            BootstrapError::ReplicationFailure {
                stage: Stage::Replication(i),
                ..
            } => assert_eq!(i, first_bad),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_exclusion_policy_records_failures() {
        let data = data();
        let engine = BootstrapEngine::quick().seed(3).min_valid_replications(1);
        let seeds = SeedStream::new(3).take(200);
        let expected_bad = (0..200)
            .filter(|&i| Resampler::new(seeds[i]).resample(40).unwrap().contains(&0))
            .count();

        let picky = |d: &[f64], idx: &[usize]| -> Result<Vec<f64>, StatisticError> {
            if idx.iter().copied().eq(0..d.len()) || !idx.contains(&0) {
                Ok(vec![1.0])
            } else {
                Err(StatisticError::Custom("row 0 drawn".into()))
            }
        };
        let result = engine.run(&data[..], &picky).unwrap();
        assert_eq!(result.excluded.len(), expected_bad);
        assert_eq!(result.replications_used(), 200 - expected_bad);
        assert!(result.excluded.iter().all(|e| e.attempts == 1));
    }

    #[test]
    fn test_exclusion_below_minimum_fails() {
        let data = data();
        let always_but_original = |d: &[f64], idx: &[usize]| -> Result<Vec<f64>, StatisticError> {
            if idx.iter().copied().eq(0..d.len()) {
                Ok(vec![1.0])
            } else {
                failing(d, idx)
            }
        };
        let err = BootstrapEngine::quick()
            .min_valid_replications(100)
            .run(&data[..], &always_but_original)
            .unwrap_err();
        assert!(matches!(
            err,
            BootstrapError::InsufficientValidReplications {
                valid: 0,
                required: 100
            }
        ));
    }

    #[test]
    fn test_redraws_recover_deterministically() {
        let data = data();
        // Fails on roughly half of all resamples.
        let coin = |d: &[f64], idx: &[usize]| -> Result<Vec<f64>, StatisticError> {
            if idx.iter().copied().eq(0..d.len()) || idx[0] % 2 == 0 {
                mean(d, idx)
            } else {
                Err(StatisticError::Custom("odd first row".into()))
            }
        };
        let engine = BootstrapEngine::quick().seed(8).redraw_attempts(40);
        let a = engine.run(&data[..], &coin).unwrap();
        let b = engine.run(&data[..], &coin).unwrap();
        assert_eq!(a.replications_used(), 200);
        assert!(a.redrawn > 0);
        assert!(a.excluded.is_empty());
        assert_eq!(a.replicates, b.replicates);
        assert_eq!(a.redrawn, b.redrawn);
    }

    #[test]
    fn test_cancelled_run_fails() {
        let data = data();
        let token = CancellationToken::new();
        token.cancel();
        let err = BootstrapEngine::quick()
            .cancellation(token)
            .run(&data[..], &mean)
            .unwrap_err();
        assert!(matches!(err, BootstrapError::Cancelled { completed: 0 }));
    }

    #[test]
    fn test_zero_budget_times_out() {
        let data = data();
        let err = BootstrapEngine::quick()
            .max_duration(Duration::ZERO)
            .run(&data[..], &mean)
            .unwrap_err();
        assert!(matches!(err, BootstrapError::Timeout { .. }));
    }

    #[test]
    fn test_does_not_touch_input() {
        let data = data();
        let before = data.clone();
        let _ = BootstrapEngine::quick().run(&data[..], &mean).unwrap();
        assert_eq!(data, before);
    }
}
