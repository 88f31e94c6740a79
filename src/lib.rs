//! # refit-bootstrap
//!
//! Nonparametric bootstrap with bias-corrected and accelerated (BCa)
//! confidence intervals.
//!
//! The crate resamples the rows of a dataset with replacement, evaluates a
//! statistic on each resample, and turns the empirical distribution into
//! interval estimates:
//! - Point estimate and bootstrap standard error per component
//! - BCa bounds (bias correction from the replicates, acceleration from a
//!   jackknife) or plain percentile bounds
//! - Deterministic output for a seed, whatever the thread count
//!
//! ## Pitfall: the statistic must be pure
//!
//! The statistic sees the dataset and the resampled row indices, nothing
//! else. Put model specifications and comparison data in fields of the
//! value implementing [`Statistic`] rather than in captured mutable state,
//! because replications run concurrently.
//!
//! ## Quick Start
//!
//! ```ignore
//! use refit_bootstrap::{BootstrapEngine, Dataset};
//! use refit_bootstrap::estimators::MeanDifference;
//!
//! let data = Dataset::from_numeric_columns(&[
//!     ("outcome", outcomes),
//!     ("treated", treated),
//! ])?;
//!
//! let estimate = BootstrapEngine::new()
//!     .replications(2_000)
//!     .seed(7)
//!     .estimate(&data, &MeanDifference::new("outcome", "treated"))?;
//!
//! for interval in &estimate.intervals {
//!     println!("{}: [{:.2}, {:.2}]", interval.label, interval.conf_low, interval.conf_high);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
mod config;
mod dataset;
mod engine;
mod error;
mod result;
mod statistic;
mod thread_pool;

// Functional modules
pub mod analysis;
pub mod estimators;
pub mod output;
pub mod statistics;

// Re-exports for public API
pub use config::{Config, DEFAULT_SEED};
pub use dataset::{Dataset, DatasetView, RowSource, Value};
pub use engine::{bootstrap, BootstrapEngine, CancellationToken};
pub use error::{BootstrapError, Degeneracy, Stage, StatisticError};
pub use result::{BootstrapResult, Estimate, ExcludedReplication, IntervalEstimate, IntervalMethod};
pub use statistic::Statistic;
