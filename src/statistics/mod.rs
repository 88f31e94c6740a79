//! Statistical building blocks for the bootstrap engine.
//!
//! - Resampling with replacement and per-replication seed streams
//! - Type-7 empirical quantiles
//! - Standard normal CDF and quantile
//! - Sample moments and an online covariance accumulator
//! - Leave-one-out jackknife for the BCa acceleration

mod jackknife;
mod moments;
mod normal;
mod quantile;
mod resample;

pub use jackknife::{acceleration, jackknife_acceleration, leave_one_out};
pub use moments::{mean, sample_std_dev, WelfordCovariance};
pub use normal::{normal_cdf, normal_quantile};
pub use quantile::{quantile_sorted, sorted_copy};
pub use resample::{counter_rng_seed, Resampler, SeedStream};
