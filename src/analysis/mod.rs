//! Confidence-interval construction from bootstrap distributions.

mod bca;

pub use bca::{
    adjusted_levels, bca_from_replicates, bca_interval, bca_intervals, bias_correction,
    percentile_intervals, BcaOptions,
};
