//! Reporting of bootstrap estimates.

mod json;
mod terminal;

pub use json::{to_json, to_json_pretty, ExcludedSummary, Report};
pub use terminal::format_estimates;
