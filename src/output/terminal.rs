//! Terminal output formatting with colors and box drawing.

use colored::Colorize;

use crate::result::{Estimate, IntervalEstimate, IntervalMethod};

/// Format an [`Estimate`] as a human-readable table.
pub fn format_estimates(estimate: &Estimate) -> String {
    let run = &estimate.bootstrap;
    let mut output = String::new();
    let sep = "\u{2500}".repeat(62);

    output.push_str("refit-bootstrap\n");
    output.push_str(&sep);
    output.push('\n');
    output.push('\n');

    output.push_str(&format!(
        "  Replications: {} used of {} (seed {})\n",
        run.replications_used(),
        run.requested,
        run.seed
    ));
    if !run.excluded.is_empty() {
        output.push_str(&format!(
            "  {}\n",
            format!("\u{26A0} {} replications excluded", run.excluded.len())
                .yellow()
                .bold()
        ));
    }
    if run.redrawn > 0 {
        output.push_str(&format!("  Redrawn: {}\n", run.redrawn));
    }
    output.push_str(&format!("  Runtime: {:.2} s\n", run.elapsed.as_secs_f64()));
    output.push('\n');

    output.push_str(&format!(
        "    {:<20} {:>12} {:>10}   {}\n",
        "Component", "Estimate", "SE", "Interval"
    ));
    for interval in &estimate.intervals {
        output.push_str(&format_row(interval));
    }

    output.push('\n');
    output.push_str(&sep);
    output.push('\n');
    if let Some(first) = estimate.intervals.first() {
        output.push_str(&format!(
            "Note: {:.0}% {} intervals.\n",
            first.confidence_level * 100.0,
            format_method(first.method)
        ));
    }

    output
}

fn format_row(interval: &IntervalEstimate) -> String {
    let bounds = format!("[{:.4}, {:.4}]", interval.conf_low, interval.conf_high);
    // An interval clear of zero is highlighted.
    let bounds = if interval.contains(0.0) {
        bounds.normal().to_string()
    } else {
        bounds.green().to_string()
    };
    format!(
        "    {:<20} {:>12.4} {:>10.4}   {}\n",
        interval.label, interval.point_estimate, interval.standard_error, bounds
    )
}

fn format_method(method: IntervalMethod) -> &'static str {
    match method {
        IntervalMethod::Bca => "BCa",
        IntervalMethod::Percentile => "percentile",
    }
}
