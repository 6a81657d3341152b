use crate::RunSummary;
use hostmon_core::{Completion, Metric, MetricStats, RunWindow, Statistics, Unit};
use std::fmt::Write;

const MB: f64 = 1024.0 * 1024.0;

/// Render the summary block and per-metric statistics table.
///
/// Byte rates are shown in MB/s; metrics with no present sample read
/// `unavailable` rather than zeros.
pub fn render_text(window: &RunWindow, stats: &Statistics) -> String {
    let summary = RunSummary::from_window(window);
    let mut out = String::new();

    let _ = writeln!(out, "{:<20}{:.1} s", "Monitoring period", summary.duration_secs);
    let _ = writeln!(out, "{:<20}{} / {}", "Data points", summary.sample_count, summary.capacity);
    if let Some(start) = summary.start_time {
        let _ = writeln!(out, "{:<20}{}", "Start time", start.format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(end) = summary.end_time {
        let _ = writeln!(out, "{:<20}{}", "End time", end.format("%Y-%m-%d %H:%M:%S"));
    }
    let completion = match summary.completion {
        Some(Completion::BudgetReached) => "duration budget reached",
        Some(Completion::StopRequested) => "stopped by request",
        None => "running",
    };
    let _ = writeln!(out, "{:<20}{completion}", "Completion");
    if !summary.unavailable.is_empty() {
        let names: Vec<&str> = summary.unavailable.iter().map(|k| k.name()).collect();
        let _ = writeln!(out, "{:<20}{}", "Unavailable", names.join(", "));
    }

    let _ = writeln!(
        out,
        "\n{:<26}{:>10}{:>10}{:>10}{:>10}{:>6}",
        "Metric", "Mean", "Min", "Max", "Std dev", "n"
    );
    for (metric, metric_stats) in stats.iter() {
        let (scale, unit) = display_unit(metric);
        let name = format!("{} ({unit})", metric.label());
        match metric_stats {
            MetricStats::Available(s) => {
                let _ = writeln!(
                    out,
                    "{name:<26}{:>10.2}{:>10.2}{:>10.2}{:>10.2}{:>6}",
                    s.mean / scale,
                    s.min / scale,
                    s.max / scale,
                    s.std_dev / scale,
                    s.count,
                );
            }
            MetricStats::Unavailable => {
                let _ = writeln!(out, "{name:<26}{:>10}", "unavailable");
            }
        }
    }
    out
}

fn display_unit(metric: Metric) -> (f64, &'static str) {
    match metric.unit() {
        Unit::BytesPerSecond => (MB, "MB/s"),
        unit => (1.0, unit.symbol()),
    }
}
