//! Export of a finished monitoring run: a console summary table and a JSON
//! report file.

mod text;

pub use text::render_text;

use chrono::{DateTime, Local};
use hostmon_core::{Completion, MonitorError, ProbeKind, Result, RunWindow, Sample, Statistics};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Headline facts about one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Seconds between the first and the last sample.
    pub duration_secs: f64,
    pub sample_count:  usize,
    pub capacity:      usize,
    pub start_time:    Option<DateTime<Local>>,
    pub end_time:      Option<DateTime<Local>>,
    pub completion:    Option<Completion>,
    pub unavailable:   Vec<ProbeKind>,
}

impl RunSummary {
    pub fn from_window(window: &RunWindow) -> Self {
        let samples = window.samples();
        let duration_secs = match (samples.first(), samples.last()) {
            (Some(first), Some(last)) => last.timestamp.saturating_sub(first.timestamp).as_secs_f64(),
            _ => 0.0,
        };

        Self {
            duration_secs,
            sample_count: samples.len(),
            capacity: window.capacity(),
            start_time: samples.first().map(|s| s.captured_at),
            end_time: samples.last().map(|s| s.captured_at),
            completion: window.completion,
            unavailable: window.unavailable.clone(),
        }
    }
}

/// Serialized form of a frozen run.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub generated_at: DateTime<Local>,
    pub summary:      RunSummary,
    pub statistics:   &'a Statistics,
    pub samples:      &'a [Sample],
}

impl<'a> Report<'a> {
    /// Build a report; only a stopped (frozen) window can be exported.
    pub fn new(window: &'a RunWindow, statistics: &'a Statistics) -> Result<Self> {
        if !window.is_frozen() {
            return Err(MonitorError::Report("run is still in progress".into()));
        }
        Ok(Self {
            generated_at: Local::now(),
            summary: RunSummary::from_window(window),
            statistics,
            samples: window.samples(),
        })
    }

    pub fn file_name(&self) -> String {
        format!(
            "system_monitor_report_{}.json",
            self.generated_at.format("%Y%m%d_%H%M%S")
        )
    }
}

/// Write the run as pretty JSON into `dir` and return the file path.
pub fn write_json(dir: impl AsRef<Path>, window: &RunWindow, statistics: &Statistics) -> Result<PathBuf> {
    let report = Report::new(window, statistics)?;
    let path = dir.as_ref().join(report.file_name());

    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| MonitorError::Report(format!("cannot serialize report: {e}")))?;
    std::fs::write(&path, json)?;

    info!("Report written to '{}'", path.display());
    Ok(path)
}
