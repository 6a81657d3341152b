use crate::error::{MonitorError, Result};
use crate::sample::{ProbeKind, Sample};
use crate::stats::Statistics;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::ops::{Bound, RangeBounds};
use std::time::Duration;

/// Default sampling period.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);
/// Default observation window length.
pub const DEFAULT_DURATION_BUDGET: Duration = Duration::from_secs(60);
/// Largest window a configuration may ask for (one week at 1 Hz).
pub const MAX_CAPACITY: usize = 7 * 24 * 60 * 60;

/// Up-front sample allocation; larger windows grow on demand.
const PREALLOCATE: usize = 4096;

/// How a run reached `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    /// The duration budget elapsed or the sample capacity was reached.
    BudgetReached,
    /// A manual stop was observed at a tick boundary.
    StopRequested,
}

/// One bounded observation session and its samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunWindow {
    pub start_time:      DateTime<Local>,
    pub end_time:        Option<DateTime<Local>>,
    pub interval:        Duration,
    pub duration_budget: Duration,
    /// Per-core vector length for every sample of this run.
    pub core_count:      usize,
    pub completion:      Option<Completion>,
    /// Probes declared unavailable for the whole run.
    pub unavailable:     Vec<ProbeKind>,
    samples:             Vec<Sample>,
}

impl RunWindow {
    pub fn new(interval: Duration, duration_budget: Duration, core_count: usize) -> Self {
        let mut window = Self {
            start_time: Local::now(),
            end_time: None,
            interval,
            duration_budget,
            core_count,
            completion: None,
            unavailable: Vec::new(),
            samples: Vec::new(),
        };
        window.samples.reserve_exact(window.capacity().min(PREALLOCATE));
        window
    }

    /// Maximum number of samples: `duration_budget / interval`.
    pub fn capacity(&self) -> usize {
        if self.interval.is_zero() {
            return 0;
        }
        usize::try_from(self.duration_budget.as_nanos() / self.interval.as_nanos())
            .unwrap_or(usize::MAX)
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity()
    }

    pub fn is_frozen(&self) -> bool {
        self.end_time.is_some()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    /// Offset of the most recent sample.
    pub fn elapsed(&self) -> Duration {
        self.samples.last().map(|s| s.timestamp).unwrap_or_default()
    }

    /// Time left before the budget runs out, measured at the last sample.
    pub fn remaining(&self) -> Duration {
        self.duration_budget.saturating_sub(self.elapsed())
    }

    /// Append one sample.
    ///
    /// Fails with [`MonitorError::CapacityExceeded`] once the window is full
    /// or frozen, and rejects timestamps that do not strictly increase.
    pub fn append(&mut self, sample: Sample) -> Result<()> {
        if self.is_frozen() || self.is_full() {
            return Err(MonitorError::CapacityExceeded {
                capacity: self.capacity(),
            });
        }
        if let Some(last) = self.samples.last() {
            if sample.timestamp <= last.timestamp {
                return Err(MonitorError::NonMonotonicTimestamp {
                    last: last.timestamp,
                    got:  sample.timestamp,
                });
            }
        }
        self.samples.push(sample);
        Ok(())
    }

    /// Freeze the window. Only the first call has any effect.
    pub fn freeze(&mut self, completion: Completion, end_time: DateTime<Local>) -> bool {
        if self.is_frozen() {
            return false;
        }
        self.completion = Some(completion);
        self.end_time = Some(end_time);
        true
    }

    pub fn mark_unavailable(&mut self, kind: ProbeKind) {
        if !self.unavailable.contains(&kind) {
            self.unavailable.push(kind);
        }
    }

    /// Statistics over a closed sub-range of sample indices.
    pub fn statistics(&self, range: impl RangeBounds<usize>) -> Result<Statistics> {
        let len = self.samples.len();
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s.saturating_add(1),
            Bound::Unbounded    => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&e) => e.checked_add(1).ok_or(MonitorError::InvalidRange {
                start,
                end: e,
                len,
            })?,
            Bound::Excluded(&e) => e,
            Bound::Unbounded    => len,
        };
        if start > end || end > len {
            return Err(MonitorError::InvalidRange { start, end, len });
        }
        Ok(Statistics::compute(&self.samples[start..end]))
    }

    /// Statistics over the whole run.
    pub fn statistics_all(&self) -> Statistics {
        Statistics::compute(&self.samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{Metric, MetricStats};

    fn sample_at(secs: u64) -> Sample {
        let mut s = Sample::empty(Duration::from_secs(secs), Local::now());
        s.cpu_percent_total = Some(secs as f64);
        s
    }

    fn window(budget_secs: u64) -> RunWindow {
        RunWindow::new(Duration::from_secs(1), Duration::from_secs(budget_secs), 1)
    }

    #[test]
    fn default_capacity_is_sixty() {
        let w = RunWindow::new(DEFAULT_INTERVAL, DEFAULT_DURATION_BUDGET, 8);
        assert_eq!(w.capacity(), 60);
    }

    #[test]
    fn append_refuses_past_capacity() {
        let mut w = window(3);
        for i in 0..3 {
            w.append(sample_at(i)).unwrap();
        }
        assert!(w.is_full());
        let err = w.append(sample_at(3)).unwrap_err();
        assert!(matches!(err, MonitorError::CapacityExceeded { capacity: 3 }));
        assert_eq!(w.len(), 3);
    }

    #[test]
    fn append_refuses_after_freeze() {
        let mut w = window(10);
        w.append(sample_at(0)).unwrap();
        assert!(w.freeze(Completion::StopRequested, Local::now()));
        assert!(matches!(
            w.append(sample_at(1)),
            Err(MonitorError::CapacityExceeded { .. })
        ));
    }

    #[test]
    fn second_freeze_keeps_first_completion() {
        let mut w = window(10);
        assert!(w.freeze(Completion::BudgetReached, Local::now()));
        assert!(!w.freeze(Completion::StopRequested, Local::now()));
        assert_eq!(w.completion, Some(Completion::BudgetReached));
    }

    #[test]
    fn timestamps_must_increase() {
        let mut w = window(10);
        w.append(sample_at(2)).unwrap();
        assert!(matches!(
            w.append(sample_at(2)),
            Err(MonitorError::NonMonotonicTimestamp { .. })
        ));
    }

    #[test]
    fn statistics_over_sub_range() {
        let mut w = window(10);
        for i in 0..5 {
            w.append(sample_at(i)).unwrap();
        }
        let stats = w.statistics(1..=3).unwrap();
        let cpu = stats.get(Metric::CpuTotal).summary().unwrap();
        assert_eq!(cpu.count, 3);
        assert_eq!(cpu.mean, 2.0);
        assert_eq!(cpu.min, 1.0);
        assert_eq!(cpu.max, 3.0);
    }

    #[test]
    fn statistics_rejects_out_of_bounds() {
        let mut w = window(10);
        w.append(sample_at(0)).unwrap();
        assert!(matches!(
            w.statistics(0..5),
            Err(MonitorError::InvalidRange { len: 1, .. })
        ));
    }

    #[test]
    fn statistics_on_frozen_window_are_idempotent() {
        let mut w = window(10);
        for i in 0..4 {
            w.append(sample_at(i)).unwrap();
        }
        w.freeze(Completion::BudgetReached, Local::now());
        assert_eq!(w.statistics_all(), w.statistics_all());
        assert_eq!(*w.statistics_all().get(Metric::Temperature), MetricStats::Unavailable);
    }

    #[test]
    fn huge_budget_does_not_preallocate() {
        let w = RunWindow::new(Duration::from_secs(1), Duration::from_secs(u64::MAX), 4);
        assert_eq!(w.capacity() as u64, u64::MAX.min(usize::MAX as u64));
        assert!(w.is_empty());
    }

    #[test]
    fn range_bounds_at_usize_max_are_rejected() {
        let mut w = window(10);
        w.append(sample_at(0)).unwrap();
        assert!(matches!(
            w.statistics(0..=usize::MAX),
            Err(MonitorError::InvalidRange { len: 1, .. })
        ));
        let excluded_start = (Bound::Excluded(usize::MAX), Bound::Unbounded);
        assert!(matches!(
            w.statistics(excluded_start),
            Err(MonitorError::InvalidRange { .. })
        ));
    }

    #[test]
    fn remaining_counts_down_from_budget() {
        let mut w = window(10);
        assert_eq!(w.remaining(), Duration::from_secs(10));
        w.append(sample_at(0)).unwrap();
        w.append(sample_at(4)).unwrap();
        assert_eq!(w.remaining(), Duration::from_secs(6));
    }
}
