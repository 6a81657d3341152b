use crate::error::Result;
use crate::sample::{ProbeKind, Sample};
use crate::stats::Statistics;
use crate::window::{Completion, RunWindow};
use chrono::{DateTime, Local};
use std::ops::RangeBounds;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Shared handle to the active [`RunWindow`].
///
/// The sampling engine is the only writer; any number of consumers may read
/// concurrently. Every write is a single push or field update under the
/// write lock, so readers never observe a partially appended sample.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    inner: Arc<RwLock<RunWindow>>,
}

impl HistoryStore {
    pub fn new(window: RunWindow) -> Self {
        Self {
            inner: Arc::new(RwLock::new(window)),
        }
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, RunWindow> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, RunWindow> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Exclusive, atomic append of one sample.
    pub fn append(&self, sample: Sample) -> Result<()> {
        self.write_guard().append(sample)
    }

    /// Append, then freeze with [`Completion::BudgetReached`] if the window
    /// is now full, both under one write lock. Returns `true` if frozen.
    pub fn append_and_seal(&self, sample: Sample, budget_elapsed: bool) -> Result<bool> {
        let mut window = self.write_guard();
        window.append(sample)?;
        if window.is_full() || budget_elapsed {
            window.freeze(Completion::BudgetReached, Local::now());
            return Ok(true);
        }
        Ok(false)
    }

    pub fn freeze(&self, completion: Completion, end_time: DateTime<Local>) -> bool {
        self.write_guard().freeze(completion, end_time)
    }

    pub fn mark_unavailable(&self, kind: ProbeKind) {
        self.write_guard().mark_unavailable(kind);
    }

    /// Borrow the window under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&RunWindow) -> R) -> R {
        f(&self.read_guard())
    }

    /// Owned copy of the window, e.g. for handing a frozen run to an exporter.
    pub fn snapshot(&self) -> RunWindow {
        self.read_guard().clone()
    }

    pub fn statistics(&self, range: impl RangeBounds<usize>) -> Result<Statistics> {
        self.read_guard().statistics(range)
    }

    pub fn statistics_all(&self) -> Statistics {
        self.read_guard().statistics_all()
    }

    pub fn len(&self) -> usize {
        self.read_guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_guard().is_empty()
    }

    pub fn is_frozen(&self) -> bool {
        self.read_guard().is_frozen()
    }
}
