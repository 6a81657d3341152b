//! The per-run tick loop: one periodic timer, all probes joined per tick,
//! one atomic append, then synchronous observer notification.

use crate::{config::EngineConfig, EngineState, Shared};
use chrono::Local;
use futures::future::join_all;
use hostmon_core::{
    Completion, HistoryStore, ProbeError, ProbeKind, Reading, RunObserver, RunWindow,
    SampleBuilder,
};
use hostmon_system::Probe;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, TryLockError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// One probe plus its per-run bookkeeping.
pub(crate) struct ProbeSlot {
    kind:      ProbeKind,
    optional:  bool,
    probe:     Arc<Mutex<Box<dyn Probe>>>,
    attempted: bool,
    disabled:  bool,
}

impl ProbeSlot {
    pub(crate) fn new(probe: Box<dyn Probe>) -> Self {
        Self {
            kind:      probe.kind(),
            optional:  probe.optional(),
            probe:     Arc::new(Mutex::new(probe)),
            attempted: false,
            disabled:  false,
        }
    }

    /// Run `sample()` on the blocking pool, bounded by `timeout`.
    ///
    /// A call that is still running from an earlier tick holds the lock, so
    /// this tick reports `Busy` instead of queueing behind it.
    async fn call(&self, timeout: Duration) -> Result<Reading, ProbeError> {
        let probe = Arc::clone(&self.probe);
        let task = tokio::task::spawn_blocking(move || match probe.try_lock() {
            Ok(mut p) => p.sample(),
            Err(TryLockError::WouldBlock) => Err(ProbeError::Busy),
            Err(TryLockError::Poisoned(e)) => e.into_inner().sample(),
        });

        match time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(ProbeError::Failed(format!("probe task aborted: {join}"))),
            Err(_) => Err(ProbeError::Timeout(timeout)),
        }
    }
}

/// Prime every probe off the async threads before the first tick.
pub(crate) async fn prime(slots: &[ProbeSlot]) {
    let probes: Vec<_> = slots.iter().map(|s| Arc::clone(&s.probe)).collect();
    let primed = tokio::task::spawn_blocking(move || {
        for probe in probes {
            probe.lock().unwrap_or_else(PoisonError::into_inner).prime();
        }
    })
    .await;
    if let Err(e) = primed {
        warn!("Probe priming aborted: {e}");
    }
}

/// Freezes the window and releases the engine however the tick task exits.
struct RunGuard {
    history: HistoryStore,
    shared:  Arc<Mutex<Shared>>,
    run_id:  u64,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if self.history.freeze(Completion::StopRequested, Local::now()) {
            error!("Monitoring run #{} ended abnormally; window frozen", self.run_id);
        }
        let mut shared = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        if shared.run_id == self.run_id {
            shared.state = EngineState::Stopped;
        }
    }
}

/// Run one observer callback, containing any panic it raises.
fn notify(what: &str, f: impl FnOnce()) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
        let msg = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic".to_string());
        error!("Observer panicked in {what}: {msg}");
    }
}

pub(crate) struct TickLoop {
    pub(crate) config:    EngineConfig,
    pub(crate) slots:     Vec<ProbeSlot>,
    pub(crate) history:   HistoryStore,
    pub(crate) observers: Vec<Arc<dyn RunObserver>>,
    pub(crate) stop_rx:   watch::Receiver<bool>,
    pub(crate) sealed:    Arc<AtomicBool>,
    pub(crate) shared:    Arc<Mutex<Shared>>,
    pub(crate) run_id:    u64,
}

impl TickLoop {
    /// Drive the run to completion and return the frozen window.
    pub(crate) async fn run(mut self) -> RunWindow {
        let _guard = RunGuard {
            history: self.history.clone(),
            shared:  Arc::clone(&self.shared),
            run_id:  self.run_id,
        };
        prime(&self.slots).await;

        let core_count = self.history.read(|w| w.core_count);
        let budget = self.config.duration_budget;
        let started = Instant::now();
        let mut ticker = time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let completion = loop {
            let woken_by_stop = tokio::select! {
                biased;
                _ = ticker.tick() => false,
                // An error means the engine was dropped; treat it as a stop.
                _ = self.stop_rx.changed() => true,
            };

            // Budget enforcement wins over a stop observed at the same boundary.
            if started.elapsed() >= budget {
                break Completion::BudgetReached;
            }
            if woken_by_stop || *self.stop_rx.borrow() {
                break Completion::StopRequested;
            }

            if self.tick(started, core_count).await {
                break Completion::BudgetReached;
            }
        };

        self.finish(completion)
    }

    /// Sample, append and notify. Returns `true` once the window is sealed.
    async fn tick(&mut self, started: Instant, core_count: usize) -> bool {
        let timestamp = started.elapsed();
        let captured_at = Local::now();

        let mut builder = SampleBuilder::new(timestamp, captured_at, core_count);
        for reading in self.sample_all().await {
            builder.reading(reading);
        }

        let budget_elapsed = started.elapsed() >= self.config.duration_budget;
        let sealed = match self.history.append_and_seal(builder.build(), budget_elapsed) {
            Ok(sealed) => {
                self.sealed.store(sealed, Ordering::Release);
                sealed
            }
            Err(e) => {
                // Only reachable through a lifecycle bug in this loop.
                error!("Sample append rejected: {e}; stopping run");
                return true;
            }
        };

        if !self.observers.is_empty() {
            self.history.read(|window| {
                let Some(sample) = window.last() else { return };
                let stats = window.statistics_all();
                for observer in &self.observers {
                    notify("on_sample", || observer.on_sample(sample, window, &stats));
                }
            });
        }

        sealed
    }

    /// Invoke every enabled probe concurrently and join the results.
    async fn sample_all(&mut self) -> Vec<Reading> {
        let timeout = self.config.probe_timeout;
        let active: Vec<usize> = (0..self.slots.len())
            .filter(|&i| !self.slots[i].disabled)
            .collect();

        let results = join_all(active.iter().map(|&i| self.slots[i].call(timeout))).await;

        let mut readings = Vec::with_capacity(results.len());
        for (i, result) in active.into_iter().zip(results) {
            let slot = &mut self.slots[i];
            // A slow first call says nothing about whether the sensor exists.
            let settled = !matches!(result, Err(ProbeError::Timeout(_) | ProbeError::Busy));
            let first_attempt = settled && !std::mem::replace(&mut slot.attempted, true);

            match result {
                Ok(reading) => readings.push(reading),
                Err(e) if e.is_permanent() || (slot.optional && first_attempt) => {
                    warn!("{} probe unavailable for this run: {e}", slot.kind);
                    slot.disabled = true;
                    self.history.mark_unavailable(slot.kind);
                }
                Err(e @ ProbeError::Timeout(_)) => {
                    warn!("{} probe {e}; field absent for this tick", slot.kind);
                }
                Err(e) => {
                    debug!("{} probe {e}; field absent for this tick", slot.kind);
                }
            }
        }
        readings
    }

    /// Freeze the window and notify observers. The run guard releases the
    /// engine once the task returns.
    fn finish(self, completion: Completion) -> RunWindow {
        self.history.freeze(completion, Local::now());

        let window = self.history.snapshot();
        info!(
            "Monitoring run finished ({:?}) with {} of {} samples",
            window.completion.unwrap_or(completion),
            window.len(),
            window.capacity(),
        );

        for observer in &self.observers {
            notify("on_run_completed", || observer.on_run_completed(&window));
        }
        window
    }
}
