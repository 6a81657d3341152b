//! Sampling engine for `hostmon`.
//!
//! Owns the `Idle → Running → Stopped` lifecycle of one observation window:
//! - builds a fresh probe set per run (availability is re-probed each time)
//! - drives a fixed-interval tick task on the Tokio runtime
//! - appends one [`Sample`](hostmon_core::Sample) per tick to the run's
//!   [`HistoryStore`] and notifies subscribed [`RunObserver`]s
//! - freezes the window when the budget elapses or a stop is observed

pub mod config;
mod tick;

pub use config::EngineConfig;

use hostmon_core::{HistoryStore, MonitorError, Result, RunObserver, RunWindow};
use hostmon_system::Probe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tick::{ProbeSlot, TickLoop};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Builds the probe set for a new run.
pub type ProbeFactory = Arc<dyn Fn() -> Vec<Box<dyn Probe>> + Send + Sync>;

/// Lifecycle of the engine's current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No run has been started yet.
    Idle,
    Running,
    /// The last run is frozen; a new one may be started.
    Stopped,
}

pub(crate) struct Shared {
    state:  EngineState,
    run_id: u64,
    active: Option<ActiveRun>,
}

struct ActiveRun {
    history: HistoryStore,
    stop_tx: watch::Sender<bool>,
    /// Set by the tick task as soon as the budget seals the window.
    sealed:  Arc<AtomicBool>,
}

struct Inner {
    config:    EngineConfig,
    factory:   ProbeFactory,
    observers: Mutex<Vec<Arc<dyn RunObserver>>>,
    shared:    Arc<Mutex<Shared>>,
}

/// Handle to the sampling engine. Cheap to clone; all clones drive the same
/// engine.
#[derive(Clone)]
pub struct SamplingEngine {
    inner: Arc<Inner>,
}

impl SamplingEngine {
    pub fn new(config: EngineConfig, factory: ProbeFactory) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                factory,
                observers: Mutex::new(Vec::new()),
                shared: Arc::new(Mutex::new(Shared {
                    state:  EngineState::Idle,
                    run_id: 0,
                    active: None,
                })),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    fn shared(&self) -> MutexGuard<'_, Shared> {
        self.inner.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an observer for every subsequent run.
    pub fn subscribe(&self, observer: Arc<dyn RunObserver>) {
        self.inner
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    pub fn state(&self) -> EngineState {
        self.shared().state
    }

    /// History of the current (or most recent) run.
    pub fn current(&self) -> Option<HistoryStore> {
        self.shared().active.as_ref().map(|run| run.history.clone())
    }

    /// Start a new run on the current Tokio runtime.
    ///
    /// Allowed from `Idle` and `Stopped`; the previous run's window is
    /// released (exporters keep their own copy via [`RunHandle::wait`]).
    pub fn start(&self) -> Result<RunHandle> {
        let mut shared = self.shared();
        if shared.state == EngineState::Running {
            return Err(MonitorError::AlreadyRunning);
        }

        let config = self.inner.config;
        let probes = (self.inner.factory)();
        let core_count = probes.iter().find_map(|p| p.core_count()).unwrap_or(0);
        let slots: Vec<ProbeSlot> = probes.into_iter().map(ProbeSlot::new).collect();

        let window = RunWindow::new(config.interval, config.duration_budget, core_count);
        let capacity = window.capacity();
        let history = HistoryStore::new(window);
        let (stop_tx, stop_rx) = watch::channel(false);
        let sealed = Arc::new(AtomicBool::new(false));

        shared.run_id += 1;
        shared.state = EngineState::Running;
        shared.active = Some(ActiveRun {
            history: history.clone(),
            stop_tx,
            sealed: Arc::clone(&sealed),
        });

        let observers = self
            .inner
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        info!(
            "Monitoring run #{} started: {} probes, {} samples every {:?}",
            shared.run_id,
            slots.len(),
            capacity,
            config.interval,
        );

        let run = TickLoop {
            config,
            slots,
            history: history.clone(),
            observers,
            stop_rx,
            sealed,
            shared: Arc::clone(&self.inner.shared),
            run_id: shared.run_id,
        };
        drop(shared);

        Ok(RunHandle {
            history,
            join: tokio::spawn(run.run()),
        })
    }

    /// Request a cooperative stop, observed at the next tick boundary.
    ///
    /// Returns `false` (a no-op) when no run is active or the running window
    /// has already been sealed by the budget.
    pub fn stop(&self) -> bool {
        let shared = self.shared();
        if shared.state != EngineState::Running {
            return false;
        }
        let Some(run) = shared.active.as_ref() else {
            return false;
        };
        if run.sealed.load(Ordering::Acquire) {
            debug!("Stop ignored: run already completed");
            return false;
        }
        run.stop_tx.send_replace(true);
        true
    }
}

/// A started run: live access to its history and a way to await the frozen
/// window.
#[derive(Debug)]
pub struct RunHandle {
    history: HistoryStore,
    join:    JoinHandle<RunWindow>,
}

impl RunHandle {
    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Wait for the run to stop and return its frozen window.
    pub async fn wait(self) -> Result<RunWindow> {
        self.join
            .await
            .map_err(|e| MonitorError::Engine(format!("tick task failed: {e}")))
    }
}
