use crate::{sample::Sample, stats::Statistics, window::RunWindow};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

/// Subscriber interface for the presentation layer.
///
/// Both callbacks run synchronously on the tick task, under the history
/// read lock. Implementations must return quickly; anything slow belongs on
/// the other side of a channel (see [`ChannelObserver`]).
pub trait RunObserver: Send + Sync {
    /// Called after every appended sample with statistics over the run so far.
    fn on_sample(&self, _sample: &Sample, _window: &RunWindow, _stats: &Statistics) {}

    /// Called once when the run is frozen.
    fn on_run_completed(&self, _window: &RunWindow) {}
}

/// Events forwarded by [`ChannelObserver`].
#[derive(Debug, Clone)]
pub enum RunEvent {
    /// A new sample plus statistics-so-far.
    Sample {
        sample:     Sample,
        statistics: Statistics,
        remaining:  std::time::Duration,
    },
    /// The run has stopped; carries the frozen window.
    Completed(Box<RunWindow>),
}

/// Forwards observer callbacks over a bounded channel without blocking.
///
/// A full channel drops `Sample` events. `Completed` is never dropped while a
/// Tokio runtime is available: if the channel is full it is handed to a task
/// that waits for room, so it still arrives after every sample already queued.
/// Without a runtime a full channel drops it like any other event.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::Sender<RunEvent>,
}

impl ChannelObserver {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<RunEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    fn forward(&self, event: RunEvent) {
        if let Err(e) = self.tx.try_send(event) {
            debug!("run event dropped: {e}");
        }
    }

    fn forward_final(&self, event: RunEvent) {
        let event = match self.tx.try_send(event) {
            Ok(()) | Err(TrySendError::Closed(_)) => return,
            Err(TrySendError::Full(event)) => event,
        };
        match Handle::try_current() {
            Ok(handle) => {
                let tx = self.tx.clone();
                handle.spawn(async move {
                    let _ = tx.send(event).await;
                });
            }
            Err(_) => debug!("completion event dropped: channel full and no runtime"),
        }
    }
}

impl RunObserver for ChannelObserver {
    fn on_sample(&self, sample: &Sample, window: &RunWindow, stats: &Statistics) {
        self.forward(RunEvent::Sample {
            sample:     sample.clone(),
            statistics: stats.clone(),
            remaining:  window.remaining(),
        });
    }

    fn on_run_completed(&self, window: &RunWindow) {
        self.forward_final(RunEvent::Completed(Box::new(window.clone())));
    }
}
