//! Data model for `hostmon`: samples, the bounded run window, its shared
//! history store, statistics and the subscriber interface.

pub mod error;
pub mod event;
pub mod history;
pub mod sample;
pub mod stats;
pub mod window;

pub use error::{MonitorError, ProbeError, Result};
pub use event::{ChannelObserver, RunEvent, RunObserver};
pub use history::HistoryStore;
pub use sample::{ProbeKind, Reading, Sample, SampleBuilder};
pub use stats::{Metric, MetricStats, Statistics, Summary, Unit};
pub use window::{Completion, RunWindow, DEFAULT_DURATION_BUDGET, DEFAULT_INTERVAL, MAX_CAPACITY};
